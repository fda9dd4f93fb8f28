use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::{AuditAction, log_audit},
    entity::{
        Categories, ProductImages, Products, SubCategories,
        categories::{ActiveModel as CategoryActive, Column as CategoryCol, Model as CategoryModel},
        product_images::{ActiveModel as ImageActive, Model as ImageModel},
        products::{ActiveModel as ProductActive, Column as ProductCol, Model as ProductModel},
        subcategories::{ActiveModel as SubCategoryActive, Model as SubCategoryModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::{Category, Product, ProductImage, SubCategory},
    response::{ApiResponse, Meta},
    routes::admin::{
        AddProductImageRequest, CreateCategoryRequest, CreateProductRequest,
        CreateSubCategoryRequest, UpdateCategoryRequest, UpdateProductRequest,
        UpdateSubCategoryRequest,
    },
    state::AppState,
};

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_staff(user)?;
    payload.validate()?;

    let taken = Categories::find()
        .filter(CategoryCol::Name.eq(payload.name.clone()))
        .one(&state.orm)
        .await?;
    if taken.is_some() {
        return Err(AppError::BadRequest("Category name is already taken".into()));
    }

    let active = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        image: Set(payload.image),
    };
    let category = active.insert(&state.orm).await?;

    audit_catalog(state, user, AuditAction::CatalogCreate, "categories", category.id).await;

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_staff(user)?;
    payload.validate()?;

    let existing = Categories::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let mut active: CategoryActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(image) = payload.image {
        active.image = Set(image);
    }
    let category = active.update(&state.orm).await?;

    audit_catalog(state, user, AuditAction::CatalogUpdate, "categories", category.id).await;

    Ok(ApiResponse::success(
        "Category updated",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    let result = Categories::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit_catalog(state, user, AuditAction::CatalogDelete, "categories", id).await;

    Ok(ApiResponse::message_only("Category deleted"))
}

pub async fn create_subcategory(
    state: &AppState,
    user: &AuthUser,
    payload: CreateSubCategoryRequest,
) -> AppResult<ApiResponse<SubCategory>> {
    ensure_staff(user)?;
    payload.validate()?;

    let category = Categories::find_by_id(payload.category_id)
        .one(&state.orm)
        .await?;
    if category.is_none() {
        return Err(AppError::BadRequest("Category not found".into()));
    }

    let active = SubCategoryActive {
        id: Set(Uuid::new_v4()),
        category_id: Set(payload.category_id),
        name: Set(payload.name),
    };
    let subcategory = active.insert(&state.orm).await?;

    audit_catalog(state, user, AuditAction::CatalogCreate, "subcategories", subcategory.id).await;

    Ok(ApiResponse::success(
        "Subcategory created",
        subcategory_from_entity(subcategory),
        Some(Meta::empty()),
    ))
}

pub async fn update_subcategory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateSubCategoryRequest,
) -> AppResult<ApiResponse<SubCategory>> {
    ensure_staff(user)?;
    payload.validate()?;

    let existing = SubCategories::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    if let Some(category_id) = payload.category_id {
        let category = Categories::find_by_id(category_id).one(&state.orm).await?;
        if category.is_none() {
            return Err(AppError::BadRequest("Category not found".into()));
        }
    }

    let mut active: SubCategoryActive = existing.into();
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    let subcategory = active.update(&state.orm).await?;

    audit_catalog(state, user, AuditAction::CatalogUpdate, "subcategories", subcategory.id).await;

    Ok(ApiResponse::success(
        "Subcategory updated",
        subcategory_from_entity(subcategory),
        Some(Meta::empty()),
    ))
}

pub async fn delete_subcategory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    let result = SubCategories::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit_catalog(state, user, AuditAction::CatalogDelete, "subcategories", id).await;

    Ok(ApiResponse::message_only("Subcategory deleted"))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;
    payload.validate()?;

    let subcategory = SubCategories::find_by_id(payload.subcategory_id)
        .one(&state.orm)
        .await?;
    if subcategory.is_none() {
        return Err(AppError::BadRequest("Subcategory not found".into()));
    }

    let taken = Products::find()
        .filter(ProductCol::ArticleNumber.eq(payload.article_number))
        .one(&state.orm)
        .await?;
    if taken.is_some() {
        return Err(AppError::BadRequest(
            "Article number is already taken".into(),
        ));
    }

    let active = ProductActive {
        id: Set(Uuid::new_v4()),
        subcategory_id: Set(payload.subcategory_id),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        article_number: Set(payload.article_number),
        product_type: Set(payload.product_type),
        video: Set(payload.video),
        created_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    audit_catalog(state, user, AuditAction::CatalogCreate, "products", product.id).await;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;
    payload.validate()?;

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if let Some(subcategory_id) = payload.subcategory_id {
        let subcategory = SubCategories::find_by_id(subcategory_id).one(&state.orm).await?;
        if subcategory.is_none() {
            return Err(AppError::BadRequest("Subcategory not found".into()));
        }
    }

    if let Some(article_number) = payload.article_number {
        let taken = Products::find()
            .filter(ProductCol::ArticleNumber.eq(article_number))
            .filter(ProductCol::Id.ne(id))
            .one(&state.orm)
            .await?;
        if taken.is_some() {
            return Err(AppError::BadRequest(
                "Article number is already taken".into(),
            ));
        }
    }

    let mut active: ProductActive = existing.into();
    if let Some(subcategory_id) = payload.subcategory_id {
        active.subcategory_id = Set(subcategory_id);
    }
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(article_number) = payload.article_number {
        active.article_number = Set(article_number);
    }
    if let Some(product_type) = payload.product_type {
        active.product_type = Set(product_type);
    }
    if let Some(video) = payload.video {
        active.video = Set(Some(video));
    }
    let product = active.update(&state.orm).await?;

    audit_catalog(state, user, AuditAction::CatalogUpdate, "products", product.id).await;

    Ok(ApiResponse::success(
        "Product updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit_catalog(state, user, AuditAction::CatalogDelete, "products", id).await;

    Ok(ApiResponse::message_only("Product deleted"))
}

pub async fn add_product_image(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: AddProductImageRequest,
) -> AppResult<ApiResponse<ProductImage>> {
    ensure_staff(user)?;
    payload.validate()?;

    let product = Products::find_by_id(product_id).one(&state.orm).await?;
    if product.is_none() {
        return Err(AppError::NotFound);
    }

    let active = ImageActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        image: Set(payload.image),
    };
    let image = active.insert(&state.orm).await?;

    audit_catalog(state, user, AuditAction::CatalogCreate, "product_images", image.id).await;

    Ok(ApiResponse::success(
        "Product image added",
        image_from_entity(image),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product_image(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    let result = ProductImages::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit_catalog(state, user, AuditAction::CatalogDelete, "product_images", id).await;

    Ok(ApiResponse::message_only("Product image deleted"))
}

async fn audit_catalog(
    state: &AppState,
    user: &AuthUser,
    action: AuditAction,
    resource: &str,
    id: Uuid,
) {
    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        action,
        Some(resource),
        Some(serde_json::json!({ "id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
}

fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        image: model.image,
    }
}

fn subcategory_from_entity(model: SubCategoryModel) -> SubCategory {
    SubCategory {
        id: model.id,
        category_id: model.category_id,
        name: model.name,
    }
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        subcategory_id: model.subcategory_id,
        name: model.name,
        description: model.description,
        price: model.price,
        article_number: model.article_number,
        product_type: model.product_type,
        video: model.video,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn image_from_entity(model: ImageModel) -> ProductImage {
    ProductImage {
        id: model.id,
        product_id: model.product_id,
        image: model.image,
    }
}
