use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::catalog::{CategoryDetail, CategoryList, SubCategoryDetail, SubCategoryList},
    dto::products::{ProductDetail, ProductList, ProductListItem, SubCategoryRef},
    dto::reviews::{ReviewAuthor, ReviewDto},
    entity::{
        Categories, Products, SubCategories,
        categories::Column as CategoryCol,
        products::{Column as ProductCol, Model as ProductModel},
        subcategories::Column as SubCategoryCol,
    },
    error::{AppError, AppResult},
    models::{Category, ProductImage, SubCategory},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

pub async fn list_categories(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<CategoryList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Categories::find().order_by_asc(CategoryCol::Name);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|model| Category {
            id: model.id,
            name: model.name,
            image: model.image,
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(meta),
    ))
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<ApiResponse<CategoryDetail>> {
    let category = Categories::find_by_id(id).one(&state.orm).await?;
    let category = match category {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let subcategories = SubCategories::find()
        .filter(SubCategoryCol::CategoryId.eq(id))
        .order_by_asc(SubCategoryCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|model| SubCategory {
            id: model.id,
            category_id: model.category_id,
            name: model.name,
        })
        .collect();

    let detail = CategoryDetail {
        id: category.id,
        name: category.name,
        image: category.image,
        subcategories,
    };
    Ok(ApiResponse::success("Category", detail, None))
}

pub async fn list_subcategories(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<SubCategoryList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = SubCategories::find().order_by_asc(SubCategoryCol::Name);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|model| SubCategory {
            id: model.id,
            category_id: model.category_id,
            name: model.name,
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Subcategories",
        SubCategoryList { items },
        Some(meta),
    ))
}

pub async fn get_subcategory(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<SubCategoryDetail>> {
    let subcategory = SubCategories::find_by_id(id).one(&state.orm).await?;
    let subcategory = match subcategory {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let products = Products::find()
        .filter(ProductCol::SubcategoryId.eq(id))
        .order_by_desc(ProductCol::CreatedAt)
        .all(&state.orm)
        .await?;
    let products = assemble_product_items(state, products).await?;

    let detail = SubCategoryDetail {
        id: subcategory.id,
        category_id: subcategory.category_id,
        name: subcategory.name,
        products,
    };
    Ok(ApiResponse::success("Subcategory", detail, None))
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(Expr::col(ProductCol::Name).ilike(pattern));
    }

    if let Some(subcategory_id) = query.subcategory_id {
        condition = condition.add(ProductCol::SubcategoryId.eq(subcategory_id));
    }

    if let Some(product_type) = query.product_type {
        condition = condition.add(ProductCol::ProductType.eq(product_type));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(ProductCol::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(ProductCol::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => ProductCol::CreatedAt,
        ProductSortBy::Price => ProductCol::Price,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = assemble_product_items(state, models).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let product = Products::find_by_id(id).one(&state.orm).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let subcategory = SubCategories::find_by_id(product.subcategory_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let images: Vec<ProductImage> =
        sqlx::query_as("SELECT * FROM product_images WHERE product_id = $1")
            .bind(product.id)
            .fetch_all(&state.pool)
            .await?;

    let ratings = rating_map(&state.pool, &[product.id]).await?;
    let (avg_rating, review_count) = ratings.get(&product.id).copied().unwrap_or((0.0, 0));

    let reviews = sqlx::query_as::<_, ReviewWithAuthorRow>(
        r#"
        SELECT r.id, r.stars, r.comment, r.created_at, u.username, u.first_name
        FROM reviews r
        JOIN users u ON u.id = r.user_id
        WHERE r.product_id = $1
        ORDER BY r.created_at DESC
        "#,
    )
    .bind(product.id)
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(ReviewWithAuthorRow::into_dto)
    .collect();

    let detail = ProductDetail {
        id: product.id,
        name: product.name,
        description: product.description,
        price: product.price,
        article_number: product.article_number,
        product_type: product.product_type,
        video: product.video,
        subcategory: SubCategoryRef {
            id: subcategory.id,
            name: subcategory.name,
        },
        images,
        avg_rating,
        review_count,
        reviews,
        created_at: product.created_at.with_timezone(&Utc),
    };
    Ok(ApiResponse::success("Product", detail, None))
}

#[derive(FromRow)]
struct ReviewWithAuthorRow {
    id: Uuid,
    stars: i32,
    comment: String,
    created_at: DateTime<Utc>,
    username: String,
    first_name: Option<String>,
}

impl ReviewWithAuthorRow {
    fn into_dto(self) -> ReviewDto {
        ReviewDto {
            id: self.id,
            author: ReviewAuthor {
                username: self.username,
                first_name: self.first_name,
            },
            stars: self.stars,
            comment: self.comment,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct RatingRow {
    product_id: Uuid,
    avg_stars: Option<f64>,
    review_count: i64,
}

/// Per-product (average stars rounded to one decimal, review count).
/// Products without reviews are absent from the map.
async fn rating_map(pool: &DbPool, ids: &[Uuid]) -> AppResult<HashMap<Uuid, (f64, i64)>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<RatingRow> = sqlx::query_as(
        r#"
        SELECT product_id, AVG(stars)::DOUBLE PRECISION AS avg_stars, COUNT(*) AS review_count
        FROM reviews
        WHERE product_id = ANY($1)
        GROUP BY product_id
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let avg = round_rating(row.avg_stars.unwrap_or(0.0));
            (row.product_id, (avg, row.review_count))
        })
        .collect())
}

async fn image_map(pool: &DbPool, ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<ProductImage>>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<ProductImage> =
        sqlx::query_as("SELECT * FROM product_images WHERE product_id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await?;

    let mut map: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
    for row in rows {
        map.entry(row.product_id).or_default().push(row);
    }
    Ok(map)
}

/// Build listing items for a page of product rows: batch-fetch images,
/// ratings and subcategory names instead of querying per product.
async fn assemble_product_items(
    state: &AppState,
    models: Vec<ProductModel>,
) -> AppResult<Vec<ProductListItem>> {
    let product_ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();

    let mut images = image_map(&state.pool, &product_ids).await?;
    let ratings = rating_map(&state.pool, &product_ids).await?;

    let subcategory_ids: Vec<Uuid> = models.iter().map(|m| m.subcategory_id).collect();
    let subcategories: HashMap<Uuid, String> = if subcategory_ids.is_empty() {
        HashMap::new()
    } else {
        SubCategories::find()
            .filter(SubCategoryCol::Id.is_in(subcategory_ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|model| (model.id, model.name))
            .collect()
    };

    let items = models
        .into_iter()
        .map(|model| {
            let (avg_rating, review_count) =
                ratings.get(&model.id).copied().unwrap_or((0.0, 0));
            ProductListItem {
                id: model.id,
                name: model.name,
                price: model.price,
                product_type: model.product_type,
                subcategory: SubCategoryRef {
                    id: model.subcategory_id,
                    name: subcategories
                        .get(&model.subcategory_id)
                        .cloned()
                        .unwrap_or_default(),
                },
                images: images.remove(&model.id).unwrap_or_default(),
                avg_rating,
                review_count,
                created_at: model.created_at.with_timezone(&Utc),
            }
        })
        .collect();

    Ok(items)
}

pub(crate) fn round_rating(avg: f64) -> f64 {
    (avg * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::round_rating;

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(round_rating(4.5), 4.5);
        assert_eq!(round_rating(11.0 / 3.0), 3.7);
        assert_eq!(round_rating(1.0 / 3.0), 0.3);
        assert_eq!(round_rating(0.0), 0.0);
    }
}
