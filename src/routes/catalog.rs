use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::catalog::{CategoryDetail, CategoryList, SubCategoryDetail, SubCategoryList},
    error::AppResult,
    response::ApiResponse,
    routes::params::Pagination,
    services::catalog_service,
    state::AppState,
};

pub fn categories_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{id}", get(get_category))
}

pub fn subcategories_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subcategories))
        .route("/{id}", get(get_subcategory))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List categories", body = ApiResponse<CategoryList>)
    ),
    tag = "Catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = catalog_service::list_categories(&state, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category with its subcategories", body = ApiResponse<CategoryDetail>),
        (status = 404, description = "Category not found")
    ),
    tag = "Catalog"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CategoryDetail>>> {
    let resp = catalog_service::get_category(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/subcategories",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List subcategories", body = ApiResponse<SubCategoryList>)
    ),
    tag = "Catalog"
)]
pub async fn list_subcategories(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<SubCategoryList>>> {
    let resp = catalog_service::list_subcategories(&state, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/subcategories/{id}",
    params(
        ("id" = Uuid, Path, description = "Subcategory ID")
    ),
    responses(
        (status = 200, description = "Subcategory with its products", body = ApiResponse<SubCategoryDetail>),
        (status = 404, description = "Subcategory not found")
    ),
    tag = "Catalog"
)]
pub async fn get_subcategory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SubCategoryDetail>>> {
    let resp = catalog_service::get_subcategory(&state, id).await?;
    Ok(Json(resp))
}
