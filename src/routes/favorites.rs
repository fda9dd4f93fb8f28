use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::favorites::{AddFavoriteItemRequest, FavoriteDto, FavoriteItemDto},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::favorite_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_favorites))
        .route("/items", post(add_favorite))
        .route("/items/{product_id}", delete(remove_favorite))
}

#[utoipa::path(
    get,
    path = "/api/favorites",
    responses(
        (status = 200, description = "The caller's favorites list", body = ApiResponse<FavoriteDto>)
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn list_favorites(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<FavoriteDto>>> {
    let resp = favorite_service::list_favorites(&state.pool, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/favorites/items",
    request_body = AddFavoriteItemRequest,
    responses(
        (status = 200, description = "Added to favorites", body = ApiResponse<FavoriteItemDto>),
        (status = 400, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn add_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddFavoriteItemRequest>,
) -> AppResult<Json<ApiResponse<FavoriteItemDto>>> {
    let resp = favorite_service::add_item(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/favorites/items/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Removed from favorites", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Favorite not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn remove_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = favorite_service::remove_item(&state.pool, &user, product_id).await?;
    Ok(Json(resp))
}
