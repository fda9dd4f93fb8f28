use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod doc;
pub mod favorites;
pub mod health;
pub mod params;
pub mod products;
pub mod profile;
pub mod reviews;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/profile", profile::router())
        .nest("/categories", catalog::categories_router())
        .nest("/subcategories", catalog::subcategories_router())
        .nest("/products", products::router())
        .nest("/reviews", reviews::router())
        .nest("/cart", cart::router())
        .nest("/favorites", favorites::router())
        .nest("/admin", admin::router())
}
