use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::reviews::ReviewDto;
use crate::models::ProductImage;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubCategoryRef {
    pub id: Uuid,
    pub name: String,
}

/// Catalog listing shape: the product row plus its derived rating fields.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductListItem {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub product_type: bool,
    pub subcategory: SubCategoryRef,
    pub images: Vec<ProductImage>,
    pub avg_rating: f64,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<ProductListItem>)]
    pub items: Vec<ProductListItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub article_number: i64,
    pub product_type: bool,
    pub video: Option<String>,
    pub subcategory: SubCategoryRef,
    pub images: Vec<ProductImage>,
    pub avg_rating: f64,
    pub review_count: i64,
    pub reviews: Vec<ReviewDto>,
    pub created_at: DateTime<Utc>,
}
