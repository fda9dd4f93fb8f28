use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i32>,
    pub phone_number: Option<String>,
    pub avatar: Option<String>,
    pub status: String,
    pub is_staff: bool,
    pub date_registered: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct SubCategory {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub subcategory_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub article_number: i64,
    pub product_type: bool,
    pub video: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub stars: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct FavoriteItem {
    pub id: Uuid,
    pub favorite_id: Uuid,
    pub product_id: Uuid,
}
