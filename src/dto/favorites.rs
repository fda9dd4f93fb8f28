use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddFavoriteItemRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteItemDto {
    pub id: Uuid,
    pub product: Product,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteDto {
    pub id: Uuid,
    pub items: Vec<FavoriteItemDto>,
}
