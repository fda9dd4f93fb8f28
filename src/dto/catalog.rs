use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::products::ProductListItem;
use crate::models::{Category, SubCategory};

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryDetail {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub subcategories: Vec<SubCategory>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct SubCategoryList {
    #[schema(value_type = Vec<SubCategory>)]
    pub items: Vec<SubCategory>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubCategoryDetail {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub products: Vec<ProductListItem>,
}
