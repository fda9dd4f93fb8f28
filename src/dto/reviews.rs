use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct CreateReviewRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub stars: i32,
    #[validate(length(min = 1, max = 2000))]
    pub comment: String,
}

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub stars: Option<i32>,
    #[validate(length(min = 1, max = 2000))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewAuthor {
    pub username: String,
    pub first_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewDto {
    pub id: Uuid,
    pub author: ReviewAuthor,
    pub stars: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ReviewList {
    #[schema(value_type = Vec<ReviewDto>)]
    pub items: Vec<ReviewDto>,
}
