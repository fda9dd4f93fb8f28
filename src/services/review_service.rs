use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::{AuditAction, log_audit},
    db::DbPool,
    dto::reviews::{CreateReviewRequest, ReviewAuthor, ReviewDto, ReviewList, UpdateReviewRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Review,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
};

pub async fn list_for_product(
    pool: &DbPool,
    product_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<ReviewList>> {
    let product_exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(pool)
        .await?;
    if product_exists.is_none() {
        return Err(AppError::NotFound);
    }

    let (page, limit, offset) = pagination.normalize();
    let rows: Vec<ReviewPageRow> = sqlx::query_as(
        r#"
        SELECT r.id, r.stars, r.comment, r.created_at, u.username, u.first_name
        FROM reviews r
        JOIN users u ON u.id = r.user_id
        WHERE r.product_id = $1
        ORDER BY r.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(product_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reviews WHERE product_id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await?;

    let items = rows.into_iter().map(ReviewPageRow::into_dto).collect();

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(meta),
    ))
}

pub async fn create_review(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    payload.validate()?;

    let product_exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(pool)
        .await?;
    if product_exists.is_none() {
        return Err(AppError::BadRequest("Product not found".into()));
    }

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM reviews WHERE user_id = $1 AND product_id = $2")
            .bind(user.user_id)
            .bind(payload.product_id)
            .fetch_optional(pool)
            .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest(
            "You have already reviewed this product".into(),
        ));
    }

    let review: Review = sqlx::query_as(
        r#"
        INSERT INTO reviews (id, product_id, user_id, stars, comment)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.product_id)
    .bind(user.user_id)
    .bind(payload.stars)
    .bind(payload.comment.as_str())
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        AuditAction::ReviewCreate,
        Some("reviews"),
        Some(serde_json::json!({ "review_id": review.id, "product_id": review.product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Review created", review, None))
}

pub async fn update_review(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    payload.validate()?;

    let existing: Option<Review> = sqlx::query_as("SELECT * FROM reviews WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let existing = match existing {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    if existing.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let stars = payload.stars.unwrap_or(existing.stars);
    let comment = payload.comment.unwrap_or(existing.comment);

    let review: Review = sqlx::query_as(
        r#"
        UPDATE reviews
        SET stars = $2, comment = $3
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(stars)
    .bind(comment)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        AuditAction::ReviewUpdate,
        Some("reviews"),
        Some(serde_json::json!({ "review_id": review.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Review updated", review, None))
}

pub async fn delete_review(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        AuditAction::ReviewDelete,
        Some("reviews"),
        Some(serde_json::json!({ "review_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::message_only("Review deleted"))
}

#[derive(FromRow)]
struct ReviewPageRow {
    id: Uuid,
    stars: i32,
    comment: String,
    created_at: DateTime<Utc>,
    username: String,
    first_name: Option<String>,
}

impl ReviewPageRow {
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
