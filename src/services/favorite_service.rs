use uuid::Uuid;

use crate::{
    audit::{AuditAction, log_audit},
    db::DbPool,
    dto::favorites::{AddFavoriteItemRequest, FavoriteDto, FavoriteItemDto},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Favorite, FavoriteItem, Product},
    response::ApiResponse,
};

/// Every user has exactly one favorites list; it is created on first touch.
async fn get_or_create_favorite(pool: &DbPool, user_id: Uuid) -> AppResult<Favorite> {
    let favorite: Favorite = sqlx::query_as(
        r#"
        INSERT INTO favorites (id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(favorite)
}

#[derive(sqlx::FromRow)]
struct FavoriteLineRow {
    item_id: Uuid,
    product_id: Uuid,
    subcategory_id: Uuid,
    name: String,
    description: String,
    price: i64,
    article_number: i64,
    product_type: bool,
    video: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn list_favorites(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<FavoriteDto>> {
    let favorite = get_or_create_favorite(pool, user.user_id).await?;

    let rows = sqlx::query_as::<_, FavoriteLineRow>(
        r#"
        SELECT fi.id AS item_id,
               p.id AS product_id, p.subcategory_id, p.name, p.description, p.price,
               p.article_number, p.product_type, p.video, p.created_at
        FROM favorite_items fi
        JOIN products p ON p.id = fi.product_id
        WHERE fi.favorite_id = $1
        ORDER BY p.name
        "#,
    )
    .bind(favorite.id)
    .fetch_all(pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| FavoriteItemDto {
            id: row.item_id,
            product: Product {
                id: row.product_id,
                subcategory_id: row.subcategory_id,
                name: row.name,
                description: row.description,
                price: row.price,
                article_number: row.article_number,
                product_type: row.product_type,
                video: row.video,
                created_at: row.created_at,
            },
        })
        .collect();

    let dto = FavoriteDto {
        id: favorite.id,
        items,
    };
    Ok(ApiResponse::success("Favorites", dto, None))
}

pub async fn add_item(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddFavoriteItemRequest,
) -> AppResult<ApiResponse<FavoriteItemDto>> {
    let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(pool)
        .await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::BadRequest("Product not found".into())),
    };

    let favorite = get_or_create_favorite(pool, user.user_id).await?;

    let existing: Option<FavoriteItem> =
        sqlx::query_as("SELECT * FROM favorite_items WHERE favorite_id = $1 AND product_id = $2")
            .bind(favorite.id)
            .bind(payload.product_id)
            .fetch_optional(pool)
            .await?;

    let item = if let Some(item) = existing {
        item
    } else {
        sqlx::query_as(
            r#"
            INSERT INTO favorite_items (id, favorite_id, product_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(favorite.id)
        .bind(payload.product_id)
        .fetch_one(pool)
        .await?
    };

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        AuditAction::FavoriteAdd,
        Some("favorite_items"),
        Some(serde_json::json!({ "product_id": payload.product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let dto = FavoriteItemDto {
        id: item.id,
        product,
    };
    Ok(ApiResponse::success("Added to favorites", dto, None))
}

pub async fn remove_item(
    pool: &DbPool,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query(
        r#"
        DELETE FROM favorite_items
        WHERE product_id = $1
          AND favorite_id IN (SELECT id FROM favorites WHERE user_id = $2)
        "#,
    )
    .bind(product_id)
    .bind(user.user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        AuditAction::FavoriteRemove,
        Some("favorite_items"),
        Some(serde_json::json!({ "product_id": product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::message_only("Removed from favorites"))
}
