use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::{AuditAction, log_audit},
    db::DbPool,
    dto::cart::{AddCartItemRequest, CartDto, CartItemDto, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Cart, CartItem, Product},
    response::ApiResponse,
};

#[derive(FromRow)]
struct CartLineRow {
    item_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    subcategory_id: Uuid,
    name: String,
    description: String,
    price: i64,
    article_number: i64,
    product_type: bool,
    video: Option<String>,
    created_at: DateTime<Utc>,
}

impl CartLineRow {
    fn into_dto(self) -> CartItemDto {
        let total_price = self.quantity as i64 * self.price;
        CartItemDto {
            id: self.item_id,
            product: Product {
                id: self.product_id,
                subcategory_id: self.subcategory_id,
                name: self.name,
                description: self.description,
                price: self.price,
                article_number: self.article_number,
                product_type: self.product_type,
                video: self.video,
                created_at: self.created_at,
            },
            quantity: self.quantity,
            total_price,
        }
    }
}

/// Every user has exactly one cart; it is created on first touch.
async fn get_or_create_cart(pool: &DbPool, user_id: Uuid) -> AppResult<Cart> {
    let cart: Cart = sqlx::query_as(
        r#"
        INSERT INTO carts (id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(cart)
}

async fn cart_lines(pool: &DbPool, cart_id: Uuid) -> AppResult<Vec<CartItemDto>> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        r#"
        SELECT ci.id AS item_id, ci.quantity,
               p.id AS product_id, p.subcategory_id, p.name, p.description, p.price,
               p.article_number, p.product_type, p.video, p.created_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.cart_id = $1
        ORDER BY p.name
        "#,
    )
    .bind(cart_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CartLineRow::into_dto).collect())
}

pub async fn get_cart(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartDto>> {
    let cart = get_or_create_cart(pool, user.user_id).await?;
    let items = cart_lines(pool, cart.id).await?;
    let total_price = cart_total(&items);

    let dto = CartDto {
        id: cart.id,
        items,
        total_price,
    };
    Ok(ApiResponse::success("Cart", dto, None))
}

pub async fn add_item(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddCartItemRequest,
) -> AppResult<ApiResponse<CartItemDto>> {
    payload.validate()?;

    let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(pool)
        .await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::BadRequest("Product not found".into())),
    };

    let cart = get_or_create_cart(pool, user.user_id).await?;

    let existing: Option<CartItem> =
        sqlx::query_as("SELECT * FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart.id)
            .bind(payload.product_id)
            .fetch_optional(pool)
            .await?;

    // Re-adding a product replaces the quantity rather than accumulating.
    let item: CartItem = if let Some(item) = existing {
        sqlx::query_as(
            r#"
            UPDATE cart_items
            SET quantity = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(item.id)
        .bind(payload.quantity)
        .fetch_one(pool)
        .await?
    } else {
        sqlx::query_as(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cart.id)
        .bind(payload.product_id)
        .bind(payload.quantity)
        .fetch_one(pool)
        .await?
    };

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        AuditAction::CartItemAdd,
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let total_price = item.quantity as i64 * product.price;
    let dto = CartItemDto {
        id: item.id,
        product,
        quantity: item.quantity,
        total_price,
    };
    Ok(ApiResponse::success("Added to cart", dto, None))
}

pub async fn update_item(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartItemDto>> {
    payload.validate()?;

    let item: Option<CartItem> = sqlx::query_as(
        r#"
        UPDATE cart_items
        SET quantity = $3
        WHERE id = $1
          AND cart_id IN (SELECT id FROM carts WHERE user_id = $2)
        RETURNING *
        "#,
    )
    .bind(item_id)
    .bind(user.user_id)
    .bind(payload.quantity)
    .fetch_optional(pool)
    .await?;
    let item = match item {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    let product: Product = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(item.product_id)
        .fetch_one(pool)
        .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        AuditAction::CartItemUpdate,
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item.id, "quantity": item.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let total_price = item.quantity as i64 * product.price;
    let dto = CartItemDto {
        id: item.id,
        product,
        quantity: item.quantity,
        total_price,
    };
    Ok(ApiResponse::success("Cart item updated", dto, None))
}

pub async fn remove_item(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query(
        r#"
        DELETE FROM cart_items
        WHERE id = $1
          AND cart_id IN (SELECT id FROM carts WHERE user_id = $2)
        "#,
    )
    .bind(item_id)
    .bind(user.user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        AuditAction::CartItemRemove,
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::message_only("Removed from cart"))
}

fn cart_total(items: &[CartItemDto]) -> i64 {
    items.iter().map(|item| item.total_price).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32, price: i64) -> CartItemDto {
        CartItemDto {
            id: Uuid::new_v4(),
            product: Product {
                id: Uuid::new_v4(),
                subcategory_id: Uuid::new_v4(),
                name: "widget".into(),
                description: "a widget".into(),
                price,
                article_number: 1,
                product_type: true,
                video: None,
                created_at: Utc::now(),
            },
            quantity,
            total_price: quantity as i64 * price,
        }
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        let items = vec![line(2, 1000), line(1, 350), line(3, 10)];
        assert_eq!(cart_total(&items), 2380);
    }

    #[test]
    fn empty_cart_totals_zero() {
        assert_eq!(cart_total(&[]), 0);
    }
}
