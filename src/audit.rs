use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

#[derive(Debug, Clone, Copy)]
pub enum AuditAction {
    UserRegister,
    UserLogin,
    UserLogout,
    ProfileUpdate,
    ReviewCreate,
    ReviewUpdate,
    ReviewDelete,
    CartItemAdd,
    CartItemUpdate,
    CartItemRemove,
    FavoriteAdd,
    FavoriteRemove,
    CatalogCreate,
    CatalogUpdate,
    CatalogDelete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::UserRegister => "user_register",
            AuditAction::UserLogin => "user_login",
            AuditAction::UserLogout => "user_logout",
            AuditAction::ProfileUpdate => "profile_update",
            AuditAction::ReviewCreate => "review_create",
            AuditAction::ReviewUpdate => "review_update",
            AuditAction::ReviewDelete => "review_delete",
            AuditAction::CartItemAdd => "cart_item_add",
            AuditAction::CartItemUpdate => "cart_item_update",
            AuditAction::CartItemRemove => "cart_item_remove",
            AuditAction::FavoriteAdd => "favorite_add",
            AuditAction::FavoriteRemove => "favorite_remove",
            AuditAction::CatalogCreate => "catalog_create",
            AuditAction::CatalogUpdate => "catalog_update",
            AuditAction::CatalogDelete => "catalog_delete",
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(action.as_str())
    .bind(resource)
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}
