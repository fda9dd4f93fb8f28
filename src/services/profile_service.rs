use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use validator::Validate;

use crate::{
    audit::{AuditAction, log_audit},
    dto::profile::UpdateProfileRequest,
    entity::{Users, users::ActiveModel as UserActive, users::Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    state::AppState,
};

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let profile: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?;
    let profile = match profile {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Profile", profile, None))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    payload.validate()?;

    let existing = Users::find_by_id(user.user_id).one(&state.orm).await?;
    let existing = match existing {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    let mut active: UserActive = existing.into();
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(Some(first_name));
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(Some(last_name));
    }
    if let Some(age) = payload.age {
        active.age = Set(Some(age));
    }
    if let Some(phone_number) = payload.phone_number {
        active.phone_number = Set(Some(phone_number));
    }
    if let Some(avatar) = payload.avatar {
        active.avatar = Set(Some(avatar));
    }

    let updated = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        AuditAction::ProfileUpdate,
        Some("users"),
        Some(serde_json::json!({ "user_id": user.user_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Profile updated",
        user_from_entity(updated),
        None,
    ))
}

fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        first_name: model.first_name,
        last_name: model.last_name,
        age: model.age,
        phone_number: model.phone_number,
        avatar: model.avatar,
        status: model.status,
        is_staff: model.is_staff,
        date_registered: model.date_registered.with_timezone(&Utc),
    }
}
