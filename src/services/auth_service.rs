use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::{AuditAction, log_audit},
    db::DbPool,
    dto::auth::{
        Claims, LoginRequest, LoginResponse, LogoutRequest, RefreshRequest, RefreshResponse,
        RegisterRequest, UserSummary,
    },
    error::{AppError, AppResult},
    models::User,
    response::{ApiResponse, Meta},
};

pub const TOKEN_USE_ACCESS: &str = "access";
pub const TOKEN_USE_REFRESH: &str = "refresh";

pub const ACCESS_TOKEN_TTL_SECS: i64 = 900; // 15 minutes
pub const REFRESH_TOKEN_TTL_SECS: i64 = 604_800; // 7 days

pub fn jwt_secret() -> AppResult<String> {
    std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))
}

fn encode_token(
    user_id: Uuid,
    staff: bool,
    token_use: &str,
    ttl_secs: i64,
    secret: &str,
) -> AppResult<String> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::seconds(ttl_secs))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        staff,
        token_use: token_use.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;
    Ok(decoded.claims)
}

fn issue_token_pair(user_id: Uuid, staff: bool, secret: &str) -> AppResult<(String, String)> {
    let access = encode_token(user_id, staff, TOKEN_USE_ACCESS, ACCESS_TOKEN_TTL_SECS, secret)?;
    let refresh = encode_token(
        user_id,
        staff,
        TOKEN_USE_REFRESH,
        REFRESH_TOKEN_TTL_SECS,
        secret,
    )?;
    Ok((access, refresh))
}

pub async fn register_user(pool: &DbPool, payload: RegisterRequest) -> AppResult<ApiResponse<User>> {
    payload.validate()?;

    let taken: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE username = $1 OR email = $2")
            .bind(payload.username.as_str())
            .bind(payload.email.as_str())
            .fetch_optional(pool)
            .await?;

    if taken.is_some() {
        return Err(AppError::BadRequest(
            "Username or email is already taken".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();

    let id = Uuid::new_v4();

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash, first_name, last_name, age, phone_number)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.username.as_str())
    .bind(payload.email.as_str())
    .bind(password_hash)
    .bind(payload.first_name.as_deref())
    .bind(payload.last_name.as_deref())
    .bind(payload.age)
    .bind(payload.phone_number.as_deref())
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.id),
        AuditAction::UserRegister,
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    Ok(ApiResponse::success("User created", user, None))
}

pub async fn login_user(
    pool: &DbPool,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { username, password } = payload;
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username.as_str())
        .fetch_optional(pool)
        .await?;

    // Unknown user and wrong password must be indistinguishable.
    let user = match user {
        Some(u) => u,
        None => return Err(AppError::Unauthorized("Invalid credentials".into())),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let secret = jwt_secret()?;
    let (access, refresh) = issue_token_pair(user.id, user.is_staff, &secret)?;

    if let Err(err) = log_audit(
        pool,
        Some(user.id),
        AuditAction::UserLogin,
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let resp = LoginResponse {
        user: UserSummary {
            username: user.username,
            email: user.email,
        },
        access,
        refresh,
    };

    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

pub async fn refresh_access_token(
    pool: &DbPool,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<RefreshResponse>> {
    let secret = jwt_secret()?;
    let claims = decode_token(&payload.refresh, &secret)?;

    if claims.token_use != TOKEN_USE_REFRESH {
        return Err(AppError::Unauthorized("Not a refresh token".into()));
    }

    let jti = Uuid::parse_str(&claims.jti)
        .map_err(|_| AppError::Unauthorized("Invalid token id".into()))?;

    let revoked: Option<(Uuid,)> = sqlx::query_as("SELECT jti FROM revoked_tokens WHERE jti = $1")
        .bind(jti)
        .fetch_optional(pool)
        .await?;

    if revoked.is_some() {
        return Err(AppError::Unauthorized("Token has been revoked".into()));
    }

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

    let access = encode_token(
        user_id,
        claims.staff,
        TOKEN_USE_ACCESS,
        ACCESS_TOKEN_TTL_SECS,
        &secret,
    )?;

    Ok(ApiResponse::success(
        "Token refreshed",
        RefreshResponse { access },
        Some(Meta::empty()),
    ))
}

pub async fn logout_user(
    pool: &DbPool,
    payload: LogoutRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let secret = jwt_secret()?;
    let claims = decode_token(&payload.refresh, &secret)?;

    if claims.token_use != TOKEN_USE_REFRESH {
        return Err(AppError::Unauthorized("Not a refresh token".into()));
    }

    let jti = Uuid::parse_str(&claims.jti)
        .map_err(|_| AppError::Unauthorized("Invalid token id".into()))?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

    // Idempotent: logging out twice with the same token is fine.
    sqlx::query(
        r#"
        INSERT INTO revoked_tokens (jti, user_id)
        VALUES ($1, $2)
        ON CONFLICT (jti) DO NOTHING
        "#,
    )
    .bind(jti)
    .bind(user_id)
    .execute(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user_id),
        AuditAction::UserLogout,
        Some("users"),
        Some(serde_json::json!({ "jti": jti })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::message_only("Logged out"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_pair_round_trips() {
        let user_id = Uuid::new_v4();
        let (access, refresh) = issue_token_pair(user_id, false, "test-secret").unwrap();

        let access_claims = decode_token(&access, "test-secret").unwrap();
        assert_eq!(access_claims.token_use, TOKEN_USE_ACCESS);
        assert_eq!(access_claims.sub, user_id.to_string());
        assert!(!access_claims.staff);

        let refresh_claims = decode_token(&refresh, "test-secret").unwrap();
        assert_eq!(refresh_claims.token_use, TOKEN_USE_REFRESH);
        assert_ne!(access_claims.jti, refresh_claims.jti);
        assert!(refresh_claims.exp > access_claims.exp);
    }

    #[test]
    fn decode_rejects_wrong_secret() {
        let (access, _) = issue_token_pair(Uuid::new_v4(), true, "secret-a").unwrap();
        let err = decode_token(&access, "secret-b").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn staff_flag_survives_the_claims() {
        let (access, _) = issue_token_pair(Uuid::new_v4(), true, "test-secret").unwrap();
        let claims = decode_token(&access, "test-secret").unwrap();
        assert!(claims.staff);
    }
}
