use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::{
    audit::audit,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
    error::{AppError, AppResult},
    middleware::auth::ROLE_USER,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

const TOKEN_TTL_HOURS: i64 = 24;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub fn issue_token(user_id: Uuid, role: &str, secret: &str) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn validate_registration(payload: &RegisterRequest) -> AppResult<()> {
    if !payload.email.contains('@') {
        return Err(AppError::bad_request("Enter a valid email address"));
    }
    let username = payload.username.trim();
    if username.is_empty() || username.len() > 150 {
        return Err(AppError::bad_request("Username is required"));
    }
    if payload.password.len() < 8 {
        return Err(AppError::bad_request("Password must be at least 8 characters"));
    }
    Ok(())
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    validate_registration(&payload)?;
    let email = payload.email.trim().to_lowercase();
    let username = payload.username.trim().to_string();

    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE lower(email) = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?;
    if exist.is_some() {
        return Err(AppError::bad_request("Email is already taken"));
    }

    let taken: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE username = $1")
        .bind(&username)
        .fetch_optional(&state.pool)
        .await?;
    if taken.is_some() {
        return Err(AppError::bad_request("Username is already taken"));
    }

    let password_hash = hash_password(&payload.password)?;

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, username, password_hash, full_name, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, email, username, full_name, role, is_active, created_at, last_login
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(&username)
    .bind(password_hash)
    .bind(payload.full_name.unwrap_or_default())
    .bind(ROLE_USER)
    .fetch_one(&state.pool)
    .await?;

    audit(
        &state.pool,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success("User created", user, None))
}

#[derive(sqlx::FromRow)]
struct LoginRow {
    id: Uuid,
    password_hash: String,
    role: String,
    is_active: bool,
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let row: Option<LoginRow> = sqlx::query_as(
        "SELECT id, password_hash, role, is_active FROM users WHERE lower(email) = lower($1)",
    )
    .bind(email.trim())
    .fetch_optional(&state.pool)
    .await?;

    let Some(row) = row else {
        return Err(AppError::bad_request("Invalid email or password"));
    };

    if !row.is_active || !verify_password(&password, &row.password_hash) {
        return Err(AppError::bad_request("Invalid email or password"));
    }

    let token = issue_token(row.id, &row.role, &state.config.jwt_secret)?;

    let user: User = sqlx::query_as(
        r#"
        UPDATE users SET last_login = now() WHERE id = $1
        RETURNING id, email, username, full_name, role, is_active, created_at, last_login
        "#,
    )
    .bind(row.id)
    .fetch_one(&state.pool)
    .await?;

    audit(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let resp = LoginResponse {
        token: format!("Bearer {}", token),
        user,
    };
    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_and_verifies_passwords() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("anything", "not-a-hash"));
    }

    #[test]
    fn issued_token_decodes() {
        let id = Uuid::new_v4();
        let token = issue_token(id, "admin", "secret").unwrap();
        let user = crate::middleware::auth::decode_token(&token, "secret").unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.role, "admin");
    }

    #[test]
    fn registration_rules() {
        let ok = RegisterRequest {
            email: "a@b.c".into(),
            username: "alice".into(),
            password: "longenough".into(),
            full_name: None,
        };
        assert!(validate_registration(&ok).is_ok());

        let short = RegisterRequest {
            password: "short".into(),
            ..ok
        };
        assert!(validate_registration(&short).is_err());
    }
}
