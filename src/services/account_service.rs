use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    audit::audit,
    db::DbPool,
    dto::accounts::{AddressList, AddressRequest, ProfileView, UpdateProfileRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Address, Profile, User},
    response::{ApiResponse, Meta},
    services::auth_service::hash_password,
    state::AppState,
};

const USER_COLUMNS: &str = "id, email, username, full_name, role, is_active, created_at, last_login";

pub async fn fetch_user(pool: &DbPool, user_id: Uuid) -> AppResult<User> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)
}

/// Profiles are created lazily on first access.
pub async fn get_or_create_profile(pool: &DbPool, user_id: Uuid) -> AppResult<Profile> {
    sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(pool)
        .await?;

    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM user_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(profile)
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ProfileView>> {
    let account = fetch_user(&state.pool, user.user_id).await?;
    let profile = get_or_create_profile(&state.pool, user.user_id).await?;
    Ok(ApiResponse::ok("Profile", ProfileView { user: account, profile }))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<ProfileView>> {
    let mut tx = state.pool.begin().await?;

    if let Some(username) = payload.username.as_deref().map(str::trim) {
        if username.is_empty() {
            return Err(AppError::bad_request("Username is required"));
        }
        let taken: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE username = $1 AND id <> $2")
                .bind(username)
                .bind(user.user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(AppError::bad_request("Username is already taken"));
        }
        sqlx::query("UPDATE users SET username = $2 WHERE id = $1")
            .bind(user.user_id)
            .bind(username)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(full_name) = payload.full_name.as_deref() {
        sqlx::query("UPDATE users SET full_name = $2 WHERE id = $1")
            .bind(user.user_id)
            .bind(full_name.trim())
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user.user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        UPDATE user_profiles SET
            interests = COALESCE($2, interests),
            avatar_url = COALESCE($3, avatar_url),
            phone = COALESCE($4, phone),
            address_line1 = COALESCE($5, address_line1),
            address_line2 = COALESCE($6, address_line2),
            city = COALESCE($7, city),
            state = COALESCE($8, state),
            postal_code = COALESCE($9, postal_code),
            country = COALESCE($10, country)
        WHERE user_id = $1
        "#,
    )
    .bind(user.user_id)
    .bind(payload.interests)
    .bind(payload.avatar_url)
    .bind(payload.phone)
    .bind(payload.address_line1)
    .bind(payload.address_line2)
    .bind(payload.city)
    .bind(payload.state)
    .bind(payload.postal_code)
    .bind(payload.country)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let account = fetch_user(&state.pool, user.user_id).await?;
    let profile = get_or_create_profile(&state.pool, user.user_id).await?;
    Ok(ApiResponse::ok("Profile updated", ProfileView { user: account, profile }))
}

pub async fn list_user_addresses(pool: &DbPool, user_id: Uuid) -> AppResult<Vec<Address>> {
    let items = sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, updated_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// The explicitly chosen address, else the default, else the most recent one.
pub async fn resolve_address(
    pool: &DbPool,
    user_id: Uuid,
    address_id: Option<Uuid>,
) -> AppResult<Option<Address>> {
    match address_id {
        Some(id) => sqlx::query_as::<_, Address>(
            "SELECT * FROM addresses WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .map(Some)
        .ok_or(AppError::NotFound),
        None => Ok(list_user_addresses(pool, user_id).await?.into_iter().next()),
    }
}

pub async fn list_addresses(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<AddressList>> {
    let items = list_user_addresses(&state.pool, user.user_id).await?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Addresses",
        AddressList { items },
        Some(Meta::new(1, total, total)),
    ))
}

fn validate_address(payload: &AddressRequest) -> AppResult<()> {
    let required = [
        &payload.full_name,
        &payload.phone,
        &payload.address_line1,
        &payload.city,
        &payload.state,
        &payload.postal_code,
    ];
    if required.iter().any(|v| v.trim().is_empty()) {
        return Err(AppError::bad_request("All address fields are required"));
    }
    Ok(())
}

async fn clear_other_defaults(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    keep: Uuid,
) -> AppResult<()> {
    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND id <> $2")
        .bind(user_id)
        .bind(keep)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    validate_address(&payload)?;
    let mut tx = state.pool.begin().await?;
    let address = sqlx::query_as::<_, Address>(
        r#"
        INSERT INTO addresses (id, user_id, full_name, phone, address_line1, address_line2,
                               city, state, postal_code, country, is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, 'India'), $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.full_name.trim())
    .bind(payload.phone.trim())
    .bind(payload.address_line1.trim())
    .bind(payload.address_line2.trim())
    .bind(payload.city.trim())
    .bind(payload.state.trim())
    .bind(payload.postal_code.trim())
    .bind(payload.country)
    .bind(payload.is_default)
    .fetch_one(&mut *tx)
    .await?;

    if address.is_default {
        clear_other_defaults(&mut tx, user.user_id, address.id).await?;
    }
    tx.commit().await?;

    Ok(ApiResponse::ok("Address saved", address))
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    validate_address(&payload)?;
    let mut tx = state.pool.begin().await?;
    let address = sqlx::query_as::<_, Address>(
        r#"
        UPDATE addresses SET
            full_name = $3, phone = $4, address_line1 = $5, address_line2 = $6,
            city = $7, state = $8, postal_code = $9, country = COALESCE($10, country),
            is_default = $11, updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user.user_id)
    .bind(payload.full_name.trim())
    .bind(payload.phone.trim())
    .bind(payload.address_line1.trim())
    .bind(payload.address_line2.trim())
    .bind(payload.city.trim())
    .bind(payload.state.trim())
    .bind(payload.postal_code.trim())
    .bind(payload.country)
    .bind(payload.is_default)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound)?;

    if address.is_default {
        clear_other_defaults(&mut tx, user.user_id, address.id).await?;
    }
    tx.commit().await?;

    Ok(ApiResponse::ok("Address updated", address))
}

pub async fn delete_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::ok("Address deleted", serde_json::json!({ "id": id })))
}

pub async fn make_default_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Address>> {
    let mut tx = state.pool.begin().await?;
    let address = sqlx::query_as::<_, Address>(
        "UPDATE addresses SET is_default = TRUE, updated_at = now() WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(user.user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound)?;

    clear_other_defaults(&mut tx, user.user_id, address.id).await?;
    tx.commit().await?;

    Ok(ApiResponse::ok("Default address updated", address))
}

/// Soft delete: the row stays for order history, identity and PII go.
pub async fn delete_account(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let unusable = hash_password(&Uuid::new_v4().to_string())?;
    let mut tx = state.pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE users SET
            is_active = FALSE,
            username = 'deleted_' || id::text,
            email = 'deleted_' || id::text || '@deleted.invalid',
            full_name = '',
            password_hash = $2
        WHERE id = $1 AND is_active
        "#,
    )
    .bind(user.user_id)
    .bind(unusable)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    sqlx::query(
        r#"
        UPDATE user_profiles SET
            phone = '', address_line1 = '', address_line2 = '', city = '',
            state = '', postal_code = '', interests = '', avatar_url = ''
        WHERE user_id = $1
        "#,
    )
    .bind(user.user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM addresses WHERE user_id = $1")
        .bind(user.user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    audit(
        &state.pool,
        Some(user.user_id),
        "account_delete",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::ok("Account deleted", serde_json::json!({})))
}
