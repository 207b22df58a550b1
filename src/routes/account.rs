use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::accounts::{AddressList, AddressRequest, ProfileView, UpdateProfileRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Address,
    response::ApiResponse,
    services::account_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::delete(delete_account))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/addresses", get(list_addresses).post(create_address))
        .route("/addresses/{id}", put(update_address).delete(delete_address))
        .route("/addresses/{id}/default", post(make_default))
}

#[utoipa::path(
    get,
    path = "/api/account/profile",
    responses(
        (status = 200, description = "Current user's account and profile", body = ApiResponse<ProfileView>)
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    Ok(Json(account_service::get_profile(&state, &user).await?))
}

#[utoipa::path(
    put,
    path = "/api/account/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<ProfileView>),
        (status = 400, description = "Username already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    Ok(Json(account_service::update_profile(&state, &user, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/account",
    responses(
        (status = 200, description = "Account anonymized and deactivated", body = ApiResponse<serde_json::Value>)
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn delete_account(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(account_service::delete_account(&state, &user).await?))
}

#[utoipa::path(
    get,
    path = "/api/account/addresses",
    responses(
        (status = 200, description = "Saved addresses, default first", body = ApiResponse<AddressList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AddressList>>> {
    Ok(Json(account_service::list_addresses(&state, &user).await?))
}

#[utoipa::path(
    post,
    path = "/api/account/addresses",
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Address saved", body = ApiResponse<Address>)
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn create_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddressRequest>,
) -> AppResult<Json<ApiResponse<Address>>> {
    Ok(Json(account_service::create_address(&state, &user, payload).await?))
}

#[utoipa::path(
    put,
    path = "/api/account/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address ID")),
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Address updated", body = ApiResponse<Address>),
        (status = 404, description = "Address not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn update_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddressRequest>,
) -> AppResult<Json<ApiResponse<Address>>> {
    Ok(Json(account_service::update_address(&state, &user, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/account/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address ID")),
    responses(
        (status = 200, description = "Address removed", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Address not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(account_service::delete_address(&state, &user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/account/addresses/{id}/default",
    params(("id" = Uuid, Path, description = "Address ID")),
    responses(
        (status = 200, description = "Default address changed", body = ApiResponse<Address>),
        (status = 404, description = "Address not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn make_default(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Address>>> {
    Ok(Json(account_service::make_default_address(&state, &user, id).await?))
}
