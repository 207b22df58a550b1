use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{CouponList, CouponRequest},
        content::{BannerList, BannerRequest},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Banner, Coupon},
    response::ApiResponse,
    services::{content_service, coupon_service},
    state::AppState,
};

/// Coupons and banners, nested under `/api/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/coupons", get(list_coupons).post(create_coupon))
        .route("/coupons/{id}", put(update_coupon).delete(delete_coupon))
        .route("/banners", get(list_banners).post(create_banner))
        .route("/banners/{id}", put(update_banner).delete(delete_banner))
}

#[utoipa::path(
    get,
    path = "/api/admin/coupons",
    responses(
        (status = 200, description = "All coupons", body = ApiResponse<CouponList>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin Promotions"
)]
pub async fn list_coupons(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CouponList>>> {
    Ok(Json(coupon_service::list_coupons(&state, &user).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/coupons",
    request_body = CouponRequest,
    responses(
        (status = 200, description = "Coupon created", body = ApiResponse<Coupon>),
        (status = 409, description = "Code already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin Promotions"
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CouponRequest>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    Ok(Json(coupon_service::create_coupon(&state, &user, payload).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon ID")),
    request_body = CouponRequest,
    responses(
        (status = 200, description = "Coupon updated", body = ApiResponse<Coupon>),
        (status = 404, description = "Coupon not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin Promotions"
)]
pub async fn update_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CouponRequest>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    Ok(Json(coupon_service::update_coupon(&state, &user, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon ID")),
    responses(
        (status = 200, description = "Coupon deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Coupon not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin Promotions"
)]
pub async fn delete_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(coupon_service::delete_coupon(&state, &user, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/banners",
    responses(
        (status = 200, description = "All banners including inactive", body = ApiResponse<BannerList>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin Promotions"
)]
pub async fn list_banners(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<BannerList>>> {
    Ok(Json(content_service::admin_list_banners(&state, &user).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/banners",
    request_body = BannerRequest,
    responses(
        (status = 200, description = "Banner created", body = ApiResponse<Banner>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin Promotions"
)]
pub async fn create_banner(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BannerRequest>,
) -> AppResult<Json<ApiResponse<Banner>>> {
    Ok(Json(content_service::create_banner(&state, &user, payload).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/banners/{id}",
    params(("id" = Uuid, Path, description = "Banner ID")),
    request_body = BannerRequest,
    responses(
        (status = 200, description = "Banner updated", body = ApiResponse<Banner>),
        (status = 404, description = "Banner not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin Promotions"
)]
pub async fn update_banner(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<BannerRequest>,
) -> AppResult<Json<ApiResponse<Banner>>> {
    Ok(Json(content_service::update_banner(&state, &user, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/banners/{id}",
    params(("id" = Uuid, Path, description = "Banner ID")),
    responses(
        (status = 200, description = "Banner deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Banner not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin Promotions"
)]
pub async fn delete_banner(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(content_service::delete_banner(&state, &user, id).await?))
}
