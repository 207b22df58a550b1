use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
    sea_query::{Expr, Func},
};
use uuid::Uuid;

use crate::{
    audit::audit,
    dto::admin::{CouponList, CouponRequest},
    entity::coupons::{ActiveModel as CouponActive, Column as CouponCol, Entity as Coupons, Model as CouponModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Coupon,
    response::{ApiResponse, Meta},
    services::notification_service::{LEVEL_PROMO, broadcast_quietly},
    state::AppState,
};

/// Case-insensitive lookup by code.
pub async fn find_by_code<C: ConnectionTrait>(conn: &C, code: &str) -> AppResult<Option<CouponModel>> {
    let code = code.trim().to_lowercase();
    if code.is_empty() {
        return Ok(None);
    }
    let coupon = Coupons::find()
        .filter(Expr::expr(Func::lower(Expr::col(CouponCol::Code))).eq(code))
        .one(conn)
        .await?;
    Ok(coupon)
}

/// The coupon a shopper is trying to apply, or the 400 explaining why not.
pub async fn validate_code<C: ConnectionTrait>(conn: &C, code: &str) -> AppResult<CouponModel> {
    let coupon = find_by_code(conn, code)
        .await?
        .ok_or_else(|| AppError::bad_request("Invalid coupon code"))?;
    if !coupon.is_valid(Utc::now()) {
        return Err(AppError::bad_request("Coupon is not active"));
    }
    Ok(coupon)
}

/// Re-check a code remembered on a cart. Stale codes are silently ignored.
pub async fn still_valid<C: ConnectionTrait>(conn: &C, code: Option<&str>) -> AppResult<Option<CouponModel>> {
    let Some(code) = code.filter(|c| !c.trim().is_empty()) else {
        return Ok(None);
    };
    let coupon = find_by_code(conn, code).await?;
    Ok(coupon.filter(|c| c.is_valid(Utc::now())))
}

fn validate_request(payload: &CouponRequest) -> AppResult<()> {
    if payload.code.trim().is_empty() {
        return Err(AppError::bad_request("Coupon code is required"));
    }
    if !(0..=100).contains(&payload.discount_percent) {
        return Err(AppError::bad_request("Discount must be between 0 and 100"));
    }
    if let (Some(from), Some(to)) = (payload.valid_from, payload.valid_to)
        && from > to
    {
        return Err(AppError::bad_request("valid_from must be before valid_to"));
    }
    Ok(())
}

async fn ensure_code_free(state: &AppState, code: &str, except: Option<Uuid>) -> AppResult<()> {
    if let Some(existing) = find_by_code(&state.orm, code).await?
        && Some(existing.id) != except
    {
        return Err(AppError::Conflict("Coupon code already exists".into()));
    }
    Ok(())
}

async fn announce(state: &AppState, coupon: &CouponModel) {
    if coupon.notify_users && coupon.is_valid(Utc::now()) {
        let title = format!("New offer: {} — {}% off", coupon.code, coupon.discount_percent);
        broadcast_quietly(&state.pool, &title, &coupon.description, "/cart", LEVEL_PROMO).await;
    }
}

pub async fn list_coupons(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CouponList>> {
    ensure_admin(user)?;
    let items: Vec<Coupon> = Coupons::find()
        .order_by_desc(CouponCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Coupon::from)
        .collect();
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Coupons",
        CouponList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn create_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: CouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    validate_request(&payload)?;
    let code = payload.code.trim().to_string();
    ensure_code_free(state, &code, None).await?;

    let coupon = CouponActive {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        description: Set(payload.description),
        discount_percent: Set(payload.discount_percent),
        active: Set(payload.active),
        notify_users: Set(payload.notify_users),
        valid_from: Set(payload.valid_from.map(Into::into)),
        valid_to: Set(payload.valid_to.map(Into::into)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    announce(state, &coupon).await;
    audit(
        &state.pool,
        Some(user.user_id),
        "coupon_create",
        "coupons",
        serde_json::json!({ "coupon_id": coupon.id, "code": coupon.code }),
    )
    .await;

    Ok(ApiResponse::ok("Coupon created", Coupon::from(coupon)))
}

pub async fn update_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: CouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    validate_request(&payload)?;
    let code = payload.code.trim().to_string();
    ensure_code_free(state, &code, Some(id)).await?;

    let existing = Coupons::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: CouponActive = existing.into();
    active.code = Set(code);
    active.description = Set(payload.description);
    active.discount_percent = Set(payload.discount_percent);
    active.active = Set(payload.active);
    active.notify_users = Set(payload.notify_users);
    active.valid_from = Set(payload.valid_from.map(Into::into));
    active.valid_to = Set(payload.valid_to.map(Into::into));
    let coupon = active.update(&state.orm).await?;

    audit(
        &state.pool,
        Some(user.user_id),
        "coupon_update",
        "coupons",
        serde_json::json!({ "coupon_id": coupon.id }),
    )
    .await;

    Ok(ApiResponse::ok("Coupon updated", Coupon::from(coupon)))
}

pub async fn delete_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Coupons::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit(
        &state.pool,
        Some(user.user_id),
        "coupon_delete",
        "coupons",
        serde_json::json!({ "coupon_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Coupon deleted", serde_json::json!({ "id": id })))
}
