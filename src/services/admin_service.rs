use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
    sea_query::LockType,
};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    audit::audit,
    db::DbPool,
    dto::{
        admin::{
            AdminOrderList, AdminOrderRow, AdminUserDetail, AdminUserList, AdminUserRow, DashboardSummary,
            InventoryAdjustRequest, LowStockList, LowStockVariant, UpdateOrderStatusRequest, UserCounts,
        },
        orders::OrderWithItems,
    },
    entity::{
        Orders, Variants,
        orders::{ActiveModel as OrderActive, Column as OrderCol},
        variants::ActiveModel as VariantActive,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ROLE_ADMIN, ROLE_USER, ensure_admin},
    models::{Order, Profile, User, Variant},
    response::{ApiResponse, Meta},
    routes::params::{AdminOrderQuery, AdminUserQuery, LowStockQuery, yes_no},
    services::{
        account_service::{fetch_user, list_user_addresses},
        order_service::{self, REVENUE_STATUSES, is_known_status},
        review_service::recent_reviews_by_user,
    },
    state::AppState,
};

const LATEST_ORDERS: u64 = 10;
const DEFAULT_LOW_STOCK: i32 = 5;
const USER_RECENT_ORDERS: u64 = 10;
const USER_RECENT_REVIEWS: i64 = 5;

fn revenue_statuses() -> Vec<String> {
    REVENUE_STATUSES.iter().map(|s| s.to_string()).collect()
}

/// Clamp a requested page to the last page that has rows.
pub fn cap_page(page: i64, per_page: i64, total: i64) -> i64 {
    let last = ((total + per_page - 1) / per_page).max(1);
    page.clamp(1, last)
}

pub async fn summary(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<DashboardSummary>> {
    ensure_admin(user)?;
    let (revenue,): (Decimal,) = sqlx::query_as(
        "SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE status = ANY($1)",
    )
    .bind(revenue_statuses())
    .fetch_one(&state.pool)
    .await?;
    let (order_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.pool)
        .await?;
    let (total_stock,): (i64,) = sqlx::query_as("SELECT COALESCE(SUM(stock), 0)::int8 FROM variants")
        .fetch_one(&state.pool)
        .await?;

    let latest: Vec<Order> = Orders::find()
        .order_by_desc(OrderCol::CreatedAt)
        .limit(LATEST_ORDERS)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::ok(
        "Dashboard",
        DashboardSummary {
            revenue,
            order_count,
            total_stock,
            latest_orders: latest,
        },
    ))
}

fn push_order_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &AdminOrderQuery) {
    builder.push(" WHERE TRUE");
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{q}%");
        builder
            .push(" AND (o.order_number ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.username ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        builder.push(" AND o.status = ").push_bind(status.to_string());
    }
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: AdminOrderQuery,
) -> AppResult<ApiResponse<AdminOrderList>> {
    ensure_admin(user)?;
    let (page, per_page, _) = query.pagination().normalize();

    let mut totals = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*), COALESCE(SUM(o.total_amount), 0) FROM orders o JOIN users u ON u.id = o.user_id",
    );
    push_order_filters(&mut totals, &query);
    let (total, total_amount): (i64, Decimal) = totals.build_query_as().fetch_one(&state.pool).await?;

    let page = cap_page(page, per_page, total);
    let offset = (page - 1) * per_page;
    let direction = match query.sort.as_deref() {
        Some("oldest") => "ASC",
        _ => "DESC",
    };

    let mut select = QueryBuilder::<Postgres>::new(
        r#"
        SELECT o.id, o.order_number, u.username, o.status, o.payment_method, o.total_amount,
               o.tracking_number, o.created_at
        FROM orders o
        JOIN users u ON u.id = o.user_id
        "#,
    );
    push_order_filters(&mut select, &query);
    select
        .push(format!(" ORDER BY o.created_at {direction}"))
        .push(" LIMIT ")
        .push_bind(per_page)
        .push(" OFFSET ")
        .push_bind(offset);
    let items = select
        .build_query_as::<AdminOrderRow>()
        .fetch_all(&state.pool)
        .await?;

    Ok(ApiResponse::success(
        "Orders",
        AdminOrderList { items, total_amount },
        Some(Meta::new(page, per_page, total)),
    ))
}

pub async fn get_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = order_service::reload_order(&state.orm, id).await?;
    let detail = order_service::order_with_items(&state.orm, order).await?;
    Ok(ApiResponse::ok("Order", detail))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let status = payload.status.trim().to_string();
    if !is_known_status(&status) {
        return Err(AppError::bad_request("Invalid status selected"));
    }

    let existing = order_service::reload_order(&state.orm, id).await?;
    let previous = existing.status.clone();
    let mut active: OrderActive = existing.into();
    active.status = Set(status.clone());
    active.updated_at = Set(chrono::Utc::now().into());
    let order = active.update(&state.orm).await?;

    audit(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": previous, "to": status }),
    )
    .await;

    Ok(ApiResponse::ok(
        format!("Order {} status updated to {}", order.order_number, order.status),
        order.into(),
    ))
}

pub async fn delete_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let order_number = order.order_number.clone();
    order.delete(&state.orm).await?;

    audit(
        &state.pool,
        Some(user.user_id),
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id, "order_number": order_number }),
    )
    .await;

    Ok(ApiResponse::ok(
        "Order deleted",
        serde_json::json!({ "id": id, "order_number": order_number }),
    ))
}

/// Book the courier shipment by hand, e.g. for COD orders or after a failed attempt.
pub async fn create_shipment(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    if !state.shipping.enabled() {
        return Err(AppError::bad_request("Shipping integration is disabled"));
    }
    let awb = order_service::create_shipment_for_order(state, id).await?;
    let order = order_service::reload_order(&state.orm, id).await?;

    audit(
        &state.pool,
        Some(user.user_id),
        "shipment_create",
        "orders",
        serde_json::json!({ "order_id": id, "awb": awb }),
    )
    .await;

    let message = match awb {
        Some(awb) => format!("Shipment created. AWB: {awb}"),
        None => "Courier order created, AWB pending".to_string(),
    };
    Ok(ApiResponse::ok(message, order.into()))
}

pub async fn low_stock(state: &AppState, user: &AuthUser, query: LowStockQuery) -> AppResult<ApiResponse<LowStockList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK);
    let (page, per_page, offset) = query.pagination().normalize();

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM variants WHERE stock <= $1")
        .bind(threshold)
        .fetch_one(&state.pool)
        .await?;
    let items = sqlx::query_as::<_, LowStockVariant>(
        r#"
        SELECT v.id AS variant_id, v.product_id, p.name AS product_name, v.size, v.color, v.sku, v.stock
        FROM variants v
        JOIN products p ON p.id = v.product_id
        WHERE v.stock <= $1
        ORDER BY v.stock, p.name
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(threshold)
    .bind(per_page)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Low stock",
        LowStockList { threshold, items },
        Some(Meta::new(page, per_page, total)),
    ))
}

/// Stock after applying `delta`; negative or overflowing results are rejected.
pub fn adjusted_stock(stock: i32, delta: i32) -> AppResult<i32> {
    match stock.checked_add(delta) {
        Some(next) if next >= 0 => Ok(next),
        Some(_) => Err(AppError::bad_request("stock cannot be negative")),
        None => Err(AppError::bad_request("stock adjustment is out of range")),
    }
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    variant_id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Variant>> {
    ensure_admin(user)?;
    if payload.delta == 0 {
        return Err(AppError::bad_request("delta must not be 0"));
    }

    let txn = state.orm.begin().await?;
    let variant = Variants::find_by_id(variant_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let new_stock = adjusted_stock(variant.stock, payload.delta)?;

    let mut active: VariantActive = variant.into();
    active.stock = Set(new_stock);
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    audit(
        &state.pool,
        Some(user.user_id),
        "inventory_adjust",
        "variants",
        serde_json::json!({ "variant_id": updated.id, "delta": payload.delta, "stock": updated.stock }),
    )
    .await;

    Ok(ApiResponse::ok("Inventory updated", updated.into()))
}

fn push_user_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &AdminUserQuery) {
    builder.push(" WHERE TRUE");
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{q}%");
        builder
            .push(" AND (u.username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    match yes_no(query.staff.as_deref()) {
        Some(true) => {
            builder.push(" AND u.role = ").push_bind(ROLE_ADMIN);
        }
        Some(false) => {
            builder.push(" AND u.role <> ").push_bind(ROLE_ADMIN);
        }
        None => {}
    }
    if let Some(active) = yes_no(query.active.as_deref()) {
        builder.push(" AND u.is_active = ").push_bind(active);
    }
}

const USER_ROW_SELECT: &str = r#"
    SELECT u.id, u.username, u.email, u.full_name, u.role, u.is_active, u.created_at, u.last_login,
           (SELECT COUNT(*) FROM orders o WHERE o.user_id = u.id) AS order_count,
           (SELECT COALESCE(SUM(o.total_amount), 0) FROM orders o
             WHERE o.user_id = u.id AND o.status IN ('paid', 'shipped', 'delivered')) AS total_spent
    FROM users u
"#;

async fn user_rows(pool: &DbPool, query: &AdminUserQuery, page: Option<(i64, i64)>) -> AppResult<Vec<AdminUserRow>> {
    let mut select = QueryBuilder::<Postgres>::new(USER_ROW_SELECT);
    push_user_filters(&mut select, query);
    select.push(" ORDER BY u.created_at DESC");
    if let Some((limit, offset)) = page {
        select.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
    }
    Ok(select.build_query_as::<AdminUserRow>().fetch_all(pool).await?)
}

pub async fn list_users(state: &AppState, user: &AuthUser, query: AdminUserQuery) -> AppResult<ApiResponse<AdminUserList>> {
    ensure_admin(user)?;
    let (page, per_page, offset) = query.pagination().normalize();

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users u");
    push_user_filters(&mut count, &query);
    let (filtered,): (i64,) = count.build_query_as().fetch_one(&state.pool).await?;

    let (total, staff, active): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE role = $1),
               COUNT(*) FILTER (WHERE is_active)
        FROM users
        "#,
    )
    .bind(ROLE_ADMIN)
    .fetch_one(&state.pool)
    .await?;

    let items = user_rows(&state.pool, &query, Some((per_page, offset))).await?;
    Ok(ApiResponse::success(
        "Users",
        AdminUserList {
            items,
            counts: UserCounts { total, staff, active },
        },
        Some(Meta::new(page, per_page, filtered)),
    ))
}

pub async fn user_detail(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<AdminUserDetail>> {
    ensure_admin(user)?;
    let account = fetch_user(&state.pool, id).await?;
    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM user_profiles WHERE user_id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let addresses = list_user_addresses(&state.pool, id).await?;

    let recent_orders: Vec<Order> = Orders::find()
        .filter(OrderCol::UserId.eq(id))
        .order_by_desc(OrderCol::CreatedAt)
        .limit(USER_RECENT_ORDERS)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let (order_count, total_spent): (i64, Decimal) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(total_amount) FILTER (WHERE status = ANY($2)), 0)
        FROM orders WHERE user_id = $1
        "#,
    )
    .bind(id)
    .bind(revenue_statuses())
    .fetch_one(&state.pool)
    .await?;
    let recent_reviews = recent_reviews_by_user(&state.pool, id, USER_RECENT_REVIEWS).await?;

    Ok(ApiResponse::ok(
        "User",
        AdminUserDetail {
            user: account,
            profile,
            addresses,
            recent_orders,
            order_count,
            total_spent,
            recent_reviews,
        },
    ))
}

pub async fn toggle_staff(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    if id == user.user_id {
        return Err(AppError::bad_request("You cannot change your own staff status."));
    }
    let account = fetch_user(&state.pool, id).await?;
    let role = if account.role == ROLE_ADMIN { ROLE_USER } else { ROLE_ADMIN };
    sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
        .bind(id)
        .bind(role)
        .execute(&state.pool)
        .await?;

    audit(
        &state.pool,
        Some(user.user_id),
        "user_toggle_staff",
        "users",
        serde_json::json!({ "user_id": id, "role": role }),
    )
    .await;

    let updated = fetch_user(&state.pool, id).await?;
    Ok(ApiResponse::ok("Staff status updated", updated))
}

pub async fn toggle_active(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    if id == user.user_id {
        return Err(AppError::bad_request("You cannot deactivate your own account."));
    }
    let updated = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET is_active = NOT is_active WHERE id = $1
        RETURNING id, email, username, full_name, role, is_active, created_at, last_login
        "#,
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound)?;

    audit(
        &state.pool,
        Some(user.user_id),
        "user_toggle_active",
        "users",
        serde_json::json!({ "user_id": id, "is_active": updated.is_active }),
    )
    .await;

    Ok(ApiResponse::ok("Active status updated", updated))
}

#[derive(Debug, serde::Serialize)]
struct UserCsvRow<'a> {
    id: Uuid,
    username: &'a str,
    email: &'a str,
    is_staff: bool,
    is_active: bool,
    date_joined: String,
    last_login: String,
}

pub fn users_to_csv(rows: &[AdminUserRow]) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(UserCsvRow {
                id: row.id,
                username: &row.username,
                email: &row.email,
                is_staff: row.role == ROLE_ADMIN,
                is_active: row.is_active,
                date_joined: row.created_at.to_rfc3339(),
                last_login: row.last_login.map(|dt| dt.to_rfc3339()).unwrap_or_default(),
            })
            .map_err(anyhow::Error::from)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("csv flush failed: {err}"))?;
    Ok(bytes)
}

pub async fn users_csv(state: &AppState, user: &AuthUser, query: AdminUserQuery) -> AppResult<Vec<u8>> {
    ensure_admin(user)?;
    let rows = user_rows(&state.pool, &query, None).await?;
    users_to_csv(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn pages_are_capped_to_last_page() {
        assert_eq!(cap_page(10, 20, 45), 3);
        assert_eq!(cap_page(0, 20, 45), 1);
        assert_eq!(cap_page(5, 20, 0), 1);
        assert_eq!(cap_page(2, 20, 45), 2);
    }

    #[test]
    fn users_csv_marks_admins_as_staff() {
        let row = AdminUserRow {
            id: Uuid::nil(),
            username: "asha".into(),
            email: "asha@example.com".into(),
            full_name: String::new(),
            role: ROLE_ADMIN.into(),
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
            order_count: 0,
            total_spent: Decimal::ZERO,
        };
        let text = String::from_utf8(users_to_csv(&[row]).expect("csv")).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,username,email,is_staff,is_active,date_joined,last_login")
        );
        let data = lines.next().expect("row");
        assert!(data.starts_with("00000000-0000-0000-0000-000000000000,asha,asha@example.com,true,true,"));
        assert!(data.ends_with(','));
    }

    #[test]
    fn stock_adjustment_is_checked() {
        assert_eq!(adjusted_stock(3, 2).ok(), Some(5));
        assert_eq!(adjusted_stock(3, -3).ok(), Some(0));
        assert!(matches!(adjusted_stock(3, -4), Err(AppError::BadRequest(_))));
        assert!(matches!(adjusted_stock(3, i32::MAX), Err(AppError::BadRequest(_))));
        assert!(matches!(adjusted_stock(-1, i32::MIN), Err(AppError::BadRequest(_))));
    }
}
