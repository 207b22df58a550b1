use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            AdminOrderList, AdminUserDetail, AdminUserList, Analytics, DashboardSummary, InventoryAdjustRequest,
            LowStockList, UpdateOrderStatusRequest,
        },
        orders::OrderWithItems,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Order, User, Variant},
    response::ApiResponse,
    routes::params::{AdminOrderQuery, AdminUserQuery, AnalyticsQuery, LowStockQuery},
    services::{admin_service, analytics_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/summary", get(summary))
        .route("/analytics", get(analytics))
        .route("/analytics.csv", get(analytics_csv))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order).delete(delete_order))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/orders/{id}/shipment", post(create_shipment))
        .route("/inventory/low-stock", get(low_stock))
        .route("/inventory/{variant_id}", patch(adjust_inventory))
        .route("/users", get(list_users))
        .route("/users.csv", get(users_csv))
        .route("/users/{id}", get(user_detail))
        .route("/users/{id}/toggle-staff", post(toggle_staff))
        .route("/users/{id}/toggle-active", post(toggle_active))
}

fn csv_response(filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/admin/summary",
    responses(
        (status = 200, description = "Revenue, order count, stock and latest orders", body = ApiResponse<DashboardSummary>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardSummary>>> {
    Ok(Json(admin_service::summary(&state, &user).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Zero-filled revenue and profit timeline", body = ApiResponse<Analytics>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn analytics(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<ApiResponse<Analytics>>> {
    Ok(Json(analytics_service::analytics(&state, &user, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/analytics.csv",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "date,revenue,net_sales,estimated_profit", content_type = "text/csv", body = String),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn analytics_csv(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Response> {
    let body = analytics_service::analytics_csv(&state, &user, query).await?;
    Ok(csv_response("analytics.csv", body))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(AdminOrderQuery),
    responses(
        (status = 200, description = "Filtered orders with total amount", body = ApiResponse<AdminOrderList>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminOrderQuery>,
) -> AppResult<Json<ApiResponse<AdminOrderList>>> {
    Ok(Json(admin_service::list_orders(&state, &user, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order detail", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(admin_service::get_order(&state, &user, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Order>),
        (status = 400, description = "Invalid status selected"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    Ok(Json(admin_service::update_order_status(&state, &user, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(admin_service::delete_order(&state, &user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/orders/{id}/shipment",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Shipment created with courier", body = ApiResponse<Order>),
        (status = 400, description = "Courier integration disabled"),
        (status = 502, description = "Courier error")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    Ok(Json(admin_service::create_shipment(&state, &user, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/inventory/low-stock",
    params(LowStockQuery),
    responses(
        (status = 200, description = "Variants at or below the threshold", body = ApiResponse<LowStockList>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<LowStockList>>> {
    Ok(Json(admin_service::low_stock(&state, &user, query).await?))
}

#[utoipa::path(
    patch,
    path = "/api/admin/inventory/{variant_id}",
    params(("variant_id" = Uuid, Path, description = "Variant ID")),
    request_body = InventoryAdjustRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<Variant>),
        (status = 400, description = "Zero delta or negative result"),
        (status = 404, description = "Variant not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn adjust_inventory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(variant_id): Path<Uuid>,
    Json(payload): Json<InventoryAdjustRequest>,
) -> AppResult<Json<ApiResponse<Variant>>> {
    Ok(Json(admin_service::adjust_inventory(&state, &user, variant_id, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(AdminUserQuery),
    responses(
        (status = 200, description = "Filtered users with counts", body = ApiResponse<AdminUserList>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminUserQuery>,
) -> AppResult<Json<ApiResponse<AdminUserList>>> {
    Ok(Json(admin_service::list_users(&state, &user, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/users.csv",
    params(AdminUserQuery),
    responses(
        (status = 200, description = "Filtered users as CSV", content_type = "text/csv", body = String),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn users_csv(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminUserQuery>,
) -> AppResult<Response> {
    let body = admin_service::users_csv(&state, &user, query).await?;
    Ok(csv_response("users.csv", body))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User with orders, addresses and reviews", body = ApiResponse<AdminUserDetail>),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn user_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AdminUserDetail>>> {
    Ok(Json(admin_service::user_detail(&state, &user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/toggle-staff",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Role flipped between admin and user", body = ApiResponse<User>),
        (status = 400, description = "Cannot change own staff status")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn toggle_staff(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    Ok(Json(admin_service::toggle_staff(&state, &user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/toggle-active",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Active flag flipped", body = ApiResponse<User>),
        (status = 400, description = "Cannot deactivate own account")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn toggle_active(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    Ok(Json(admin_service::toggle_active(&state, &user, id).await?))
}
