use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    dto::orders::{
        CheckoutPreview, CheckoutRequest, CheckoutResponse, Invoice, OrderList, OrderWithItems, PreviewRequest,
        QuickReturnRequest, ReturnRequestBody, SupportRequest, TrackingView,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::ReturnRequest,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{order_service, return_service},
    state::AppState,
};

pub fn checkout_router() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout))
        .route("/preview", post(preview))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/{order_number}", get(get_order))
        .route("/{order_number}/invoice", get(invoice))
        .route("/{order_number}/tracking", get(tracking))
        .route("/{order_number}/support", post(support))
        .route("/{order_number}/returns", post(request_return))
        .route("/{order_number}/quick-return", post(quick_return))
}

#[utoipa::path(
    post,
    path = "/api/checkout/preview",
    request_body = PreviewRequest,
    responses(
        (status = 200, description = "Price summary checkout would charge", body = ApiResponse<CheckoutPreview>),
        (status = 400, description = "Your cart is empty")
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn preview(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PreviewRequest>,
) -> AppResult<Json<ApiResponse<CheckoutPreview>>> {
    Ok(Json(order_service::preview(&state, &user, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order placed; razorpay orders carry payment instructions", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Empty cart, missing address, bad payment method or short stock"),
        (status = 502, description = "Payment gateway unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    Ok(Json(order_service::checkout(&state, &user, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Current user's orders, newest first", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    Ok(Json(order_service::list_orders(&state, &user, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/orders/{order_number}",
    params(("order_number" = String, Path, description = "Order number")),
    responses(
        (status = 200, description = "Order with items and return requests", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_number): Path<String>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(order_service::get_order(&state, &user, &order_number).await?))
}

#[utoipa::path(
    get,
    path = "/api/orders/{order_number}/invoice",
    params(("order_number" = String, Path, description = "Order number")),
    responses(
        (status = 200, description = "Invoice lines with store identity", body = ApiResponse<Invoice>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_number): Path<String>,
) -> AppResult<Json<ApiResponse<Invoice>>> {
    Ok(Json(order_service::invoice(&state, &user, &order_number).await?))
}

#[utoipa::path(
    get,
    path = "/api/orders/{order_number}/tracking",
    params(("order_number" = String, Path, description = "Order number")),
    responses(
        (status = 200, description = "Courier tracking; null when not shipped", body = ApiResponse<TrackingView>),
        (status = 404, description = "Order not found"),
        (status = 502, description = "Courier unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn tracking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_number): Path<String>,
) -> AppResult<Json<ApiResponse<TrackingView>>> {
    Ok(Json(order_service::tracking(&state, &user, &order_number).await?))
}

#[utoipa::path(
    post,
    path = "/api/orders/{order_number}/support",
    params(("order_number" = String, Path, description = "Order number")),
    request_body = SupportRequest,
    responses(
        (status = 200, description = "Support request recorded", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Unknown support request")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn support(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_number): Path<String>,
    Json(payload): Json<SupportRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(order_service::support(&state, &user, &order_number, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/orders/{order_number}/returns",
    params(("order_number" = String, Path, description = "Order number")),
    request_body = ReturnRequestBody,
    responses(
        (status = 200, description = "Return or exchange recorded", body = ApiResponse<ReturnRequest>),
        (status = 400, description = "Empty or invalid selection")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn request_return(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_number): Path<String>,
    Json(payload): Json<ReturnRequestBody>,
) -> AppResult<Json<ApiResponse<ReturnRequest>>> {
    Ok(Json(return_service::request_return(&state, &user, &order_number, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/orders/{order_number}/quick-return",
    params(("order_number" = String, Path, description = "Order number")),
    request_body = QuickReturnRequest,
    responses(
        (status = 200, description = "Whole order queued for return", body = ApiResponse<ReturnRequest>),
        (status = 400, description = "Order not delivered yet")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn quick_return(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_number): Path<String>,
    payload: Option<Json<QuickReturnRequest>>,
) -> AppResult<Json<ApiResponse<ReturnRequest>>> {
    let payload = payload.map(|Json(body)| body).unwrap_or_default();
    Ok(Json(return_service::quick_return(&state, &user, &order_number, payload).await?))
}
