use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};

use crate::{
    dto::{
        orders::OrderWithItems,
        payments::{PaymentCallback, WebhookAck},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/callback", post(callback))
        .route("/webhook", post(webhook))
}

#[utoipa::path(
    post,
    path = "/api/payments/callback",
    request_body = PaymentCallback,
    responses(
        (status = 200, description = "Payment verified and order marked paid", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Payment verification failed"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn callback(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PaymentCallback>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(payment_service::callback(&state, &user, payload).await?))
}

/// Raw body is needed for the signature check, so no `Json` extractor here.
#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    request_body(content = serde_json::Value, description = "Gateway event payload"),
    params(("x-razorpay-signature" = Option<String>, Header, description = "HMAC-SHA256 of the raw body")),
    responses(
        (status = 200, description = "Event acknowledged", body = ApiResponse<WebhookAck>),
        (status = 400, description = "Invalid signature or payload")
    ),
    tag = "Payments"
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<WebhookAck>>> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());
    Ok(Json(payment_service::webhook(&state, &body, signature).await?))
}
