use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
    sea_query::LockType,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    audit::audit,
    dto::{
        orders::OrderWithItems,
        payments::{PaymentCallback, WebhookAck},
    },
    entity::{
        CartItems, Carts, Orders,
        cart_items::Column as CartItemCol,
        carts::Column as CartCol,
        orders::{ActiveModel as OrderActive, Column as OrderCol, Model as OrderModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::{
        cart_service::set_cart_coupon,
        notification_service::{LEVEL_SUCCESS, notify_user_quietly},
        order_service::{self, STATUS_CREATED, STATUS_PAID},
    },
    state::AppState,
};

pub const EVENT_PAYMENT_CAPTURED: &str = "payment.captured";

/// Gateway ids pulled out of a `payment.captured` webhook body.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPayment {
    pub order_id: String,
    pub payment_id: String,
}

pub fn captured_payment(body: &Value) -> Option<CapturedPayment> {
    let entity = body.pointer("/payload/payment/entity")?;
    let order_id = entity.get("order_id")?.as_str()?.to_string();
    let payment_id = entity
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some(CapturedPayment { order_id, payment_id })
}

/// Record a successful payment. Debits stock, empties the buyer's cart and
/// clears their coupon. Returns `false` when the order had already moved past `created`.
pub async fn mark_paid(
    state: &AppState,
    order_id: Uuid,
    payment_id: &str,
    signature: Option<&str>,
) -> AppResult<(OrderModel, bool)> {
    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.status != STATUS_CREATED {
        txn.commit().await?;
        return Ok((order, false));
    }

    order_service::debit_stock(&txn, &order).await?;

    let user_id = order.user_id;
    let mut active: OrderActive = order.into();
    active.status = Set(STATUS_PAID.into());
    if !payment_id.is_empty() {
        active.gateway_payment_id = Set(payment_id.to_string());
    }
    if let Some(signature) = signature {
        active.gateway_signature = Set(signature.to_string());
    }
    active.stock_debited = Set(true);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    if let Some(cart) = Carts::find().filter(CartCol::UserId.eq(user_id)).one(&txn).await? {
        CartItems::delete_many()
            .filter(CartItemCol::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
        set_cart_coupon(&txn, cart.id, None).await?;
    }
    txn.commit().await?;

    audit(
        &state.pool,
        Some(user_id),
        "order_paid",
        "orders",
        serde_json::json!({ "order_id": order.id, "gateway_payment_id": order.gateway_payment_id }),
    )
    .await;
    notify_user_quietly(
        &state.pool,
        user_id,
        "Payment received",
        &format!("We received your payment for order {}.", order.order_number),
        &format!("/orders/{}", order.order_number),
        LEVEL_SUCCESS,
    )
    .await;
    order_service::ship_quietly(state, order.id).await;

    Ok((order, true))
}

async fn find_by_gateway_order(state: &AppState, gateway_order_id: &str) -> AppResult<Option<OrderModel>> {
    if gateway_order_id.is_empty() {
        return Ok(None);
    }
    Ok(Orders::find()
        .filter(OrderCol::GatewayOrderId.eq(gateway_order_id))
        .one(&state.orm)
        .await?)
}

/// Client-side confirmation after the checkout widget completes.
pub async fn callback(
    state: &AppState,
    user: &AuthUser,
    payload: PaymentCallback,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = find_by_gateway_order(state, &payload.razorpay_order_id)
        .await?
        .filter(|o| o.user_id == user.user_id)
        .ok_or(AppError::NotFound)?;

    let verified = state.payments.verify_payment(
        &payload.razorpay_order_id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
    );
    if !verified {
        tracing::warn!(order_number = %order.order_number, "payment signature mismatch");
        audit(
            &state.pool,
            Some(user.user_id),
            "payment_verification_failed",
            "orders",
            serde_json::json!({ "order_id": order.id }),
        )
        .await;
        return Err(AppError::bad_request("Payment verification failed"));
    }

    let (order, newly_paid) = mark_paid(
        state,
        order.id,
        &payload.razorpay_payment_id,
        Some(&payload.razorpay_signature),
    )
    .await?;

    let message = if newly_paid { "Payment successful" } else { "Payment already recorded" };
    let order = order_service::reload_order(&state.orm, order.id).await?;
    let detail = order_service::order_with_items(&state.orm, order).await?;
    Ok(ApiResponse::ok(message, detail))
}

/// Gateway-to-server notification. Unknown events and orders are acknowledged.
pub async fn webhook(
    state: &AppState,
    body: &[u8],
    signature: Option<&str>,
) -> AppResult<ApiResponse<WebhookAck>> {
    if !state.payments.verify_webhook(body, signature) {
        return Err(AppError::bad_request("Invalid signature"));
    }
    let payload: Value = serde_json::from_slice(body).map_err(|_| AppError::bad_request("Invalid payload"))?;
    let event = payload.get("event").and_then(Value::as_str).map(str::to_string);

    let mut handled = false;
    if event.as_deref() == Some(EVENT_PAYMENT_CAPTURED)
        && let Some(captured) = captured_payment(&payload)
    {
        match find_by_gateway_order(state, &captured.order_id).await? {
            Some(order) => {
                let (_, newly_paid) = mark_paid(state, order.id, &captured.payment_id, None).await?;
                handled = newly_paid;
            }
            None => tracing::debug!(gateway_order_id = captured.order_id, "webhook for unknown order"),
        }
    }

    Ok(ApiResponse::ok("ok", WebhookAck { event, handled }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_captured_payment_ids() {
        let body = serde_json::json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": { "id": "pay_1", "order_id": "order_9" } } }
        });
        assert_eq!(
            captured_payment(&body),
            Some(CapturedPayment {
                order_id: "order_9".into(),
                payment_id: "pay_1".into(),
            })
        );
    }

    #[test]
    fn missing_order_id_yields_none() {
        let body = serde_json::json!({ "payload": { "payment": { "entity": { "id": "pay_1" } } } });
        assert_eq!(captured_payment(&body), None);
        assert_eq!(captured_payment(&serde_json::json!({})), None);
    }
}
