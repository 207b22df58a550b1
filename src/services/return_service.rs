use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
    ActiveValue::NotSet,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit::audit,
    dto::orders::{QuickReturnRequest, ReturnLine, ReturnRequestBody},
    entity::{
        Orders, ReturnItems, ReturnRequests, Variants,
        order_items::Model as OrderItemModel,
        orders::{Column as OrderCol, Model as OrderModel},
        return_items::{ActiveModel as ReturnItemActive, Model as ReturnItemModel},
        return_requests::{ActiveModel as ReturnActive, Column as ReturnCol},
        variants::Column as VariantCol,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::ReturnRequest,
    response::ApiResponse,
    services::{
        account_service::fetch_user,
        order_service::{self, STATUS_DELIVERED, STATUS_EXCHANGE_REQUESTED, STATUS_RETURN_REQUESTED},
    },
    state::AppState,
};

pub const KIND_RETURN: &str = "return";
pub const KIND_EXCHANGE: &str = "exchange";

pub const RETURN_REQUESTED: &str = "requested";
pub const RETURN_PICKUP_SCHEDULED: &str = "pickup_scheduled";

const QUICK_RETURN_REASON: &str = "Quick return";

/// A validated line: the ordered item, how many go back, and the replacement variant.
#[derive(Debug, Clone)]
struct Selection {
    item: OrderItemModel,
    quantity: i32,
    exchange_variant_id: Option<Uuid>,
}

/// Quantity of each order item already covered by earlier requests.
type Returned = HashMap<Uuid, i32>;

/// Merge repeated items, then clamp each to what is still returnable
/// (ordered minus already requested).
fn select_lines(
    kind: &str,
    items: &[OrderItemModel],
    lines: &[ReturnLine],
    returned: &Returned,
) -> AppResult<Vec<Selection>> {
    let by_id: HashMap<Uuid, &OrderItemModel> = items.iter().map(|i| (i.id, i)).collect();
    let mut selected: Vec<Selection> = Vec::new();
    for line in lines.iter().filter(|l| l.quantity > 0) {
        let item = by_id
            .get(&line.order_item_id)
            .ok_or_else(|| AppError::bad_request("Item is not part of this order"))?;
        let exchange = if kind == KIND_EXCHANGE { line.exchange_variant_id } else { None };
        match selected.iter_mut().find(|s| s.item.id == item.id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
                existing.exchange_variant_id = existing.exchange_variant_id.or(exchange);
            }
            None => selected.push(Selection {
                item: (*item).clone(),
                quantity: line.quantity,
                exchange_variant_id: exchange,
            }),
        }
    }
    if selected.is_empty() {
        return Err(AppError::bad_request("Select at least one item to return/exchange"));
    }

    for selection in &mut selected {
        let remaining = returnable(&selection.item, returned);
        if remaining == 0 {
            return Err(AppError::bad_request(
                "This item has already been requested for return/exchange",
            ));
        }
        selection.quantity = selection.quantity.min(remaining);
    }
    Ok(selected)
}

fn returnable(item: &OrderItemModel, returned: &Returned) -> i32 {
    let used = returned.get(&item.id).copied().unwrap_or(0);
    item.quantity.saturating_sub(used).max(0)
}

async fn returned_quantities(state: &AppState, order_id: Uuid) -> AppResult<Returned> {
    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        r#"
        SELECT ri.order_item_id, COALESCE(SUM(ri.quantity), 0)::int8
        FROM return_items ri
        JOIN return_requests rr ON rr.id = ri.request_id
        WHERE rr.order_id = $1
        GROUP BY ri.order_item_id
        "#,
    )
    .bind(order_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, qty)| (id, i32::try_from(qty).unwrap_or(i32::MAX)))
        .collect())
}

fn order_status_for(kind: &str) -> &'static str {
    if kind == KIND_EXCHANGE {
        STATUS_EXCHANGE_REQUESTED
    } else {
        STATUS_RETURN_REQUESTED
    }
}

async fn existing_variant_ids(state: &AppState, ids: Vec<Uuid>) -> AppResult<Vec<Uuid>> {
    if ids.is_empty() {
        return Ok(ids);
    }
    let found = Variants::find()
        .filter(VariantCol::Id.is_in(ids))
        .all(&state.orm)
        .await?;
    Ok(found.into_iter().map(|v| v.id).collect())
}

async fn record_request(
    state: &AppState,
    user: &AuthUser,
    order: &OrderModel,
    kind: &str,
    reason: &str,
    selection: &[Selection],
) -> AppResult<Uuid> {
    let txn = state.orm.begin().await?;
    let request = ReturnActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        user_id: Set(user.user_id),
        kind: Set(kind.to_string()),
        reason: Set(reason.trim().to_string()),
        status: Set(RETURN_REQUESTED.into()),
        awb_code: Set(String::new()),
        notes: Set(String::new()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for line in selection {
        ReturnItemActive {
            id: Set(Uuid::new_v4()),
            request_id: Set(request.id),
            order_item_id: Set(line.item.id),
            quantity: Set(line.quantity),
            exchange_variant_id: Set(line.exchange_variant_id),
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;
    Ok(request.id)
}

/// Ask the courier for a reverse pickup. `None` when disabled or no AWB came back.
async fn book_pickup(state: &AppState, order: &OrderModel, selection: &[Selection]) -> Option<String> {
    if !state.shipping.enabled() {
        return None;
    }
    let result = async {
        let email = fetch_user(&state.pool, order.user_id).await?.email;
        let mut lines = order_service::load_ship_lines(&state.orm, order.id).await?;
        let wanted: HashMap<Uuid, i32> = selection.iter().map(|s| (s.item.id, s.quantity)).collect();
        lines.retain(|l| wanted.contains_key(&l.item.id));
        for line in &mut lines {
            line.units = wanted.get(&line.item.id).copied().unwrap_or(line.units);
        }
        let shipment = order_service::shipment_order_for(order, &email, &lines, &state.config.shipping);
        Ok::<_, AppError>(state.shipping.create_return(&shipment).await?)
    }
    .await;

    match result {
        Ok(awb) => awb,
        Err(err) => {
            tracing::warn!(order_number = %order.order_number, error = %err, "return pickup booking failed");
            None
        }
    }
}

async fn mark_pickup_scheduled(state: &AppState, request_id: Uuid, order_id: Uuid, kind: &str, awb: &str) -> AppResult<()> {
    let txn = state.orm.begin().await?;
    ReturnRequests::update_many()
        .col_expr(ReturnCol::AwbCode, Expr::value(awb))
        .col_expr(ReturnCol::Status, Expr::value(RETURN_PICKUP_SCHEDULED))
        .col_expr(ReturnCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(ReturnCol::Id.eq(request_id))
        .exec(&txn)
        .await?;
    Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(order_status_for(kind)))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(OrderCol::Id.eq(order_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;
    Ok(())
}

async fn submit(
    state: &AppState,
    user: &AuthUser,
    order: OrderModel,
    kind: &str,
    reason: &str,
    selection: Vec<Selection>,
) -> AppResult<ApiResponse<ReturnRequest>> {
    let request_id = record_request(state, user, &order, kind, reason, &selection).await?;
    let awb = book_pickup(state, &order, &selection).await;

    let message = match &awb {
        Some(awb) => {
            mark_pickup_scheduled(state, request_id, order.id, kind, awb).await?;
            let label = if kind == KIND_EXCHANGE { "Exchange" } else { "Return" };
            format!("{label} initiated. AWB: {awb}")
        }
        None => "Request recorded. We'll schedule a pickup soon.".to_string(),
    };

    audit(
        &state.pool,
        Some(user.user_id),
        "return_request",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "request_id": request_id,
            "kind": kind,
            "awb": awb,
        }),
    )
    .await;

    let (request, items): (_, Vec<ReturnItemModel>) = ReturnRequests::find_by_id(request_id)
        .find_with_related(ReturnItems)
        .all(&state.orm)
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::ok(message, ReturnRequest::from_parts(request, items)))
}

pub async fn request_return(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
    payload: ReturnRequestBody,
) -> AppResult<ApiResponse<ReturnRequest>> {
    let kind = payload.kind.trim().to_ascii_lowercase();
    if kind != KIND_RETURN && kind != KIND_EXCHANGE {
        return Err(AppError::bad_request("Type must be return or exchange"));
    }
    let order = order_service::find_user_order(&state.orm, user.user_id, order_number).await?;
    let items = order_service::order_items(&state.orm, order.id).await?;
    let returned = returned_quantities(state, order.id).await?;
    let mut selection = select_lines(&kind, &items, &payload.items, &returned)?;

    // Unknown replacement variants are dropped rather than rejected.
    let requested: Vec<Uuid> = selection.iter().filter_map(|s| s.exchange_variant_id).collect();
    let known = existing_variant_ids(state, requested).await?;
    for line in &mut selection {
        line.exchange_variant_id = line.exchange_variant_id.filter(|id| known.contains(id));
    }

    submit(state, user, order, &kind, &payload.reason, selection).await
}

/// Return every item of a delivered order in full.
pub async fn quick_return(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
    payload: QuickReturnRequest,
) -> AppResult<ApiResponse<ReturnRequest>> {
    let order = order_service::find_user_order(&state.orm, user.user_id, order_number).await?;
    if order.status != STATUS_DELIVERED {
        return Err(AppError::bad_request(
            "You can request a return after the order is delivered.",
        ));
    }
    let items = order_service::order_items(&state.orm, order.id).await?;
    let returned = returned_quantities(state, order.id).await?;
    let selection: Vec<Selection> = items
        .into_iter()
        .filter_map(|item| {
            let quantity = returnable(&item, &returned);
            (quantity > 0).then_some(Selection {
                quantity,
                item,
                exchange_variant_id: None,
            })
        })
        .collect();
    if selection.is_empty() {
        return Err(AppError::bad_request("This order has no items to return"));
    }

    let reason = if payload.reason.trim().is_empty() {
        QUICK_RETURN_REASON
    } else {
        payload.reason.as_str()
    };
    submit(state, user, order, KIND_RETURN, reason, selection).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn item(quantity: i32) -> OrderItemModel {
        OrderItemModel {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            variant_id: None,
            variant_size: "L".into(),
            variant_color: "Black".into(),
            quantity,
            unit_price: dec!(499),
            line_total: dec!(499) * Decimal::from(quantity),
            unit_cost: Decimal::ZERO,
            line_cost: Decimal::ZERO,
        }
    }

    fn line(item: &OrderItemModel, quantity: i32, exchange: Option<Uuid>) -> ReturnLine {
        ReturnLine {
            order_item_id: item.id,
            quantity,
            exchange_variant_id: exchange,
        }
    }

    #[test]
    fn quantities_are_clamped_to_ordered() {
        let items = vec![item(2), item(1)];
        let selected = select_lines(KIND_RETURN, &items, &[line(&items[0], 5, None), line(&items[1], 0, None)], &Returned::new())
            .expect("selection");
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].quantity, 2);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let items = vec![item(2)];
        let err = select_lines(KIND_RETURN, &items, &[line(&items[0], 0, None)], &Returned::new()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn foreign_items_are_rejected() {
        let items = vec![item(2)];
        let stranger = item(1);
        assert!(select_lines(KIND_RETURN, &items, &[line(&stranger, 1, None)], &Returned::new()).is_err());
    }

    #[test]
    fn exchange_variant_only_kept_for_exchanges() {
        let items = vec![item(1)];
        let variant = Uuid::new_v4();
        let returned = select_lines(KIND_RETURN, &items, &[line(&items[0], 1, Some(variant))], &Returned::new()).expect("return");
        assert_eq!(returned[0].exchange_variant_id, None);
        let exchanged = select_lines(KIND_EXCHANGE, &items, &[line(&items[0], 1, Some(variant))], &Returned::new()).expect("exchange");
        assert_eq!(exchanged[0].exchange_variant_id, Some(variant));
    }

    #[test]
    fn repeated_items_are_merged_and_clamped() {
        let items = vec![item(3)];
        let lines = [line(&items[0], 2, None), line(&items[0], 2, None)];
        let selected = select_lines(KIND_RETURN, &items, &lines, &Returned::new()).expect("selection");
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].quantity, 3);
    }

    #[test]
    fn earlier_requests_reduce_what_can_be_returned() {
        let items = vec![item(3)];
        let mut returned = Returned::new();
        returned.insert(items[0].id, 2);
        let selected = select_lines(KIND_RETURN, &items, &[line(&items[0], 3, None)], &returned).expect("selection");
        assert_eq!(selected[0].quantity, 1);

        returned.insert(items[0].id, 3);
        let err = select_lines(KIND_RETURN, &items, &[line(&items[0], 1, None)], &returned).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(returnable(&items[0], &returned), 0);
    }

    #[test]
    fn order_moves_to_matching_status() {
        assert_eq!(order_status_for(KIND_RETURN), STATUS_RETURN_REQUESTED);
        assert_eq!(order_status_for(KIND_EXCHANGE), STATUS_EXCHANGE_REQUESTED);
    }
}
