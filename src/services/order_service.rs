use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
    ActiveValue::NotSet,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit::audit,
    config::ShippingConfig,
    dto::{
        cart::GuestCartLine,
        orders::{
            CheckoutPreview, CheckoutRequest, CheckoutResponse, Invoice, InvoiceLine, OrderList, OrderWithItems,
            PAYMENT_COD, PAYMENT_RAZORPAY, PaymentInstructions, PreviewRequest, SupportRequest, TrackingView,
        },
    },
    entity::{
        CartItems, OrderItems, Orders, Products, ReturnItems, ReturnRequests, Variants,
        cart_items::Column as CartItemCol,
        carts::Model as CartModel,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Model as OrderItemModel},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Model as OrderModel},
        products::Model as ProductModel,
        return_requests::Column as ReturnCol,
        variants::{Column as VariantCol, Model as VariantModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, ReturnRequest},
    pricing::{self, Parcel, ParcelLine},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{
        account_service::{fetch_user, resolve_address},
        cart_service::{self, PricedLine},
        coupon_service,
        notification_service::{LEVEL_INFO, LEVEL_SUCCESS, notify_user_quietly},
    },
    shipping::{ShipmentItem, ShipmentOrder},
    state::AppState,
};

pub const STATUS_CREATED: &str = "created";
pub const STATUS_PAID: &str = "paid";
pub const STATUS_DELIVERED: &str = "delivered";
pub const STATUS_RETURN_REQUESTED: &str = "return_requested";
pub const STATUS_EXCHANGE_REQUESTED: &str = "exchange_requested";

pub const ORDER_STATUSES: [&str; 15] = [
    "created",
    "paid",
    "confirmed",
    "packed",
    "dispatched",
    "out_for_delivery",
    "delivered",
    "processing",
    "shipped",
    "return_requested",
    "exchange_requested",
    "return_in_transit",
    "return_completed",
    "cancelled",
    "refunded",
];

/// Statuses whose totals count as revenue.
pub const REVENUE_STATUSES: [&str; 3] = ["paid", "shipped", "delivered"];

pub const SHIPPING_PROVIDER: &str = "Shiprocket";

const ORDER_NUMBER_ATTEMPTS: usize = 5;

pub fn is_known_status(status: &str) -> bool {
    ORDER_STATUSES.contains(&status)
}

/// Ten upper-case hex characters.
pub fn new_order_number() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_ascii_uppercase()
}

async fn unique_order_number<C: ConnectionTrait>(conn: &C) -> AppResult<String> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let candidate = new_order_number();
        let taken = Orders::find()
            .filter(OrderCol::OrderNumber.eq(candidate.as_str()))
            .count(conn)
            .await?
            > 0;
        if !taken {
            return Ok(candidate);
        }
    }
    Err(AppError::Internal(anyhow::anyhow!("could not allocate an order number")))
}

/// Largest value a NUMERIC(10, 2) money column holds.
pub fn max_order_amount() -> Decimal {
    Decimal::new(99_999_999_99, 2)
}

pub fn fits_amount_column(summary: &pricing::PriceSummary) -> bool {
    let max = max_order_amount();
    [summary.subtotal, summary.gst_amount, summary.shipping_amount, summary.total_amount]
        .iter()
        .all(|amount| *amount <= max)
}

/// Lines being bought and whether they came out of the cart.
struct CheckoutSource {
    cart: CartModel,
    lines: Vec<PricedLine>,
    from_cart: bool,
}

/// Buy-now line first, then the selected cart lines, then the whole cart.
async fn collect_source<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    buy_now: Option<&GuestCartLine>,
    selected: Option<&[Uuid]>,
) -> AppResult<CheckoutSource> {
    let cart = cart_service::get_or_create_cart(conn, user_id).await?;

    if let Some(line) = buy_now {
        let priced = cart_service::resolve_guest_line(conn, line)
            .await?
            .ok_or_else(|| AppError::bad_request("This item is no longer available"))?;
        return Ok(CheckoutSource {
            cart,
            lines: vec![priced],
            from_cart: false,
        });
    }

    let only = selected.filter(|ids| !ids.is_empty());
    let (lines, unavailable) = cart_service::load_lines_checked(conn, cart.id, only).await?;
    if lines.is_empty() && unavailable == 0 {
        return Err(AppError::bad_request("Your cart is empty"));
    }
    if unavailable > 0 {
        return Err(AppError::bad_request(
            "Some items in your cart are no longer available. Remove them to continue.",
        ));
    }
    Ok(CheckoutSource {
        cart,
        lines,
        from_cart: true,
    })
}

pub async fn preview(
    state: &AppState,
    user: &AuthUser,
    payload: PreviewRequest,
) -> AppResult<ApiResponse<CheckoutPreview>> {
    let source = collect_source(
        &state.orm,
        user.user_id,
        payload.buy_now.as_ref(),
        payload.selected_item_ids.as_deref(),
    )
    .await?;
    let coupon = coupon_service::still_valid(&state.orm, source.cart.coupon_code.as_deref()).await?;
    let address = resolve_address(&state.pool, user.user_id, payload.address_id).await?;

    let summary = cart_service::price_lines(
        state,
        &source.lines,
        coupon.as_ref(),
        address.as_ref().map(|a| a.postal_code.as_str()),
        false,
    )
    .await;

    Ok(ApiResponse::ok(
        "Checkout preview",
        CheckoutPreview {
            address_id: address.map(|a| a.id),
            units: cart_service::units(&source.lines)?,
            summary,
        },
    ))
}

fn order_item_for(order_id: Uuid, line: &PricedLine) -> OrderItemActive {
    let unit_cost = line.unit_cost();
    OrderItemActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        product_id: Set(line.product.id),
        variant_id: Set(line.variant.as_ref().map(|v| v.id)),
        variant_size: Set(line.variant.as_ref().map(|v| v.size.clone()).unwrap_or_default()),
        variant_color: Set(line.variant.as_ref().map(|v| v.color.clone()).unwrap_or_default()),
        quantity: Set(line.quantity),
        unit_price: Set(line.unit_price()),
        line_total: Set(line.line_total()),
        unit_cost: Set(unit_cost),
        line_cost: Set(pricing::line_total(unit_cost, line.quantity)),
    }
}

/// Take the order's quantities out of variant stock, once per order.
/// Returns `false` when the order was already debited.
pub async fn debit_stock<C: ConnectionTrait>(conn: &C, order: &OrderModel) -> AppResult<bool> {
    if order.stock_debited {
        return Ok(false);
    }
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(conn)
        .await?;

    for item in &items {
        let Some(variant_id) = item.variant_id else {
            continue;
        };
        let variant = Variants::find_by_id(variant_id)
            .lock(LockType::Update)
            .one(conn)
            .await?
            .ok_or(AppError::NotFound)?;
        if variant.stock < item.quantity {
            return Err(AppError::bad_request(format!(
                "Not enough stock for {} ({}/{})",
                variant.sku, variant.size, variant.color
            )));
        }
        Variants::update_many()
            .col_expr(VariantCol::Stock, Expr::col(VariantCol::Stock).sub(item.quantity))
            .filter(VariantCol::Id.eq(variant_id))
            .exec(conn)
            .await?;
    }

    Orders::update_many()
        .col_expr(OrderCol::StockDebited, Expr::value(true))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(OrderCol::Id.eq(order.id))
        .exec(conn)
        .await?;
    Ok(true)
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    if payload.buy_now.is_none() && !payload.merge_items.is_empty() {
        let txn = state.orm.begin().await?;
        let cart = cart_service::get_or_create_cart(&txn, user.user_id).await?;
        cart_service::merge_lines(&txn, cart.id, &payload.merge_items).await?;
        txn.commit().await?;
    }

    let source = collect_source(
        &state.orm,
        user.user_id,
        payload.buy_now.as_ref(),
        payload.selected_item_ids.as_deref(),
    )
    .await?;
    let coupon = coupon_service::still_valid(&state.orm, source.cart.coupon_code.as_deref()).await?;
    let address = resolve_address(&state.pool, user.user_id, payload.address_id)
        .await?
        .ok_or_else(|| AppError::bad_request("Add a shipping address before checkout"))?;

    let method = payload.payment_method.trim().to_ascii_lowercase();
    let summary = cart_service::price_lines(
        state,
        &source.lines,
        coupon.as_ref(),
        Some(address.postal_code.as_str()),
        method == PAYMENT_COD,
    )
    .await;
    if method != PAYMENT_RAZORPAY && method != PAYMENT_COD {
        return Err(AppError::bad_request("Select a valid payment method"));
    }
    if !fits_amount_column(&summary) {
        return Err(AppError::bad_request("Order total is too large"));
    }

    let txn = state.orm.begin().await?;
    let order_number = unique_order_number(&txn).await?;
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        order_number: Set(order_number.clone()),
        status: Set(STATUS_CREATED.into()),
        payment_method: Set(method.clone()),
        gateway_order_id: Set(String::new()),
        gateway_payment_id: Set(String::new()),
        gateway_signature: Set(String::new()),
        subtotal: Set(summary.subtotal),
        gst_amount: Set(summary.gst_amount),
        shipping_amount: Set(summary.shipping_amount),
        total_amount: Set(summary.total_amount),
        coupon_code: Set(summary.coupon_code.clone().unwrap_or_default()),
        discount_amount: Set(summary.discount_amount),
        shipping_name: Set(address.full_name.clone()),
        shipping_phone: Set(address.phone.clone()),
        address_line1: Set(address.address_line1.clone()),
        address_line2: Set(address.address_line2.clone()),
        city: Set(address.city.clone()),
        state: Set(address.state.clone()),
        postal_code: Set(address.postal_code.clone()),
        country: Set(address.country.clone()),
        shipping_provider: NotSet,
        tracking_number: NotSet,
        stock_debited: Set(false),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(source.lines.len());
    for line in &source.lines {
        let item = order_item_for(order.id, line).insert(&txn).await?;
        items.push(OrderItem::from(item));
    }

    if method == PAYMENT_COD {
        debit_stock(&txn, &order).await?;
        if source.from_cart {
            let ids: Vec<Uuid> = source.lines.iter().filter_map(|l| l.cart_item_id).collect();
            CartItems::delete_many()
                .filter(CartItemCol::CartId.eq(source.cart.id))
                .filter(CartItemCol::Id.is_in(ids))
                .exec(&txn)
                .await?;
        }
        cart_service::set_cart_coupon(&txn, source.cart.id, None).await?;
        txn.commit().await?;

        audit(
            &state.pool,
            Some(user.user_id),
            "checkout",
            "orders",
            serde_json::json!({ "order_id": order.id, "payment_method": method, "total": order.total_amount }),
        )
        .await;
        notify_user_quietly(
            &state.pool,
            user.user_id,
            "Order placed",
            &format!("Your order {order_number} has been placed. Pay on delivery."),
            &format!("/orders/{order_number}"),
            LEVEL_SUCCESS,
        )
        .await;

        let order = reload_order(&state.orm, order.id).await?;
        return Ok(ApiResponse::ok(
            format!("COD order placed: {order_number}"),
            CheckoutResponse {
                order: order.into(),
                items,
                payment: None,
            },
        ));
    }

    txn.commit().await?;

    let gateway_order = state
        .payments
        .create_order(pricing::amount_minor(order.total_amount), &order_number)
        .await
        .inspect_err(|err| tracing::warn!(error = %err, order_number, "gateway order creation failed"))?;

    let mut active: OrderActive = order.into();
    active.gateway_order_id = Set(gateway_order.id.clone());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    audit(
        &state.pool,
        Some(user.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id, "payment_method": method, "gateway_order_id": order.gateway_order_id }),
    )
    .await;

    let payment = PaymentInstructions {
        key_id: state.payments.key_id().to_string(),
        amount: gateway_order.amount,
        currency: gateway_order.currency,
        gateway_order_id: gateway_order.id,
        order_number,
        store_name: state.config.store.name.clone(),
    };
    Ok(ApiResponse::ok(
        "Order created, complete the payment",
        CheckoutResponse {
            order: order.into(),
            items,
            payment: Some(payment),
        },
    ))
}

pub async fn reload_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn find_user_order<C: ConnectionTrait>(conn: &C, user_id: Uuid, order_number: &str) -> AppResult<OrderModel> {
    Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user_id))
                .add(OrderCol::OrderNumber.eq(order_number)),
        )
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn order_items<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<OrderItemModel>> {
    Ok(OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(conn)
        .await?)
}

pub async fn returns_for_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<ReturnRequest>> {
    let rows = ReturnRequests::find()
        .filter(ReturnCol::OrderId.eq(order_id))
        .order_by_desc(ReturnCol::CreatedAt)
        .find_with_related(ReturnItems)
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(request, items)| ReturnRequest::from_parts(request, items))
        .collect())
}

pub async fn order_with_items<C: ConnectionTrait>(conn: &C, order: OrderModel) -> AppResult<OrderWithItems> {
    let items = order_items(conn, order.id)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();
    let returns = returns_for_order(conn, order.id).await?;
    Ok(OrderWithItems {
        order: order.into(),
        items,
        returns,
    })
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = find_user_order(&state.orm, user.user_id, order_number).await?;
    let detail = order_with_items(&state.orm, order).await?;
    Ok(ApiResponse::ok("Order", detail))
}

pub async fn invoice(state: &AppState, user: &AuthUser, order_number: &str) -> AppResult<ApiResponse<Invoice>> {
    let order = find_user_order(&state.orm, user.user_id, order_number).await?;
    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .find_also_related(Products)
        .all(&state.orm)
        .await?;

    let lines = rows
        .into_iter()
        .map(|(item, product)| InvoiceLine {
            product_name: product.map(|p| p.name).unwrap_or_default(),
            size: item.variant_size,
            color: item.variant_color,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total,
        })
        .collect();

    let store = &state.config.store;
    Ok(ApiResponse::ok(
        "Invoice",
        Invoice {
            store_name: store.name.clone(),
            store_domain: store.domain.clone(),
            gstin: store.gstin.clone(),
            currency_symbol: store.currency_symbol.clone(),
            order: order.into(),
            lines,
        },
    ))
}

/// Courier status for the order's AWB; `tracking` is null until one is assigned.
pub async fn tracking(state: &AppState, user: &AuthUser, order_number: &str) -> AppResult<ApiResponse<TrackingView>> {
    let order = find_user_order(&state.orm, user.user_id, order_number).await?;
    let tracking = if order.tracking_number.is_empty() {
        None
    } else {
        state.shipping.track(&order.tracking_number).await?
    };
    Ok(ApiResponse::ok(
        "Tracking",
        TrackingView {
            order_number: order.order_number,
            provider: order.shipping_provider,
            tracking_number: order.tracking_number,
            tracking,
        },
    ))
}

pub async fn support(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
    payload: SupportRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let order = find_user_order(&state.orm, user.user_id, order_number).await?;
    let message = match payload.kind.as_str() {
        "not_received" => {
            "Thanks. We've recorded that you haven't received this order. Our team will review and reach out."
        }
        "delivery_feedback" => "Thanks for your feedback on the delivery associate.",
        _ => return Err(AppError::bad_request("Unknown support request")),
    };

    audit(
        &state.pool,
        Some(user.user_id),
        &format!("order_{}", payload.kind),
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "order_number": order.order_number,
            "message": payload.message.trim(),
        }),
    )
    .await;

    Ok(ApiResponse::ok(
        message,
        serde_json::json!({ "order_number": order.order_number, "kind": payload.kind }),
    ))
}

/// An order line with the catalog rows needed to describe it to the courier.
#[derive(Debug, Clone)]
pub struct ShipLine {
    pub item: OrderItemModel,
    pub product: Option<ProductModel>,
    pub variant: Option<VariantModel>,
    pub units: i32,
}

impl ShipLine {
    fn shipment_item(&self) -> ShipmentItem {
        let mut name = self
            .product
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "Item".to_string());
        if let Some(variant) = &self.variant {
            name = format!("{name} - {}/{}", variant.size, variant.color);
        }
        let sku = match &self.variant {
            Some(variant) => variant.sku.clone(),
            None => format!("SKU-{}", self.item.product_id),
        };
        ShipmentItem {
            name,
            sku,
            units: self.units,
            selling_price: self.item.unit_price,
        }
    }

    fn parcel_line(&self) -> ParcelLine {
        ParcelLine {
            quantity: self.units,
            variant: self.variant.as_ref().map(VariantModel::shipping_attrs),
            product: self
                .product
                .as_ref()
                .map(ProductModel::shipping_attrs)
                .unwrap_or_default(),
        }
    }
}

pub async fn load_ship_lines<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<ShipLine>> {
    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .find_also_related(Products)
        .all(conn)
        .await?;

    let variant_ids: Vec<Uuid> = rows.iter().filter_map(|(item, _)| item.variant_id).collect();
    let variants: HashMap<Uuid, VariantModel> = if variant_ids.is_empty() {
        HashMap::new()
    } else {
        Variants::find()
            .filter(VariantCol::Id.is_in(variant_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect()
    };

    Ok(rows
        .into_iter()
        .map(|(item, product)| ShipLine {
            units: item.quantity,
            variant: item.variant_id.and_then(|id| variants.get(&id).cloned()),
            product,
            item,
        })
        .collect())
}

pub fn shipment_order_for(order: &OrderModel, email: &str, lines: &[ShipLine], config: &ShippingConfig) -> ShipmentOrder {
    let parcel_lines: Vec<ParcelLine> = lines.iter().map(ShipLine::parcel_line).collect();
    ShipmentOrder {
        order_number: order.order_number.clone(),
        order_date: order.created_at.with_timezone(&Utc),
        customer_name: order.shipping_name.clone(),
        email: email.to_string(),
        phone: order.shipping_phone.clone(),
        address_line1: order.address_line1.clone(),
        address_line2: order.address_line2.clone(),
        city: order.city.clone(),
        state: order.state.clone(),
        postal_code: order.postal_code.clone(),
        country: order.country.clone(),
        prepaid: order.payment_method != PAYMENT_COD,
        items: lines.iter().map(ShipLine::shipment_item).collect(),
        parcel: Parcel::from_lines(&parcel_lines, config.default_unit_weight_kg, config.default_dims_cm),
    }
}

/// Book a courier shipment and store its AWB. An order that already has
/// tracking is left alone and its existing AWB returned.
pub async fn create_shipment_for_order(state: &AppState, order_id: Uuid) -> AppResult<Option<String>> {
    let order = reload_order(&state.orm, order_id).await?;
    if !order.tracking_number.is_empty() {
        return Ok(Some(order.tracking_number));
    }

    let user = fetch_user(&state.pool, order.user_id).await?;
    let lines = load_ship_lines(&state.orm, order.id).await?;
    let shipment = shipment_order_for(&order, &user.email, &lines, &state.config.shipping);
    let awb = state.shipping.create_shipment(&shipment).await?;

    if let Some(awb) = &awb {
        Orders::update_many()
            .col_expr(OrderCol::TrackingNumber, Expr::value(awb.clone()))
            .col_expr(OrderCol::ShippingProvider, Expr::value(SHIPPING_PROVIDER))
            .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(OrderCol::Id.eq(order.id))
            .exec(&state.orm)
            .await?;
        notify_user_quietly(
            &state.pool,
            order.user_id,
            "Order shipped",
            &format!("Order {} is on its way. AWB: {awb}", order.order_number),
            &format!("/orders/{}/track", order.order_number),
            LEVEL_INFO,
        )
        .await;
    }
    Ok(awb)
}

/// Shipment creation after payment; failures are logged only.
pub async fn ship_quietly(state: &AppState, order_id: Uuid) {
    if !state.shipping.enabled() {
        return;
    }
    match create_shipment_for_order(state, order_id).await {
        Ok(Some(awb)) => tracing::debug!(%order_id, awb, "shipment created"),
        Ok(None) => tracing::warn!(%order_id, "courier did not assign an AWB"),
        Err(err) => tracing::warn!(%order_id, error = %err, "shipment creation failed"),
    }
}

/// Sales after discount, floored at zero.
pub fn net_sales(subtotal: Decimal, discount: Decimal) -> Decimal {
    (subtotal - discount).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(method: &str) -> OrderModel {
        let now = Utc::now().into();
        OrderModel {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            order_number: "AB12CD34EF".into(),
            status: STATUS_CREATED.into(),
            payment_method: method.into(),
            gateway_order_id: String::new(),
            gateway_payment_id: String::new(),
            gateway_signature: String::new(),
            subtotal: dec!(998),
            gst_amount: dec!(179.64),
            shipping_amount: Decimal::ZERO,
            total_amount: dec!(1177.64),
            coupon_code: String::new(),
            discount_amount: Decimal::ZERO,
            shipping_name: "Asha Rao".into(),
            shipping_phone: "9876543210".into(),
            address_line1: "12 MG Road".into(),
            address_line2: String::new(),
            city: "Bengaluru".into(),
            state: "Karnataka".into(),
            postal_code: "560001".into(),
            country: "India".into(),
            shipping_provider: SHIPPING_PROVIDER.into(),
            tracking_number: String::new(),
            stock_debited: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn item(order_id: Uuid, quantity: i32) -> OrderItemModel {
        OrderItemModel {
            id: Uuid::new_v4(),
            order_id,
            product_id: Uuid::new_v4(),
            variant_id: None,
            variant_size: String::new(),
            variant_color: String::new(),
            quantity,
            unit_price: dec!(499),
            line_total: dec!(499) * Decimal::from(quantity),
            unit_cost: Decimal::ZERO,
            line_cost: Decimal::ZERO,
        }
    }

    #[test]
    fn order_numbers_are_ten_upper_hex_chars() {
        let number = new_order_number();
        assert_eq!(number.len(), 10);
        assert!(number.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn status_list_is_complete() {
        assert!(is_known_status("out_for_delivery"));
        assert!(is_known_status("refunded"));
        assert!(!is_known_status("lost"));
        assert!(REVENUE_STATUSES.iter().all(|s| is_known_status(s)));
    }

    #[test]
    fn shipment_uses_sku_fallback_and_payment_mode() {
        let cod = order(PAYMENT_COD);
        let line = ShipLine {
            item: item(cod.id, 2),
            product: None,
            variant: None,
            units: 2,
        };
        let shipment = shipment_order_for(&cod, "asha@example.com", &[line.clone()], &ShippingConfig::default());
        assert!(!shipment.prepaid);
        assert_eq!(shipment.items[0].sku, format!("SKU-{}", line.item.product_id));
        assert_eq!(shipment.items[0].units, 2);
        assert_eq!(shipment.parcel.weight_kg, dec!(1.0));
        assert_eq!(shipment.sub_total(), dec!(998));

        let prepaid = shipment_order_for(&order(PAYMENT_RAZORPAY), "", &[], &ShippingConfig::default());
        assert!(prepaid.prepaid);
    }

    #[test]
    fn net_sales_never_negative() {
        assert_eq!(net_sales(dec!(100), dec!(10)), dec!(90));
        assert_eq!(net_sales(dec!(10), dec!(20)), Decimal::ZERO);
    }

    #[test]
    fn totals_must_fit_amount_columns() {
        let config = crate::config::PricingConfig::default();
        let ok = pricing::summarize(dec!(998), None, None, &config);
        assert!(fits_amount_column(&ok));

        let huge = pricing::summarize(dec!(99) * dec!(9999999), None, None, &config);
        assert!(!fits_amount_column(&huge));
        assert_eq!(max_order_amount(), dec!(99999999.99));
    }
}
