use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::cart::GuestCartLine,
    models::{Order, OrderItem, ReturnRequest},
    pricing::PriceSummary,
    shipping::Tracking,
};

pub const PAYMENT_RAZORPAY: &str = "razorpay";
pub const PAYMENT_COD: &str = "cod";

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PreviewRequest {
    #[serde(default)]
    pub address_id: Option<Uuid>,
    #[serde(default)]
    pub buy_now: Option<GuestCartLine>,
    #[serde(default)]
    pub selected_item_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub address_id: Option<Uuid>,
    pub payment_method: String,
    /// Guest cart lines merged into the account cart before pricing.
    #[serde(default)]
    pub merge_items: Vec<GuestCartLine>,
    /// Single-line purchase that bypasses the cart.
    #[serde(default)]
    pub buy_now: Option<GuestCartLine>,
    /// Restrict checkout to these cart line ids.
    #[serde(default)]
    pub selected_item_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutPreview {
    pub address_id: Option<Uuid>,
    pub units: i32,
    pub summary: PriceSummary,
}

/// Everything the client needs to open the gateway's checkout widget.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentInstructions {
    pub key_id: String,
    pub amount: i64,
    pub currency: String,
    pub gateway_order_id: String,
    pub order_number: String,
    pub store_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Option<PaymentInstructions>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub returns: Vec<ReturnRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceLine {
    pub product_name: String,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Invoice {
    pub store_name: String,
    pub store_domain: String,
    pub gstin: String,
    pub currency_symbol: String,
    pub order: Order,
    pub lines: Vec<InvoiceLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingView {
    pub order_number: String,
    pub provider: String,
    pub tracking_number: String,
    pub tracking: Option<Tracking>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReturnLine {
    pub order_item_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub exchange_variant_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnRequestBody {
    /// `return` or `exchange`.
    pub kind: String,
    #[serde(default)]
    pub reason: String,
    pub items: Vec<ReturnLine>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct QuickReturnRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SupportRequest {
    /// `not_received` or `delivery_feedback`.
    pub kind: String,
    #[serde(default)]
    pub message: String,
}
