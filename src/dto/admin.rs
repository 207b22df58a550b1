use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Address, Coupon, Order, Profile, Review, User};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustRequest {
    pub delta: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct LowStockVariant {
    pub variant_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub size: String,
    pub color: String,
    pub sku: String,
    pub stock: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LowStockList {
    pub threshold: i32,
    pub items: Vec<LowStockVariant>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub revenue: Decimal,
    pub order_count: i64,
    pub total_stock: i64,
    pub latest_orders: Vec<Order>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct AnalyticsPoint {
    pub date: String,
    pub revenue: Decimal,
    pub net_sales: Decimal,
    pub estimated_profit: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Analytics {
    pub days: i64,
    pub group: String,
    pub points: Vec<AnalyticsPoint>,
    pub total_revenue: Decimal,
    pub total_net_sales: Decimal,
    pub total_profit: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct AdminOrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub username: String,
    pub status: String,
    pub payment_method: String,
    pub total_amount: Decimal,
    pub tracking_number: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderList {
    pub items: Vec<AdminOrderRow>,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct AdminUserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub order_count: i64,
    pub total_spent: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserCounts {
    pub total: i64,
    pub staff: i64,
    pub active: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUserList {
    pub items: Vec<AdminUserRow>,
    pub counts: UserCounts,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUserDetail {
    pub user: User,
    pub profile: Option<Profile>,
    pub addresses: Vec<Address>,
    pub recent_orders: Vec<Order>,
    pub order_count: i64,
    pub total_spent: Decimal,
    pub recent_reviews: Vec<Review>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CouponRequest {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub discount_percent: i32,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub notify_users: bool,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponList {
    pub items: Vec<Coupon>,
}
