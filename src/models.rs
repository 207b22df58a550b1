use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{
        categories, coupons, order_items, orders, product_images, products, return_items, return_requests, users,
        variants,
    },
    pricing::{PricePoint, ShippingAttrs},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            username: model.username,
            full_name: model.full_name,
            role: model.role,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
            last_login: model.last_login.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub avatar_url: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub interests: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub is_display: bool,
    pub thumbnail_url: String,
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            is_display: model.is_display,
            thumbnail_url: model.thumbnail_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category_id: Uuid,
    pub description: String,
    pub base_price: Decimal,
    pub sale_price: Option<Decimal>,
    pub price: Decimal,
    pub is_active: bool,
    pub is_best_seller: bool,
    pub notify_users: bool,
    pub weight_kg: Option<Decimal>,
    pub length_cm: Option<i32>,
    pub breadth_cm: Option<i32>,
    pub height_cm: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            price: model.sale_price.unwrap_or(model.base_price),
            id: model.id,
            name: model.name,
            slug: model.slug,
            category_id: model.category_id,
            description: model.description,
            base_price: model.base_price,
            sale_price: model.sale_price,
            is_active: model.is_active,
            is_best_seller: model.is_best_seller,
            notify_users: model.notify_users,
            weight_kg: model.weight_kg,
            length_cm: model.length_cm,
            breadth_cm: model.breadth_cm,
            height_cm: model.height_cm,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl products::Model {
    pub fn price_point(&self) -> PricePoint {
        PricePoint::product(self.base_price, self.sale_price)
    }

    pub fn shipping_attrs(&self) -> ShippingAttrs {
        ShippingAttrs {
            weight_kg: self.weight_kg,
            length_cm: self.length_cm,
            breadth_cm: self.breadth_cm,
            height_cm: self.height_cm,
        }
    }
}

impl variants::Model {
    pub fn price_point(&self) -> PricePoint {
        PricePoint {
            base_price: self.base_price,
            sale_price: self.sale_price,
        }
    }

    pub fn shipping_attrs(&self) -> ShippingAttrs {
        ShippingAttrs {
            weight_kg: self.weight_kg,
            length_cm: self.length_cm,
            breadth_cm: self.breadth_cm,
            height_cm: self.height_cm,
        }
    }
}

/// Compact product row for listings, with rating aggregates.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct ProductCard {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub base_price: Decimal,
    pub sale_price: Option<Decimal>,
    pub is_best_seller: bool,
    pub image_url: Option<String>,
    pub avg_rating: Option<f64>,
    pub review_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Variant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub size: String,
    pub color: String,
    pub sku: String,
    pub stock: i32,
    pub base_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    pub length_cm: Option<i32>,
    pub breadth_cm: Option<i32>,
    pub height_cm: Option<i32>,
}

impl From<variants::Model> for Variant {
    fn from(model: variants::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            size: model.size,
            color: model.color,
            sku: model.sku,
            stock: model.stock,
            base_price: model.base_price,
            sale_price: model.sale_price,
            cost_price: model.cost_price,
            weight_kg: model.weight_kg,
            length_cm: model.length_cm,
            breadth_cm: model.breadth_cm,
            height_cm: model.height_cm,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image_url: String,
    pub alt_text: String,
    pub color: String,
    pub is_primary: bool,
}

impl From<product_images::Model> for ProductImage {
    fn from(model: product_images::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            image_url: model.image_url,
            alt_text: model.alt_text,
            color: model.color,
            is_primary: model.is_primary,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct WishlistEntry {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub base_price: Decimal,
    pub sale_price: Option<Decimal>,
    pub image_url: Option<String>,
    pub last_variant_id: Option<Uuid>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_slug: String,
    pub variant_id: Option<Uuid>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub description: String,
    pub discount_percent: i32,
    pub active: bool,
    pub notify_users: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub is_valid: bool,
}

impl From<coupons::Model> for Coupon {
    fn from(model: coupons::Model) -> Self {
        Self {
            is_valid: model.is_valid(Utc::now()),
            id: model.id,
            code: model.code,
            description: model.description,
            discount_percent: model.discount_percent,
            active: model.active,
            notify_users: model.notify_users,
            valid_from: model.valid_from.map(|dt| dt.with_timezone(&Utc)),
            valid_to: model.valid_to.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_number: String,
    pub status: String,
    pub payment_method: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub coupon_code: String,
    pub gst_amount: Decimal,
    pub shipping_amount: Decimal,
    pub total_amount: Decimal,
    pub shipping_name: String,
    pub shipping_phone: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub shipping_provider: String,
    pub tracking_number: String,
    pub stock_debited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            order_number: model.order_number,
            status: model.status,
            payment_method: model.payment_method,
            gateway_order_id: model.gateway_order_id,
            gateway_payment_id: model.gateway_payment_id,
            subtotal: model.subtotal,
            discount_amount: model.discount_amount,
            coupon_code: model.coupon_code,
            gst_amount: model.gst_amount,
            shipping_amount: model.shipping_amount,
            total_amount: model.total_amount,
            shipping_name: model.shipping_name,
            shipping_phone: model.shipping_phone,
            address_line1: model.address_line1,
            address_line2: model.address_line2,
            city: model.city,
            state: model.state,
            postal_code: model.postal_code,
            country: model.country,
            shipping_provider: model.shipping_provider,
            tracking_number: model.tracking_number,
            stock_debited: model.stock_debited,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub variant_size: String,
    pub variant_color: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            variant_id: model.variant_id,
            variant_size: model.variant_size,
            variant_color: model.variant_color,
            quantity: model.quantity,
            unit_price: model.unit_price,
            line_total: model.line_total,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReturnRequest {
    pub id: Uuid,
    pub order_id: Uuid,
    pub kind: String,
    pub reason: String,
    pub status: String,
    pub awb_code: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<ReturnItem>,
}

impl ReturnRequest {
    pub fn from_parts(model: return_requests::Model, items: Vec<return_items::Model>) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            kind: model.kind,
            reason: model.reason,
            status: model.status,
            awb_code: model.awb_code,
            notes: model.notes,
            created_at: model.created_at.with_timezone(&Utc),
            items: items.into_iter().map(ReturnItem::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReturnItem {
    pub id: Uuid,
    pub order_item_id: Uuid,
    pub quantity: i32,
    pub exchange_variant_id: Option<Uuid>,
}

impl From<return_items::Model> for ReturnItem {
    fn from(model: return_items::Model) -> Self {
        Self {
            id: model.id,
            order_item_id: model.order_item_id,
            quantity: model.quantity,
            exchange_variant_id: model.exchange_variant_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub rating: i32,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub link_url: String,
    pub level: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Banner {
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
    pub video_url: String,
    pub link_url: String,
    pub button_text: String,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}
