use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Banner;

#[derive(Debug, Serialize, ToSchema)]
pub struct StoreInfo {
    pub name: String,
    pub domain: String,
    pub currency_symbol: String,
    pub gst_rate: Decimal,
    pub gstin: String,
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_rate: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BannerList {
    pub items: Vec<Banner>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewsletterRequest {
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NewsletterResponse {
    pub email: String,
    pub created: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BannerRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub link_url: String,
    #[serde(default)]
    pub button_text: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub sort_order: i32,
}
