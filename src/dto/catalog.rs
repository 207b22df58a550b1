use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::reviews::RatingSummary,
    models::{Banner, Category, Product, ProductCard, ProductImage, Review, Variant},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<ProductCard>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<Category>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryDetail {
    pub category: Category,
    pub products: Vec<ProductCard>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    pub product: Product,
    pub category: Option<Category>,
    pub variants: Vec<Variant>,
    pub images: Vec<ProductImage>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub rating: RatingSummary,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Deal {
    pub product: ProductCard,
    pub discount_percent: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HomeView {
    pub latest: Vec<ProductCard>,
    pub categories: Vec<Category>,
    pub banners: Vec<Banner>,
    pub top_deals: Vec<Deal>,
    pub wishlist_product_ids: Vec<Uuid>,
}

/// Either a hex colour, an rgb triple, or raw pixels to average.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ColorSearchRequest {
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<u8>>)]
    pub rgb: Option<[u8; 3]>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<Vec<u8>>>)]
    pub pixels: Option<Vec<[u8; 3]>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ColorSearchResult {
    pub color: String,
    pub items: Vec<ProductCard>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub is_display: bool,
    #[serde(default)]
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VariantRequest {
    pub size: String,
    pub color: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub base_price: Option<Decimal>,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    #[serde(default)]
    pub weight_kg: Option<Decimal>,
    #[serde(default)]
    pub length_cm: Option<i32>,
    #[serde(default)]
    pub breadth_cm: Option<i32>,
    #[serde(default)]
    pub height_cm: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateVariantRequest {
    pub size: Option<String>,
    pub color: Option<String>,
    pub sku: Option<String>,
    pub stock: Option<i32>,
    pub base_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    pub length_cm: Option<i32>,
    pub breadth_cm: Option<i32>,
    pub height_cm: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ImageRequest {
    pub image_url: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub category_id: Uuid,
    #[serde(default)]
    pub description: String,
    pub base_price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_best_seller: bool,
    #[serde(default)]
    pub notify_users: bool,
    #[serde(default)]
    pub weight_kg: Option<Decimal>,
    #[serde(default)]
    pub length_cm: Option<i32>,
    #[serde(default)]
    pub breadth_cm: Option<i32>,
    #[serde(default)]
    pub height_cm: Option<i32>,
    #[serde(default)]
    pub variants: Vec<VariantRequest>,
    #[serde(default)]
    pub images: Vec<ImageRequest>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub base_price: Option<Decimal>,
    /// `null` clears the sale price; omit to leave it unchanged.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Decimal>)]
    pub sale_price: Option<Option<Decimal>>,
    pub is_active: Option<bool>,
    pub is_best_seller: Option<bool>,
    pub notify_users: Option<bool>,
    pub weight_kg: Option<Decimal>,
    pub length_cm: Option<i32>,
    pub breadth_cm: Option<i32>,
    pub height_cm: Option<i32>,
    /// Replaces the image set when present.
    pub images: Option<Vec<ImageRequest>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<Decimal>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Decimal>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_price_distinguishes_null_from_missing() {
        let missing: UpdateProductRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.sale_price, None);

        let cleared: UpdateProductRequest = serde_json::from_str(r#"{"sale_price": null}"#).unwrap();
        assert_eq!(cleared.sale_price, Some(None));

        let set: UpdateProductRequest = serde_json::from_str(r#"{"sale_price": "99.50"}"#).unwrap();
        assert_eq!(set.sale_price, Some(Some(Decimal::new(9950, 2))));
    }

    #[test]
    fn color_search_accepts_pixels() {
        let req: ColorSearchRequest =
            serde_json::from_str(r#"{"pixels": [[0,0,0],[255,255,255]]}"#).unwrap();
        assert_eq!(req.pixels.map(|p| p.len()), Some(2));
    }
}
