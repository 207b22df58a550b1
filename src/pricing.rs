//! Price, tax and parcel arithmetic shared by the cart, checkout and analytics.
//!
//! All money is `Decimal` rounded half-even to two places at each step.

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::PricingConfig;

/// Base and sale price pair as stored on products and variants.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricePoint {
    pub base_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
}

impl PricePoint {
    pub fn product(base_price: Decimal, sale_price: Option<Decimal>) -> Self {
        Self {
            base_price: Some(base_price),
            sale_price,
        }
    }

    pub fn effective(&self) -> Option<Decimal> {
        self.sale_price.or(self.base_price)
    }
}

/// Price of one unit: the variant's own price when it has one, else the product's.
pub fn unit_price(product: PricePoint, variant: Option<PricePoint>) -> Decimal {
    variant
        .and_then(|v| v.effective())
        .or_else(|| product.effective())
        .unwrap_or(Decimal::ZERO)
}

pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    round2(unit_price * Decimal::from(quantity))
}

pub fn round2(value: Decimal) -> Decimal {
    value.round_dp(2)
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct PriceSummary {
    pub subtotal: Decimal,
    pub coupon_code: Option<String>,
    pub discount_percent: i32,
    pub discount_amount: Decimal,
    pub discounted_subtotal: Decimal,
    pub gst_rate: Decimal,
    pub gst_amount: Decimal,
    pub shipping_amount: Decimal,
    pub total_amount: Decimal,
}

pub fn summarize(
    subtotal: Decimal,
    coupon: Option<(&str, i32)>,
    shipping_estimate: Option<Decimal>,
    config: &PricingConfig,
) -> PriceSummary {
    let subtotal = round2(subtotal);
    let discount_percent = coupon.map(|(_, pct)| pct.max(0)).unwrap_or(0);
    let discount_amount = round2(subtotal * Decimal::from(discount_percent) / Decimal::from(100));
    let discounted_subtotal = round2(subtotal - discount_amount).max(Decimal::ZERO);
    let gst_amount = round2(discounted_subtotal * config.gst_rate);
    let shipping_amount = shipping_fee(discounted_subtotal, shipping_estimate, config);
    let total_amount = round2(discounted_subtotal + gst_amount + shipping_amount);

    PriceSummary {
        subtotal,
        coupon_code: coupon.map(|(code, _)| code.to_string()),
        discount_percent,
        discount_amount,
        discounted_subtotal,
        gst_rate: config.gst_rate,
        gst_amount,
        shipping_amount,
        total_amount,
    }
}

pub fn shipping_fee(
    discounted_subtotal: Decimal,
    estimate: Option<Decimal>,
    config: &PricingConfig,
) -> Decimal {
    if discounted_subtotal >= config.free_shipping_threshold {
        return Decimal::ZERO;
    }
    match estimate {
        Some(rate) => round2(rate),
        None => config.flat_shipping_rate,
    }
}

/// Gateway amounts are integer minor units, truncated.
pub fn amount_minor(total: Decimal) -> i64 {
    (total * Decimal::from(100)).trunc().to_i64().unwrap_or(0)
}

/// Weight and dimensions carried by a product or variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShippingAttrs {
    pub weight_kg: Option<Decimal>,
    pub length_cm: Option<i32>,
    pub breadth_cm: Option<i32>,
    pub height_cm: Option<i32>,
}

#[derive(Debug, Clone, Copy)]
pub struct ParcelLine {
    pub quantity: i32,
    pub variant: Option<ShippingAttrs>,
    pub product: ShippingAttrs,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parcel {
    pub units: i32,
    pub weight_kg: Decimal,
    pub length_cm: i32,
    pub breadth_cm: i32,
    pub height_cm: i32,
}

impl Parcel {
    pub fn from_lines(
        lines: &[ParcelLine],
        default_unit_weight: Decimal,
        default_dims: (i32, i32, i32),
    ) -> Self {
        let (mut length, mut breadth, mut height) = default_dims;
        let mut weight = Decimal::ZERO;
        let mut units: i32 = 0;

        for line in lines {
            let variant = line.variant.unwrap_or_default();
            let unit_weight = positive_dec(variant.weight_kg)
                .or_else(|| positive_dec(line.product.weight_kg))
                .unwrap_or(default_unit_weight);
            weight += unit_weight * Decimal::from(line.quantity);
            units = units.saturating_add(line.quantity);

            let pick = |v: Option<i32>, p: Option<i32>| positive(v).or_else(|| positive(p));
            if let Some(l) = pick(variant.length_cm, line.product.length_cm) {
                length = length.max(l);
            }
            if let Some(b) = pick(variant.breadth_cm, line.product.breadth_cm) {
                breadth = breadth.max(b);
            }
            if let Some(h) = pick(variant.height_cm, line.product.height_cm) {
                height = height.max(h);
            }
        }

        Self {
            units,
            weight_kg: weight,
            length_cm: length,
            breadth_cm: breadth,
            height_cm: height,
        }
    }

    pub fn dims(&self) -> (i32, i32, i32) {
        (self.length_cm, self.breadth_cm, self.height_cm)
    }
}

fn positive(value: Option<i32>) -> Option<i32> {
    value.filter(|v| *v > 0)
}

fn positive_dec(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| *v > Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> PricingConfig {
        PricingConfig::default()
    }

    #[test]
    fn variant_price_wins_when_present() {
        let product = PricePoint::product(dec!(500), Some(dec!(450)));
        let variant = PricePoint {
            base_price: Some(dec!(520)),
            sale_price: None,
        };
        assert_eq!(unit_price(product, Some(variant)), dec!(520));
    }

    #[test]
    fn falls_back_to_product_sale_price() {
        let product = PricePoint::product(dec!(500), Some(dec!(450)));
        assert_eq!(unit_price(product, Some(PricePoint::default())), dec!(450));
        assert_eq!(unit_price(product, None), dec!(450));
    }

    #[test]
    fn summary_applies_coupon_then_gst_and_flat_shipping() {
        let summary = summarize(dec!(300), Some(("SAVE10", 10)), None, &config());
        assert_eq!(summary.discount_amount, dec!(30.00));
        assert_eq!(summary.discounted_subtotal, dec!(270.00));
        assert_eq!(summary.gst_amount, dec!(48.60));
        assert_eq!(summary.shipping_amount, dec!(49));
        assert_eq!(summary.total_amount, dec!(367.60));
        assert_eq!(summary.coupon_code.as_deref(), Some("SAVE10"));
    }

    #[test]
    fn free_shipping_at_threshold() {
        let summary = summarize(dec!(399), None, Some(dec!(80)), &config());
        assert_eq!(summary.shipping_amount, Decimal::ZERO);
        assert_eq!(summary.total_amount, dec!(470.82));
    }

    #[test]
    fn threshold_uses_discounted_subtotal() {
        let summary = summarize(dec!(400), Some(("TEN", 10)), Some(dec!(62.456)), &config());
        assert_eq!(summary.discounted_subtotal, dec!(360.00));
        assert_eq!(summary.shipping_amount, dec!(62.46));
    }

    #[test]
    fn rounding_is_half_even() {
        assert_eq!(round2(dec!(0.125)), dec!(0.12));
        assert_eq!(round2(dec!(0.135)), dec!(0.14));
    }

    #[test]
    fn amount_minor_truncates() {
        assert_eq!(amount_minor(dec!(367.60)), 36760);
        assert_eq!(amount_minor(dec!(10.999)), 1099);
    }

    #[test]
    fn parcel_prefers_variant_then_product_then_default() {
        let lines = [
            ParcelLine {
                quantity: 2,
                variant: Some(ShippingAttrs {
                    weight_kg: Some(dec!(0.3)),
                    length_cm: Some(30),
                    ..Default::default()
                }),
                product: ShippingAttrs {
                    weight_kg: Some(dec!(0.9)),
                    height_cm: Some(5),
                    ..Default::default()
                },
            },
            ParcelLine {
                quantity: 1,
                variant: None,
                product: ShippingAttrs::default(),
            },
        ];
        let parcel = Parcel::from_lines(&lines, dec!(0.5), (20, 15, 2));
        assert_eq!(parcel.weight_kg, dec!(1.1));
        assert_eq!(parcel.units, 3);
        assert_eq!(parcel.dims(), (30, 15, 5));
    }

    #[test]
    fn parcel_units_saturate_instead_of_overflowing() {
        let line = ParcelLine {
            quantity: i32::MAX,
            variant: None,
            product: ShippingAttrs::default(),
        };
        let parcel = Parcel::from_lines(&[line, line], dec!(0.5), (20, 15, 2));
        assert_eq!(parcel.units, i32::MAX);
    }
}
