use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

use crate::pricing::Parcel;

#[derive(Debug, Clone)]
pub struct RateQuery {
    pub delivery_postcode: String,
    pub cod: bool,
    pub declared_value: Option<Decimal>,
    pub parcel: Parcel,
}

#[derive(Debug, Clone)]
pub struct ShipmentItem {
    pub name: String,
    pub sku: String,
    pub units: i32,
    pub selling_price: Decimal,
}

/// Order snapshot sent to the courier for forward shipments and returns.
#[derive(Debug, Clone)]
pub struct ShipmentOrder {
    pub order_number: String,
    pub order_date: DateTime<Utc>,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub prepaid: bool,
    pub items: Vec<ShipmentItem>,
    pub parcel: Parcel,
}

/// Normalized tracking response.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct Tracking {
    pub status: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub events: Vec<Value>,
}

fn money(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

impl ShipmentItem {
    fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "sku": self.sku,
            "units": self.units,
            "selling_price": money(self.selling_price),
        })
    }
}

impl ShipmentOrder {
    fn address(&self) -> String {
        format!("{} {}", self.address_line1, self.address_line2)
            .trim()
            .to_string()
    }

    fn country_or_default(&self) -> &str {
        if self.country.is_empty() { "India" } else { &self.country }
    }

    fn items_json(&self) -> Vec<Value> {
        self.items.iter().map(ShipmentItem::to_json).collect()
    }

    pub fn sub_total(&self) -> Decimal {
        self.items
            .iter()
            .map(|i| i.selling_price * Decimal::from(i.units))
            .sum()
    }

    pub(crate) fn adhoc_payload(&self, pickup_location: &str, channel_id: &str) -> Value {
        let mut payload = json!({
            "order_id": self.order_number,
            "order_date": self.order_date.format("%Y-%m-%d %H:%M").to_string(),
            "pickup_location": pickup_location,
            "billing_customer_name": self.customer_name,
            "billing_last_name": "",
            "billing_address": self.address(),
            "billing_city": self.city,
            "billing_pincode": self.postal_code,
            "billing_state": self.state,
            "billing_country": self.country_or_default(),
            "billing_email": self.email,
            "billing_phone": self.phone,
            "shipping_is_billing": true,
            "order_items": self.items_json(),
            "payment_method": if self.prepaid { "Prepaid" } else { "COD" },
            "sub_total": money(self.sub_total()),
            "length": self.parcel.length_cm,
            "breadth": self.parcel.breadth_cm,
            "height": self.parcel.height_cm,
            "weight": money(self.parcel.weight_kg),
        });
        if !channel_id.is_empty() {
            payload["channel_id"] = json!(channel_id);
        }
        payload
    }

    /// Reverse pickup: the customer address is the pickup, the warehouse the drop.
    pub(crate) fn return_payload(&self, pickup_location: &str, pickup_pin: &str) -> Value {
        let warehouse = if pickup_location.is_empty() { "Warehouse" } else { pickup_location };
        json!({
            "order_id": format!("RET-{}", self.order_number),
            "order_date": self.order_date.format("%Y-%m-%d %H:%M").to_string(),
            "pickup_customer_name": self.customer_name,
            "pickup_last_name": "",
            "pickup_address": self.address(),
            "pickup_city": self.city,
            "pickup_pincode": self.postal_code,
            "pickup_state": self.state,
            "pickup_country": self.country_or_default(),
            "pickup_email": self.email,
            "pickup_phone": self.phone,
            "pickup_isd_code": "91",
            "delivery_customer_name": warehouse,
            "delivery_last_name": "",
            "delivery_address": pickup_location,
            "delivery_city": "",
            "delivery_pincode": pickup_pin,
            "delivery_state": "",
            "delivery_country": "India",
            "delivery_email": self.email,
            "delivery_phone": self.phone,
            "order_items": self.items_json(),
            "length": self.parcel.length_cm,
            "breadth": self.parcel.breadth_cm,
            "height": self.parcel.height_cm,
            "weight": money(self.parcel.weight_kg),
        })
    }
}

impl RateQuery {
    pub(crate) fn payload(&self, pickup_pin: &str) -> Value {
        let mut payload = json!({
            "pickup_postcode": pickup_pin,
            "delivery_postcode": self.delivery_postcode,
            "weight": money(self.parcel.weight_kg),
            "cod": if self.cod { 1 } else { 0 },
            "length": self.parcel.length_cm,
            "breadth": self.parcel.breadth_cm,
            "height": self.parcel.height_cm,
        });
        if let Some(value) = self.declared_value {
            payload["declared_value"] = json!(money(value));
        }
        payload
    }
}

/// Look a key up at the top level, then under `data`.
pub(crate) fn field<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.get(key)
        .filter(|v| !v.is_null())
        .or_else(|| body.get("data").and_then(|d| d.get(key)).filter(|v| !v.is_null()))
}

pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Cheapest quoted rate across the available courier companies.
pub(crate) fn cheapest_rate(body: &Value) -> Option<Decimal> {
    let companies = field(body, "available_courier_companies")?.as_array()?;
    companies
        .iter()
        .filter_map(|company| {
            ["rate", "freight_charge", "total_amount"]
                .iter()
                .find_map(|key| company.get(*key).and_then(as_decimal))
        })
        .min()
}

pub(crate) fn normalize_tracking(body: &Value) -> Tracking {
    let track = body
        .get("tracking_data")
        .filter(|v| v.is_object())
        .unwrap_or(body);
    let status = track
        .get("shipment_status")
        .filter(|v| !v.is_null())
        .or_else(|| track.get("current_status"))
        .and_then(as_text);
    let events = track
        .get("shipment_track")
        .and_then(Value::as_array)
        .or_else(|| track.get("scan").and_then(Value::as_array))
        .cloned()
        .unwrap_or_default();
    Tracking { status, events }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn picks_cheapest_rate_with_fallback_fields() {
        let body = json!({
            "data": {
                "available_courier_companies": [
                    { "rate": 72.5 },
                    { "freight_charge": "65.00" },
                    { "total_amount": 90 },
                    { "name": "no price" }
                ]
            }
        });
        assert_eq!(cheapest_rate(&body), Some(dec!(65.00)));
    }

    #[test]
    fn no_companies_means_no_rate() {
        assert_eq!(cheapest_rate(&json!({ "data": {} })), None);
        assert_eq!(
            cheapest_rate(&json!({ "available_courier_companies": [] })),
            None
        );
    }

    #[test]
    fn awb_found_at_top_level_or_nested() {
        let top = json!({ "awb_code": "AWB1" });
        let nested = json!({ "data": { "awb_code": 12345 } });
        assert_eq!(field(&top, "awb_code").and_then(as_text).as_deref(), Some("AWB1"));
        assert_eq!(field(&nested, "awb_code").and_then(as_text).as_deref(), Some("12345"));
    }

    #[test]
    fn tracking_normalizes_nested_payload() {
        let body = json!({
            "tracking_data": {
                "shipment_status": "In Transit",
                "shipment_track": [{ "activity": "Picked up" }]
            }
        });
        let tracking = normalize_tracking(&body);
        assert_eq!(tracking.status.as_deref(), Some("In Transit"));
        assert_eq!(tracking.events.len(), 1);
    }

    #[test]
    fn tracking_falls_back_to_current_status_and_scan() {
        let body = json!({ "current_status": "Delivered", "scan": [{}, {}] });
        let tracking = normalize_tracking(&body);
        assert_eq!(tracking.status.as_deref(), Some("Delivered"));
        assert_eq!(tracking.events.len(), 2);
    }
}
