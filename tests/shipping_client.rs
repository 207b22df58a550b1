use axum_storefront_api::{
    config::ShippingConfig,
    pricing::Parcel,
    shipping::{RateQuery, ShipmentItem, ShipmentOrder, ShippingClient, ShippingError},
};
use chrono::Utc;
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(base_url: String) -> ShippingConfig {
    ShippingConfig {
        enabled: true,
        email: "ops@example.com".into(),
        password: "secret".into(),
        pickup_location: "Primary".into(),
        pickup_pin: "110001".into(),
        base_url,
        ..ShippingConfig::default()
    }
}

fn parcel() -> Parcel {
    Parcel {
        units: 2,
        weight_kg: dec!(1.0),
        length_cm: 20,
        breadth_cm: 15,
        height_cm: 4,
    }
}

fn shipment() -> ShipmentOrder {
    ShipmentOrder {
        order_number: "A1B2C3D4E5".into(),
        order_date: Utc::now(),
        customer_name: "Asha Rao".into(),
        email: "asha@example.com".into(),
        phone: "9999999999".into(),
        address_line1: "12 MG Road".into(),
        address_line2: String::new(),
        city: "Bengaluru".into(),
        state: "Karnataka".into(),
        postal_code: "560001".into(),
        country: String::new(),
        prepaid: true,
        items: vec![ShipmentItem {
            name: "Classic Crew Tee - M/Black".into(),
            sku: "TEE-M-BLK".into(),
            units: 2,
            selling_price: dec!(599),
        }],
        parcel: parcel(),
    }
}

async fn mount_login(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok_1" })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn token_is_cached_between_calls() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/courier/serviceability/"))
        .and(header("authorization", "Bearer tok_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "available_courier_companies": [
                { "rate": 95.0 },
                { "freight_charge": 72.5 },
                { "total_amount": 110 }
            ] }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = ShippingClient::new(config(server.uri()));
    let query = RateQuery {
        delivery_postcode: "560001".into(),
        cod: false,
        declared_value: Some(dec!(1198)),
        parcel: parcel(),
    };

    let first = client.estimate(&query).await.expect("estimate");
    let second = client.estimate(&query).await.expect("estimate");
    assert_eq!(first, Some(dec!(72.5)));
    assert_eq!(second, first);
}

#[tokio::test]
async fn shipment_assigns_awb_after_adhoc_order() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/orders/create/adhoc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "order_id": 881, "shipment_id": 9001 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/courier/assign/awb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "awb_assign_status": 1,
            "response": { "data": {} },
            "data": { "awb_code": "AWB123456" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ShippingClient::new(config(server.uri()));
    let awb = client.create_shipment(&shipment()).await.expect("shipment");
    assert_eq!(awb.as_deref(), Some("AWB123456"));
}

#[tokio::test]
async fn return_uses_awb_from_response() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/orders/create/return"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "awb_code": "RET777" })))
        .mount(&server)
        .await;

    let client = ShippingClient::new(config(server.uri()));
    let awb = client.create_return(&shipment()).await.expect("return");
    assert_eq!(awb.as_deref(), Some("RET777"));
}

#[tokio::test]
async fn tracking_is_normalized() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/courier/track/awb/AWB123456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tracking_data": {
                "shipment_status": "In Transit",
                "shipment_track": [{ "current_status": "Picked up" }]
            }
        })))
        .mount(&server)
        .await;

    let client = ShippingClient::new(config(server.uri()));
    let tracking = client.track("AWB123456").await.expect("track").expect("tracking");
    assert_eq!(tracking.status.as_deref(), Some("In Transit"));
    assert_eq!(tracking.events.len(), 1);
}

#[tokio::test]
async fn rejected_login_surfaces_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = ShippingClient::new(config(server.uri()));
    let err = client.create_shipment(&shipment()).await.unwrap_err();
    assert!(matches!(err, ShippingError::Auth(_)));
}

#[tokio::test]
async fn disabled_client_skips_network() {
    let client = ShippingClient::new(ShippingConfig::default());
    assert!(!client.enabled());
    assert!(client.track("AWB1").await.expect("track").is_none());
    assert!(matches!(
        client.create_shipment(&shipment()).await,
        Err(ShippingError::Disabled)
    ));
}
