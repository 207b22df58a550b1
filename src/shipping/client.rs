use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::instrument;

use super::{
    ShippingError,
    types::{RateQuery, ShipmentOrder, Tracking, as_text, cheapest_rate, field, normalize_tracking},
};
use crate::config::ShippingConfig;

/// Tokens live for ten minutes upstream; refresh a minute early.
const TOKEN_TTL: Duration = Duration::from_secs(9 * 60);

#[derive(Clone)]
pub struct ShippingClient {
    inner: Arc<ShippingClientInner>,
}

struct ShippingClientInner {
    client: reqwest::Client,
    config: ShippingConfig,
    /// In-memory token cache
    token: RwLock<Option<CachedToken>>,
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

impl ShippingClient {
    pub fn new(config: ShippingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            inner: Arc::new(ShippingClientInner {
                client,
                config,
                token: RwLock::new(None),
            }),
        }
    }

    pub fn enabled(&self) -> bool {
        let cfg = &self.inner.config;
        cfg.enabled && !cfg.email.is_empty() && !cfg.password.is_empty() && !cfg.pickup_location.is_empty()
    }

    pub fn config(&self) -> &ShippingConfig {
        &self.inner.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.config.base_url.trim_end_matches('/'), path)
    }

    /// Return the cached token, logging in again once it has expired.
    #[instrument(skip(self))]
    pub async fn token(&self) -> Result<String, ShippingError> {
        if let Some(cached) = self.inner.token.read().await.as_ref()
            && cached.expires_at > Instant::now()
        {
            return Ok(cached.value.clone());
        }

        let mut guard = self.inner.token.write().await;
        if let Some(cached) = guard.as_ref()
            && cached.expires_at > Instant::now()
        {
            return Ok(cached.value.clone());
        }

        let cfg = &self.inner.config;
        let response = self
            .inner
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": cfg.email, "password": cfg.password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ShippingError::Auth(format!("login returned {}", response.status())));
        }
        let body: LoginResponse = response.json().await?;
        let value = body
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ShippingError::Auth("token missing".into()))?;

        *guard = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + TOKEN_TTL,
        });
        tracing::debug!("courier token refreshed");
        Ok(value)
    }

    pub async fn clear_token(&self) {
        *self.inner.token.write().await = None;
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, ShippingError> {
        let token = self.token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShippingError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<Value, ShippingError> {
        self.send(self.inner.client.post(self.url(path)).json(payload)).await
    }

    /// Cheapest rate for the parcel, or `None` when no quote is available.
    #[instrument(skip(self, query), fields(drop_pin = %query.delivery_postcode))]
    pub async fn estimate(&self, query: &RateQuery) -> Result<Option<Decimal>, ShippingError> {
        let pickup_pin = &self.inner.config.pickup_pin;
        if !self.enabled() || pickup_pin.is_empty() || query.delivery_postcode.is_empty() {
            return Ok(None);
        }
        let body = self
            .post("/courier/serviceability/", &query.payload(pickup_pin))
            .await?;
        Ok(cheapest_rate(&body))
    }

    async fn assign_awb(&self, shipment_id: &Value) -> Result<Option<String>, ShippingError> {
        let body = self
            .post("/courier/assign/awb", &json!({ "shipment_id": shipment_id }))
            .await?;
        Ok(field(&body, "awb_code").and_then(as_text))
    }

    /// Create the courier order and assign an AWB. Returns the AWB when assigned.
    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    pub async fn create_shipment(&self, order: &ShipmentOrder) -> Result<Option<String>, ShippingError> {
        if !self.enabled() {
            return Err(ShippingError::Disabled);
        }
        let cfg = &self.inner.config;
        let body = self
            .post(
                "/orders/create/adhoc",
                &order.adhoc_payload(&cfg.pickup_location, &cfg.channel_id),
            )
            .await?;
        let Some(shipment_id) = field(&body, "shipment_id").cloned() else {
            tracing::warn!(response = %body, "courier order created without shipment_id");
            return Ok(None);
        };
        self.assign_awb(&shipment_id).await
    }

    /// Book a reverse pickup for the given items. Returns the return AWB when assigned.
    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    pub async fn create_return(&self, order: &ShipmentOrder) -> Result<Option<String>, ShippingError> {
        if !self.enabled() {
            return Err(ShippingError::Disabled);
        }
        let cfg = &self.inner.config;
        let body = self
            .post(
                "/orders/create/return",
                &order.return_payload(&cfg.pickup_location, &cfg.pickup_pin),
            )
            .await?;
        if let Some(awb) = field(&body, "awb_code").and_then(as_text) {
            return Ok(Some(awb));
        }
        match field(&body, "shipment_id").cloned() {
            Some(shipment_id) => self.assign_awb(&shipment_id).await,
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    pub async fn track(&self, awb: &str) -> Result<Option<Tracking>, ShippingError> {
        if !self.enabled() || awb.is_empty() {
            return Ok(None);
        }
        let request = self
            .inner
            .client
            .get(self.url(&format!("/courier/track/awb/{awb}")));
        let body = self.send(request).await?;
        Ok(Some(normalize_tracking(&body)))
    }
}
