use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::PaymentError;
use crate::config::PaymentConfig;

#[derive(Clone)]
pub struct PaymentGateway {
    inner: Arc<PaymentGatewayInner>,
}

struct PaymentGatewayInner {
    client: reqwest::Client,
    config: PaymentConfig,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// Order object returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl PaymentGateway {
    pub fn new(config: PaymentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            inner: Arc::new(PaymentGatewayInner { client, config }),
        }
    }

    pub fn config(&self) -> &PaymentConfig {
        &self.inner.config
    }

    pub fn key_id(&self) -> &str {
        &self.inner.config.key_id
    }

    pub fn currency(&self) -> &str {
        &self.inner.config.currency
    }

    pub fn is_configured(&self) -> bool {
        !self.inner.config.key_id.is_empty() && !self.inner.config.key_secret.is_empty()
    }

    /// Create a gateway order for `amount_minor` (paise) tagged with our receipt.
    #[instrument(skip(self), fields(receipt = %receipt))]
    pub async fn create_order(&self, amount_minor: i64, receipt: &str) -> Result<GatewayOrder, PaymentError> {
        if !self.is_configured() {
            return Err(PaymentError::NotConfigured);
        }
        let cfg = &self.inner.config;
        let url = format!("{}/orders", cfg.base_url.trim_end_matches('/'));

        let response = self
            .inner
            .client
            .post(url)
            .basic_auth(&cfg.key_id, Some(&cfg.key_secret))
            .json(&CreateOrderBody {
                amount: amount_minor,
                currency: &cfg.currency,
                receipt,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "gateway order creation rejected");
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<GatewayOrder>().await?)
    }

    pub fn verify_payment(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        super::verify_payment_signature(&self.inner.config.key_secret, order_id, payment_id, signature)
    }

    /// Webhooks are only authenticated when a secret is configured.
    pub fn verify_webhook(&self, body: &[u8], signature: Option<&str>) -> bool {
        match self.inner.config.webhook_secret.as_deref() {
            None => true,
            Some(secret) => signature
                .is_some_and(|sig| super::verify_webhook_signature(secret, body, sig)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> PaymentConfig {
        PaymentConfig {
            key_id: "rzp_test_key".into(),
            key_secret: "secret".into(),
            webhook_secret: None,
            base_url,
            currency: "INR".into(),
        }
    }

    #[tokio::test]
    async fn creates_order_with_amount_and_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(header_exists("authorization"))
            .and(body_json(serde_json::json!({
                "amount": 36760,
                "currency": "INR",
                "receipt": "A1B2C3D4E5"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "order_123",
                "amount": 36760,
                "currency": "INR",
                "receipt": "A1B2C3D4E5",
                "status": "created"
            })))
            .mount(&server)
            .await;

        let gateway = PaymentGateway::new(config(server.uri()));
        let order = gateway.create_order(36760, "A1B2C3D4E5").await.unwrap();
        assert_eq!(order.id, "order_123");
        assert_eq!(order.amount, 36760);
    }

    #[tokio::test]
    async fn surfaces_rejections() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let gateway = PaymentGateway::new(config(server.uri()));
        let err = gateway.create_order(100, "R").await.unwrap_err();
        assert!(matches!(err, PaymentError::Rejected { status: 401, .. }));
    }

    #[tokio::test]
    async fn refuses_without_keys() {
        let mut cfg = config("http://localhost".into());
        cfg.key_secret.clear();
        let gateway = PaymentGateway::new(cfg);
        assert!(matches!(
            gateway.create_order(100, "R").await,
            Err(PaymentError::NotConfigured)
        ));
    }

    #[test]
    fn webhook_accepted_without_secret() {
        let gateway = PaymentGateway::new(config("http://localhost".into()));
        assert!(gateway.verify_webhook(b"{}", None));
    }

    #[test]
    fn webhook_requires_signature_with_secret() {
        let mut cfg = config("http://localhost".into());
        cfg.webhook_secret = Some("whsec".into());
        let gateway = PaymentGateway::new(cfg);
        assert!(!gateway.verify_webhook(b"{}", None));
        let sig = crate::payments::signature::sign("whsec", b"{}");
        assert!(gateway.verify_webhook(b"{}", Some(&sig)));
    }
}
