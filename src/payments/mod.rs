//! Payment gateway integration.
//!
//! Orders are created over the gateway's REST API with basic auth, and
//! callbacks/webhooks are authenticated with HMAC-SHA256 signatures.

pub mod client;
pub mod signature;

pub use client::{GatewayOrder, PaymentGateway};
pub use signature::{verify_payment_signature, verify_webhook_signature};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment gateway keys are not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
}
