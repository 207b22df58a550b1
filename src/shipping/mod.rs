//! Courier API client: token caching, rate estimates, shipments, returns and tracking.
//!
//! Every call is best-effort from the storefront's point of view. Callers log
//! failures and fall back (flat shipping rate, no AWB) rather than failing the
//! request, except the tracking endpoint which reports upstream errors.

pub mod client;
pub mod types;

pub use client::ShippingClient;
pub use types::{RateQuery, ShipmentItem, ShipmentOrder, Tracking};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShippingError {
    #[error("courier integration is disabled")]
    Disabled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("courier authentication failed: {0}")]
    Auth(String),

    #[error("courier rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
}
