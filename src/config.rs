use std::{env, str::FromStr};

use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub store: StoreConfig,
    pub pricing: PricingConfig,
    pub payment: PaymentConfig,
    pub shipping: ShippingConfig,
}

/// Storefront identity shown on invoices and the store info endpoint.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub name: String,
    pub domain: String,
    pub currency_symbol: String,
    pub gstin: String,
}

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub gst_rate: Decimal,
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_rate: Decimal,
    /// Fallback cost-of-goods ratio for profit estimates when items carry no cost.
    pub cogs_rate: f64,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: Option<String>,
    pub base_url: String,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct ShippingConfig {
    pub enabled: bool,
    pub email: String,
    pub password: String,
    pub pickup_location: String,
    pub channel_id: String,
    pub pickup_pin: String,
    pub base_url: String,
    pub default_unit_weight_kg: Decimal,
    pub default_dims_cm: (i32, i32, i32),
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            store: StoreConfig::from_env(),
            pricing: PricingConfig::from_env(),
            payment: PaymentConfig::from_env(),
            shipping: ShippingConfig::from_env(),
        })
    }
}

impl StoreConfig {
    fn from_env() -> Self {
        Self {
            name: var_or("STORE_NAME", "Storefront"),
            domain: var_or("SITE_DOMAIN", "localhost"),
            currency_symbol: var_or("CURRENCY_SYMBOL", "₹"),
            gstin: var_or("GSTIN", ""),
        }
    }
}

impl PricingConfig {
    fn from_env() -> Self {
        Self {
            gst_rate: parse_or("GST_RATE", Decimal::new(18, 2)),
            free_shipping_threshold: parse_or("FREE_SHIPPING_THRESHOLD", Decimal::from(399)),
            flat_shipping_rate: parse_or("FLAT_SHIPPING_RATE", Decimal::from(49)),
            cogs_rate: parse_or("COGS_RATE", 0.0),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            gst_rate: Decimal::new(18, 2),
            free_shipping_threshold: Decimal::from(399),
            flat_shipping_rate: Decimal::from(49),
            cogs_rate: 0.0,
        }
    }
}

impl PaymentConfig {
    fn from_env() -> Self {
        Self {
            key_id: var_or("RAZORPAY_KEY_ID", ""),
            key_secret: var_or("RAZORPAY_KEY_SECRET", ""),
            webhook_secret: env::var("RAZORPAY_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            base_url: var_or("RAZORPAY_BASE_URL", "https://api.razorpay.com/v1"),
            currency: var_or("PAYMENT_CURRENCY", "INR"),
        }
    }
}

impl ShippingConfig {
    fn from_env() -> Self {
        Self {
            enabled: parse_or("SHIPROCKET_ENABLED", false),
            email: var_or("SHIPROCKET_EMAIL", ""),
            password: var_or("SHIPROCKET_PASSWORD", ""),
            pickup_location: var_or("SHIPROCKET_PICKUP_LOCATION", ""),
            channel_id: var_or("SHIPROCKET_CHANNEL_ID", ""),
            pickup_pin: var_or("SHIPROCKET_PICKUP_PIN", ""),
            base_url: var_or(
                "SHIPROCKET_BASE_URL",
                "https://apiv2.shiprocket.in/v1/external",
            ),
            default_unit_weight_kg: parse_or("SHIPROCKET_DEFAULT_UNIT_WEIGHT_KG", Decimal::new(5, 1)),
            default_dims_cm: (
                parse_or("SHIPROCKET_DEFAULT_DIM_LCM", 20),
                parse_or("SHIPROCKET_DEFAULT_DIM_BCM", 15),
                parse_or("SHIPROCKET_DEFAULT_DIM_HCM", 2),
            ),
        }
    }
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            email: String::new(),
            password: String::new(),
            pickup_location: String::new(),
            channel_id: String::new(),
            pickup_pin: String::new(),
            base_url: "https://apiv2.shiprocket.in/v1/external".to_string(),
            default_unit_weight_kg: Decimal::new(5, 1),
            default_dims_cm: (20, 15, 2),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
