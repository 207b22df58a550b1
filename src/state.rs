use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn},
    payments::PaymentGateway,
    shipping::ShippingClient,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub payments: PaymentGateway,
    pub shipping: ShippingClient,
}

impl AppState {
    pub fn new(pool: DbPool, orm: OrmConn, config: AppConfig) -> Self {
        let payments = PaymentGateway::new(config.payment.clone());
        let shipping = ShippingClient::new(config.shipping.clone());
        Self {
            pool,
            orm,
            config: Arc::new(config),
            payments,
            shipping,
        }
    }
}
