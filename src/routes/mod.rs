use axum::Router;

use crate::state::AppState;

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod content;
pub mod doc;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod params;
pub mod payments;
pub mod products;
pub mod promotions;
pub mod wishlist;

// State is attached by the caller.
pub fn create_api_router() -> Router<AppState> {
    let admin = admin::router()
        .merge(products::router())
        .merge(promotions::router());

    Router::new()
        .nest("/auth", auth::router())
        .nest("/account", account::router())
        .nest("/catalog", catalog::router())
        .nest("/content", content::router())
        .nest("/wishlist", wishlist::router())
        .nest("/cart", cart::router())
        .nest("/checkout", orders::checkout_router())
        .nest("/orders", orders::router())
        .nest("/payments", payments::router())
        .nest("/notifications", notifications::router())
        .nest("/admin", admin)
}
