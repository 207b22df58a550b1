pub mod accounts;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod content;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod reviews;
pub mod wishlist;
