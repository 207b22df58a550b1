use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        accounts::{AddressRequest, ProfileView, UpdateProfileRequest},
        admin::{AnalyticsPoint, CouponRequest, InventoryAdjustRequest, UpdateOrderStatusRequest},
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartView, GuestCartLine},
        catalog::{ColorSearchRequest, CreateProductRequest, ProductDetail},
        orders::{CheckoutRequest, CheckoutResponse, OrderWithItems, PaymentInstructions, ReturnRequestBody},
        payments::{PaymentCallback, WebhookAck},
    },
    models::{
        Address, Banner, CartLine, Category, Coupon, Notification, Order, OrderItem, Product, ProductCard,
        ReturnRequest, Review, User, Variant,
    },
    pricing::PriceSummary,
    response::Meta,
    routes::{
        account, admin, auth, cart, catalog, content, health, notifications, orders, params, payments, products,
        promotions, wishlist,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Storefront API", description = "Apparel storefront: catalog, cart, checkout, payments and admin"),
    paths(
        health::health_check,
        auth::register,
        auth::login,
        account::get_profile,
        account::update_profile,
        account::delete_account,
        account::list_addresses,
        account::create_address,
        account::update_address,
        account::delete_address,
        account::make_default,
        catalog::home,
        catalog::list_categories,
        catalog::category_detail,
        catalog::list_products,
        catalog::product_detail,
        catalog::search,
        catalog::search_by_color,
        catalog::list_reviews,
        catalog::upsert_review,
        content::store_info,
        content::list_banners,
        content::subscribe,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        wishlist::move_to_cart,
        cart::view_cart,
        cart::cart_count,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        cart::save_for_later,
        cart::merge_cart,
        cart::apply_coupon,
        cart::remove_coupon,
        orders::preview,
        orders::checkout,
        orders::list_orders,
        orders::get_order,
        orders::invoice,
        orders::tracking,
        orders::support,
        orders::request_return,
        orders::quick_return,
        payments::callback,
        payments::webhook,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read,
        admin::summary,
        admin::analytics,
        admin::analytics_csv,
        admin::list_orders,
        admin::get_order,
        admin::update_order_status,
        admin::delete_order,
        admin::create_shipment,
        admin::low_stock,
        admin::adjust_inventory,
        admin::list_users,
        admin::users_csv,
        admin::user_detail,
        admin::toggle_staff,
        admin::toggle_active,
        products::create_category,
        products::update_category,
        products::delete_category,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::create_variant,
        products::update_variant,
        products::delete_variant,
        promotions::list_coupons,
        promotions::create_coupon,
        promotions::update_coupon,
        promotions::delete_coupon,
        promotions::list_banners,
        promotions::create_banner,
        promotions::update_banner,
        promotions::delete_banner
    ),
    components(
        schemas(
            User,
            Address,
            Category,
            Product,
            ProductCard,
            Variant,
            CartLine,
            Coupon,
            Order,
            OrderItem,
            ReturnRequest,
            Review,
            Notification,
            Banner,
            PriceSummary,
            Meta,
            params::Pagination,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            ProfileView,
            UpdateProfileRequest,
            AddressRequest,
            ProductDetail,
            ColorSearchRequest,
            CreateProductRequest,
            AddToCartRequest,
            GuestCartLine,
            CartView,
            CheckoutRequest,
            CheckoutResponse,
            PaymentInstructions,
            OrderWithItems,
            ReturnRequestBody,
            PaymentCallback,
            WebhookAck,
            UpdateOrderStatusRequest,
            InventoryAdjustRequest,
            CouponRequest,
            AnalyticsPoint
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Account", description = "Profile, addresses and account deletion"),
        (name = "Catalog", description = "Public catalog browsing and search"),
        (name = "Reviews", description = "Product reviews"),
        (name = "Content", description = "Store info, banners and newsletter"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Checkout", description = "Checkout preview and order placement"),
        (name = "Orders", description = "Order history, invoices, tracking and returns"),
        (name = "Payments", description = "Payment gateway callback and webhook"),
        (name = "Notifications", description = "In-app notifications"),
        (name = "Admin", description = "Dashboard, orders, inventory and users"),
        (name = "Admin Catalog", description = "Category, product and variant management"),
        (name = "Admin Promotions", description = "Coupons and banners"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_core_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/api/checkout", "/api/payments/webhook", "/api/admin/analytics.csv", "/health"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemes = doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
