use axum_storefront_api::{
    config::{AppConfig, PaymentConfig, PricingConfig, ShippingConfig, StoreConfig},
    db::{create_orm_conn, run_migrations},
    dto::{
        accounts::AddressRequest,
        admin::{InventoryAdjustRequest, UpdateOrderStatusRequest},
        cart::{AddToCartRequest, ApplyCouponRequest},
        orders::{CheckoutRequest, PreviewRequest, QuickReturnRequest, ReturnLine, ReturnRequestBody},
        payments::PaymentCallback,
        wishlist::AddWishlistRequest,
    },
    entity::{
        Orders, Products, Variants, categories::ActiveModel as CategoryActive,
        coupons::ActiveModel as CouponActive, products::ActiveModel as ProductActive,
        products::Column as ProductCol, users::ActiveModel as UserActive, variants::ActiveModel as VariantActive,
    },
    error::AppError,
    middleware::auth::{AuthUser, ROLE_ADMIN, ROLE_USER, authenticate},
    payments::signature::sign,
    routes::params::{AnalyticsQuery, LowStockQuery},
    services::{
        account_service, admin_service, analytics_service, auth_service, cart_service, order_service, payment_service,
        product_service, return_service, wishlist_service,
    },
    state::AppState,
};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY_SECRET: &str = "rzp_secret";
const WEBHOOK_SECRET: &str = "whsec_test";

fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests.");
            None
        }
    }
}

const JWT_SECRET: &str = "test-secret";

fn test_config(database_url: &str, gateway_url: String, shipping: ShippingConfig) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: JWT_SECRET.into(),
        store: StoreConfig {
            name: "Test Store".into(),
            domain: "localhost".into(),
            currency_symbol: "₹".into(),
            gstin: "29ABCDE1234F1Z5".into(),
        },
        pricing: PricingConfig::default(),
        payment: PaymentConfig {
            key_id: "rzp_test_key".into(),
            key_secret: KEY_SECRET.into(),
            webhook_secret: Some(WEBHOOK_SECRET.into()),
            base_url: gateway_url,
            currency: "INR".into(),
        },
        shipping,
    }
}

async fn setup_state(database_url: &str, gateway_url: String) -> anyhow::Result<AppState> {
    setup_state_with_courier(database_url, gateway_url, ShippingConfig::default()).await
}

async fn setup_state_with_courier(
    database_url: &str,
    gateway_url: String,
    shipping: ShippingConfig,
) -> anyhow::Result<AppState> {
    let (pool, orm) = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;
    Ok(AppState::new(pool, orm, test_config(database_url, gateway_url, shipping)))
}

fn tag() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

async fn create_user(state: &AppState, role: &str) -> anyhow::Result<AuthUser> {
    let suffix = tag();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(format!("{role}-{suffix}@example.com")),
        username: Set(format!("{role}_{suffix}")),
        password_hash: Set("dummy".into()),
        full_name: Set("Test Person".into()),
        role: Set(role.into()),
        is_active: Set(true),
        created_at: NotSet,
        last_login: Set(None),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

/// One active product with a single M/Black variant holding `stock` units.
async fn create_variant_product(state: &AppState, stock: i32) -> anyhow::Result<(Uuid, Uuid)> {
    let suffix = tag();
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Tees {suffix}")),
        slug: Set(format!("tees-{suffix}")),
        is_display: Set(true),
        thumbnail_url: Set(String::new()),
    }
    .insert(&state.orm)
    .await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Crew Tee {suffix}")),
        slug: Set(format!("crew-tee-{suffix}")),
        category_id: Set(category.id),
        description: Set("Heavyweight cotton".into()),
        base_price: Set(dec!(799)),
        sale_price: Set(Some(dec!(599))),
        is_active: Set(true),
        is_best_seller: Set(false),
        notify_users: Set(false),
        weight_kg: Set(None),
        length_cm: Set(None),
        breadth_cm: Set(None),
        height_cm: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let variant = VariantActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        size: Set("M".into()),
        color: Set("Black".into()),
        sku: Set(format!("TEE-{suffix}-M-BLK").to_uppercase()),
        stock: Set(stock),
        base_price: Set(None),
        sale_price: Set(None),
        cost_price: Set(Some(dec!(250))),
        weight_kg: Set(None),
        length_cm: Set(None),
        breadth_cm: Set(None),
        height_cm: Set(None),
    }
    .insert(&state.orm)
    .await?;

    Ok((product.id, variant.id))
}

async fn add_variant(state: &AppState, product_id: Uuid, size: &str, stock: i32) -> anyhow::Result<Uuid> {
    let variant = VariantActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        size: Set(size.into()),
        color: Set("Black".into()),
        sku: Set(format!("TEE-{}-{size}-BLK", tag()).to_uppercase()),
        stock: Set(stock),
        base_price: Set(None),
        sale_price: Set(None),
        cost_price: Set(None),
        weight_kg: Set(None),
        length_cm: Set(None),
        breadth_cm: Set(None),
        height_cm: Set(None),
    }
    .insert(&state.orm)
    .await?;
    Ok(variant.id)
}

async fn create_coupon(
    state: &AppState,
    active: bool,
    valid_to: Option<chrono::DateTime<Utc>>,
) -> anyhow::Result<String> {
    let code = format!("T{}", tag()).to_uppercase();
    CouponActive {
        id: Set(Uuid::new_v4()),
        code: Set(code.clone()),
        description: Set("Test offer".into()),
        discount_percent: Set(10),
        active: Set(active),
        notify_users: Set(false),
        valid_from: Set(None),
        valid_to: Set(valid_to.map(Into::into)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(code)
}

async fn place_cod_order(state: &AppState, shopper: &AuthUser) -> anyhow::Result<(Uuid, String)> {
    let placed = order_service::checkout(state, shopper, checkout_request("cod"))
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("checkout returned no data"))?;
    Ok((placed.order.id, placed.order.order_number))
}

async fn mark_delivered(state: &AppState, admin: &AuthUser, order_id: Uuid) -> anyhow::Result<()> {
    admin_service::update_order_status(
        state,
        admin,
        order_id,
        UpdateOrderStatusRequest {
            status: "delivered".into(),
        },
    )
    .await?;
    Ok(())
}

async fn add_address(state: &AppState, user: &AuthUser) -> anyhow::Result<()> {
    account_service::create_address(
        state,
        user,
        AddressRequest {
            full_name: "Asha Rao".into(),
            phone: "9999999999".into(),
            address_line1: "12 MG Road".into(),
            address_line2: String::new(),
            city: "Bengaluru".into(),
            state: "Karnataka".into(),
            postal_code: "560001".into(),
            country: None,
            is_default: true,
        },
    )
    .await?;
    Ok(())
}

async fn add_to_cart(state: &AppState, user: &AuthUser, product_id: Uuid, quantity: i32) -> anyhow::Result<()> {
    cart_service::add_item(
        state,
        user,
        AddToCartRequest {
            product_id,
            size: Some("M".into()),
            color: Some("Black".into()),
            quantity: Some(quantity),
        },
    )
    .await?;
    Ok(())
}

async fn stock_of(state: &AppState, variant_id: Uuid) -> anyhow::Result<i32> {
    let variant = Variants::find_by_id(variant_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("variant vanished"))?;
    Ok(variant.stock)
}

fn checkout_request(method: &str) -> CheckoutRequest {
    CheckoutRequest {
        address_id: None,
        payment_method: method.into(),
        merge_items: Vec::new(),
        buy_now: None,
        selected_item_ids: None,
    }
}

// COD checkout debits stock at once; a shortfall rolls the order back; admin
// moves it to delivered and the shopper files a quick return.
#[tokio::test]
async fn cod_checkout_stock_and_return_flow() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, "http://127.0.0.1:9".into()).await?;

    let shopper = create_user(&state, ROLE_USER).await?;
    let admin = create_user(&state, ROLE_ADMIN).await?;
    let (product_id, variant_id) = create_variant_product(&state, 3).await?;
    add_address(&state, &shopper).await?;

    let empty = order_service::checkout(&state, &shopper, checkout_request("cod")).await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))), "empty cart must be rejected");

    add_to_cart(&state, &shopper, product_id, 2).await?;
    let preview = order_service::preview(&state, &shopper, PreviewRequest::default())
        .await?
        .data
        .expect("preview");
    assert_eq!(preview.units, 2);
    assert_eq!(preview.summary.subtotal, dec!(1198));

    let bad_method = order_service::checkout(&state, &shopper, checkout_request("cheque")).await;
    assert!(matches!(bad_method, Err(AppError::BadRequest(_))));

    let placed = order_service::checkout(&state, &shopper, checkout_request("cod")).await?;
    assert!(placed.message.starts_with("COD order placed"));
    let placed = placed.data.expect("checkout data");
    assert!(placed.payment.is_none());
    assert_eq!(placed.order.status, "created");
    assert!(placed.order.stock_debited);
    assert_eq!(placed.order.total_amount, preview.summary.total_amount);
    assert_eq!(placed.items.len(), 1);
    assert_eq!(stock_of(&state, variant_id).await?, 1);

    let count = cart_service::cart_count(&state, &shopper).await?.data.expect("count");
    assert_eq!(count.count, 0);

    // Only one unit left: the second order must fail without side effects.
    add_to_cart(&state, &shopper, product_id, 2).await?;
    let short = order_service::checkout(&state, &shopper, checkout_request("cod")).await;
    assert!(matches!(short, Err(AppError::BadRequest(_))));
    assert_eq!(stock_of(&state, variant_id).await?, 1);
    let count = cart_service::cart_count(&state, &shopper).await?.data.expect("count");
    assert_eq!(count.count, 2);

    let early = return_service::quick_return(
        &state,
        &shopper,
        &placed.order.order_number,
        QuickReturnRequest::default(),
    )
    .await;
    assert!(matches!(early, Err(AppError::BadRequest(_))));

    let forbidden = admin_service::summary(&state, &shopper).await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    let invalid = admin_service::update_order_status(
        &state,
        &admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "teleported".into(),
        },
    )
    .await;
    assert!(matches!(invalid, Err(AppError::BadRequest(_))));

    let delivered = admin_service::update_order_status(
        &state,
        &admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "delivered".into(),
        },
    )
    .await?;
    assert_eq!(delivered.data.expect("order").status, "delivered");

    let returned = return_service::quick_return(
        &state,
        &shopper,
        &placed.order.order_number,
        QuickReturnRequest::default(),
    )
    .await?;
    // Courier is disabled, so the request is only recorded.
    assert_eq!(returned.message, "Request recorded. We'll schedule a pickup soon.");
    let request = returned.data.expect("return request");
    assert_eq!(request.kind, "return");
    assert_eq!(request.status, "requested");
    assert_eq!(request.items.len(), 1);
    assert_eq!(request.items[0].quantity, 2);

    let low = admin_service::low_stock(
        &state,
        &admin,
        LowStockQuery {
            threshold: Some(5),
            page: Some(1),
            per_page: Some(100),
        },
    )
    .await?;
    let low = low.data.expect("low stock");
    assert!(
        low.items.iter().any(|v| v.variant_id == variant_id),
        "expected variant to appear in low-stock list"
    );

    Ok(())
}

// Razorpay checkout leaves stock alone until the signed webhook arrives;
// replays and late callbacks are no-ops.
#[tokio::test]
async fn razorpay_webhook_marks_order_paid_once() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let gateway = MockServer::start().await;
    let gateway_order_id = format!("order_{}", tag());
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": gateway_order_id,
            "amount": 100,
            "currency": "INR",
            "status": "created"
        })))
        .mount(&gateway)
        .await;

    let state = setup_state(&database_url, gateway.uri()).await?;
    let shopper = create_user(&state, ROLE_USER).await?;
    let (product_id, variant_id) = create_variant_product(&state, 3).await?;
    add_address(&state, &shopper).await?;
    add_to_cart(&state, &shopper, product_id, 2).await?;

    let placed = order_service::checkout(&state, &shopper, checkout_request("razorpay"))
        .await?
        .data
        .expect("checkout data");
    let payment = placed.payment.expect("payment instructions");
    assert_eq!(payment.gateway_order_id, gateway_order_id);
    assert_eq!(payment.key_id, "rzp_test_key");
    assert!(!placed.order.stock_debited);
    assert_eq!(stock_of(&state, variant_id).await?, 3);

    let tampered = payment_service::callback(
        &state,
        &shopper,
        PaymentCallback {
            razorpay_order_id: gateway_order_id.clone(),
            razorpay_payment_id: "pay_test_1".into(),
            razorpay_signature: sign(KEY_SECRET, b"someone|else"),
        },
    )
    .await;
    assert!(matches!(tampered, Err(AppError::BadRequest(ref m)) if m == "Payment verification failed"));
    assert_eq!(stock_of(&state, variant_id).await?, 3);

    let body = serde_json::to_vec(&serde_json::json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": "pay_test_1", "order_id": gateway_order_id } } }
    }))?;

    let forged = payment_service::webhook(&state, &body, Some("deadbeef")).await;
    assert!(matches!(forged, Err(AppError::BadRequest(_))));
    assert_eq!(stock_of(&state, variant_id).await?, 3);

    let signature = sign(WEBHOOK_SECRET, &body);
    let ack = payment_service::webhook(&state, &body, Some(&signature))
        .await?
        .data
        .expect("ack");
    assert!(ack.handled);
    assert_eq!(stock_of(&state, variant_id).await?, 1);

    let replay = payment_service::webhook(&state, &body, Some(&signature))
        .await?
        .data
        .expect("ack");
    assert!(!replay.handled);
    assert_eq!(stock_of(&state, variant_id).await?, 1);

    let count = cart_service::cart_count(&state, &shopper).await?.data.expect("count");
    assert_eq!(count.count, 0);

    let callback_signature = sign(KEY_SECRET, format!("{gateway_order_id}|pay_test_1").as_bytes());
    let late = payment_service::callback(
        &state,
        &shopper,
        PaymentCallback {
            razorpay_order_id: gateway_order_id.clone(),
            razorpay_payment_id: "pay_test_1".into(),
            razorpay_signature: callback_signature,
        },
    )
    .await?;
    assert_eq!(late.message, "Payment already recorded");
    let detail = late.data.expect("order");
    assert_eq!(detail.order.status, "paid");
    assert_eq!(detail.order.gateway_payment_id, "pay_test_1");

    // The paid order lands in today's UTC bucket.
    let today = analytics_service::compute(
        &state,
        &AnalyticsQuery {
            days: Some(1),
            group: None,
        },
    )
    .await?;
    assert_eq!(today.points.len(), 1);
    assert_eq!(today.points[0].date, Utc::now().format("%Y-%m-%d").to_string());
    assert!(today.points[0].revenue >= detail.order.total_amount);

    Ok(())
}

// Coupon, quantity and variant errors surface as 400s with readable messages.
#[tokio::test]
async fn cart_rejects_bad_coupons_quantities_and_missing_variants() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, "http://127.0.0.1:9".into()).await?;
    let shopper = create_user(&state, ROLE_USER).await?;
    let (product_id, _) = create_variant_product(&state, 10).await?;
    add_to_cart(&state, &shopper, product_id, 1).await?;

    let unknown = cart_service::apply_coupon(
        &state,
        &shopper,
        ApplyCouponRequest {
            code: format!("NOPE{}", tag()),
        },
    )
    .await;
    assert!(matches!(unknown, Err(AppError::BadRequest(ref m)) if m == "Invalid coupon code"));

    let disabled = create_coupon(&state, false, None).await?;
    let inactive = cart_service::apply_coupon(&state, &shopper, ApplyCouponRequest { code: disabled }).await;
    assert!(matches!(inactive, Err(AppError::BadRequest(ref m)) if m == "Coupon is not active"));

    let lapsed = create_coupon(&state, true, Some(Utc::now() - Duration::days(1))).await?;
    let expired = cart_service::apply_coupon(&state, &shopper, ApplyCouponRequest { code: lapsed }).await;
    assert!(matches!(expired, Err(AppError::BadRequest(ref m)) if m == "Coupon is not active"));

    let live = create_coupon(&state, true, Some(Utc::now() + Duration::days(1))).await?;
    let applied = cart_service::apply_coupon(
        &state,
        &shopper,
        ApplyCouponRequest {
            code: live.to_lowercase(),
        },
    )
    .await?
    .data
    .expect("cart");
    assert_eq!(applied.summary.coupon_code.as_deref(), Some(live.as_str()));

    let oversized = cart_service::add_item(
        &state,
        &shopper,
        AddToCartRequest {
            product_id,
            size: Some("M".into()),
            color: Some("Black".into()),
            quantity: Some(i32::MAX),
        },
    )
    .await;
    assert!(matches!(oversized, Err(AppError::BadRequest(_))));

    // Topping up past the cap leaves the line at the cap.
    add_to_cart(&state, &shopper, product_id, cart_service::MAX_LINE_QUANTITY).await?;
    let count = cart_service::cart_count(&state, &shopper).await?.data.expect("count");
    assert_eq!(count.count, i64::from(cart_service::MAX_LINE_QUANTITY));

    // Wishlisted without ever picking a size: moving it needs a variant.
    let browser = create_user(&state, ROLE_USER).await?;
    wishlist_service::add_to_wishlist(&state, &browser, AddWishlistRequest { product_id }).await?;
    let no_variant = cart_service::move_to_cart(&state, &browser, product_id).await;
    assert!(matches!(no_variant, Err(AppError::BadRequest(ref m)) if m == "Select size and color"));

    // Saved from the cart, the variant is remembered and the move succeeds.
    add_to_cart(&state, &browser, product_id, 1).await?;
    let view = cart_service::view_cart(&state, &browser).await?.data.expect("cart");
    let item_id = view.items[0].id;
    let saved = cart_service::save_for_later(&state, &browser, item_id).await?.data.expect("cart");
    assert!(saved.items.is_empty());
    let moved = cart_service::move_to_cart(&state, &browser, product_id).await?.data.expect("cart");
    assert_eq!(moved.count, 1);
    assert_eq!(moved.items[0].size.as_deref(), Some("M"));

    Ok(())
}

// A product switched off after it was carted can no longer be bought.
#[tokio::test]
async fn deactivated_product_cannot_be_checked_out() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, "http://127.0.0.1:9".into()).await?;
    let shopper = create_user(&state, ROLE_USER).await?;
    let (product_id, variant_id) = create_variant_product(&state, 3).await?;
    add_address(&state, &shopper).await?;
    add_to_cart(&state, &shopper, product_id, 1).await?;

    Products::update_many()
        .col_expr(ProductCol::IsActive, Expr::value(false))
        .filter(ProductCol::Id.eq(product_id))
        .exec(&state.orm)
        .await?;

    let view = cart_service::view_cart(&state, &shopper).await?.data.expect("cart");
    assert!(view.items.is_empty());
    assert_eq!(view.summary.total_amount, dec!(0));

    let attempt = order_service::checkout(&state, &shopper, checkout_request("cod")).await;
    assert!(matches!(attempt, Err(AppError::BadRequest(ref m)) if m.contains("no longer available")));
    assert_eq!(stock_of(&state, variant_id).await?, 3);

    Ok(())
}

// Tokens follow the account: demotion and deactivation apply immediately.
#[tokio::test]
async fn tokens_reflect_current_role_and_status() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, "http://127.0.0.1:9".into()).await?;
    let owner = create_user(&state, ROLE_ADMIN).await?;
    let staff = create_user(&state, ROLE_ADMIN).await?;
    let token = auth_service::issue_token(staff.user_id, ROLE_ADMIN, JWT_SECRET)?;

    let before = authenticate(&state, &token).await?;
    assert!(before.is_admin());

    admin_service::toggle_staff(&state, &owner, staff.user_id).await?;
    let demoted = authenticate(&state, &token).await?;
    assert_eq!(demoted.role, ROLE_USER);
    assert!(matches!(admin_service::summary(&state, &demoted).await, Err(AppError::Forbidden)));

    admin_service::toggle_active(&state, &owner, staff.user_id).await?;
    let disabled = authenticate(&state, &token).await;
    assert!(matches!(disabled, Err(AppError::Unauthorized(_))));

    let ghost = auth_service::issue_token(Uuid::new_v4(), ROLE_ADMIN, JWT_SECRET)?;
    assert!(matches!(authenticate(&state, &ghost).await, Err(AppError::Unauthorized(_))));

    Ok(())
}

// Returned quantities never exceed what was ordered, inventory changes are
// bounds-checked and exchange targets cannot be deleted.
#[tokio::test]
async fn returns_and_inventory_stay_within_bounds() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, "http://127.0.0.1:9".into()).await?;
    let shopper = create_user(&state, ROLE_USER).await?;
    let admin = create_user(&state, ROLE_ADMIN).await?;
    let (product_id, variant_id) = create_variant_product(&state, 5).await?;
    let larger = add_variant(&state, product_id, "L", 4).await?;
    add_address(&state, &shopper).await?;
    add_to_cart(&state, &shopper, product_id, 2).await?;

    let (order_id, order_number) = place_cod_order(&state, &shopper).await?;
    mark_delivered(&state, &admin, order_id).await?;
    let item_id = order_service::order_items(&state.orm, order_id).await?[0].id;

    let line = |quantity, exchange| ReturnLine {
        order_item_id: item_id,
        quantity,
        exchange_variant_id: exchange,
    };
    let first = return_service::request_return(
        &state,
        &shopper,
        &order_number,
        ReturnRequestBody {
            kind: "exchange".into(),
            reason: "Too small".into(),
            items: vec![line(1, Some(larger)), line(1, None)],
        },
    )
    .await?
    .data
    .expect("return request");
    assert_eq!(first.items.len(), 1);
    assert_eq!(first.items[0].quantity, 2);
    assert_eq!(first.items[0].exchange_variant_id, Some(larger));

    let again = return_service::request_return(
        &state,
        &shopper,
        &order_number,
        ReturnRequestBody {
            kind: "return".into(),
            reason: String::new(),
            items: vec![line(1, None)],
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));

    let referenced = product_service::delete_variant(&state, &admin, larger).await;
    assert!(matches!(referenced, Err(AppError::Conflict(_))));

    let overflow = admin_service::adjust_inventory(
        &state,
        &admin,
        variant_id,
        InventoryAdjustRequest { delta: i32::MAX },
    )
    .await;
    assert!(matches!(overflow, Err(AppError::BadRequest(_))));
    let negative = admin_service::adjust_inventory(
        &state,
        &admin,
        variant_id,
        InventoryAdjustRequest { delta: -100 },
    )
    .await;
    assert!(matches!(negative, Err(AppError::BadRequest(_))));
    assert_eq!(stock_of(&state, variant_id).await?, 3);

    Ok(())
}

// With the courier switched on, booking stores the AWB once and later calls
// reuse it; the after-payment hook books quietly.
#[tokio::test]
async fn courier_shipment_is_booked_once() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let courier = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "tok_ship" })))
        .mount(&courier)
        .await;
    Mock::given(method("POST"))
        .and(path("/courier/serviceability/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "available_courier_companies": [{ "rate": 60.0 }] }
        })))
        .mount(&courier)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders/create/adhoc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "order_id": 42, "shipment_id": 4242 })))
        .expect(2)
        .mount(&courier)
        .await;
    Mock::given(method("POST"))
        .and(path("/courier/assign/awb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "awb_assign_status": 1,
            "data": { "awb_code": "AWB-FLOW-1" }
        })))
        .expect(2)
        .mount(&courier)
        .await;

    let shipping = ShippingConfig {
        enabled: true,
        email: "ops@example.com".into(),
        password: "secret".into(),
        pickup_location: "Primary".into(),
        pickup_pin: "110001".into(),
        base_url: courier.uri(),
        ..ShippingConfig::default()
    };
    let state = setup_state_with_courier(&database_url, "http://127.0.0.1:9".into(), shipping).await?;
    assert!(state.shipping.enabled());

    let shopper = create_user(&state, ROLE_USER).await?;
    let (product_id, _) = create_variant_product(&state, 5).await?;
    add_address(&state, &shopper).await?;

    add_to_cart(&state, &shopper, product_id, 1).await?;
    let (first_id, _) = place_cod_order(&state, &shopper).await?;
    let awb = order_service::create_shipment_for_order(&state, first_id).await?;
    assert_eq!(awb.as_deref(), Some("AWB-FLOW-1"));
    let stored = order_service::reload_order(&state.orm, first_id).await?;
    assert_eq!(stored.tracking_number, "AWB-FLOW-1");
    assert_eq!(stored.shipping_provider, order_service::SHIPPING_PROVIDER);

    // Already tracked: no second courier booking.
    let repeat = order_service::create_shipment_for_order(&state, first_id).await?;
    assert_eq!(repeat.as_deref(), Some("AWB-FLOW-1"));

    add_to_cart(&state, &shopper, product_id, 1).await?;
    let (second_id, _) = place_cod_order(&state, &shopper).await?;
    order_service::ship_quietly(&state, second_id).await;
    let shipped = Orders::find_by_id(second_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("order vanished"))?;
    assert_eq!(shipped.tracking_number, "AWB-FLOW-1");

    Ok(())
}

