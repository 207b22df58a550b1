use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
    ActiveValue::NotSet,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use crate::{
    catalog_match::resolve_variant,
    config::ShippingConfig,
    dto::cart::{
        AddToCartRequest, ApplyCouponRequest, CartCount, CartView, GuestCartLine, MergeCartRequest,
        UpdateCartItemRequest,
    },
    entity::{
        CartItems, Carts, Products, Variants, WishlistItems,
        cart_items::{ActiveModel as CartItemActive, Column as CartItemCol},
        carts::{ActiveModel as CartActive, Column as CartCol, Model as CartModel},
        coupons::Model as CouponModel,
        products::{Column as ProdCol, Model as ProductModel},
        variants::{Column as VariantCol, Model as VariantModel},
        wishlist_items::{ActiveModel as WishlistActive, Column as WishlistCol},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartLine,
    pricing::{self, Parcel, ParcelLine, PriceSummary},
    response::ApiResponse,
    services::{account_service::resolve_address, coupon_service, wishlist_service::remember_variant},
    shipping::RateQuery,
    state::AppState,
};

pub const MAX_LINE_QUANTITY: i32 = 99;

/// A product (and optional variant) with a quantity, ready to be priced.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub cart_item_id: Option<Uuid>,
    pub quantity: i32,
    pub product: ProductModel,
    pub variant: Option<VariantModel>,
}

impl PricedLine {
    pub fn unit_price(&self) -> Decimal {
        pricing::unit_price(
            self.product.price_point(),
            self.variant.as_ref().map(VariantModel::price_point),
        )
    }

    pub fn line_total(&self) -> Decimal {
        pricing::line_total(self.unit_price(), self.quantity)
    }

    pub fn unit_cost(&self) -> Decimal {
        self.variant
            .as_ref()
            .and_then(|v| v.cost_price)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn parcel_line(&self) -> ParcelLine {
        ParcelLine {
            quantity: self.quantity,
            variant: self.variant.as_ref().map(VariantModel::shipping_attrs),
            product: self.product.shipping_attrs(),
        }
    }

    pub fn to_cart_line(&self) -> CartLine {
        CartLine {
            id: self.cart_item_id.unwrap_or_default(),
            product_id: self.product.id,
            product_name: self.product.name.clone(),
            product_slug: self.product.slug.clone(),
            variant_id: self.variant.as_ref().map(|v| v.id),
            size: self.variant.as_ref().map(|v| v.size.clone()),
            color: self.variant.as_ref().map(|v| v.color.clone()),
            quantity: self.quantity,
            unit_price: self.unit_price(),
            line_total: self.line_total(),
        }
    }
}

pub fn subtotal(lines: &[PricedLine]) -> Decimal {
    lines.iter().map(PricedLine::line_total).sum()
}

/// Total units across lines; a sum past `i32::MAX` is rejected.
pub fn units(lines: &[PricedLine]) -> AppResult<i32> {
    lines
        .iter()
        .try_fold(0i32, |acc, l| acc.checked_add(l.quantity))
        .ok_or_else(|| AppError::bad_request("Cart quantity is too large"))
}

/// Quantity for an explicit add or update: raised to 1, rejected above the line cap.
pub fn requested_quantity(quantity: i32) -> AppResult<i32> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(AppError::bad_request(format!(
            "Quantity must be at most {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(quantity.max(1))
}

pub fn parcel_for(config: &ShippingConfig, lines: &[PricedLine]) -> Parcel {
    let parcel_lines: Vec<ParcelLine> = lines.iter().map(PricedLine::parcel_line).collect();
    Parcel::from_lines(&parcel_lines, config.default_unit_weight_kg, config.default_dims_cm)
}

pub async fn get_or_create_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<CartModel> {
    if let Some(cart) = Carts::find().filter(CartCol::UserId.eq(user_id)).one(conn).await? {
        return Ok(cart);
    }
    Carts::insert(CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        coupon_code: Set(None),
        updated_at: NotSet,
    })
    .on_conflict(OnConflict::column(CartCol::UserId).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;

    Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart vanished after insert")))
}

async fn touch_cart<C: ConnectionTrait>(conn: &C, cart_id: Uuid) -> AppResult<()> {
    Carts::update_many()
        .col_expr(CartCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(CartCol::Id.eq(cart_id))
        .exec(conn)
        .await?;
    Ok(())
}

pub async fn set_cart_coupon<C: ConnectionTrait>(conn: &C, cart_id: Uuid, code: Option<String>) -> AppResult<()> {
    Carts::update_many()
        .col_expr(CartCol::CouponCode, Expr::value(code))
        .col_expr(CartCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(CartCol::Id.eq(cart_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Cart lines in insertion order, optionally restricted to `only`.
/// Lines for inactive or missing products are left out.
pub async fn load_lines<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
    only: Option<&[Uuid]>,
) -> AppResult<Vec<PricedLine>> {
    Ok(load_lines_checked(conn, cart_id, only).await?.0)
}

/// Like [`load_lines`], also counting the lines that were left out.
pub async fn load_lines_checked<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
    only: Option<&[Uuid]>,
) -> AppResult<(Vec<PricedLine>, usize)> {
    let mut finder = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .order_by_asc(CartItemCol::CreatedAt);
    if let Some(ids) = only {
        finder = finder.filter(CartItemCol::Id.is_in(ids.to_vec()));
    }
    let rows = finder.find_also_related(Products).all(conn).await?;

    let variant_ids: Vec<Uuid> = rows.iter().filter_map(|(item, _)| item.variant_id).collect();
    let variants: HashMap<Uuid, VariantModel> = if variant_ids.is_empty() {
        HashMap::new()
    } else {
        Variants::find()
            .filter(VariantCol::Id.is_in(variant_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect()
    };

    let total = rows.len();
    let lines: Vec<PricedLine> = rows
        .into_iter()
        .filter_map(|(item, product)| {
            let product = product.filter(|p| p.is_active)?;
            Some(PricedLine {
                cart_item_id: Some(item.id),
                quantity: item.quantity,
                variant: item.variant_id.and_then(|id| variants.get(&id).cloned()),
                product,
            })
        })
        .collect();
    let unavailable = total - lines.len();
    Ok((lines, unavailable))
}

/// Validate a client-held line against the catalog. `None` when the product is gone,
/// inactive, or the variant does not fit it.
pub async fn resolve_guest_line<C: ConnectionTrait>(conn: &C, line: &GuestCartLine) -> AppResult<Option<PricedLine>> {
    let Some(product) = Products::find_by_id(line.product_id)
        .filter(ProdCol::IsActive.eq(true))
        .one(conn)
        .await?
    else {
        return Ok(None);
    };

    let variant = match line.variant_id {
        Some(variant_id) => {
            let found = Variants::find_by_id(variant_id)
                .filter(VariantCol::ProductId.eq(product.id))
                .one(conn)
                .await?;
            match found {
                Some(v) => Some(v),
                None => return Ok(None),
            }
        }
        None => {
            let has_variants = Variants::find()
                .filter(VariantCol::ProductId.eq(product.id))
                .count(conn)
                .await?
                > 0;
            if has_variants {
                return Ok(None);
            }
            None
        }
    };

    Ok(Some(PricedLine {
        cart_item_id: None,
        quantity: line.quantity.clamp(1, MAX_LINE_QUANTITY),
        product,
        variant,
    }))
}

fn same_variant(variant_id: Option<Uuid>) -> Condition {
    match variant_id {
        Some(id) => Condition::all().add(CartItemCol::VariantId.eq(id)),
        None => Condition::all().add(CartItemCol::VariantId.is_null()),
    }
}

/// Add `quantity` to the line for this product and variant, creating it if needed.
/// The line total is capped at [`MAX_LINE_QUANTITY`].
pub async fn add_quantity<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
) -> AppResult<()> {
    let quantity = quantity.clamp(1, MAX_LINE_QUANTITY);
    let existing = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .filter(CartItemCol::ProductId.eq(product_id))
        .filter(same_variant(variant_id))
        .one(conn)
        .await?;

    match existing {
        Some(item) => {
            let next = item.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
            let mut active: CartItemActive = item.into();
            active.quantity = Set(next);
            active.update(conn).await?;
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart_id),
                product_id: Set(product_id),
                variant_id: Set(variant_id),
                quantity: Set(quantity),
                created_at: NotSet,
            }
            .insert(conn)
            .await?;
        }
    }
    touch_cart(conn, cart_id).await
}

/// Fold guest lines into the cart; lines that no longer resolve are skipped.
pub async fn merge_lines<C: ConnectionTrait>(conn: &C, cart_id: Uuid, lines: &[GuestCartLine]) -> AppResult<usize> {
    let mut merged = 0;
    for line in lines {
        match resolve_guest_line(conn, line).await? {
            Some(priced) => {
                add_quantity(
                    conn,
                    cart_id,
                    priced.product.id,
                    priced.variant.as_ref().map(|v| v.id),
                    priced.quantity,
                )
                .await?;
                merged += 1;
            }
            None => tracing::debug!(product_id = %line.product_id, "skipping unresolvable guest cart line"),
        }
    }
    Ok(merged)
}

pub fn empty_summary(coupon: Option<&CouponModel>, state: &AppState) -> PriceSummary {
    let mut summary = pricing::summarize(
        Decimal::ZERO,
        coupon.map(|c| (c.code.as_str(), c.discount_percent)),
        None,
        &state.config.pricing,
    );
    summary.shipping_amount = Decimal::ZERO;
    summary.total_amount = Decimal::ZERO;
    summary
}

/// Price lines with coupon and tax, asking the courier for a rate when shipping is not free.
pub async fn price_lines(
    state: &AppState,
    lines: &[PricedLine],
    coupon: Option<&CouponModel>,
    postal_code: Option<&str>,
    cod: bool,
) -> PriceSummary {
    if lines.is_empty() {
        return empty_summary(coupon, state);
    }
    let config = &state.config.pricing;
    let subtotal = subtotal(lines);
    let coupon = coupon.map(|c| (c.code.as_str(), c.discount_percent));
    let provisional = pricing::summarize(subtotal, coupon, None, config);
    if provisional.discounted_subtotal >= config.free_shipping_threshold {
        return provisional;
    }
    let Some(pin) = postal_code.map(str::trim).filter(|p| !p.is_empty()) else {
        return provisional;
    };

    let query = RateQuery {
        delivery_postcode: pin.to_string(),
        cod,
        declared_value: Some(provisional.discounted_subtotal),
        parcel: parcel_for(&state.config.shipping, lines),
    };
    let estimate = match state.shipping.estimate(&query).await {
        Ok(rate) => rate,
        Err(err) => {
            tracing::warn!(error = %err, pin, "shipping estimate failed, using flat rate");
            None
        }
    };
    pricing::summarize(subtotal, coupon, estimate, config)
}

pub async fn build_view(state: &AppState, user_id: Uuid) -> AppResult<CartView> {
    let cart = get_or_create_cart(&state.orm, user_id).await?;
    let lines = load_lines(&state.orm, cart.id, None).await?;
    let coupon = coupon_service::still_valid(&state.orm, cart.coupon_code.as_deref()).await?;
    let address = resolve_address(&state.pool, user_id, None).await?;

    let summary = price_lines(
        state,
        &lines,
        coupon.as_ref(),
        address.as_ref().map(|a| a.postal_code.as_str()),
        false,
    )
    .await;

    Ok(CartView {
        count: i64::from(units(&lines)?),
        items: lines.iter().map(PricedLine::to_cart_line).collect(),
        summary,
    })
}

pub async fn view_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let view = build_view(state, user.user_id).await?;
    Ok(ApiResponse::ok("Cart", view))
}

pub async fn cart_count(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartCount>> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(ci.quantity), 0)::int8
        FROM cart_items ci
        JOIN carts c ON c.id = ci.cart_id
        WHERE c.user_id = $1
        "#,
    )
    .bind(user.user_id)
    .fetch_one(&state.pool)
    .await?;
    Ok(ApiResponse::ok("Cart count", CartCount { count }))
}

pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let product = Products::find_by_id(payload.product_id)
        .filter(ProdCol::IsActive.eq(true))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let variants = Variants::find()
        .filter(VariantCol::ProductId.eq(product.id))
        .all(&state.orm)
        .await?;
    let variant_id = if variants.is_empty() {
        None
    } else {
        let size = payload.size.as_deref().unwrap_or_default().trim();
        let color = payload.color.as_deref().unwrap_or_default().trim();
        let variant = resolve_variant(&variants, size, color).ok_or(AppError::NotFound)?;
        Some(variant.id)
    };

    let quantity = requested_quantity(payload.quantity.unwrap_or(1))?;
    let cart = get_or_create_cart(&state.orm, user.user_id).await?;
    add_quantity(&state.orm, cart.id, product.id, variant_id, quantity).await?;
    remember_variant(&state.pool, user.user_id, product.id, variant_id).await?;

    let view = build_view(state, user.user_id).await?;
    Ok(ApiResponse::ok("Added to cart", view))
}

pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    let cart = get_or_create_cart(&state.orm, user.user_id).await?;
    let item = CartItems::find_by_id(item_id)
        .filter(CartItemCol::CartId.eq(cart.id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let quantity = requested_quantity(payload.quantity)?;
    let mut active: CartItemActive = item.into();
    active.quantity = Set(quantity);
    active.update(&state.orm).await?;
    touch_cart(&state.orm, cart.id).await?;

    let view = build_view(state, user.user_id).await?;
    Ok(ApiResponse::ok("Cart updated", view))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let cart = get_or_create_cart(&state.orm, user.user_id).await?;
    let result = CartItems::delete_many()
        .filter(CartItemCol::Id.eq(item_id))
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    touch_cart(&state.orm, cart.id).await?;

    let view = build_view(state, user.user_id).await?;
    Ok(ApiResponse::ok("Removed item from cart", view))
}

pub async fn merge_cart(
    state: &AppState,
    user: &AuthUser,
    payload: MergeCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;
    let cart = get_or_create_cart(&txn, user.user_id).await?;
    let merged = merge_lines(&txn, cart.id, &payload.items).await?;
    txn.commit().await?;

    tracing::debug!(user_id = %user.user_id, merged, "guest cart merged");
    let view = build_view(state, user.user_id).await?;
    Ok(ApiResponse::ok("Cart merged", view))
}

pub async fn apply_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: ApplyCouponRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.code.trim().is_empty() {
        return Err(AppError::bad_request("Enter a coupon code"));
    }
    let coupon = coupon_service::validate_code(&state.orm, &payload.code).await?;
    let cart = get_or_create_cart(&state.orm, user.user_id).await?;
    set_cart_coupon(&state.orm, cart.id, Some(coupon.code.clone())).await?;

    let view = build_view(state, user.user_id).await?;
    Ok(ApiResponse::ok(format!("Coupon '{}' applied", coupon.code), view))
}

pub async fn remove_coupon(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart = get_or_create_cart(&state.orm, user.user_id).await?;
    set_cart_coupon(&state.orm, cart.id, None).await?;
    let view = build_view(state, user.user_id).await?;
    Ok(ApiResponse::ok("Coupon removed", view))
}

/// Move a cart line to the wishlist, remembering the chosen variant.
pub async fn save_for_later(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;
    let cart = get_or_create_cart(&txn, user.user_id).await?;
    let item = CartItems::find_by_id(item_id)
        .filter(CartItemCol::CartId.eq(cart.id))
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let existing = WishlistItems::find()
        .filter(WishlistCol::UserId.eq(user.user_id))
        .filter(WishlistCol::ProductId.eq(item.product_id))
        .one(&txn)
        .await?;
    match existing {
        Some(entry) => {
            if item.variant_id.is_some() {
                let mut active: WishlistActive = entry.into();
                active.last_variant_id = Set(item.variant_id);
                active.update(&txn).await?;
            }
        }
        None => {
            WishlistActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(item.product_id),
                last_variant_id: Set(item.variant_id),
                added_at: NotSet,
            }
            .insert(&txn)
            .await?;
        }
    }

    item.delete(&txn).await?;
    touch_cart(&txn, cart.id).await?;
    txn.commit().await?;

    let view = build_view(state, user.user_id).await?;
    Ok(ApiResponse::ok("Saved for later", view))
}

/// Bring a wishlist product back into the cart using its remembered variant.
pub async fn move_to_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;
    let entry = WishlistItems::find()
        .filter(WishlistCol::UserId.eq(user.user_id))
        .filter(WishlistCol::ProductId.eq(product_id))
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let line = GuestCartLine {
        product_id,
        variant_id: entry.last_variant_id,
        quantity: 1,
    };
    let Some(priced) = resolve_guest_line(&txn, &line).await? else {
        let product_active = Products::find_by_id(product_id)
            .filter(ProdCol::IsActive.eq(true))
            .one(&txn)
            .await?
            .is_some();
        return Err(if product_active {
            AppError::bad_request("Select size and color")
        } else {
            AppError::NotFound
        });
    };

    let cart = get_or_create_cart(&txn, user.user_id).await?;
    add_quantity(&txn, cart.id, product_id, priced.variant.as_ref().map(|v| v.id), 1).await?;
    entry.delete(&txn).await?;
    txn.commit().await?;

    let view = build_view(state, user.user_id).await?;
    Ok(ApiResponse::ok("Moved to cart", view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(base: Decimal, sale: Option<Decimal>) -> ProductModel {
        ProductModel {
            id: Uuid::new_v4(),
            name: "Classic Tee".into(),
            slug: "classic-tee".into(),
            category_id: Uuid::new_v4(),
            description: String::new(),
            base_price: base,
            sale_price: sale,
            is_active: true,
            is_best_seller: false,
            notify_users: false,
            weight_kg: Some(dec!(0.3)),
            length_cm: Some(30),
            breadth_cm: None,
            height_cm: None,
            created_at: Utc::now().into(),
        }
    }

    fn variant(product_id: Uuid, base: Option<Decimal>, sale: Option<Decimal>) -> VariantModel {
        VariantModel {
            id: Uuid::new_v4(),
            product_id,
            size: "L".into(),
            color: "Black".into(),
            sku: "TEE-L-BLACK".into(),
            stock: 5,
            base_price: base,
            sale_price: sale,
            cost_price: Some(dec!(120)),
            weight_kg: None,
            length_cm: None,
            breadth_cm: Some(25),
            height_cm: None,
        }
    }

    #[test]
    fn variant_price_overrides_product_price() {
        let p = product(dec!(499), Some(dec!(399)));
        let v = variant(p.id, Some(dec!(549)), None);
        let line = PricedLine {
            cart_item_id: None,
            quantity: 2,
            product: p.clone(),
            variant: Some(v),
        };
        assert_eq!(line.unit_price(), dec!(549));
        assert_eq!(line.line_total(), dec!(1098));
        assert_eq!(line.unit_cost(), dec!(120));

        let plain = PricedLine {
            cart_item_id: None,
            quantity: 1,
            product: p.clone(),
            variant: Some(variant(p.id, None, None)),
        };
        assert_eq!(plain.unit_price(), dec!(399));
    }

    #[test]
    fn cart_line_carries_variant_attributes() {
        let p = product(dec!(499), None);
        let v = variant(p.id, None, None);
        let id = Uuid::new_v4();
        let line = PricedLine {
            cart_item_id: Some(id),
            quantity: 3,
            product: p,
            variant: Some(v),
        }
        .to_cart_line();
        assert_eq!(line.id, id);
        assert_eq!(line.size.as_deref(), Some("L"));
        assert_eq!(line.color.as_deref(), Some("Black"));
        assert_eq!(line.line_total, dec!(1497));
    }

    #[test]
    fn parcel_mixes_variant_and_product_attributes() {
        let p = product(dec!(499), None);
        let v = variant(p.id, None, None);
        let lines = vec![PricedLine {
            cart_item_id: None,
            quantity: 2,
            product: p,
            variant: Some(v),
        }];
        let parcel = parcel_for(&ShippingConfig::default(), &lines);
        assert_eq!(parcel.units, 2);
        assert_eq!(parcel.weight_kg, dec!(0.6));
        assert_eq!(parcel.dims(), (30, 25, 2));
        assert_eq!(units(&lines).ok(), Some(2));
        assert_eq!(subtotal(&lines), dec!(998));
    }

    #[test]
    fn requested_quantity_is_bounded() {
        assert_eq!(requested_quantity(0).ok(), Some(1));
        assert_eq!(requested_quantity(-4).ok(), Some(1));
        assert_eq!(requested_quantity(MAX_LINE_QUANTITY).ok(), Some(MAX_LINE_QUANTITY));
        assert!(matches!(requested_quantity(MAX_LINE_QUANTITY + 1), Err(AppError::BadRequest(_))));
        assert!(matches!(requested_quantity(i32::MAX), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn unit_total_overflow_is_rejected() {
        let p = product(dec!(499), None);
        let line = |quantity| PricedLine {
            cart_item_id: None,
            quantity,
            product: p.clone(),
            variant: None,
        };
        let lines = vec![line(i32::MAX), line(i32::MAX)];
        assert!(matches!(units(&lines), Err(AppError::BadRequest(_))));
    }
}
