use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
    ActiveValue::NotSet,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    audit::audit,
    catalog_match::{is_known_color, is_known_size, slugify},
    dto::catalog::{
        CategoryRequest, CreateProductRequest, ImageRequest, UpdateProductRequest, UpdateVariantRequest,
        VariantRequest,
    },
    entity::{
        CartItems, Categories, OrderItems, ProductImages, Products, ReturnItems, Variants,
        cart_items::Column as CartItemCol,
        categories::{ActiveModel as CategoryActive, Column as CategoryCol},
        order_items::Column as OrderItemCol,
        product_images::{ActiveModel as ImageActive, Column as ImageCol},
        return_items::Column as ReturnItemCol,
        products::{ActiveModel as ProductActive, Column as ProdCol, Model as ProductModel},
        variants::{ActiveModel as VariantActive, Column as VariantCol, Model as VariantModel},
    },
    error::{AppError, AppResult, conflict_if_referenced},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Product, Variant},
    response::ApiResponse,
    services::notification_service::{LEVEL_PROMO, broadcast_quietly},
    state::AppState,
};

const VARIANT_IN_EXCHANGE: &str = "Variant is the replacement in an exchange request";

/// Derive a slug from `source` and suffix `-2`, `-3`, ... until it is free.
async fn unique_product_slug<C: ConnectionTrait>(
    conn: &C,
    source: &str,
    except: Option<Uuid>,
) -> AppResult<String> {
    let base = match slugify(source) {
        s if s.is_empty() => "product".to_string(),
        s => s,
    };
    let mut candidate = base.clone();
    let mut n = 2;
    loop {
        let mut finder = Products::find().filter(ProdCol::Slug.eq(candidate.clone()));
        if let Some(id) = except {
            finder = finder.filter(ProdCol::Id.ne(id));
        }
        if finder.count(conn).await? == 0 {
            return Ok(candidate);
        }
        candidate = format!("{base}-{n}");
        n += 1;
    }
}

async fn unique_category_slug<C: ConnectionTrait>(
    conn: &C,
    source: &str,
    except: Option<Uuid>,
) -> AppResult<String> {
    let base = match slugify(source) {
        s if s.is_empty() => "category".to_string(),
        s => s,
    };
    let mut candidate = base.clone();
    let mut n = 2;
    loop {
        let mut finder = Categories::find().filter(CategoryCol::Slug.eq(candidate.clone()));
        if let Some(id) = except {
            finder = finder.filter(CategoryCol::Id.ne(id));
        }
        if finder.count(conn).await? == 0 {
            return Ok(candidate);
        }
        candidate = format!("{base}-{n}");
        n += 1;
    }
}

fn default_sku(product_slug: &str, size: &str, color: &str) -> String {
    slugify(&format!("{product_slug} {size} {color}")).to_uppercase()
}

fn validate_variant_attrs(size: &str, color: &str, stock: i32) -> AppResult<()> {
    if !is_known_size(size) {
        return Err(AppError::bad_request(format!("Unknown size: {size}")));
    }
    if !is_known_color(color) {
        return Err(AppError::bad_request(format!("Unknown color: {color}")));
    }
    if stock < 0 {
        return Err(AppError::bad_request("Stock cannot be negative"));
    }
    Ok(())
}

async fn ensure_sku_free<C: ConnectionTrait>(conn: &C, sku: &str, except: Option<Uuid>) -> AppResult<()> {
    let mut finder = Variants::find().filter(VariantCol::Sku.eq(sku));
    if let Some(id) = except {
        finder = finder.filter(VariantCol::Id.ne(id));
    }
    if finder.count(conn).await? > 0 {
        return Err(AppError::Conflict(format!("SKU {sku} already exists")));
    }
    Ok(())
}

async fn ensure_combination_free<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    size: &str,
    color: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let mut finder = Variants::find()
        .filter(VariantCol::ProductId.eq(product_id))
        .filter(VariantCol::Size.eq(size))
        .filter(VariantCol::Color.eq(color));
    if let Some(id) = except {
        finder = finder.filter(VariantCol::Id.ne(id));
    }
    if finder.count(conn).await? > 0 {
        return Err(AppError::Conflict(format!("Variant {size}/{color} already exists")));
    }
    Ok(())
}

async fn insert_variant(
    txn: &DatabaseTransaction,
    product: &ProductModel,
    payload: VariantRequest,
) -> AppResult<VariantModel> {
    let size = payload.size.trim().to_string();
    let color = payload.color.trim().to_string();
    validate_variant_attrs(&size, &color, payload.stock)?;
    ensure_combination_free(txn, product.id, &size, &color, None).await?;

    let sku = payload
        .sku
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default_sku(&product.slug, &size, &color));
    ensure_sku_free(txn, &sku, None).await?;

    let variant = VariantActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        size: Set(size),
        color: Set(color),
        sku: Set(sku),
        stock: Set(payload.stock),
        base_price: Set(payload.base_price),
        sale_price: Set(payload.sale_price),
        cost_price: Set(payload.cost_price),
        weight_kg: Set(payload.weight_kg),
        length_cm: Set(payload.length_cm),
        breadth_cm: Set(payload.breadth_cm),
        height_cm: Set(payload.height_cm),
    }
    .insert(txn)
    .await?;
    Ok(variant)
}

async fn replace_images(txn: &DatabaseTransaction, product_id: Uuid, images: Vec<ImageRequest>) -> AppResult<()> {
    ProductImages::delete_many()
        .filter(ImageCol::ProductId.eq(product_id))
        .exec(txn)
        .await?;
    for image in images.into_iter().filter(|i| !i.image_url.trim().is_empty()) {
        ImageActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            image_url: Set(image.image_url.trim().to_string()),
            alt_text: Set(image.alt_text),
            color: Set(image.color),
            is_primary: Set(image.is_primary),
        }
        .insert(txn)
        .await?;
    }
    Ok(())
}

async fn ensure_category<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<()> {
    if Categories::find_by_id(id).one(conn).await?.is_none() {
        return Err(AppError::bad_request("Category does not exist"));
    }
    Ok(())
}

fn validate_prices(base: Decimal, sale: Option<Decimal>) -> AppResult<()> {
    if base < Decimal::ZERO || sale.is_some_and(|s| s < Decimal::ZERO) {
        return Err(AppError::bad_request("Prices cannot be negative"));
    }
    Ok(())
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::bad_request("Category name is required"));
    }
    if Categories::find().filter(CategoryCol::Name.eq(name.clone())).count(&state.orm).await? > 0 {
        return Err(AppError::Conflict("Category already exists".into()));
    }
    let source = payload.slug.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(&name);
    let slug = unique_category_slug(&state.orm, source, None).await?;

    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        slug: Set(slug),
        is_display: Set(payload.is_display),
        thumbnail_url: Set(payload.thumbnail_url),
    }
    .insert(&state.orm)
    .await?;

    audit(
        &state.pool,
        Some(user.user_id),
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::ok("Category created", Category::from(category)))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: CategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let existing = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::bad_request("Category name is required"));
    }
    let clash = Categories::find()
        .filter(CategoryCol::Name.eq(name.clone()))
        .filter(CategoryCol::Id.ne(id))
        .count(&state.orm)
        .await?;
    if clash > 0 {
        return Err(AppError::Conflict("Category already exists".into()));
    }

    let slug = match payload.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(requested) => unique_category_slug(&state.orm, requested, Some(id)).await?,
        None => existing.slug.clone(),
    };

    let mut active: CategoryActive = existing.into();
    active.name = Set(name);
    active.slug = Set(slug);
    active.is_display = Set(payload.is_display);
    active.thumbnail_url = Set(payload.thumbnail_url);
    let category = active.update(&state.orm).await?;

    Ok(ApiResponse::ok("Category updated", Category::from(category)))
}

pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let in_use = Products::find()
        .filter(ProdCol::CategoryId.eq(id))
        .count(&state.orm)
        .await?;
    if in_use > 0 {
        return Err(AppError::Conflict("Category still has products".into()));
    }
    let result = Categories::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit(
        &state.pool,
        Some(user.user_id),
        "category_delete",
        "categories",
        serde_json::json!({ "category_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Category deleted", serde_json::json!({ "id": id })))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::bad_request("Product name is required"));
    }
    validate_prices(payload.base_price, payload.sale_price)?;

    let txn = state.orm.begin().await?;
    ensure_category(&txn, payload.category_id).await?;

    let source = payload.slug.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(&name);
    let slug = unique_product_slug(&txn, source, None).await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        slug: Set(slug),
        category_id: Set(payload.category_id),
        description: Set(payload.description),
        base_price: Set(payload.base_price),
        sale_price: Set(payload.sale_price),
        is_active: Set(payload.is_active),
        is_best_seller: Set(payload.is_best_seller),
        notify_users: Set(payload.notify_users),
        weight_kg: Set(payload.weight_kg),
        length_cm: Set(payload.length_cm),
        breadth_cm: Set(payload.breadth_cm),
        height_cm: Set(payload.height_cm),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for variant in payload.variants {
        insert_variant(&txn, &product, variant).await?;
    }
    replace_images(&txn, product.id, payload.images).await?;

    txn.commit().await?;

    if product.notify_users && product.is_active {
        let title = format!("New arrival: {}", product.name);
        let link = format!("/products/{}", product.slug);
        broadcast_quietly(&state.pool, &title, "Fresh in the store", &link, LEVEL_PROMO).await;
    }

    audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::ok("Product created", Product::from(product)))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    let existing = Products::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let base_price = payload.base_price.unwrap_or(existing.base_price);
    let sale_price = payload.sale_price.unwrap_or(existing.sale_price);
    validate_prices(base_price, sale_price)?;

    if let Some(category_id) = payload.category_id {
        ensure_category(&txn, category_id).await?;
    }

    let slug = match payload.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(requested) => Some(unique_product_slug(&txn, requested, Some(id)).await?),
        None => None,
    };

    let mut active: ProductActive = existing.into();
    if let Some(name) = payload.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        active.name = Set(name);
    }
    if let Some(slug) = slug {
        active.slug = Set(slug);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    active.base_price = Set(base_price);
    active.sale_price = Set(sale_price);
    if let Some(v) = payload.is_active {
        active.is_active = Set(v);
    }
    if let Some(v) = payload.is_best_seller {
        active.is_best_seller = Set(v);
    }
    if let Some(v) = payload.notify_users {
        active.notify_users = Set(v);
    }
    if let Some(v) = payload.weight_kg {
        active.weight_kg = Set(Some(v));
    }
    if let Some(v) = payload.length_cm {
        active.length_cm = Set(Some(v));
    }
    if let Some(v) = payload.breadth_cm {
        active.breadth_cm = Set(Some(v));
    }
    if let Some(v) = payload.height_cm {
        active.height_cm = Set(Some(v));
    }
    let product = active.update(&txn).await?;

    if let Some(images) = payload.images {
        replace_images(&txn, product.id, images).await?;
    }
    txn.commit().await?;

    if product.notify_users && product.is_active && product.sale_price.is_some() {
        let title = format!("On sale: {}", product.name);
        let link = format!("/products/{}", product.slug);
        broadcast_quietly(&state.pool, &title, "Limited time price drop", &link, LEVEL_PROMO).await;
    }

    audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::ok("Product updated", Product::from(product)))
}

/// Products with order history are archived instead of removed.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    CartItems::delete_many()
        .filter(CartItemCol::ProductId.eq(id))
        .exec(&txn)
        .await?;

    let ordered = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(id))
        .count(&txn)
        .await?;

    let archived = ordered > 0;
    if archived {
        let mut active: ProductActive = product.into();
        active.is_active = Set(false);
        active.update(&txn).await?;
    } else {
        Products::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|err| conflict_if_referenced(err, VARIANT_IN_EXCHANGE))?;
    }
    txn.commit().await?;

    audit(
        &state.pool,
        Some(user.user_id),
        if archived { "product_archive" } else { "product_delete" },
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    let message = if archived { "Product archived" } else { "Product deleted" };
    Ok(ApiResponse::ok(message, serde_json::json!({ "id": id, "archived": archived })))
}

pub async fn create_variant(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: VariantRequest,
) -> AppResult<ApiResponse<Variant>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let variant = insert_variant(&txn, &product, payload).await?;
    txn.commit().await?;

    Ok(ApiResponse::ok("Variant created", Variant::from(variant)))
}

pub async fn update_variant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateVariantRequest,
) -> AppResult<ApiResponse<Variant>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    let existing = Variants::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let size = payload.size.map(|s| s.trim().to_string()).unwrap_or_else(|| existing.size.clone());
    let color = payload.color.map(|c| c.trim().to_string()).unwrap_or_else(|| existing.color.clone());
    let stock = payload.stock.unwrap_or(existing.stock);
    validate_variant_attrs(&size, &color, stock)?;
    ensure_combination_free(&txn, existing.product_id, &size, &color, Some(id)).await?;

    let sku = payload.sku.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    if let Some(sku) = sku.as_deref() {
        ensure_sku_free(&txn, sku, Some(id)).await?;
    }

    let mut active: VariantActive = existing.into();
    active.size = Set(size);
    active.color = Set(color);
    active.stock = Set(stock);
    if let Some(sku) = sku {
        active.sku = Set(sku);
    }
    if let Some(v) = payload.base_price {
        active.base_price = Set(Some(v));
    }
    if let Some(v) = payload.sale_price {
        active.sale_price = Set(Some(v));
    }
    if let Some(v) = payload.cost_price {
        active.cost_price = Set(Some(v));
    }
    if let Some(v) = payload.weight_kg {
        active.weight_kg = Set(Some(v));
    }
    if let Some(v) = payload.length_cm {
        active.length_cm = Set(Some(v));
    }
    if let Some(v) = payload.breadth_cm {
        active.breadth_cm = Set(Some(v));
    }
    if let Some(v) = payload.height_cm {
        active.height_cm = Set(Some(v));
    }
    let variant = active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::ok("Variant updated", Variant::from(variant)))
}

pub async fn delete_variant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let ordered = OrderItems::find()
        .filter(OrderItemCol::VariantId.eq(id))
        .count(&state.orm)
        .await?;
    if ordered > 0 {
        return Err(AppError::Conflict("Variant has order history; set its stock to 0 instead".into()));
    }
    let exchange_target = ReturnItems::find()
        .filter(ReturnItemCol::ExchangeVariantId.eq(id))
        .count(&state.orm)
        .await?;
    if exchange_target > 0 {
        return Err(AppError::Conflict(VARIANT_IN_EXCHANGE.into()));
    }

    let txn = state.orm.begin().await?;
    CartItems::delete_many()
        .filter(CartItemCol::VariantId.eq(id))
        .exec(&txn)
        .await?;
    let result = Variants::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(|err| conflict_if_referenced(err, VARIANT_IN_EXCHANGE))?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    txn.commit().await?;

    audit(
        &state.pool,
        Some(user.user_id),
        "variant_delete",
        "variants",
        serde_json::json!({ "variant_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Variant deleted", serde_json::json!({ "id": id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sku_is_stable_and_upper_case() {
        assert_eq!(default_sku("classic-tee", "XL", "Navy Blue"), "CLASSIC-TEE-XL-NAVY-BLUE");
    }

    #[test]
    fn rejects_unknown_variant_attributes() {
        assert!(validate_variant_attrs("M", "Red", 3).is_ok());
        assert!(validate_variant_attrs("S", "Red", 3).is_err());
        assert!(validate_variant_attrs("M", "Purple", 3).is_err());
        assert!(validate_variant_attrs("M", "Red", -1).is_err());
    }
}
