use rust_decimal::{Decimal, prelude::ToPrimitive};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    catalog_match::{average_rgb, nearest_color, ordered_colors, ordered_sizes, parse_hex_color},
    db::DbPool,
    dto::catalog::{
        CategoryDetail, CategoryList, ColorSearchRequest, ColorSearchResult, Deal, HomeView,
        ProductDetail, ProductList,
    },
    entity::{
        Categories, Products, Variants,
        products::Column as ProdCol,
        variants::Column as VariantCol,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Banner, Category, Product, ProductCard, ProductImage, Variant},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SearchQuery, SortOrder},
    services::review_service::{rating_summary, reviews_for_product},
    state::AppState,
};

const HOME_LATEST: i64 = 12;
const HOME_BANNERS: i64 = 8;
const TOP_DEALS: usize = 8;
const MAX_DEAL_PERCENT: i32 = 30;

/// Card columns; callers append `WHERE`/`ORDER BY` against alias `p`.
pub const CARD_SELECT: &str = r#"
    SELECT p.id, p.name, p.slug, p.base_price, p.sale_price, p.is_best_seller,
           (SELECT i.image_url FROM product_images i
             WHERE i.product_id = p.id
             ORDER BY i.is_primary DESC, i.id
             LIMIT 1) AS image_url,
           (SELECT AVG(r.rating)::float8 FROM reviews r WHERE r.product_id = p.id) AS avg_rating,
           (SELECT COUNT(*) FROM reviews r WHERE r.product_id = p.id) AS review_count
    FROM products p
"#;

/// Whole-percent markdown of a sale price, rounded half-up.
pub fn deal_percent(base_price: Decimal, sale_price: Option<Decimal>) -> Option<i32> {
    let sale = sale_price?;
    if base_price <= Decimal::ZERO {
        return None;
    }
    let pct = (base_price - sale) * Decimal::from(100) / base_price;
    pct.round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        .to_i32()
}

/// Products on sale by more than zero and at most 30 percent, deepest first.
pub fn top_deals(cards: Vec<ProductCard>) -> Vec<Deal> {
    let mut deals: Vec<(Decimal, Deal)> = cards
        .into_iter()
        .filter_map(|card| {
            let sale = card.sale_price?;
            if card.base_price <= Decimal::ZERO {
                return None;
            }
            let exact = (card.base_price - sale) * Decimal::from(100) / card.base_price;
            if exact <= Decimal::ZERO || exact > Decimal::from(MAX_DEAL_PERCENT) {
                return None;
            }
            let discount_percent = deal_percent(card.base_price, card.sale_price)?;
            Some((exact, Deal { product: card, discount_percent }))
        })
        .collect();
    deals.sort_by(|a, b| b.0.cmp(&a.0));
    deals.into_iter().take(TOP_DEALS).map(|(_, d)| d).collect()
}

pub async fn wishlist_ids(pool: &DbPool, user_id: Uuid) -> AppResult<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT product_id FROM wishlist_items WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn active_banners(pool: &DbPool, limit: i64) -> AppResult<Vec<Banner>> {
    let items = sqlx::query_as::<_, Banner>(
        "SELECT * FROM banners WHERE is_active ORDER BY sort_order, created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

pub async fn home(state: &AppState, user: Option<AuthUser>) -> AppResult<ApiResponse<HomeView>> {
    let latest = sqlx::query_as::<_, ProductCard>(&format!(
        "{CARD_SELECT} WHERE p.is_active ORDER BY p.created_at DESC LIMIT $1"
    ))
    .bind(HOME_LATEST)
    .fetch_all(&state.pool)
    .await?;

    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, name, slug, is_display, thumbnail_url FROM categories WHERE is_display ORDER BY name",
    )
    .fetch_all(&state.pool)
    .await?;

    let banners = active_banners(&state.pool, HOME_BANNERS).await?;

    let on_sale = sqlx::query_as::<_, ProductCard>(&format!(
        "{CARD_SELECT} WHERE p.is_active AND p.sale_price IS NOT NULL"
    ))
    .fetch_all(&state.pool)
    .await?;

    let wishlist_product_ids = match user {
        Some(user) => wishlist_ids(&state.pool, user.user_id).await?,
        None => Vec::new(),
    };

    Ok(ApiResponse::ok(
        "Home",
        HomeView {
            latest,
            categories,
            banners,
            top_deals: top_deals(on_sale),
            wishlist_product_ids,
        },
    ))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<Category> = Categories::find()
        .order_by_asc(crate::entity::categories::Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn category_detail(state: &AppState, slug: &str) -> AppResult<ApiResponse<CategoryDetail>> {
    let category = sqlx::query_as::<_, Category>(
        "SELECT id, name, slug, is_display, thumbnail_url FROM categories WHERE slug = $1",
    )
    .bind(slug)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound)?;

    let products = sqlx::query_as::<_, ProductCard>(&format!(
        "{CARD_SELECT} WHERE p.is_active AND p.category_id = $1 ORDER BY p.created_at DESC"
    ))
    .bind(category.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::ok("Category", CategoryDetail { category, products }))
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    builder.push(" WHERE p.is_active");
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{q}%");
        builder
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(slug) = query.category.as_deref().filter(|s| !s.is_empty()) {
        builder
            .push(" AND p.category_id IN (SELECT id FROM categories WHERE slug = ")
            .push_bind(slug.to_string())
            .push(")");
    }
    if let Some(min) = query.min_price {
        builder
            .push(" AND COALESCE(p.sale_price, p.base_price) >= ")
            .push_bind(min);
    }
    if let Some(max) = query.max_price {
        builder
            .push(" AND COALESCE(p.sale_price, p.base_price) <= ")
            .push_bind(max);
    }
}

pub async fn list_products(state: &AppState, query: ProductQuery) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
    push_filters(&mut count, &query);
    let (total,): (i64,) = count.build_query_as().fetch_one(&state.pool).await?;

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut select = QueryBuilder::<Postgres>::new(CARD_SELECT);
    push_filters(&mut select, &query);
    select
        .push(format!(" ORDER BY {} {}", sort_by.as_sql(), sort_order.as_sql()))
        .push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let items = select
        .build_query_as::<ProductCard>()
        .fetch_all(&state.pool)
        .await?;

    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn product_detail(state: &AppState, slug: &str) -> AppResult<ApiResponse<ProductDetail>> {
    let product = Products::find()
        .filter(ProdCol::Slug.eq(slug))
        .filter(ProdCol::IsActive.eq(true))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let category = Categories::find_by_id(product.category_id)
        .one(&state.orm)
        .await?
        .map(Category::from);

    let variants = Variants::find()
        .filter(VariantCol::ProductId.eq(product.id))
        .all(&state.orm)
        .await?;
    let sizes = ordered_sizes(variants.iter().map(|v| v.size.as_str()));
    let colors = ordered_colors(variants.iter().map(|v| v.color.as_str()));

    let images = sqlx::query_as::<_, ProductImage>(
        "SELECT * FROM product_images WHERE product_id = $1 ORDER BY is_primary DESC, id",
    )
    .bind(product.id)
    .fetch_all(&state.pool)
    .await?;

    let rating = rating_summary(&state.pool, product.id).await?;
    let reviews = reviews_for_product(&state.pool, product.id).await?;

    Ok(ApiResponse::ok(
        "Product",
        ProductDetail {
            product: Product::from(product),
            category,
            variants: variants.into_iter().map(Variant::from).collect(),
            images,
            sizes,
            colors,
            rating,
            reviews,
        },
    ))
}

/// Substring search; a blank query finds nothing rather than everything.
pub async fn search(state: &AppState, query: SearchQuery) -> AppResult<ApiResponse<ProductList>> {
    let Some(q) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(ApiResponse::success(
            "Type to search products",
            ProductList { items: Vec::new() },
            Some(Meta::new(1, 0, 0)),
        ));
    };

    let product_query = ProductQuery {
        page: query.page,
        per_page: query.per_page,
        q: Some(q.to_string()),
        ..Default::default()
    };
    let mut response = list_products(state, product_query).await?;
    response.message = format!("Results for '{q}'");
    Ok(response)
}

fn requested_rgb(payload: &ColorSearchRequest) -> Option<[u8; 3]> {
    if let Some(pixels) = payload.pixels.as_deref() {
        return average_rgb(pixels);
    }
    if let Some(rgb) = payload.rgb {
        return Some(rgb);
    }
    payload.hex.as_deref().and_then(parse_hex_color)
}

pub async fn search_by_color(
    state: &AppState,
    payload: ColorSearchRequest,
) -> AppResult<ApiResponse<ColorSearchResult>> {
    let rgb = requested_rgb(&payload)
        .ok_or_else(|| AppError::bad_request("Provide a colour as hex, rgb or pixels"))?;
    let color = nearest_color(rgb);

    let items = sqlx::query_as::<_, ProductCard>(&format!(
        r#"{CARD_SELECT}
        WHERE p.is_active
          AND EXISTS (SELECT 1 FROM variants v WHERE v.product_id = p.id AND v.color = $1)
        ORDER BY p.created_at DESC"#
    ))
    .bind(color)
    .fetch_all(&state.pool)
    .await?;

    tracing::debug!(?rgb, color, hits = items.len(), "colour search");

    Ok(ApiResponse::ok(
        format!("Results by colour: {color}"),
        ColorSearchResult {
            color: color.to_string(),
            items,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn card(base: Decimal, sale: Option<Decimal>) -> ProductCard {
        ProductCard {
            id: Uuid::new_v4(),
            name: "Tee".into(),
            slug: "tee".into(),
            base_price: base,
            sale_price: sale,
            is_best_seller: false,
            image_url: None,
            avg_rating: None,
            review_count: 0,
        }
    }

    #[test]
    fn deal_percent_rounds_to_whole_numbers() {
        assert_eq!(deal_percent(dec!(999), Some(dec!(799))), Some(20));
        assert_eq!(deal_percent(dec!(100), None), None);
        assert_eq!(deal_percent(dec!(0), Some(dec!(0))), None);
    }

    #[test]
    fn top_deals_keep_only_modest_markdowns() {
        let deals = top_deals(vec![
            card(dec!(100), Some(dec!(90))),
            card(dec!(100), Some(dec!(50))),
            card(dec!(100), Some(dec!(75))),
            card(dec!(100), Some(dec!(100))),
            card(dec!(100), Some(dec!(120))),
            card(dec!(100), None),
        ]);
        let pcts: Vec<i32> = deals.iter().map(|d| d.discount_percent).collect();
        assert_eq!(pcts, vec![25, 10]);
    }

    #[test]
    fn top_deals_are_capped() {
        let cards = (0..12).map(|_| card(dec!(100), Some(dec!(80)))).collect();
        assert_eq!(top_deals(cards).len(), 8);
    }

    #[test]
    fn pixels_win_over_hex() {
        let req = ColorSearchRequest {
            hex: Some("#ffffff".into()),
            rgb: None,
            pixels: Some(vec![[0, 0, 0], [20, 20, 40]]),
        };
        assert_eq!(requested_rgb(&req), Some([10, 10, 20]));

        let hex_only = ColorSearchRequest {
            hex: Some("#ef4444".into()),
            ..Default::default()
        };
        assert_eq!(requested_rgb(&hex_only).map(nearest_color), Some("Red"));
        assert_eq!(requested_rgb(&ColorSearchRequest::default()), None);
    }
}
