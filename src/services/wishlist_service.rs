use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::wishlist::{AddWishlistRequest, WishlistList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::WishlistEntry,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn wishlist_entries(pool: &DbPool, user_id: Uuid) -> AppResult<Vec<WishlistEntry>> {
    let items = sqlx::query_as::<_, WishlistEntry>(
        r#"
        SELECT w.product_id, p.name, p.slug, p.base_price, p.sale_price,
               (SELECT i.image_url FROM product_images i
                 WHERE i.product_id = p.id
                 ORDER BY i.is_primary DESC, i.id
                 LIMIT 1) AS image_url,
               w.last_variant_id, w.added_at
        FROM wishlist_items w
        JOIN products p ON p.id = w.product_id
        WHERE w.user_id = $1
        ORDER BY w.added_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

pub async fn list_wishlist(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<WishlistList>> {
    let items = wishlist_entries(&state.pool, user.user_id).await?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Wishlist",
        WishlistList { items },
        Some(Meta::new(1, total, total)),
    ))
}

/// Adding twice is a no-op.
pub async fn add_to_wishlist(
    state: &AppState,
    user: &AuthUser,
    payload: AddWishlistRequest,
) -> AppResult<ApiResponse<WishlistList>> {
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(&state.pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound);
    }

    sqlx::query(
        r#"
        INSERT INTO wishlist_items (id, user_id, product_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, product_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.product_id)
    .execute(&state.pool)
    .await?;

    let items = wishlist_entries(&state.pool, user.user_id).await?;
    Ok(ApiResponse::ok("Added to wishlist", WishlistList { items }))
}

pub async fn remove_from_wishlist(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
        .bind(user.user_id)
        .bind(product_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::ok(
        "Removed from wishlist",
        serde_json::json!({ "product_id": product_id }),
    ))
}

/// Remember the variant last picked for a product already on the wishlist.
pub async fn remember_variant(
    pool: &DbPool,
    user_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
) -> AppResult<()> {
    if variant_id.is_none() {
        return Ok(());
    }
    sqlx::query("UPDATE wishlist_items SET last_variant_id = $3 WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .bind(variant_id)
        .execute(pool)
        .await?;
    Ok(())
}
