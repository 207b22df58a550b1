use uuid::Uuid;

use crate::{
    audit::audit,
    db::DbPool,
    dto::reviews::{RatingSummary, ReviewList, ReviewRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Review,
    response::ApiResponse,
    state::AppState,
};

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.product_id, r.user_id, u.username, r.rating, r.title, r.body, r.created_at
    FROM reviews r
    JOIN users u ON u.id = r.user_id
"#;

pub async fn rating_summary(pool: &DbPool, product_id: Uuid) -> AppResult<RatingSummary> {
    let (average, count): (Option<f64>, i64) = sqlx::query_as(
        "SELECT AVG(rating)::float8, COUNT(*) FROM reviews WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(pool)
    .await?;
    Ok(RatingSummary { average, count })
}

pub async fn reviews_for_product(pool: &DbPool, product_id: Uuid) -> AppResult<Vec<Review>> {
    let items = sqlx::query_as::<_, Review>(&format!(
        "{REVIEW_SELECT} WHERE r.product_id = $1 ORDER BY r.created_at DESC"
    ))
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

pub async fn recent_reviews_by_user(pool: &DbPool, user_id: Uuid, limit: i64) -> AppResult<Vec<Review>> {
    let items = sqlx::query_as::<_, Review>(&format!(
        "{REVIEW_SELECT} WHERE r.user_id = $1 ORDER BY r.created_at DESC LIMIT $2"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

async fn product_id_by_slug(pool: &DbPool, slug: &str) -> AppResult<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE slug = $1 AND is_active")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    row.map(|(id,)| id).ok_or(AppError::NotFound)
}

pub async fn list_reviews(state: &AppState, slug: &str) -> AppResult<ApiResponse<ReviewList>> {
    let product_id = product_id_by_slug(&state.pool, slug).await?;
    let items = reviews_for_product(&state.pool, product_id).await?;
    let summary = rating_summary(&state.pool, product_id).await?;
    Ok(ApiResponse::ok("Reviews", ReviewList { items, summary }))
}

/// One review per user and product; posting again replaces it.
pub async fn upsert_review(
    state: &AppState,
    user: &AuthUser,
    slug: &str,
    payload: ReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::bad_request("Rating must be between 1 and 5"));
    }
    let product_id = product_id_by_slug(&state.pool, slug).await?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO reviews (id, product_id, user_id, rating, title, body)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (product_id, user_id) DO UPDATE SET
            rating = EXCLUDED.rating,
            title = EXCLUDED.title,
            body = EXCLUDED.body,
            created_at = now()
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(product_id)
    .bind(user.user_id)
    .bind(payload.rating)
    .bind(payload.title.trim())
    .bind(payload.body.trim())
    .fetch_one(&state.pool)
    .await?;

    let review = sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.id = $1"))
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    audit(
        &state.pool,
        Some(user.user_id),
        "review_upsert",
        "reviews",
        serde_json::json!({ "review_id": review.id, "product_id": product_id, "rating": review.rating }),
    )
    .await;

    Ok(ApiResponse::ok("Review saved", review))
}
