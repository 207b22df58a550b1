use uuid::Uuid;

use crate::{
    audit::audit,
    dto::content::{BannerList, BannerRequest, NewsletterRequest, NewsletterResponse, StoreInfo},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Banner,
    response::{ApiResponse, Meta},
    services::catalog_service::active_banners,
    state::AppState,
};

const PUBLIC_BANNERS: i64 = 8;
const DEFAULT_BUTTON_TEXT: &str = "Shop now";

pub fn store_info(state: &AppState) -> ApiResponse<StoreInfo> {
    let store = &state.config.store;
    let pricing = &state.config.pricing;
    ApiResponse::ok(
        "Store",
        StoreInfo {
            name: store.name.clone(),
            domain: store.domain.clone(),
            currency_symbol: store.currency_symbol.clone(),
            gst_rate: pricing.gst_rate,
            gstin: store.gstin.clone(),
            free_shipping_threshold: pricing.free_shipping_threshold,
            flat_shipping_rate: pricing.flat_shipping_rate,
        },
    )
}

pub async fn list_banners(state: &AppState) -> AppResult<ApiResponse<BannerList>> {
    let items = active_banners(&state.pool, PUBLIC_BANNERS).await?;
    Ok(ApiResponse::ok("Banners", BannerList { items }))
}

pub async fn subscribe(state: &AppState, payload: NewsletterRequest) -> AppResult<ApiResponse<NewsletterResponse>> {
    let email = payload.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::bad_request("Enter a valid email address"));
    }

    let result = sqlx::query(
        "INSERT INTO newsletter_subscribers (id, email) VALUES ($1, $2) ON CONFLICT (email) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .execute(&state.pool)
    .await?;
    let created = result.rows_affected() > 0;

    let message = if created { "Subscribed" } else { "Already subscribed" };
    Ok(ApiResponse::ok(message, NewsletterResponse { email, created }))
}

pub async fn admin_list_banners(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<BannerList>> {
    ensure_admin(user)?;
    let items = sqlx::query_as::<_, Banner>("SELECT * FROM banners ORDER BY sort_order, created_at DESC")
        .fetch_all(&state.pool)
        .await?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Banners",
        BannerList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn create_banner(
    state: &AppState,
    user: &AuthUser,
    payload: BannerRequest,
) -> AppResult<ApiResponse<Banner>> {
    ensure_admin(user)?;
    let banner = sqlx::query_as::<_, Banner>(
        r#"
        INSERT INTO banners (id, title, subtitle, image_url, video_url, link_url, button_text, is_active, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.title)
    .bind(payload.subtitle)
    .bind(payload.image_url)
    .bind(payload.video_url)
    .bind(payload.link_url)
    .bind(payload.button_text.unwrap_or_else(|| DEFAULT_BUTTON_TEXT.to_string()))
    .bind(payload.is_active.unwrap_or(true))
    .bind(payload.sort_order)
    .fetch_one(&state.pool)
    .await?;

    audit(
        &state.pool,
        Some(user.user_id),
        "banner_create",
        "banners",
        serde_json::json!({ "banner_id": banner.id }),
    )
    .await;

    Ok(ApiResponse::ok("Banner created", banner))
}

pub async fn update_banner(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: BannerRequest,
) -> AppResult<ApiResponse<Banner>> {
    ensure_admin(user)?;
    let banner = sqlx::query_as::<_, Banner>(
        r#"
        UPDATE banners SET
            title = $2, subtitle = $3, image_url = $4, video_url = $5, link_url = $6,
            button_text = COALESCE($7, button_text),
            is_active = COALESCE($8, is_active),
            sort_order = $9
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.title)
    .bind(payload.subtitle)
    .bind(payload.image_url)
    .bind(payload.video_url)
    .bind(payload.link_url)
    .bind(payload.button_text)
    .bind(payload.is_active)
    .bind(payload.sort_order)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::ok("Banner updated", banner))
}

pub async fn delete_banner(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = sqlx::query("DELETE FROM banners WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    audit(
        &state.pool,
        Some(user.user_id),
        "banner_delete",
        "banners",
        serde_json::json!({ "banner_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Banner deleted", serde_json::json!({ "id": id })))
}
