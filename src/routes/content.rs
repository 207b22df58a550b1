use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::content::{BannerList, NewsletterRequest, NewsletterResponse, StoreInfo},
    error::AppResult,
    response::ApiResponse,
    services::content_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/store", get(store_info))
        .route("/banners", get(list_banners))
        .route("/newsletter", post(subscribe))
}

#[utoipa::path(
    get,
    path = "/api/content/store",
    responses(
        (status = 200, description = "Store identity and pricing constants", body = ApiResponse<StoreInfo>)
    ),
    tag = "Content"
)]
pub async fn store_info(State(state): State<AppState>) -> Json<ApiResponse<StoreInfo>> {
    Json(content_service::store_info(&state))
}

#[utoipa::path(
    get,
    path = "/api/content/banners",
    responses(
        (status = 200, description = "Active banners", body = ApiResponse<BannerList>)
    ),
    tag = "Content"
)]
pub async fn list_banners(State(state): State<AppState>) -> AppResult<Json<ApiResponse<BannerList>>> {
    Ok(Json(content_service::list_banners(&state).await?))
}

#[utoipa::path(
    post,
    path = "/api/content/newsletter",
    request_body = NewsletterRequest,
    responses(
        (status = 200, description = "Subscribed; `created` is false when already present", body = ApiResponse<NewsletterResponse>),
        (status = 400, description = "Invalid email")
    ),
    tag = "Content"
)]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(payload): Json<NewsletterRequest>,
) -> AppResult<Json<ApiResponse<NewsletterResponse>>> {
    Ok(Json(content_service::subscribe(&state, payload).await?))
}
