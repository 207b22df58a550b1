use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    dto::{
        catalog::{CategoryDetail, CategoryList, ColorSearchRequest, ColorSearchResult, HomeView, ProductDetail, ProductList},
        reviews::{ReviewList, ReviewRequest},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Review,
    response::ApiResponse,
    routes::params::{ProductQuery, SearchQuery},
    services::{catalog_service, review_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/home", get(home))
        .route("/categories", get(list_categories))
        .route("/categories/{slug}", get(category_detail))
        .route("/products", get(list_products))
        .route("/products/{slug}", get(product_detail))
        .route("/products/{slug}/reviews", get(list_reviews).post(upsert_review))
        .route("/search", get(search))
        .route("/search/color", post(search_by_color))
}

#[utoipa::path(
    get,
    path = "/api/catalog/home",
    responses(
        (status = 200, description = "Latest products, categories, banners and top deals", body = ApiResponse<HomeView>)
    ),
    tag = "Catalog"
)]
pub async fn home(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> AppResult<Json<ApiResponse<HomeView>>> {
    Ok(Json(catalog_service::home(&state, user).await?))
}

#[utoipa::path(
    get,
    path = "/api/catalog/categories",
    responses(
        (status = 200, description = "All categories", body = ApiResponse<CategoryList>)
    ),
    tag = "Catalog"
)]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<ApiResponse<CategoryList>>> {
    Ok(Json(catalog_service::list_categories(&state).await?))
}

#[utoipa::path(
    get,
    path = "/api/catalog/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category with its active products", body = ApiResponse<CategoryDetail>),
        (status = 404, description = "Category not found")
    ),
    tag = "Catalog"
)]
pub async fn category_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<CategoryDetail>>> {
    Ok(Json(catalog_service::category_detail(&state, &slug).await?))
}

#[utoipa::path(
    get,
    path = "/api/catalog/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Paginated active products", body = ApiResponse<ProductList>)
    ),
    tag = "Catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(catalog_service::list_products(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/catalog/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product with variants, images and reviews", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Product not found")
    ),
    tag = "Catalog"
)]
pub async fn product_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    Ok(Json(catalog_service::product_detail(&state, &slug).await?))
}

#[utoipa::path(
    get,
    path = "/api/catalog/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Products whose name or description match", body = ApiResponse<ProductList>)
    ),
    tag = "Catalog"
)]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(catalog_service::search(&state, query).await?))
}

#[utoipa::path(
    post,
    path = "/api/catalog/search/color",
    request_body = ColorSearchRequest,
    responses(
        (status = 200, description = "Products with a variant in the nearest palette colour", body = ApiResponse<ColorSearchResult>),
        (status = 400, description = "No colour supplied")
    ),
    tag = "Catalog"
)]
pub async fn search_by_color(
    State(state): State<AppState>,
    Json(payload): Json<ColorSearchRequest>,
) -> AppResult<Json<ApiResponse<ColorSearchResult>>> {
    Ok(Json(catalog_service::search_by_color(&state, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/catalog/products/{slug}/reviews",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Reviews with rating summary", body = ApiResponse<ReviewList>),
        (status = 404, description = "Product not found")
    ),
    tag = "Reviews"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    Ok(Json(review_service::list_reviews(&state, &slug).await?))
}

#[utoipa::path(
    post,
    path = "/api/catalog/products/{slug}/reviews",
    params(("slug" = String, Path, description = "Product slug")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review created or replaced", body = ApiResponse<Review>),
        (status = 400, description = "Rating outside 1..5")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn upsert_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<ReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    Ok(Json(review_service::upsert_review(&state, &user, &slug, payload).await?))
}
