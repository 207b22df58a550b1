use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::notifications::{NotificationList, UnreadCount},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Notification,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub const LEVEL_INFO: &str = "info";
pub const LEVEL_SUCCESS: &str = "success";
pub const LEVEL_PROMO: &str = "promo";

async fn insert(
    pool: &DbPool,
    user_id: Option<Uuid>,
    title: &str,
    message: &str,
    link_url: &str,
    level: &str,
) -> AppResult<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO notifications (id, user_id, title, message, link_url, level)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(link_url)
    .bind(level)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// A notification every user sees.
pub async fn broadcast(pool: &DbPool, title: &str, message: &str, link_url: &str, level: &str) -> AppResult<Uuid> {
    insert(pool, None, title, message, link_url, level).await
}

pub async fn notify_user(
    pool: &DbPool,
    user_id: Uuid,
    title: &str,
    message: &str,
    link_url: &str,
    level: &str,
) -> AppResult<Uuid> {
    insert(pool, Some(user_id), title, message, link_url, level).await
}

/// Fire-and-log variant used by flows where a failed notification must not fail the request.
pub async fn broadcast_quietly(pool: &DbPool, title: &str, message: &str, link_url: &str, level: &str) {
    if let Err(err) = broadcast(pool, title, message, link_url, level).await {
        tracing::warn!(error = %err, title, "broadcast notification failed");
    }
}

pub async fn notify_user_quietly(pool: &DbPool, user_id: Uuid, title: &str, message: &str, link_url: &str, level: &str) {
    if let Err(err) = notify_user(pool, user_id, title, message, link_url, level).await {
        tracing::warn!(error = %err, %user_id, title, "user notification failed");
    }
}

pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = pagination.normalize();
    let items = sqlx::query_as::<_, Notification>(
        r#"
        SELECT n.id, n.user_id, n.title, n.message, n.link_url, n.level, n.created_at,
               (r.notification_id IS NOT NULL) AS is_read
        FROM notifications n
        LEFT JOIN notification_reads r ON r.notification_id = n.id AND r.user_id = $1
        WHERE n.user_id = $1 OR n.user_id IS NULL
        ORDER BY n.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 OR user_id IS NULL",
    )
    .bind(user.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Notifications",
        NotificationList { items },
        Some(Meta::new(page, limit, total.0)),
    ))
}

pub async fn unread_count(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UnreadCount>> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM notifications n
        WHERE (n.user_id = $1 OR n.user_id IS NULL)
          AND NOT EXISTS (
            SELECT 1 FROM notification_reads r
            WHERE r.notification_id = n.id AND r.user_id = $1
          )
        "#,
    )
    .bind(user.user_id)
    .fetch_one(&state.pool)
    .await?;
    Ok(ApiResponse::ok("Unread", UnreadCount { count }))
}

pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let visible: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM notifications WHERE id = $1 AND (user_id = $2 OR user_id IS NULL)",
    )
    .bind(id)
    .bind(user.user_id)
    .fetch_optional(&state.pool)
    .await?;
    if visible.is_none() {
        return Err(AppError::NotFound);
    }

    sqlx::query(
        "INSERT INTO notification_reads (notification_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(user.user_id)
    .execute(&state.pool)
    .await?;

    Ok(ApiResponse::ok("Marked read", serde_json::json!({ "id": id })))
}

pub async fn mark_all_read(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query(
        r#"
        INSERT INTO notification_reads (notification_id, user_id)
        SELECT n.id, $1 FROM notifications n
        WHERE n.user_id = $1 OR n.user_id IS NULL
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(user.user_id)
    .execute(&state.pool)
    .await?;

    Ok(ApiResponse::ok(
        "Marked all read",
        serde_json::json!({ "marked": result.rows_affected() }),
    ))
}
