use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Json,
};
use push_core::db::DbConnection;
use push_core::redis::{decrement_unread, get_connection, read_unread, reset_unread};
use push_core::{notifications, subscriptions, PushContext, SubscriptionRequest, UnsubscribeRequest};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "push-api"
    }))
}

async fn db_connection(ctx: &PushContext) -> Result<DbConnection, StatusCode> {
    ctx.db_pool.get().await.map_err(|e| {
        tracing::error!("Failed to get database connection: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

fn internal_error(context: &str, e: anyhow::Error) -> StatusCode {
    tracing::error!("{}: {}", context, e);
    StatusCode::INTERNAL_SERVER_ERROR
}

pub async fn vapid_public_key(Extension(ctx): Extension<PushContext>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "public_key": ctx.config.push.vapid_public_key,
    }))
}

pub async fn me(Extension(user): Extension<AuthenticatedUser>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "user_id": user.user_id }))
}

pub async fn upsert_subscription(
    Extension(ctx): Extension<PushContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<SubscriptionRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if !req.is_complete() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut conn = db_connection(&ctx).await?;
    let record = subscriptions::upsert_subscription(&mut conn, &req.into_record(user.user_id))
        .await
        .map_err(|e| internal_error("Failed to save push subscription", e))?;

    tracing::info!("Saved push subscription {} for user {}", record.id, user.user_id);

    Ok(Json(serde_json::json!({
        "status": "ok",
        "id": record.id,
    })))
}

pub async fn delete_subscription(
    Extension(ctx): Extension<PushContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<UnsubscribeRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if req.endpoint.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut conn = db_connection(&ctx).await?;
    let deleted = subscriptions::delete_subscription(&mut conn, user.user_id, &req.endpoint)
        .await
        .map_err(|e| internal_error("Failed to delete push subscription", e))?;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "deleted": deleted,
    })))
}

#[derive(Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

pub async fn get_notifications(
    Extension(ctx): Extension<PushContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<NotificationQuery>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let (limit, offset) = notifications::page_bounds(params.limit, params.offset);
    let mut conn = db_connection(&ctx).await?;

    let records = notifications::list_for_user(&mut conn, user.user_id, limit, offset)
        .await
        .map_err(|e| internal_error("Failed to load notifications", e))?;

    Ok(Json(serde_json::json!(records)))
}

pub async fn get_notification_counts(
    Extension(ctx): Extension<PushContext>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut redis_conn = get_connection(&ctx.redis_pool)
        .await
        .map_err(|e| internal_error("Failed to get redis connection", e))?;

    let total_unread = match read_unread(&mut redis_conn, &user.user_id.to_string()).await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!("Failed to read unread count: {}", e);
            0
        }
    };

    Ok(Json(serde_json::json!({
        "total_unread": total_unread,
    })))
}

pub async fn mark_notification_read(
    Extension(ctx): Extension<PushContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let notification_id = Uuid::parse_str(&id).map_err(|_| StatusCode::BAD_REQUEST)?;
    let mut conn = db_connection(&ctx).await?;

    let notification = notifications::find_for_user(&mut conn, user.user_id, notification_id)
        .await
        .map_err(|e| internal_error("Failed to load notification", e))?
        .ok_or(StatusCode::NOT_FOUND)?;

    if notification.has_been_read() {
        return Ok(Json(serde_json::json!({"status": "already_read"})));
    }

    notifications::mark_read(&mut conn, notification_id)
        .await
        .map_err(|e| internal_error("Failed to mark notification read", e))?;

    let mut redis_conn = match get_connection(&ctx.redis_pool).await {
        Ok(c) => c,
        Err(_) => return Ok(Json(serde_json::json!({"status": "ok", "warning": "counts_not_updated"}))),
    };

    if let Err(e) = decrement_unread(&mut redis_conn, &user.user_id.to_string()).await {
        tracing::warn!("Failed to decrement unread count for {}: {}", user.user_id, e);
        return Ok(Json(serde_json::json!({"status": "ok", "warning": "counts_not_updated"})));
    }

    Ok(Json(serde_json::json!({"status": "ok"})))
}

pub async fn mark_all_read(
    Extension(ctx): Extension<PushContext>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut conn = db_connection(&ctx).await?;

    let updated = notifications::mark_all_read(&mut conn, user.user_id)
        .await
        .map_err(|e| internal_error("Failed to mark notifications read", e))?;

    let counts_updated = match get_connection(&ctx.redis_pool).await {
        Ok(mut redis_conn) => reset_unread(&mut redis_conn, &user.user_id.to_string()).await.is_ok(),
        Err(_) => false,
    };

    let mut result = serde_json::json!({ "updated": updated });
    if !counts_updated {
        tracing::warn!("Unread count for {} was not reset", user.user_id);
        result["warning"] = serde_json::json!("counts_not_updated");
    }

    Ok(Json(result))
}
