use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::DbConnection;
use crate::schema::notifications;
use crate::types::{NewNotification, Notification};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

pub async fn insert_notification(
    conn: &mut DbConnection,
    notification: &NewNotification,
) -> anyhow::Result<Notification> {
    let record = diesel::insert_into(notifications::table)
        .values(notification)
        .returning(Notification::as_returning())
        .get_result(conn)
        .await?;

    Ok(record)
}

/// Newest first.
pub async fn list_for_user(
    conn: &mut DbConnection,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Notification>> {
    let records = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .order(notifications::created_at.desc())
        .limit(limit)
        .offset(offset)
        .select(Notification::as_select())
        .load(conn)
        .await?;

    Ok(records)
}

pub async fn find_for_user(
    conn: &mut DbConnection,
    user_id: Uuid,
    id: Uuid,
) -> anyhow::Result<Option<Notification>> {
    let record = notifications::table
        .filter(notifications::id.eq(id))
        .filter(notifications::user_id.eq(user_id))
        .select(Notification::as_select())
        .first(conn)
        .await
        .optional()?;

    Ok(record)
}

pub async fn mark_read(conn: &mut DbConnection, id: Uuid) -> anyhow::Result<usize> {
    let updated = diesel::update(notifications::table.filter(notifications::id.eq(id)))
        .set(notifications::is_read.eq(Some(true)))
        .execute(conn)
        .await?;

    Ok(updated)
}

/// Marks every unread record of the user as read; returns how many changed.
pub async fn mark_all_read(conn: &mut DbConnection, user_id: Uuid) -> anyhow::Result<usize> {
    let updated = diesel::update(
        notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::is_read.is_distinct_from(true)),
    )
    .set(notifications::is_read.eq(Some(true)))
    .execute(conn)
    .await?;

    Ok(updated)
}

/// Clamps client supplied paging to the supported window.
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}
