use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::DbConnection;
use crate::schema::push_subscriptions;
use crate::types::{NewPushSubscription, PushSubscription};

/// Inserts or overwrites the record for `subscription.endpoint`.
///
/// The endpoint is the conflict target, so re-subscribing the same channel
/// never produces a second row; the last writer's user and keys win.
pub async fn upsert_subscription(
    conn: &mut DbConnection,
    subscription: &NewPushSubscription,
) -> anyhow::Result<PushSubscription> {
    let record = diesel::insert_into(push_subscriptions::table)
        .values(subscription)
        .on_conflict(push_subscriptions::endpoint)
        .do_update()
        .set((
            push_subscriptions::user_id.eq(excluded(push_subscriptions::user_id)),
            push_subscriptions::p256dh.eq(excluded(push_subscriptions::p256dh)),
            push_subscriptions::auth.eq(excluded(push_subscriptions::auth)),
        ))
        .returning(PushSubscription::as_returning())
        .get_result(conn)
        .await?;

    Ok(record)
}

/// Removes the caller's record for `endpoint`; returns the number of rows
/// deleted (zero when there was nothing to remove).
pub async fn delete_subscription(
    conn: &mut DbConnection,
    user_id: Uuid,
    endpoint: &str,
) -> anyhow::Result<usize> {
    let deleted = diesel::delete(
        push_subscriptions::table
            .filter(push_subscriptions::endpoint.eq(endpoint))
            .filter(push_subscriptions::user_id.eq(user_id)),
    )
    .execute(conn)
    .await?;

    Ok(deleted)
}

/// Drops a record the push service reported as expired, regardless of owner.
pub async fn delete_stale_endpoint(conn: &mut DbConnection, endpoint: &str) -> anyhow::Result<usize> {
    let deleted = diesel::delete(push_subscriptions::table.filter(push_subscriptions::endpoint.eq(endpoint)))
        .execute(conn)
        .await?;

    Ok(deleted)
}

pub async fn subscriptions_for_user(
    conn: &mut DbConnection,
    user_id: Uuid,
) -> anyhow::Result<Vec<PushSubscription>> {
    let records = push_subscriptions::table
        .filter(push_subscriptions::user_id.eq(user_id))
        .order(push_subscriptions::created_at.asc())
        .select(PushSubscription::as_select())
        .load(conn)
        .await?;

    Ok(records)
}
