use anyhow::{anyhow, Result};
use async_trait::async_trait;
use push_core::redis::{get_connection, increment_unread};
use push_core::redpanda::{produce_json, DELIVERY_TOPIC};
use push_core::{notifications, DeliveryJob, NewNotification, Notification, NotificationKind, PushContext};
use serde_json::Value;
use uuid::Uuid;

/// Steps that turn a built record into an inbox entry and a push.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create_notification(&self, notification: &NewNotification) -> Result<Notification>;
    async fn increment_unread_count(&self, user_id: Uuid) -> Result<()>;
    async fn emit_delivery_job(&self, notification: Notification) -> Result<()>;
}

/// Stores the record, bumps the unread counter and queues delivery. The
/// counter is best-effort: once the record exists its push still goes out.
pub async fn dispatch<S>(sink: &S, new_notification: &NewNotification) -> Result<()>
where
    S: NotificationSink + ?Sized,
{
    let notification = sink.create_notification(new_notification).await?;

    if let Err(e) = sink.increment_unread_count(notification.user_id).await {
        tracing::warn!(
            "Failed to increment unread count for user {}: {}",
            notification.user_id,
            e
        );
    }

    sink.emit_delivery_job(notification).await
}

pub struct NotificationService {
    ctx: PushContext,
}

impl NotificationService {
    pub fn new(ctx: PushContext) -> Self {
        Self { ctx }
    }

    pub async fn process_event(&self, event_type: &str, event_data: &Value) -> Result<()> {
        tracing::debug!("Processing notification event: {}", event_type);

        let new_notification = build_notification(event_type, event_data)?;
        dispatch(self, &new_notification).await
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    async fn create_notification(&self, notification: &NewNotification) -> Result<Notification> {
        let mut conn = self.ctx.db_pool.get().await?;
        let record = notifications::insert_notification(&mut conn, notification).await?;
        tracing::info!(
            "Created {} notification {} for user {}",
            record.notification_type,
            record.id,
            record.user_id
        );
        Ok(record)
    }

    async fn increment_unread_count(&self, user_id: Uuid) -> Result<()> {
        let mut conn = get_connection(&self.ctx.redis_pool).await?;
        increment_unread(&mut conn, &user_id.to_string()).await?;
        Ok(())
    }

    async fn emit_delivery_job(&self, notification: Notification) -> Result<()> {
        let user_id = notification.user_id;
        let job = DeliveryJob { user_id, notification };
        produce_json(&self.ctx.redpanda_producer, DELIVERY_TOPIC, &user_id.to_string(), &job).await
    }
}

/// The user the event is addressed to (`event_data.user_id`).
pub fn extract_recipient(event_data: &Value) -> Result<Uuid> {
    let user_id = event_data
        .get("user_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Missing user_id in event data"))?;

    Uuid::parse_str(user_id).map_err(|e| anyhow!("Invalid user_id {}: {}", user_id, e))
}

fn related_car(event_data: &Value) -> Option<Uuid> {
    event_data
        .get("car_id")
        .and_then(|v| v.as_str())
        .and_then(|id| Uuid::parse_str(id).ok())
}

pub fn kind_for_event(event_type: &str) -> NotificationKind {
    match event_type {
        "inquiry.created" => NotificationKind::Inquiry,
        "payment.due" => NotificationKind::Payment,
        "reminder.due" => NotificationKind::Reminder,
        "car.sold" => NotificationKind::Sale,
        other => NotificationKind::Other(other.to_string()),
    }
}

fn text<'a>(event_data: &'a Value, field: &str) -> Option<&'a str> {
    event_data
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

fn car_label(event_data: &Value) -> String {
    match (text(event_data, "make"), text(event_data, "model")) {
        (Some(make), Some(model)) => format!("{} {}", make, model),
        _ => text(event_data, "car_name").unwrap_or("your car").to_string(),
    }
}

fn amount(event_data: &Value) -> Option<String> {
    match event_data.get("amount")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

pub fn format_notification(event_type: &str, event_data: &Value) -> (String, String) {
    match kind_for_event(event_type) {
        NotificationKind::Inquiry => {
            let customer = text(event_data, "customer_name").unwrap_or("A customer");
            let inquiry_type = text(event_data, "inquiry_type").unwrap_or("an inquiry");
            (
                "New Inquiry".to_string(),
                format!("{} sent {} about {}", customer, inquiry_type, car_label(event_data)),
            )
        }
        NotificationKind::Payment => {
            let customer = text(event_data, "customer_name").unwrap_or("A customer");
            let message = match amount(event_data) {
                Some(amount) => format!("{} has a pending payment of Rs {} for {}", customer, amount, car_label(event_data)),
                None => format!("{} has a pending payment for {}", customer, car_label(event_data)),
            };
            ("Payment Pending".to_string(), message)
        }
        NotificationKind::Reminder => {
            let message = text(event_data, "message")
                .map(str::to_string)
                .unwrap_or_else(|| format!("You have a reminder for {}", car_label(event_data)));
            ("Reminder".to_string(), message)
        }
        NotificationKind::Sale => (
            "Car Sold".to_string(),
            format!("{} has been marked as sold", car_label(event_data)),
        ),
        NotificationKind::Other(_) => {
            tracing::warn!("Unknown event type for notification formatting: {}", event_type);
            (
                "Notification".to_string(),
                "You have a new notification".to_string(),
            )
        }
    }
}

/// Builds the inbox record for an event; unknown event types still produce a
/// generic record.
pub fn build_notification(event_type: &str, event_data: &Value) -> Result<NewNotification> {
    let user_id = extract_recipient(event_data)?;
    let (title, message) = format_notification(event_type, event_data);

    Ok(NewNotification {
        user_id,
        title,
        message,
        notification_type: kind_for_event(event_type).as_str().to_string(),
        related_car_id: related_car(event_data),
    })
}
