use chrono::{DateTime, Utc};
#[cfg(feature = "server")]
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[cfg(feature = "server")]
use crate::schema::{notifications, push_subscriptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(Queryable, Selectable), diesel(table_name = push_subscriptions))]
pub struct PushSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub created_at: DateTime<Utc>,
}

/// Subscription record as written by a client; `endpoint` is the upsert key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(Insertable), diesel(table_name = push_subscriptions))]
pub struct NewPushSubscription {
    pub user_id: Uuid,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(Queryable, Selectable), diesel(table_name = notifications))]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub is_read: Option<bool>,
    pub related_car_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn has_been_read(&self) -> bool {
        self.is_read.unwrap_or(false)
    }

    pub fn kind(&self) -> NotificationKind {
        NotificationKind::from(self.notification_type.as_str())
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "server", derive(Insertable), diesel(table_name = notifications))]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub related_car_id: Option<Uuid>,
}

/// Body a client sends to register its push channel; the owner is the
/// authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

impl SubscriptionRequest {
    pub fn is_complete(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.p256dh.trim().is_empty() && !self.auth.trim().is_empty()
    }

    pub fn into_record(self, user_id: Uuid) -> NewPushSubscription {
        NewPushSubscription {
            user_id,
            endpoint: self.endpoint,
            p256dh: self.p256dh,
            auth: self.auth,
        }
    }
}

impl From<&NewPushSubscription> for SubscriptionRequest {
    fn from(record: &NewPushSubscription) -> Self {
        SubscriptionRequest {
            endpoint: record.endpoint.clone(),
            p256dh: record.p256dh.clone(),
            auth: record.auth.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

/// Business category of a notification record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Inquiry,
    Payment,
    Reminder,
    Sale,
    Other(String),
}

impl NotificationKind {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationKind::Inquiry => "inquiry",
            NotificationKind::Payment => "payment",
            NotificationKind::Reminder => "reminder",
            NotificationKind::Sale => "sale",
            NotificationKind::Other(other) => other,
        }
    }

    /// Kinds whose notifications deep-link to the inbox rather than a car.
    pub fn opens_inbox(&self) -> bool {
        matches!(
            self,
            NotificationKind::Inquiry | NotificationKind::Payment | NotificationKind::Reminder
        )
    }
}

impl From<&str> for NotificationKind {
    fn from(value: &str) -> Self {
        match value {
            "inquiry" => NotificationKind::Inquiry,
            "payment" => NotificationKind::Payment,
            "reminder" => NotificationKind::Reminder,
            "sale" => NotificationKind::Sale,
            other => NotificationKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message on the delivery topic: one notification to fan out to every
/// subscription of `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryJob {
    pub user_id: Uuid,
    pub notification: Notification,
}
