//! Wire shape of a Web Push message body.
//!
//! Every field is optional: senders fill in what they know and the
//! receiving worker merges the rest from its defaults.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::types::Notification;

pub const DEFAULT_TITLE: &str = "Malik Collection";
pub const DEFAULT_BODY: &str = "You have a new notification";
pub const DEFAULT_ICON: &str = "/favicon.ico";
pub const DEFAULT_TAG: &str = "notification";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<NotificationData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<NotificationAction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,
}

/// Deep-link metadata attached to a displayed notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(
        rename = "carId",
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub car_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NotificationPayload {
    /// Payload a server-side sender produces for an inbox record.
    pub fn from_record(notification: &Notification) -> Self {
        let id = notification.id.to_string();
        NotificationPayload {
            title: Some(notification.title.clone()),
            body: Some(notification.message.clone()),
            icon: Some(DEFAULT_ICON.to_string()),
            badge: Some(DEFAULT_ICON.to_string()),
            tag: Some(id.clone()),
            data: Some(NotificationData {
                kind: Some(notification.notification_type.clone()),
                car_id: notification.related_car_id.map(|car| car.to_string()),
                id: Some(id),
                extra: Map::new(),
            }),
            actions: None,
            require_interaction: None,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_payload_reads_camel_case_fields() {
        let payload: NotificationPayload = serde_json::from_str(
            r#"{"title":"Car Sold","requireInteraction":true,"data":{"type":"sale","carId":42,"source":"crm"}}"#,
        )
        .unwrap();

        assert_eq!(payload.title.as_deref(), Some("Car Sold"));
        assert_eq!(payload.require_interaction, Some(true));
        let data = payload.data.unwrap();
        assert_eq!(data.kind.as_deref(), Some("sale"));
        assert_eq!(data.car_id.as_deref(), Some("42"));
        assert_eq!(data.extra.get("source"), Some(&Value::String("crm".to_string())));
    }

    #[test]
    fn test_from_record_links_car_and_tag() {
        let car = Uuid::new_v4();
        let record = Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Car Sold".to_string(),
            message: "Civic 2019 was sold".to_string(),
            notification_type: "sale".to_string(),
            is_read: Some(false),
            related_car_id: Some(car),
            created_at: Utc::now(),
        };

        let payload = NotificationPayload::from_record(&record);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["tag"], record.id.to_string());
        assert_eq!(json["data"]["carId"], car.to_string());
        assert_eq!(json["data"]["type"], "sale");
        assert!(json.get("requireInteraction").is_none());
    }
}
