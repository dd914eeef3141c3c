//! Turns an incoming push message into what the worker displays.

use push_core::payload::{DEFAULT_BODY, DEFAULT_ICON, DEFAULT_TAG, DEFAULT_TITLE};
use push_core::{NotificationAction, NotificationData, NotificationPayload};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Vibrate 200ms, pause 100ms, vibrate 200ms.
pub const VIBRATION_PATTERN: [u32; 3] = [200, 100, 200];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
    pub tag: String,
    /// A notification replacing one with the same tag alerts again.
    pub renotify: bool,
    pub require_interaction: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Presentation {
    pub title: String,
    pub options: DisplayOptions,
}

/// Reads the raw push data.
///
/// A JSON object is taken field by field: a field with the wrong type is
/// dropped and falls back to its default, the rest are kept. Any other JSON
/// value leaves every field unset. Data that is not JSON becomes the body text.
pub fn parse_push_data(raw: Option<&[u8]>) -> NotificationPayload {
    let Some(raw) = raw else {
        return NotificationPayload::default();
    };

    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(fields)) => payload_from_fields(fields),
        Ok(_) => NotificationPayload::default(),
        Err(_) => text_payload(raw),
    }
}

fn payload_from_fields(mut fields: Map<String, Value>) -> NotificationPayload {
    NotificationPayload {
        title: take_field(&mut fields, "title"),
        body: take_field(&mut fields, "body"),
        icon: take_field(&mut fields, "icon"),
        badge: take_field(&mut fields, "badge"),
        tag: take_field(&mut fields, "tag"),
        data: match fields.remove("data") {
            Some(Value::Object(data)) => Some(data_from_fields(data)),
            Some(Value::Null) | None => None,
            Some(other) => {
                tracing::debug!("Ignoring push payload data that is not an object: {}", other);
                None
            }
        },
        actions: match fields.remove("actions") {
            Some(Value::Array(entries)) => Some(entries.into_iter().filter_map(action_from_value).collect()),
            Some(Value::Null) | None => None,
            Some(other) => {
                tracing::debug!("Ignoring push payload actions that are not a list: {}", other);
                None
            }
        },
        require_interaction: take_field(&mut fields, "requireInteraction"),
    }
}

fn data_from_fields(mut fields: Map<String, Value>) -> NotificationData {
    NotificationData {
        kind: take_field(&mut fields, "type"),
        car_id: take_id(&mut fields, "carId"),
        id: take_id(&mut fields, "id"),
        extra: fields,
    }
}

fn take_field<T: DeserializeOwned>(fields: &mut Map<String, Value>, name: &str) -> Option<T> {
    let value = fields.remove(name)?;
    match serde_json::from_value::<Option<T>>(value) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Ignoring push payload field {}: {}", name, e);
            None
        }
    }
}

/// Ids arrive as strings or numbers depending on the sender.
fn take_id(fields: &mut Map<String, Value>, name: &str) -> Option<String> {
    match fields.remove(name)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => None,
        other => {
            tracing::debug!("Ignoring push payload field {}: {}", name, other);
            None
        }
    }
}

fn action_from_value(entry: Value) -> Option<NotificationAction> {
    match serde_json::from_value(entry) {
        Ok(action) => Some(action),
        Err(e) => {
            tracing::debug!("Ignoring malformed notification action: {}", e);
            None
        }
    }
}

fn text_payload(raw: &[u8]) -> NotificationPayload {
    NotificationPayload {
        body: Some(String::from_utf8_lossy(raw).into_owned()),
        ..NotificationPayload::default()
    }
}

/// Merges the payload over the defaults; fields present in the payload win.
pub fn present(payload: NotificationPayload) -> Presentation {
    let options = DisplayOptions {
        body: payload.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
        icon: non_empty_or(payload.icon, DEFAULT_ICON),
        badge: non_empty_or(payload.badge, DEFAULT_ICON),
        vibrate: VIBRATION_PATTERN.to_vec(),
        data: payload.data.unwrap_or_default(),
        actions: payload.actions.unwrap_or_default(),
        tag: non_empty_or(payload.tag, DEFAULT_TAG),
        renotify: true,
        require_interaction: payload.require_interaction.unwrap_or(false),
    };

    Presentation {
        title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        options,
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
