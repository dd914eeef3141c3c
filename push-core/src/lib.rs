pub mod config;
#[cfg(feature = "server")]
pub mod context;
#[cfg(feature = "server")]
pub mod db;
#[cfg(feature = "server")]
pub mod encryption;
pub mod key_codec;
#[cfg(feature = "server")]
pub mod notifications;
pub mod payload;
#[cfg(feature = "server")]
pub mod redis;
#[cfg(feature = "server")]
pub mod redpanda;
#[cfg(feature = "server")]
pub mod schema;
#[cfg(feature = "server")]
pub mod subscriptions;
pub mod types;
#[cfg(feature = "server")]
pub mod vapid;

pub use config::Config;
#[cfg(feature = "server")]
pub use context::PushContext;
#[cfg(feature = "server")]
pub use db::DbPool;
#[cfg(feature = "server")]
pub use encryption::{encrypt_payload, EncryptionError};
pub use key_codec::{decode_key, encode_key, url_base64_to_bytes, KeyCodecError};
pub use payload::{NotificationAction, NotificationData, NotificationPayload};
#[cfg(feature = "server")]
pub use redis::RedisPool;
#[cfg(feature = "server")]
pub use redpanda::{RedpandaConsumer, RedpandaProducer};
pub use types::{
    DeliveryJob, NewNotification, NewPushSubscription, Notification, NotificationKind, PushSubscription,
    SubscriptionRequest, UnsubscribeRequest,
};
#[cfg(feature = "server")]
pub use vapid::{VapidError, VapidSigner};
