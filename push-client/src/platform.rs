//! Browser capabilities the subscription manager depends on.
//!
//! Implementations wrap the host's service worker container, push manager
//! and notification APIs. Every call may suspend on a network round trip or
//! a permission prompt.

use async_trait::async_trait;
use push_core::NotificationData;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Notification permission as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub service_worker: bool,
    pub push_manager: bool,
}

impl Capabilities {
    pub fn supports_push(&self) -> bool {
        self.service_worker && self.push_manager
    }
}

/// A push channel opened by the host's push manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushChannel {
    pub endpoint: String,
    pub p256dh: Option<Vec<u8>>,
    pub auth: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Always true: silent pushes are not requested.
    pub user_visible_only: bool,
    pub application_server_key: Vec<u8>,
}

/// Options for a notification raised by the page itself.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocalNotification {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub data: Option<NotificationData>,
}

#[async_trait]
pub trait PushPlatform: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    fn permission(&self) -> Permission;

    /// Shows the permission prompt; resolves once the user answers.
    async fn request_permission(&self) -> Permission;

    async fn register_service_worker(&self, script_url: &str) -> Result<(), PlatformError>;

    /// Resolves when a worker for this page is active.
    async fn service_worker_ready(&self) -> Result<(), PlatformError>;

    async fn get_subscription(&self) -> Result<Option<PushChannel>, PlatformError>;

    async fn subscribe(&self, options: &SubscribeOptions) -> Result<PushChannel, PlatformError>;

    async fn unsubscribe(&self, channel: &PushChannel) -> Result<bool, PlatformError>;

    /// Displays through the active worker registration.
    async fn show_notification(&self, title: &str, notification: &LocalNotification) -> Result<(), PlatformError>;

    /// Constructs a notification directly, without a worker.
    fn show_fallback_notification(&self, title: &str, body: &str, icon: &str) -> Result<(), PlatformError>;
}
