use push_core::config::DEFAULT_VAPID_PUBLIC_KEY;
use push_core::payload::{DEFAULT_ICON, DEFAULT_TAG};
use push_core::{encode_key, url_base64_to_bytes, NewPushSubscription, NotificationData};
use tokio::sync::Mutex;

use crate::backend::SubscriptionBackend;
use crate::error::PushError;
use crate::notifier::Notifier;
use crate::platform::{LocalNotification, Permission, PushChannel, PushPlatform, SubscribeOptions};

pub const SERVICE_WORKER_SCRIPT: &str = "/sw.js";

/// Snapshot of the page's push status, refreshed on mount and after every
/// mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushState {
    pub is_supported: bool,
    pub is_subscribed: bool,
    pub permission: Permission,
    pub loading: bool,
}

pub struct PushSubscriptionManager<P, B, N> {
    platform: P,
    backend: B,
    notifier: N,
    application_server_key: String,
    state: Mutex<PushState>,
}

impl<P, B, N> PushSubscriptionManager<P, B, N>
where
    P: PushPlatform,
    B: SubscriptionBackend,
    N: Notifier,
{
    pub fn new(platform: P, backend: B, notifier: N) -> Self {
        Self {
            platform,
            backend,
            notifier,
            application_server_key: DEFAULT_VAPID_PUBLIC_KEY.to_string(),
            state: Mutex::new(PushState::default()),
        }
    }

    /// Overrides the base64url application server key used for new channels.
    pub fn with_application_server_key(mut self, key: impl Into<String>) -> Self {
        self.application_server_key = key.into();
        self
    }

    pub async fn state(&self) -> PushState {
        *self.state.lock().await
    }

    /// Samples support and permission, registers the worker and reads the
    /// current channel.
    pub async fn mount(&self) -> PushState {
        let is_supported = self.platform.capabilities().supports_push();
        {
            let mut state = self.state.lock().await;
            state.is_supported = is_supported;
            state.permission = self.platform.permission();
        }

        if is_supported {
            if let Err(e) = self.platform.register_service_worker(SERVICE_WORKER_SCRIPT).await {
                tracing::error!("Service worker registration failed: {}", e);
            }
            self.check_subscription().await;
        }

        self.state().await
    }

    /// Whether a push channel is currently open. Failures read as `false`.
    pub async fn check_subscription(&self) -> bool {
        let is_subscribed = match self.read_subscription().await {
            Ok(channel) => channel.is_some(),
            Err(e) => {
                tracing::warn!("Error checking push subscription: {}", e);
                false
            }
        };

        self.state.lock().await.is_subscribed = is_subscribed;
        is_subscribed
    }

    async fn read_subscription(&self) -> Result<Option<PushChannel>, PushError> {
        self.ensure_supported()?;
        self.platform.service_worker_ready().await?;
        Ok(self.platform.get_subscription().await?)
    }

    /// Opens a push channel and records it for the signed-in user.
    pub async fn subscribe(&self) -> bool {
        if !self.begin().await {
            tracing::debug!("Subscribe ignored while another operation is running");
            return false;
        }

        let subscribed = match self.open_and_persist().await {
            Ok(record) => {
                tracing::info!("Push subscription saved for user {}", record.user_id);
                self.notifier.success("Push notifications enabled!");
                true
            }
            Err(e) => {
                tracing::error!("Error subscribing to push: {}", e);
                self.notifier.error(&e.user_message());
                false
            }
        };

        self.finish(subscribed).await;
        subscribed
    }

    async fn open_and_persist(&self) -> Result<NewPushSubscription, PushError> {
        self.ensure_supported()?;

        if self.platform.request_permission().await != Permission::Granted {
            return Err(PushError::PermissionDenied);
        }

        self.platform.register_service_worker(SERVICE_WORKER_SCRIPT).await?;
        self.platform.service_worker_ready().await?;

        let options = SubscribeOptions {
            user_visible_only: true,
            application_server_key: url_base64_to_bytes(&self.application_server_key)?,
        };
        let channel = self.platform.subscribe(&options).await?;

        let record = match self.build_record(&channel).await {
            Ok(record) => record,
            Err(e) => {
                self.close_channel(&channel).await;
                return Err(e);
            }
        };

        self.backend.upsert_subscription(&record).await?;
        Ok(record)
    }

    async fn build_record(&self, channel: &PushChannel) -> Result<NewPushSubscription, PushError> {
        let (Some(p256dh), Some(auth)) = (&channel.p256dh, &channel.auth) else {
            return Err(PushError::MissingKeys);
        };

        let user_id = self
            .backend
            .current_user()
            .await?
            .ok_or(PushError::NotAuthenticated)?;

        Ok(NewPushSubscription {
            user_id,
            endpoint: channel.endpoint.clone(),
            p256dh: encode_key(p256dh),
            auth: encode_key(auth),
        })
    }

    async fn close_channel(&self, channel: &PushChannel) {
        if let Err(e) = self.platform.unsubscribe(channel).await {
            tracing::warn!("Failed to close unusable push channel: {}", e);
        }
    }

    /// Closes the current channel and deletes its record. Having nothing to
    /// close counts as success.
    pub async fn unsubscribe(&self) -> bool {
        if !self.begin().await {
            tracing::debug!("Unsubscribe ignored while another operation is running");
            return false;
        }

        let unsubscribed = match self.close_and_forget().await {
            Ok(()) => {
                self.notifier.success("Push notifications disabled");
                true
            }
            Err(e) => {
                tracing::error!("Error unsubscribing from push: {}", e);
                self.notifier.error("Failed to disable notifications");
                false
            }
        };

        self.finish(unsubscribed).await;
        unsubscribed
    }

    async fn close_and_forget(&self) -> Result<(), PushError> {
        let Some(channel) = self.read_subscription().await? else {
            return Ok(());
        };

        self.platform.unsubscribe(&channel).await?;

        match self.backend.current_user().await {
            Ok(Some(_)) => {
                if let Err(e) = self.backend.delete_subscription(&channel.endpoint).await {
                    tracing::warn!("Failed to delete push subscription record: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Could not resolve user for subscription cleanup: {}", e),
        }

        Ok(())
    }

    /// Raises a notification from the page. Returns `false` without error
    /// when permission is refused.
    pub async fn show_local_notification(&self, title: &str, body: &str, data: Option<NotificationData>) -> bool {
        let mut permission = self.platform.permission();
        if permission != Permission::Granted {
            permission = self.platform.request_permission().await;
            self.state.lock().await.permission = permission;
        }
        if permission != Permission::Granted {
            return false;
        }

        let tag = data
            .as_ref()
            .and_then(|d| d.id.as_deref())
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_TAG)
            .to_string();
        let notification = LocalNotification {
            body: body.to_string(),
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_ICON.to_string(),
            tag,
            data,
        };

        match self.show_through_worker(title, &notification).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Worker notification failed, using fallback: {}", e);
                match self.platform.show_fallback_notification(title, body, DEFAULT_ICON) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!("Fallback notification failed: {}", e);
                        false
                    }
                }
            }
        }
    }

    async fn show_through_worker(&self, title: &str, notification: &LocalNotification) -> Result<(), PushError> {
        if !self.platform.capabilities().service_worker {
            return Err(PushError::Unsupported);
        }
        self.platform.service_worker_ready().await?;
        self.platform.show_notification(title, notification).await?;
        Ok(())
    }

    fn ensure_supported(&self) -> Result<(), PushError> {
        if self.platform.capabilities().supports_push() {
            Ok(())
        } else {
            Err(PushError::Unsupported)
        }
    }

    async fn begin(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.loading {
            return false;
        }
        state.loading = true;
        true
    }

    /// Clears the loading flag and re-reads platform state. A failed
    /// operation only re-reads the permission.
    async fn finish(&self, succeeded: bool) {
        if succeeded {
            self.check_subscription().await;
        }
        let mut state = self.state.lock().await;
        state.permission = self.platform.permission();
        state.loading = false;
    }
}
