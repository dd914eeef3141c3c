use push_core::KeyCodecError;
use thiserror::Error;

use crate::backend::BackendError;
use crate::platform::PlatformError;

/// Failures of the subscription manager. `Display` is the message shown to
/// the user.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("Push notifications are not supported in this browser")]
    Unsupported,
    #[error("Notification permission denied")]
    PermissionDenied,
    #[error("Failed to get subscription keys")]
    MissingKeys,
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("{0}")]
    Platform(#[from] PlatformError),
    #[error("{0}")]
    Backend(#[from] BackendError),
    #[error("Invalid application server key: {0}")]
    KeyCodec(#[from] KeyCodecError),
}

impl PushError {
    /// Falls back to a generic message when the underlying error has none.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            "Failed to enable notifications".to_string()
        } else {
            message
        }
    }
}
