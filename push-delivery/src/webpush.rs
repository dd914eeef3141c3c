use anyhow::{anyhow, Result};
use push_core::config::PushConfig;
use push_core::{decode_key, encrypt_payload, EncryptionError, KeyCodecError, NotificationPayload, PushSubscription, VapidError, VapidSigner};
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebPushError {
    #[error("invalid subscription key: {0}")]
    Key(#[from] KeyCodecError),
    #[error(transparent)]
    Encryption(#[from] EncryptionError),
    #[error(transparent)]
    Vapid(#[from] VapidError),
    #[error("failed to serialize payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("push request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result of one push request, by the push service's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The subscription expired or was revoked; its record should go.
    Gone,
    Failed(StatusCode),
}

pub fn classify_status(status: StatusCode) -> DeliveryOutcome {
    if status.is_success() {
        DeliveryOutcome::Delivered
    } else if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        DeliveryOutcome::Gone
    } else {
        DeliveryOutcome::Failed(status)
    }
}

pub struct WebPushDelivery {
    client: reqwest::Client,
    signer: Option<VapidSigner>,
    ttl_seconds: u32,
}

impl WebPushDelivery {
    pub fn new(config: &PushConfig) -> Result<Self> {
        let signer = match &config.vapid_private_key_pem {
            Some(pem) => {
                tracing::info!("Initializing Web Push delivery");
                let signer = VapidSigner::from_pem(pem, &config.vapid_subject)?;
                if !signer.matches_public_key(&config.vapid_public_key) {
                    tracing::warn!(
                        "VAPID private key does not match VAPID_PUBLIC_KEY; clients subscribed with {} will reject pushes",
                        config.vapid_public_key
                    );
                }
                Some(signer)
            }
            None => {
                tracing::warn!("Web Push delivery disabled (missing VAPID_PRIVATE_KEY_PEM)");
                None
            }
        };

        Self::with_signer(signer, config.ttl_seconds)
    }

    pub fn with_signer(signer: Option<VapidSigner>, ttl_seconds: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            signer,
            ttl_seconds,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.signer.is_some()
    }

    /// Encrypts `payload` for `subscription` and signs the request.
    pub fn build_request(
        &self,
        signer: &VapidSigner,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
        now: u64,
    ) -> Result<reqwest::Request, WebPushError> {
        let ua_public = decode_key(&subscription.p256dh)?;
        let auth_secret = decode_key(&subscription.auth)?;

        let plaintext = serde_json::to_vec(payload)?;
        let body = encrypt_payload(&plaintext, &ua_public, &auth_secret)?;
        let authorization = signer.authorization(&subscription.endpoint, now)?;

        let request = self
            .client
            .post(&subscription.endpoint)
            .header("TTL", self.ttl_seconds.to_string())
            .header("Urgency", "normal")
            .header(CONTENT_ENCODING, "aes128gcm")
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(AUTHORIZATION, authorization)
            .body(body)
            .build()?;

        Ok(request)
    }

    pub async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<Option<DeliveryOutcome>, WebPushError> {
        let Some(signer) = &self.signer else {
            tracing::debug!("Web Push not configured, skipping");
            return Ok(None);
        };

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let request = self.build_request(signer, subscription, payload, now)?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        let outcome = classify_status(status);
        if let DeliveryOutcome::Failed(_) = outcome {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                "Push service returned {} for subscription {}: {}",
                status,
                subscription.id,
                error_text
            );
        }

        Ok(Some(outcome))
    }
}
