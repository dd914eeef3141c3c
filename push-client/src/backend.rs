use async_trait::async_trait;
use push_core::{NewPushSubscription, SubscriptionRequest, UnsubscribeRequest};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Identity and subscription storage offered by the managed backend.
#[async_trait]
pub trait SubscriptionBackend: Send + Sync {
    /// The signed-in user, or `None` when the session is anonymous.
    async fn current_user(&self) -> Result<Option<Uuid>, BackendError>;

    /// Writes the record keyed by its endpoint, replacing any previous one.
    async fn upsert_subscription(&self, subscription: &NewPushSubscription) -> Result<(), BackendError>;

    async fn delete_subscription(&self, endpoint: &str) -> Result<(), BackendError>;
}

#[derive(Deserialize)]
struct MeResponse {
    user_id: Uuid,
}

/// Talks to `push-api` with the session's bearer token.
pub struct HttpSubscriptionBackend {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpSubscriptionBackend {
    pub fn new(base_url: &str, access_token: Option<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BackendError::new(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::new(format!("Backend returned {}: {}", status, body)))
    }
}

#[async_trait]
impl SubscriptionBackend for HttpSubscriptionBackend {
    async fn current_user(&self) -> Result<Option<Uuid>, BackendError> {
        if self.access_token.is_none() {
            return Ok(None);
        }

        let response = self
            .authorized(self.client.get(self.url("/api/v1/me")))
            .send()
            .await
            .map_err(|e| BackendError::new(e.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }

        let me: MeResponse = Self::expect_success(response)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::new(e.to_string()))?;
        Ok(Some(me.user_id))
    }

    async fn upsert_subscription(&self, subscription: &NewPushSubscription) -> Result<(), BackendError> {
        let response = self
            .authorized(self.client.post(self.url("/api/v1/push-subscriptions")))
            .json(&SubscriptionRequest::from(subscription))
            .send()
            .await
            .map_err(|e| BackendError::new(e.to_string()))?;

        Self::expect_success(response).await?;
        Ok(())
    }

    async fn delete_subscription(&self, endpoint: &str) -> Result<(), BackendError> {
        let response = self
            .authorized(self.client.delete(self.url("/api/v1/push-subscriptions")))
            .json(&UnsubscribeRequest {
                endpoint: endpoint.to_string(),
            })
            .send()
            .await
            .map_err(|e| BackendError::new(e.to_string()))?;

        Self::expect_success(response).await?;
        Ok(())
    }
}
