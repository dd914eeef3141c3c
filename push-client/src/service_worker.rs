//! Background worker: install/activate lifecycle, push display and click
//! handling.

use async_trait::async_trait;
use push_core::NotificationData;
use std::fmt;
use thiserror::Error;

use crate::click_router::{route_click, ClickOutcome};
use crate::platform::PlatformError;
use crate::presentation::{parse_push_data, present, DisplayOptions, Presentation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Unregistered,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Unregistered => "unregistered",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Cannot {action} while worker is {state}")]
    InvalidTransition { action: &'static str, state: WorkerState },
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// An open window of the app, as enumerated by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
    pub focused: bool,
}

/// The notification the user activated.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickedNotification {
    pub tag: String,
    pub data: Option<NotificationData>,
}

/// Host facilities available inside the worker's global scope.
#[async_trait]
pub trait WorkerScope: Send + Sync {
    /// Origin of the app, e.g. `https://app.example.com`.
    fn origin(&self) -> &str;

    async fn skip_waiting(&self) -> Result<(), PlatformError>;

    async fn claim_clients(&self) -> Result<(), PlatformError>;

    async fn show_notification(&self, title: &str, options: &DisplayOptions) -> Result<(), PlatformError>;

    async fn close_notification(&self, tag: &str) -> Result<(), PlatformError>;

    async fn match_windows(&self, include_uncontrolled: bool) -> Result<Vec<WindowClient>, PlatformError>;

    async fn navigate(&self, client_id: &str, path: &str) -> Result<(), PlatformError>;

    async fn focus(&self, client_id: &str) -> Result<(), PlatformError>;

    async fn open_window(&self, path: &str) -> Result<(), PlatformError>;
}

pub struct ServiceWorker<S> {
    scope: S,
    state: WorkerState,
}

impl<S: WorkerScope> ServiceWorker<S> {
    pub fn new(scope: S) -> Self {
        Self {
            scope,
            state: WorkerState::Unregistered,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn scope(&self) -> &S {
        &self.scope
    }

    /// Installs and skips the waiting phase so the new worker takes over
    /// without a reload.
    pub async fn install(&mut self) -> Result<(), LifecycleError> {
        self.expect_state("install", WorkerState::Unregistered)?;
        self.state = WorkerState::Installing;
        tracing::info!("Service worker installing");

        match self.scope.skip_waiting().await {
            Ok(()) => {
                self.state = WorkerState::Installed;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Service worker install failed: {}", e);
                self.state = WorkerState::Redundant;
                Err(e.into())
            }
        }
    }

    /// Activates and claims every open client. A failed claim only delays
    /// control until the next navigation.
    pub async fn activate(&mut self) -> Result<(), LifecycleError> {
        self.expect_state("activate", WorkerState::Installed)?;
        self.state = WorkerState::Activating;
        tracing::info!("Service worker activating");

        if let Err(e) = self.scope.claim_clients().await {
            tracing::warn!("Failed to claim clients: {}", e);
        }

        self.state = WorkerState::Activated;
        Ok(())
    }

    /// Shows exactly one notification per push. The event is complete only
    /// once the display call has resolved.
    pub async fn handle_push(&self, data: Option<&[u8]>) -> Result<Presentation, LifecycleError> {
        self.expect_state("handle push", WorkerState::Activated)?;
        tracing::debug!("Push received ({} bytes)", data.map(<[u8]>::len).unwrap_or(0));

        let presentation = present(parse_push_data(data));
        self.scope
            .show_notification(&presentation.title, &presentation.options)
            .await?;
        Ok(presentation)
    }

    pub async fn handle_click(&self, notification: &ClickedNotification) -> Result<ClickOutcome, LifecycleError> {
        self.expect_state("handle click", WorkerState::Activated)?;
        tracing::debug!("Notification clicked: {}", notification.tag);
        Ok(route_click(&self.scope, notification).await?)
    }

    pub fn handle_close(&self, notification: &ClickedNotification) {
        tracing::debug!("Notification closed: {}", notification.tag);
    }

    fn expect_state(&self, action: &'static str, expected: WorkerState) -> Result<(), LifecycleError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeScope;

    async fn activated(scope: FakeScope) -> ServiceWorker<FakeScope> {
        let mut worker = ServiceWorker::new(scope);
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        worker
    }

    #[tokio::test]
    async fn test_lifecycle_reaches_activated() {
        let scope = FakeScope::new("https://app.malikcollection.app");
        let mut worker = ServiceWorker::new(scope.clone());
        assert_eq!(worker.state(), WorkerState::Unregistered);

        worker.install().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Installed);
        assert!(scope.skipped_waiting());

        worker.activate().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Activated);
        assert!(scope.claimed());
    }

    #[tokio::test]
    async fn test_activate_before_install_is_rejected() {
        let mut worker = ServiceWorker::new(FakeScope::new("https://app.malikcollection.app"));
        let err = worker.activate().await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidTransition {
                state: WorkerState::Unregistered,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_failed_install_is_redundant() {
        let scope = FakeScope::new("https://app.malikcollection.app");
        scope.fail_skip_waiting();
        let mut worker = ServiceWorker::new(scope);

        assert!(worker.install().await.is_err());
        assert_eq!(worker.state(), WorkerState::Redundant);
    }

    #[tokio::test]
    async fn test_claim_failure_still_activates() {
        let scope = FakeScope::new("https://app.malikcollection.app");
        scope.fail_claim();
        let worker = activated(scope).await;
        assert_eq!(worker.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_push_shows_exactly_one_notification() {
        let scope = FakeScope::new("https://app.malikcollection.app");
        let worker = activated(scope.clone()).await;

        worker.handle_push(Some(b"{not json")).await.unwrap();

        let shown = scope.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].0, "Malik Collection");
        assert_eq!(shown[0].1.body, "{not json");
    }

    #[tokio::test]
    async fn test_push_without_data_uses_defaults() {
        let scope = FakeScope::new("https://app.malikcollection.app");
        let worker = activated(scope.clone()).await;

        let presentation = worker.handle_push(None).await.unwrap();
        assert_eq!(presentation.options.body, "You have a new notification");
        assert_eq!(scope.shown().len(), 1);
    }

    #[tokio::test]
    async fn test_push_before_activation_is_rejected() {
        let scope = FakeScope::new("https://app.malikcollection.app");
        let worker = ServiceWorker::new(scope.clone());

        assert!(worker.handle_push(None).await.is_err());
        assert!(scope.shown().is_empty());
    }

    #[tokio::test]
    async fn test_click_routes_through_worker() {
        let scope = FakeScope::new("https://app.malikcollection.app");
        let worker = activated(scope.clone()).await;

        let outcome = worker
            .handle_click(&ClickedNotification {
                tag: "notification".to_string(),
                data: None,
            })
            .await
            .unwrap();

        assert_eq!(outcome, ClickOutcome::Opened { path: "/dashboard".to_string() });
        assert_eq!(scope.closed(), vec!["notification".to_string()]);
    }
}
