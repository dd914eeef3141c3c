//! In-memory stand-ins for the browser and backend, shared by the unit tests.

use async_trait::async_trait;
use push_core::NewPushSubscription;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::backend::{BackendError, SubscriptionBackend};
use crate::notifier::Notifier;
use crate::platform::{
    Capabilities, LocalNotification, Permission, PlatformError, PushChannel, PushPlatform, SubscribeOptions,
};
use crate::presentation::DisplayOptions;
use crate::service_worker::{WindowClient, WorkerScope};

struct PlatformState {
    capabilities: Capabilities,
    permission: Permission,
    prompt_answer: Permission,
    prompts: usize,
    channel: Option<PushChannel>,
    template: PushChannel,
    subscribe_calls: usize,
    unsubscribe_calls: usize,
    last_options: Option<SubscribeOptions>,
    shown: Vec<(String, LocalNotification)>,
    fallbacks: Vec<(String, String, String)>,
    fail_worker_ready: bool,
    fail_worker_display: bool,
}

#[derive(Clone)]
pub struct FakePlatform {
    inner: Arc<Mutex<PlatformState>>,
}

impl FakePlatform {
    /// A fully capable browser whose push manager hands out `endpoint`.
    pub fn new(endpoint: &str) -> Self {
        let template = PushChannel {
            endpoint: endpoint.to_string(),
            p256dh: Some(vec![4; 65]),
            auth: Some(vec![7; 16]),
        };
        Self {
            inner: Arc::new(Mutex::new(PlatformState {
                capabilities: Capabilities {
                    service_worker: true,
                    push_manager: true,
                },
                permission: Permission::Default,
                prompt_answer: Permission::Default,
                prompts: 0,
                channel: None,
                template,
                subscribe_calls: 0,
                unsubscribe_calls: 0,
                last_options: None,
                shown: Vec::new(),
                fallbacks: Vec::new(),
                fail_worker_ready: false,
                fail_worker_display: false,
            })),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut PlatformState) -> T) -> T {
        f(&mut self.inner.lock().unwrap())
    }

    pub fn set_capabilities(&self, capabilities: Capabilities) {
        self.with(|s| s.capabilities = capabilities);
    }

    pub fn set_permission(&self, permission: Permission) {
        self.with(|s| s.permission = permission);
    }

    pub fn answer_prompt(&self, answer: Permission) {
        self.with(|s| s.prompt_answer = answer);
    }

    pub fn drop_channel_auth(&self) {
        self.with(|s| s.template.auth = None);
    }

    pub fn fail_worker_ready(&self) {
        self.with(|s| s.fail_worker_ready = true);
    }

    pub fn fail_worker_display(&self) {
        self.with(|s| s.fail_worker_display = true);
    }

    pub fn prompts(&self) -> usize {
        self.with(|s| s.prompts)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.with(|s| s.subscribe_calls)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.with(|s| s.unsubscribe_calls)
    }

    pub fn channel_p256dh(&self) -> Vec<u8> {
        self.with(|s| s.template.p256dh.clone().unwrap_or_default())
    }

    pub fn last_subscribe_options(&self) -> Option<SubscribeOptions> {
        self.with(|s| s.last_options.clone())
    }

    pub fn shown(&self) -> Vec<(String, LocalNotification)> {
        self.with(|s| s.shown.clone())
    }

    pub fn fallbacks(&self) -> Vec<(String, String, String)> {
        self.with(|s| s.fallbacks.clone())
    }
}

#[async_trait]
impl PushPlatform for FakePlatform {
    fn capabilities(&self) -> Capabilities {
        self.with(|s| s.capabilities)
    }

    fn permission(&self) -> Permission {
        self.with(|s| s.permission)
    }

    async fn request_permission(&self) -> Permission {
        self.with(|s| {
            if s.permission == Permission::Default {
                s.prompts += 1;
                s.permission = s.prompt_answer;
            }
            s.permission
        })
    }

    async fn register_service_worker(&self, _script_url: &str) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn service_worker_ready(&self) -> Result<(), PlatformError> {
        if self.with(|s| s.fail_worker_ready) {
            Err(PlatformError::new("no active service worker"))
        } else {
            Ok(())
        }
    }

    async fn get_subscription(&self) -> Result<Option<PushChannel>, PlatformError> {
        Ok(self.with(|s| s.channel.clone()))
    }

    async fn subscribe(&self, options: &SubscribeOptions) -> Result<PushChannel, PlatformError> {
        Ok(self.with(|s| {
            s.subscribe_calls += 1;
            s.last_options = Some(options.clone());
            let channel = s.channel.clone().unwrap_or_else(|| s.template.clone());
            s.channel = Some(channel.clone());
            channel
        }))
    }

    async fn unsubscribe(&self, _channel: &PushChannel) -> Result<bool, PlatformError> {
        Ok(self.with(|s| {
            s.unsubscribe_calls += 1;
            s.channel.take().is_some()
        }))
    }

    async fn show_notification(&self, title: &str, notification: &LocalNotification) -> Result<(), PlatformError> {
        self.with(|s| {
            if s.fail_worker_display {
                return Err(PlatformError::new("worker display failed"));
            }
            s.shown.push((title.to_string(), notification.clone()));
            Ok(())
        })
    }

    fn show_fallback_notification(&self, title: &str, body: &str, icon: &str) -> Result<(), PlatformError> {
        self.with(|s| {
            s.fallbacks
                .push((title.to_string(), body.to_string(), icon.to_string()));
        });
        Ok(())
    }
}

#[derive(Default)]
struct BackendState {
    user: Option<Uuid>,
    records: BTreeMap<String, NewPushSubscription>,
    upserts: usize,
    deletes: Vec<String>,
    upsert_error: Option<String>,
    delete_error: Option<String>,
}

/// Subscription table keyed by endpoint, like the real upsert target.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<BackendState>>,
}

impl MemoryBackend {
    pub fn with_user(user_id: Uuid) -> Self {
        let backend = Self::default();
        backend.inner.lock().unwrap().user = Some(user_id);
        backend
    }

    pub fn user(&self) -> Option<Uuid> {
        self.inner.lock().unwrap().user
    }

    pub fn records(&self) -> Vec<NewPushSubscription> {
        self.inner.lock().unwrap().records.values().cloned().collect()
    }

    pub fn upserts(&self) -> usize {
        self.inner.lock().unwrap().upserts
    }

    pub fn deletes(&self) -> Vec<String> {
        self.inner.lock().unwrap().deletes.clone()
    }

    pub fn fail_upserts(&self, message: &str) {
        self.inner.lock().unwrap().upsert_error = Some(message.to_string());
    }

    pub fn fail_deletes(&self, message: &str) {
        self.inner.lock().unwrap().delete_error = Some(message.to_string());
    }
}

#[async_trait]
impl SubscriptionBackend for MemoryBackend {
    async fn current_user(&self) -> Result<Option<Uuid>, BackendError> {
        Ok(self.user())
    }

    async fn upsert_subscription(&self, subscription: &NewPushSubscription) -> Result<(), BackendError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(message) = &state.upsert_error {
            return Err(BackendError::new(message.clone()));
        }
        state.upserts += 1;
        state
            .records
            .insert(subscription.endpoint.clone(), subscription.clone());
        Ok(())
    }

    async fn delete_subscription(&self, endpoint: &str) -> Result<(), BackendError> {
        let mut state = self.inner.lock().unwrap();
        state.deletes.push(endpoint.to_string());
        if let Some(message) = &state.delete_error {
            return Err(BackendError::new(message.clone()));
        }
        state.records.remove(endpoint);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    successes: Arc<Mutex<Vec<String>>>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.successes.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
struct ScopeState {
    windows: Vec<WindowClient>,
    shown: Vec<(String, DisplayOptions)>,
    closed: Vec<String>,
    navigations: Vec<(String, String)>,
    focused: Vec<String>,
    opened: Vec<String>,
    skipped_waiting: bool,
    claimed: bool,
    fail_skip_waiting: bool,
    fail_claim: bool,
    fail_navigate: bool,
    fail_focus: bool,
}

#[derive(Clone)]
pub struct FakeScope {
    origin: String,
    inner: Arc<Mutex<ScopeState>>,
}

impl FakeScope {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            inner: Arc::new(Mutex::new(ScopeState::default())),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut ScopeState) -> T) -> T {
        f(&mut self.inner.lock().unwrap())
    }

    pub fn add_window(&self, window: WindowClient) {
        self.with(|s| s.windows.push(window));
    }

    pub fn fail_skip_waiting(&self) {
        self.with(|s| s.fail_skip_waiting = true);
    }

    pub fn fail_claim(&self) {
        self.with(|s| s.fail_claim = true);
    }

    pub fn fail_navigate(&self) {
        self.with(|s| s.fail_navigate = true);
    }

    pub fn fail_focus(&self) {
        self.with(|s| s.fail_focus = true);
    }

    pub fn skipped_waiting(&self) -> bool {
        self.with(|s| s.skipped_waiting)
    }

    pub fn claimed(&self) -> bool {
        self.with(|s| s.claimed)
    }

    pub fn shown(&self) -> Vec<(String, DisplayOptions)> {
        self.with(|s| s.shown.clone())
    }

    pub fn closed(&self) -> Vec<String> {
        self.with(|s| s.closed.clone())
    }

    pub fn navigations(&self) -> Vec<(String, String)> {
        self.with(|s| s.navigations.clone())
    }

    pub fn focused(&self) -> Vec<String> {
        self.with(|s| s.focused.clone())
    }

    pub fn opened(&self) -> Vec<String> {
        self.with(|s| s.opened.clone())
    }
}

#[async_trait]
impl WorkerScope for FakeScope {
    fn origin(&self) -> &str {
        &self.origin
    }

    async fn skip_waiting(&self) -> Result<(), PlatformError> {
        self.with(|s| {
            if s.fail_skip_waiting {
                return Err(PlatformError::new("skipWaiting rejected"));
            }
            s.skipped_waiting = true;
            Ok(())
        })
    }

    async fn claim_clients(&self) -> Result<(), PlatformError> {
        self.with(|s| {
            if s.fail_claim {
                return Err(PlatformError::new("claim rejected"));
            }
            s.claimed = true;
            Ok(())
        })
    }

    async fn show_notification(&self, title: &str, options: &DisplayOptions) -> Result<(), PlatformError> {
        self.with(|s| s.shown.push((title.to_string(), options.clone())));
        Ok(())
    }

    async fn close_notification(&self, tag: &str) -> Result<(), PlatformError> {
        self.with(|s| s.closed.push(tag.to_string()));
        Ok(())
    }

    async fn match_windows(&self, _include_uncontrolled: bool) -> Result<Vec<WindowClient>, PlatformError> {
        Ok(self.with(|s| s.windows.clone()))
    }

    async fn navigate(&self, client_id: &str, path: &str) -> Result<(), PlatformError> {
        self.with(|s| {
            if s.fail_navigate {
                return Err(PlatformError::new("TypeError: client is not controlled"));
            }
            s.navigations.push((client_id.to_string(), path.to_string()));
            Ok(())
        })
    }

    async fn focus(&self, client_id: &str) -> Result<(), PlatformError> {
        self.with(|s| {
            if s.fail_focus {
                return Err(PlatformError::new("InvalidAccessError: not allowed to focus"));
            }
            s.focused.push(client_id.to_string());
            Ok(())
        })
    }

    async fn open_window(&self, path: &str) -> Result<(), PlatformError> {
        self.with(|s| s.opened.push(path.to_string()));
        Ok(())
    }
}
