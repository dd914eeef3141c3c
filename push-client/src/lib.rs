//! Page-side and worker-side halves of Web Push for the Malik Collection app.

pub mod backend;
pub mod click_router;
pub mod error;
pub mod manager;
pub mod notifier;
pub mod platform;
pub mod presentation;
pub mod service_worker;

#[cfg(test)]
mod testing;

pub use backend::{BackendError, HttpSubscriptionBackend, SubscriptionBackend};
pub use click_router::{route_click, ClickOutcome, DeepLink};
pub use error::PushError;
pub use manager::{PushState, PushSubscriptionManager, SERVICE_WORKER_SCRIPT};
pub use notifier::{LogNotifier, Notifier};
pub use platform::{Capabilities, LocalNotification, Permission, PlatformError, PushChannel, PushPlatform, SubscribeOptions};
pub use presentation::{parse_push_data, present, DisplayOptions, Presentation};
pub use service_worker::{ClickedNotification, LifecycleError, ServiceWorker, WindowClient, WorkerScope};
