use push_core::{NotificationData, NotificationKind};
use reqwest::Url;

use crate::platform::PlatformError;
use crate::service_worker::{ClickedNotification, WindowClient, WorkerScope};

/// In-app screen a notification opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLink {
    Dashboard,
    Notifications,
    Car(String),
}

impl DeepLink {
    /// Inbox kinds win over a car id; anything else lands on the dashboard.
    pub fn for_data(data: Option<&NotificationData>) -> Self {
        let Some(data) = data else {
            return DeepLink::Dashboard;
        };

        let opens_inbox = data
            .kind
            .as_deref()
            .map(|kind| NotificationKind::from(kind).opens_inbox())
            .unwrap_or(false);
        if opens_inbox {
            return DeepLink::Notifications;
        }

        match data.car_id.as_deref() {
            Some(car_id) if !car_id.is_empty() => DeepLink::Car(car_id.to_string()),
            _ => DeepLink::Dashboard,
        }
    }

    pub fn path(&self) -> String {
        match self {
            DeepLink::Dashboard => "/dashboard".to_string(),
            DeepLink::Notifications => "/notifications".to_string(),
            DeepLink::Car(id) => format!("/car/{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Focused { client_id: String, path: String },
    Opened { path: String },
}

/// Picks the window to reuse: a focused same-origin window if there is one,
/// otherwise the first same-origin window in enumeration order.
pub fn pick_window<'a>(windows: &'a [WindowClient], origin: &str) -> Option<&'a WindowClient> {
    let mut same_origin = windows.iter().filter(|w| is_same_origin(&w.url, origin));
    let first = same_origin.next()?;
    if first.focused {
        return Some(first);
    }
    same_origin.find(|w| w.focused).or(Some(first))
}

fn is_same_origin(url: &str, origin: &str) -> bool {
    match Url::parse(url) {
        Ok(url) => url.origin().ascii_serialization() == origin.trim_end_matches('/'),
        Err(_) => false,
    }
}

/// Closes the clicked notification, then brings the app to its deep link.
pub async fn route_click<S>(scope: &S, notification: &ClickedNotification) -> Result<ClickOutcome, PlatformError>
where
    S: WorkerScope + ?Sized,
{
    if let Err(e) = scope.close_notification(&notification.tag).await {
        tracing::warn!("Failed to close notification {}: {}", notification.tag, e);
    }

    let path = DeepLink::for_data(notification.data.as_ref()).path();
    let windows = scope.match_windows(true).await?;

    if let Some(window) = pick_window(&windows, scope.origin()) {
        // Uncontrolled windows reject navigation but can still be focused.
        if let Err(e) = scope.navigate(&window.id, &path).await {
            tracing::warn!("Failed to navigate window {} to {}: {}", window.id, path, e);
        }
        match scope.focus(&window.id).await {
            Ok(()) => {
                tracing::debug!("Reused window {} for {}", window.id, path);
                return Ok(ClickOutcome::Focused {
                    client_id: window.id.clone(),
                    path,
                });
            }
            Err(e) => tracing::warn!("Failed to focus window {}, opening a new one: {}", window.id, e),
        }
    }

    scope.open_window(&path).await?;
    tracing::debug!("Opened new window for {}", path);
    Ok(ClickOutcome::Opened { path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeScope;

    fn data(kind: Option<&str>, car_id: Option<&str>) -> NotificationData {
        NotificationData {
            kind: kind.map(str::to_string),
            car_id: car_id.map(str::to_string),
            ..NotificationData::default()
        }
    }

    fn window(id: &str, url: &str, focused: bool) -> WindowClient {
        WindowClient {
            id: id.to_string(),
            url: url.to_string(),
            focused,
        }
    }

    #[test]
    fn test_deep_links() {
        assert_eq!(DeepLink::for_data(Some(&data(Some("payment"), None))).path(), "/notifications");
        assert_eq!(DeepLink::for_data(Some(&data(Some("inquiry"), Some("abc")))).path(), "/notifications");
        assert_eq!(DeepLink::for_data(Some(&data(Some("sale"), Some("abc")))).path(), "/car/abc");
        assert_eq!(DeepLink::for_data(Some(&data(None, Some("abc")))).path(), "/car/abc");
        assert_eq!(DeepLink::for_data(Some(&data(None, Some("")))).path(), "/dashboard");
        assert_eq!(DeepLink::for_data(Some(&data(None, None))).path(), "/dashboard");
        assert_eq!(DeepLink::for_data(None).path(), "/dashboard");
    }

    #[test]
    fn test_pick_window_prefers_focused_same_origin() {
        let windows = vec![
            window("1", "https://other.example/dashboard", true),
            window("2", "https://app.malikcollection.app/settings", false),
            window("3", "https://app.malikcollection.app/car/9", true),
        ];

        let picked = pick_window(&windows, "https://app.malikcollection.app").unwrap();
        assert_eq!(picked.id, "3");
    }

    #[test]
    fn test_pick_window_falls_back_to_first_match() {
        let windows = vec![
            window("1", "https://app.malikcollection.app/settings", false),
            window("2", "https://app.malikcollection.app/dashboard", false),
        ];

        assert_eq!(pick_window(&windows, "https://app.malikcollection.app").unwrap().id, "1");
        assert!(pick_window(&windows, "https://elsewhere.example").is_none());
    }

    #[test]
    fn test_origin_is_not_a_substring_match() {
        let windows = vec![window("1", "https://evil.example/?next=https://app.malikcollection.app", true)];
        assert!(pick_window(&windows, "https://app.malikcollection.app").is_none());
    }

    #[tokio::test]
    async fn test_click_reuses_open_window() {
        let scope = FakeScope::new("https://app.malikcollection.app");
        scope.add_window(window("w1", "https://app.malikcollection.app/settings", false));

        let clicked = ClickedNotification {
            tag: "n-1".to_string(),
            data: Some(data(Some("payment"), None)),
        };
        let outcome = route_click(&scope, &clicked).await.unwrap();

        assert_eq!(
            outcome,
            ClickOutcome::Focused {
                client_id: "w1".to_string(),
                path: "/notifications".to_string()
            }
        );
        assert_eq!(scope.closed(), vec!["n-1".to_string()]);
        assert_eq!(scope.navigations(), vec![("w1".to_string(), "/notifications".to_string())]);
        assert_eq!(scope.focused(), vec!["w1".to_string()]);
        assert!(scope.opened().is_empty());
    }

    #[tokio::test]
    async fn test_click_opens_window_when_none_match() {
        let scope = FakeScope::new("https://app.malikcollection.app");

        let clicked = ClickedNotification {
            tag: "n-2".to_string(),
            data: Some(data(None, Some("abc"))),
        };
        let outcome = route_click(&scope, &clicked).await.unwrap();

        assert_eq!(outcome, ClickOutcome::Opened { path: "/car/abc".to_string() });
        assert_eq!(scope.opened(), vec!["/car/abc".to_string()]);
    }

    #[tokio::test]
    async fn test_click_focuses_window_that_rejects_navigation() {
        let scope = FakeScope::new("https://app.malikcollection.app");
        scope.add_window(window("w1", "https://app.malikcollection.app/settings", false));
        scope.fail_navigate();

        let clicked = ClickedNotification {
            tag: "n-3".to_string(),
            data: Some(data(Some("reminder"), None)),
        };
        let outcome = route_click(&scope, &clicked).await.unwrap();

        assert_eq!(
            outcome,
            ClickOutcome::Focused {
                client_id: "w1".to_string(),
                path: "/notifications".to_string()
            }
        );
        assert!(scope.navigations().is_empty());
        assert_eq!(scope.focused(), vec!["w1".to_string()]);
        assert!(scope.opened().is_empty());
    }

    #[tokio::test]
    async fn test_click_opens_window_when_focus_fails() {
        let scope = FakeScope::new("https://app.malikcollection.app");
        scope.add_window(window("w1", "https://app.malikcollection.app/settings", false));
        scope.fail_navigate();
        scope.fail_focus();

        let clicked = ClickedNotification {
            tag: "n-4".to_string(),
            data: Some(data(Some("sale"), Some("c-9"))),
        };
        let outcome = route_click(&scope, &clicked).await.unwrap();

        assert_eq!(outcome, ClickOutcome::Opened { path: "/car/c-9".to_string() });
        assert!(scope.focused().is_empty());
        assert_eq!(scope.opened(), vec!["/car/c-9".to_string()]);
    }
}
