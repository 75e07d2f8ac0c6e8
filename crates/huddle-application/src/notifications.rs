//! Transient toast notifications.
//!
//! Every notification is visible for the configured lifetime and then
//! dismissed automatically. A bounded history is kept for inspection.

use huddle_core::notification::{Notification, NotificationLevel, Notifier};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const HISTORY_LIMIT: usize = 100;

#[derive(Default)]
struct Toasts {
    active: Vec<Notification>,
    history: VecDeque<Notification>,
}

/// Notifier that keeps active toasts and dismisses them after `ttl`.
#[derive(Clone)]
pub struct NotificationCenter {
    toasts: Arc<Mutex<Toasts>>,
    ttl: Duration,
}

impl NotificationCenter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            toasts: Arc::new(Mutex::new(Toasts::default())),
            ttl,
        }
    }

    /// Toasts currently on screen, oldest first.
    pub fn active(&self) -> Vec<Notification> {
        self.lock().active.clone()
    }

    /// Everything shown so far, oldest first.
    pub fn history(&self) -> Vec<Notification> {
        self.lock().history.iter().cloned().collect()
    }

    /// Message texts of the history, handy for assertions and logs.
    pub fn messages(&self) -> Vec<String> {
        self.lock()
            .history
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }

    pub fn last(&self) -> Option<Notification> {
        self.lock().history.back().cloned()
    }

    pub fn dismiss(&self, id: &str) {
        self.lock().active.retain(|n| n.id != id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Toasts> {
        self.toasts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Notifier for NotificationCenter {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => {
                tracing::warn!("[NotificationCenter] {}", notification.message)
            }
            _ => tracing::info!("[NotificationCenter] {}", notification.message),
        }

        let id = notification.id.clone();
        {
            let mut toasts = self.lock();
            toasts.active.push(notification.clone());
            toasts.history.push_back(notification);
            while toasts.history.len() > HISTORY_LIMIT {
                toasts.history.pop_front();
            }
        }

        // Outside a runtime the toast simply stays until dismissed.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let center = self.clone();
            let ttl = self.ttl;
            handle.spawn(async move {
                tokio::time::sleep(ttl).await;
                center.dismiss(&id);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_toast_is_dismissed_after_ttl() {
        let center = NotificationCenter::new(Duration::from_millis(4000));
        center.notify(Notification::success("Saved"));
        assert_eq!(center.active().len(), 1);

        tokio::time::sleep(Duration::from_millis(3999)).await;
        assert_eq!(center.active().len(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(center.active().is_empty());
        assert_eq!(center.messages(), vec!["Saved".to_string()]);
    }

    #[test]
    fn test_notify_without_runtime_keeps_toast() {
        let center = NotificationCenter::new(Duration::from_millis(3000));
        center.notify(Notification::error("Failed"));
        let active = center.active();
        assert_eq!(active.len(), 1);

        center.dismiss(&active[0].id);
        assert!(center.active().is_empty());
        assert_eq!(center.last().map(|n| n.level), Some(NotificationLevel::Error));
    }
}
