//! User-facing notifications (the toast surface).

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: Option<String>,
}

impl Notification {
    pub fn success(title: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Success, title: title.into(), message: None }
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Info, title: title.into(), message: None }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            message: Some(message.into()),
        }
    }
}

/// Sink for notifications. Must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        let message = n.message.as_deref().unwrap_or("");
        match n.level {
            NotificationLevel::Error => tracing::warn!(title = %n.title, message, "notification"),
            _ => tracing::info!(title = %n.title, message, "notification"),
        }
    }
}

/// Queues notifications for inspection (tests, headless UI).
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    queue: Mutex<VecDeque<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything queued so far.
    pub fn drain(&self) -> Vec<Notification> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.drain(..).collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(notification);
    }
}
