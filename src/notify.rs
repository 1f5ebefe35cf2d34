//! User-visible notifications.
//!
//! Mutations report their outcome here. Every notification is logged and
//! broadcast; the CLI prints them, tests assert on them.

use tokio::sync::broadcast;

/// Capacity of the notification channel. Slow receivers lose the oldest.
pub const DEFAULT_CAPACITY: usize = 32;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Notification {
    /// `true` for [`NotificationLevel::Success`].
    pub fn is_success(&self) -> bool {
        self.level == NotificationLevel::Success
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Broadcasts notifications. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier {
    /// Notifier buffering up to `capacity` messages per receiver.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every notification published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Publish a success message.
    pub fn success(&self, message: impl Into<String>) {
        self.publish(Notification {
            level: NotificationLevel::Success,
            message: message.into(),
        });
    }

    /// Publish an error message.
    pub fn error(&self, message: impl Into<String>) {
        self.publish(Notification {
            level: NotificationLevel::Error,
            message: message.into(),
        });
    }

    fn publish(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => tracing::info!("{}", notification.message),
            NotificationLevel::Error => tracing::warn!("{}", notification.message),
        }
        // Having no receivers is fine.
        let _ = self.sender.send(notification);
    }
}
