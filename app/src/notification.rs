//! Transient user-facing notifications (toasts).
//!
//! Reducers append; the shell drains and renders them.

use serde::Serialize;
use std::collections::VecDeque;

/// Visual weight of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationVariant {
    /// Informational or success.
    #[default]
    Default,
    /// Failure.
    Destructive,
}

/// A toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Short heading.
    pub title: String,
    /// Body text.
    pub description: String,
    /// Visual weight.
    pub variant: NotificationVariant,
}

impl Notification {
    /// Success or informational notification.
    #[must_use]
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NotificationVariant::Default,
        }
    }

    /// Failure notification.
    #[must_use]
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NotificationVariant::Destructive,
        }
    }

    /// `true` for [`NotificationVariant::Destructive`].
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.variant == NotificationVariant::Destructive
    }
}

/// FIFO of notifications not yet shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationQueue {
    pending: VecDeque<Notification>,
}

impl NotificationQueue {
    /// Append a notification.
    pub fn push(&mut self, notification: Notification) {
        tracing::debug!(
            title = %notification.title,
            error = notification.is_error(),
            "Notification queued"
        );
        self.pending.push_back(notification);
    }

    /// Remove and return all pending notifications, oldest first.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.pending.drain(..).collect()
    }

    /// Remove the `count` oldest notifications (those already shown).
    pub fn dismiss(&mut self, count: usize) {
        let count = count.min(self.pending.len());
        self.pending.drain(..count);
    }

    /// Pending notifications, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.pending.iter()
    }

    /// The most recent notification, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Notification> {
        self.pending.back()
    }

    /// Number of pending notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// `true` when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let mut queue = NotificationQueue::default();
        queue.push(Notification::error("Error", "first"));
        queue.push(Notification::info("Success", "second"));

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].description, "first");
        assert!(drained[0].is_error());
        assert!(!drained[1].is_error());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dismiss_keeps_newer_items() {
        let mut queue = NotificationQueue::default();
        queue.push(Notification::info("Success", "shown"));
        queue.push(Notification::info("Success", "arrived later"));

        queue.dismiss(1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.last().map(|n| n.description.as_str()), Some("arrived later"));

        queue.dismiss(5);
        assert!(queue.is_empty());
    }
}
