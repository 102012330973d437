//! Transient user notifications ("toasts") and the loading-toast guard.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Error,
    Loading,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub level: Level,
    pub message: String,
}

/// What a notifier was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyEvent {
    Show(Notification),
    Dismiss(u64),
}

/// Sink for user-visible notifications.
pub trait Notifier: Send + Sync {
    /// Show a notification and return its id.
    fn show(&self, level: Level, message: &str) -> u64;
    fn dismiss(&self, id: u64);
}

/// Shows an indefinite loading toast and dismisses it exactly once, on drop.
#[must_use = "the toast is dismissed as soon as the guard is dropped"]
pub struct LoadingToast {
    notifier: Arc<dyn Notifier>,
    id: u64,
}

impl LoadingToast {
    pub fn show(notifier: &Arc<dyn Notifier>, message: &str) -> Self {
        let id = notifier.show(Level::Loading, message);
        Self {
            notifier: Arc::clone(notifier),
            id,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for LoadingToast {
    fn drop(&mut self) {
        self.notifier.dismiss(self.id);
    }
}

/// Writes notifications to the log.
#[derive(Debug, Default)]
pub struct TracingNotifier {
    next_id: AtomicU64,
}

impl TracingNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Notifier for TracingNotifier {
    fn show(&self, level: Level, message: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        match level {
            Level::Error => tracing::warn!(toast = id, "{message}"),
            Level::Success | Level::Info => tracing::info!(toast = id, "{message}"),
            Level::Loading => tracing::debug!(toast = id, "{message}"),
        }
        id
    }

    fn dismiss(&self, id: u64) {
        tracing::debug!(toast = id, "Dismissed");
    }
}

/// Forwards notifications over a channel to whatever renders them.
#[derive(Debug)]
pub struct ChannelNotifier {
    next_id: AtomicU64,
    tx: mpsc::UnboundedSender<NotifyEvent>,
}

impl ChannelNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NotifyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                next_id: AtomicU64::new(0),
                tx,
            },
            rx,
        )
    }
}

impl Notifier for ChannelNotifier {
    fn show(&self, level: Level, message: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        // A closed receiver means nobody renders toasts any more.
        let _ = self.tx.send(NotifyEvent::Show(Notification {
            id,
            level,
            message: message.to_string(),
        }));
        id
    }

    fn dismiss(&self, id: u64) {
        let _ = self.tx.send(NotifyEvent::Dismiss(id));
    }
}

/// Drain everything currently queued on a notifier channel.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<NotifyEvent>) -> Vec<NotifyEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
