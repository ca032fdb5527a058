// ── User-visible notifications ──
//
// The toast channel: coordinators and account flows publish, front ends
// subscribe and render. Publishing with no subscriber is not an error.

use serde::Serialize;
use strum::Display;
use tokio::sync::broadcast;
use tracing::debug;

const NOTIFICATION_CHANNEL_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_SIZE);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn publish(&self, level: Level, message: impl Into<String>) {
        let message = message.into();
        debug!(%level, "notify: {message}");
        let _ = self.tx.send(Notification { level, message });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(Level::Success, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(Level::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.publish(Level::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(Level::Error, message);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_in_order() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        notifier.success("Book created");
        notifier.error("Failed to delete book");

        assert_eq!(
            rx.try_recv().unwrap(),
            Notification {
                level: Level::Success,
                message: "Book created".into()
            }
        );
        assert_eq!(rx.try_recv().unwrap().level, Level::Error);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        Notifier::new().info("nobody listening");
    }
}
