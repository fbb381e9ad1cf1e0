use tokio::sync::broadcast;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    /// A position is open without its take-profit leg.
    Alert,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub severity: Severity,
    pub text: String,
}

/// Fan-out of operator notifications. Sending never blocks the pipeline and a
/// missing subscriber is not an error.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn info(&self, text: String) {
        let _ = self.tx.send(Notification {
            severity: Severity::Info,
            text,
        });
    }

    pub fn alert(&self, text: String) {
        error!(target: "alert", "{}", text);
        let _ = self.tx.send(Notification {
            severity: Severity::Alert,
            text,
        });
    }
}
