//! User-facing notifications.
//!
//! The broadcaster and [`crate::ZapClient`] report progress through an
//! injected [`NotificationSink`] rather than a global toast channel, so tests
//! and embedders decide where messages go.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{error, info};

pub const TX_SUCCESS: &str = "Transaction is executed successfully!";
pub const TX_FAILED:  &str = "Transaction failed!";
pub const ZAP_FAILED: &str = "Zap failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind:        NotificationKind,
    pub message:     String,
    pub description: Option<String>,
    /// Signature of the transaction the notification is about, if any.
    pub txid:        Option<String>,
}

impl Notification {
    pub fn success(
        message: impl Into<String>,
        description: Option<String>,
        txid: Option<String>,
    ) -> Self {
        Self { kind: NotificationKind::Success, message: message.into(), description, txid }
    }

    pub fn error(
        message: impl Into<String>,
        description: Option<String>,
        txid: Option<String>,
    ) -> Self {
        Self { kind: NotificationKind::Error, message: message.into(), description, txid }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<S: NotificationSink + ?Sized> NotificationSink for &S {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

impl<S: NotificationSink + ?Sized> NotificationSink for Arc<S> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

/// Emits every notification as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, n: Notification) {
        let description = n.description.as_deref().unwrap_or("");
        let txid = n.txid.as_deref().unwrap_or("");
        match n.kind {
            NotificationKind::Success => info!(txid, description, "{}", n.message),
            NotificationKind::Error   => error!(txid, description, "{}", n.message),
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    received: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.received.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn error_count(&self) -> usize {
        self.notifications().iter().filter(|n| n.is_error()).count()
    }

    pub fn success_count(&self) -> usize {
        self.notifications().iter().filter(|n| !n.is_error()).count()
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, notification: Notification) {
        if let Ok(mut received) = self.received.lock() {
            received.push(notification);
        }
    }
}
