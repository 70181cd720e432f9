//! Transient user-facing notifications.

use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Success => "success", Self::Error => "error", Self::Info => "info" }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub id: Uuid,
    pub message: String,
    pub severity: Severity,
    pub expires_at: Instant,
}

/// Stack of independent toasts, each expiring on its own timer.
#[derive(Debug)]
pub struct ToastBoard {
    ttl: Duration,
    toasts: Mutex<Vec<Toast>>,
}

impl ToastBoard {
    pub fn new(ttl: Duration) -> Self { Self { ttl, toasts: Mutex::new(Vec::new()) } }

    /// Drops expired toasts and returns the rest, oldest first.
    pub fn active(&self) -> Vec<Toast> {
        let now = Instant::now();
        let mut toasts = self.toasts.lock().unwrap_or_else(PoisonError::into_inner);
        toasts.retain(|t| t.expires_at > now);
        toasts.clone()
    }

    pub fn dismiss(&self, id: Uuid) {
        self.toasts.lock().unwrap_or_else(PoisonError::into_inner).retain(|t| t.id != id);
    }
}

impl Notifier for ToastBoard {
    fn notify(&self, message: &str, severity: Severity) {
        LogNotifier.notify(message, severity);
        let toast = Toast { id: Uuid::new_v4(), message: message.to_string(), severity, expires_at: Instant::now() + self.ttl };
        self.toasts.lock().unwrap_or_else(PoisonError::into_inner).push(toast);
    }
}

/// Writes notifications to the log. `ToastBoard` mirrors every toast here;
/// on its own it serves callers with no page to draw on.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Error => error!(target: "storefront::notify", "{message}"),
            Severity::Success | Severity::Info => info!(target: "storefront::notify", severity = severity.as_str(), "{message}"),
        }
    }
}
