//! Timed, auto-dismissing status messages.
//!
//! Each entry runs its own dismissal task: visible for the configured TTL,
//! then fading, then removed. Entries are independent of one another and the
//! queue has no cap.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::config::NotificationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Visible,
    /// Fade transition running; removed when it ends.
    Fading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub phase: Phase,
    pub created_at: Instant,
}

#[derive(Default)]
struct QueueState {
    next_id: u64,
    entries: Vec<Notification>,
}

/// Shared handle to the notification list. Clones see the same entries.
#[derive(Clone)]
pub struct NotificationQueue {
    state: Arc<Mutex<QueueState>>,
    config: NotificationConfig,
}

impl NotificationQueue {
    pub fn new(config: NotificationConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            config,
        }
    }

    /// Append an entry and schedule its dismissal. Returns the entry id.
    pub fn enqueue(&self, message: impl Into<String>, severity: Severity) -> u64 {
        let message = message.into();
        match severity {
            Severity::Success | Severity::Info => info!(severity = severity.as_str(), %message, "notification"),
            Severity::Warning => warn!(%message, "notification"),
            Severity::Error => error!(%message, "notification"),
        }

        let id = {
            let mut state = self.lock();
            state.next_id += 1;
            let id = state.next_id;
            state.entries.push(Notification {
                id,
                message,
                severity,
                phase: Phase::Visible,
                created_at: Instant::now(),
            });
            id
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let queue = self.clone();
                handle.spawn(async move {
                    sleep(queue.config.ttl).await;
                    queue.set_phase(id, Phase::Fading);
                    sleep(queue.config.fade).await;
                    queue.dismiss(id);
                });
            }
            Err(_) => debug!(id, "no runtime, notification will not auto-dismiss"),
        }
        id
    }

    /// Remove an entry now. Returns whether it was still present.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|n| n.id != id);
        state.entries.len() != before
    }

    /// Current entries in insertion order.
    pub fn entries(&self) -> Vec<Notification> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Number of current entries with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|n| n.severity == severity)
            .count()
    }

    fn set_phase(&self, id: u64, phase: Phase) {
        if let Some(entry) = self.lock().entries.iter_mut().find(|n| n.id == id) {
            entry.phase = phase;
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
