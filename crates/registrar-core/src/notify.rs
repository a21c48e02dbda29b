//! Transient user notifications.
//!
//! Forms and views push messages here instead of failing; the front-end
//! shows the newest live message and lets older ones expire.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

/// How long a notification stays visible.
const DEFAULT_TTL: Duration = Duration::from_secs(5);

/// Upper bound on queued notifications; the oldest are dropped first.
const MAX_NOTIFICATIONS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    pub created_at: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }
}

/// Shared notification queue. Clones push into the same queue.
#[derive(Debug, Clone)]
pub struct Notifier {
    queue: Arc<Mutex<VecDeque<Notification>>>,
    ttl: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, level: Level, message: impl Into<String>) {
        let message = message.into();
        debug!(?level, %message, "Notification");
        let mut queue = self.lock();
        queue.push_back(Notification {
            level,
            message,
            created_at: Instant::now(),
        });
        while queue.len() > MAX_NOTIFICATIONS {
            queue.pop_front();
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(Level::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(Level::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(Level::Error, message);
    }

    /// Drop expired notifications and return the newest live one.
    pub fn current(&self, now: Instant) -> Option<Notification> {
        let mut queue = self.lock();
        let ttl = self.ttl;
        queue.retain(|n| !n.is_expired(now, ttl));
        queue.back().cloned()
    }

    /// Every queued notification, oldest first.
    pub fn all(&self) -> Vec<Notification> {
        self.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
