//! Broadcast loop counters

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct BroadcastStats {
    wakeups: AtomicU64,
    /// Wakeups that found the queue empty
    idle_wakeups: AtomicU64,
    notifications: AtomicU64,
    messages_sent: AtomicU64,
    send_failures: AtomicU64,
    /// Notifications no live client was listening for
    unmatched: AtomicU64,
}

impl BroadcastStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inc_wakeups(&self) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_idle_wakeups(&self) {
        self.idle_wakeups.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_notifications(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_messages_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_send_failures(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_unmatched(&self) {
        self.unmatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            wakeups: self.wakeups.load(Ordering::Relaxed),
            idle_wakeups: self.idle_wakeups.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub wakeups: u64,
    pub idle_wakeups: u64,
    pub notifications: u64,
    pub messages_sent: u64,
    pub send_failures: u64,
    pub unmatched: u64,
}
