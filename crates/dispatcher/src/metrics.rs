//! Forwarding counters for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use observability::{RunningStats, StatsSummary};
use parking_lot::Mutex;

/// Counters shared by every dispatch of one `ForwardDispatcher`
#[derive(Debug, Default)]
pub struct ForwardMetrics {
    /// Events fanned out
    events: AtomicU64,
    /// Deliveries currently waiting on a permit or a response
    in_flight: AtomicUsize,
    /// 2xx responses
    success_count: AtomicU64,
    /// Non-2xx responses
    non_success_count: AtomicU64,
    /// No response at all
    failure_count: AtomicU64,
    /// Forward records the store refused
    record_failure_count: AtomicU64,
    notifications_accepted: AtomicU64,
    notifications_deduplicated: AtomicU64,
    /// Delivery latency in milliseconds (responses only)
    latency_ms: Mutex<RunningStats>,
}

impl ForwardMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_events(&self) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn delivery_started(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivery_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a delivery that produced an HTTP response
    pub fn record_response(&self, status: u16, latency_ms: f64) {
        if (200..300).contains(&status) {
            self.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.non_success_count.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_ms.lock().push(latency_ms);
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_record_failure_count(&self) {
        self.record_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification(&self, accepted: bool) {
        if accepted {
            self.notifications_accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.notifications_deduplicated
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events: self.events.load(Ordering::Relaxed),
            in_flight: self.in_flight(),
            success_count: self.success_count.load(Ordering::Relaxed),
            non_success_count: self.non_success_count.load(Ordering::Relaxed),
            failure_count: self.failure_count.load(Ordering::Relaxed),
            record_failure_count: self.record_failure_count.load(Ordering::Relaxed),
            notifications_accepted: self.notifications_accepted.load(Ordering::Relaxed),
            notifications_deduplicated: self.notifications_deduplicated.load(Ordering::Relaxed),
            latency_ms: self.latency_ms.lock().summary(),
        }
    }
}

/// Point-in-time copy of `ForwardMetrics` (for reporting)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub events: u64,
    pub in_flight: usize,
    pub success_count: u64,
    pub non_success_count: u64,
    pub failure_count: u64,
    pub record_failure_count: u64,
    pub notifications_accepted: u64,
    pub notifications_deduplicated: u64,
    pub latency_ms: StatsSummary,
}

impl MetricsSnapshot {
    /// Every delivery attempt, whatever its outcome
    pub fn deliveries(&self) -> u64 {
        self.success_count + self.non_success_count + self.failure_count
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Events forwarded: {}", self.events)?;
        writeln!(
            f,
            "Deliveries: {} (2xx {}, other {}, failed {})",
            self.deliveries(),
            self.success_count,
            self.non_success_count,
            self.failure_count
        )?;
        writeln!(f, "Unrecorded deliveries: {}", self.record_failure_count)?;
        writeln!(
            f,
            "Notifications: {} queued, {} deduplicated",
            self.notifications_accepted, self.notifications_deduplicated
        )?;
        write!(f, "Latency (ms): {}", self.latency_ms)
    }
}
