//! Pipeline metrics
//!
//! Thin helpers over the `metrics` facade so label values stay consistent
//! across crates, plus an online statistics accumulator for summaries.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Result of an ingestion request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    Accepted,
    NotFound,
    BadRequest,
    Unauthorized,
    Internal,
}

impl ReceiveOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::Internal => "internal",
        }
    }
}

/// Result of one forward delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// 2xx response
    Success,
    /// Any other response status
    NonSuccess,
    /// No response (connect error, timeout, bad url)
    TransportFailure,
}

impl ForwardOutcome {
    pub fn from_status(status: u16) -> Self {
        if (200..300).contains(&status) {
            Self::Success
        } else {
            Self::NonSuccess
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NonSuccess => "non_success",
            Self::TransportFailure => "transport_failure",
        }
    }
}

/// Result of handing a refresh signal to a realtime client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastResult {
    Sent,
    Failed,
}

impl BroadcastResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

pub fn record_receive(outcome: ReceiveOutcome) {
    counter!("splay_receive_total", "outcome" => outcome.as_str()).increment(1);
}

/// Count a delivery and record how long it took
pub fn record_forward(outcome: ForwardOutcome, elapsed: Duration) {
    counter!("splay_forward_total", "outcome" => outcome.as_str()).increment(1);
    histogram!("splay_forward_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
}

/// Count a notification push (`accepted = false` means deduplicated)
pub fn record_notification(accepted: bool) {
    let result = if accepted { "accepted" } else { "deduplicated" };
    counter!("splay_notifications_total", "result" => result).increment(1);
}

pub fn record_broadcast(result: BroadcastResult) {
    counter!("splay_broadcast_messages_total", "result" => result.as_str()).increment(1);
}

pub fn record_queue_depth(depth: usize) {
    gauge!("splay_delay_queue_depth").set(depth as f64);
}

/// Summary of a `RunningStats`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}
