//! ForwardDispatcher - concurrent fan-out of one event to its targets

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    ContractError, ForwardConfig, ForwardTarget, Headers, NewForwardRecord, Notification,
    NotifyConfig, OutboundRequest, ReceiveRecord, RecordId, Store, Transport, UserId,
    X_FORWARDED_FOR,
};
use delay_queue::DelayQueue;
use observability::ForwardOutcome;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::task::TaskTracker;
use tracing::{debug, debug_span, error, info, instrument, warn, Instrument};

use crate::error::DispatcherError;
use crate::metrics::{ForwardMetrics, MetricsSnapshot};

/// Headers never copied onto an outbound request
const SKIPPED_HEADERS: [&str; 4] = ["host", "content-length", "transfer-encoding", "connection"];

/// Dispatcher tuning
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Deadline for each delivery
    pub delivery_timeout: Duration,
    /// Debounce window for the completion notification
    pub notify_ttl: Duration,
    /// Deliveries allowed in flight across all events
    pub max_in_flight: usize,
}

impl DispatcherConfig {
    pub fn from_config(forward: &ForwardConfig, notify: &NotifyConfig) -> Self {
        Self {
            delivery_timeout: forward.timeout(),
            notify_ttl: notify.ttl(),
            max_in_flight: forward.max_in_flight,
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::from_config(&ForwardConfig::default(), &NotifyConfig::default())
    }
}

/// One accepted event, ready to be relayed
#[derive(Debug, Clone)]
pub struct ForwardJob {
    /// The persisted inbound event; its body is relayed verbatim
    pub receive: ReceiveRecord,
    /// Owner of the bucket, addressee of the notification
    pub owner: UserId,
    /// Resolved caller ip
    pub ip: Option<String>,
    /// Inbound headers as received
    pub headers: Headers,
    pub targets: Vec<ForwardTarget>,
    /// Keep `authorization` off the wire; it carries the ingest credential
    pub strip_authorization: bool,
}

/// Result of one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub url: String,
    /// Response status, None when no response arrived
    pub status: Option<u16>,
    /// Transport error text when no response arrived
    pub error: Option<String>,
    /// Id of the persisted forward record
    pub record_id: Option<RecordId>,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_some_and(|s| (200..300).contains(&s))
    }
}

/// Result of a whole fan-out
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub receive_record_id: RecordId,
    pub deliveries: Vec<DeliveryOutcome>,
    /// Whether the notification push was accepted (false = deduplicated)
    pub notification_queued: bool,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.deliveries.iter().filter(|d| d.is_success()).count()
    }

    pub fn recorded(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|d| d.record_id.is_some())
            .count()
    }
}

/// Everything a delivery task needs, shared across the fan-out
struct DeliveryContext {
    receive: ReceiveRecord,
    /// Headers sent on the wire
    outbound_headers: Headers,
    /// Serialized headers persisted on each forward record
    recorded_headers: String,
    body: Bytes,
}

/// Fans every event out to its targets concurrently, records each outcome and
/// queues one notification once all deliveries have finished
pub struct ForwardDispatcher<S, T> {
    store: Arc<S>,
    transport: Arc<T>,
    queue: Arc<DelayQueue<Notification>>,
    config: DispatcherConfig,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    metrics: Arc<ForwardMetrics>,
}

impl<S, T> ForwardDispatcher<S, T>
where
    S: Store + Sync + 'static,
    T: Transport + Sync + 'static,
{
    pub fn new(
        store: Arc<S>,
        transport: Arc<T>,
        queue: Arc<DelayQueue<Notification>>,
        config: DispatcherConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
        Self {
            store,
            transport,
            queue,
            config,
            permits,
            tracker: TaskTracker::new(),
            metrics: Arc::new(ForwardMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<ForwardMetrics> {
        &self.metrics
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Dispatches still running
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Run `dispatch` in the background
    ///
    /// The task is tracked so `shutdown` can wait for it.
    pub fn spawn(self: &Arc<Self>, job: ForwardJob) -> JoinHandle<DispatchReport> {
        let this = Arc::clone(self);
        self.tracker
            .spawn(async move { this.dispatch(job).await }.in_current_span())
    }

    /// Deliver to every target concurrently, wait for all of them, then queue
    /// exactly one notification for the bucket owner
    #[instrument(
        name = "forward_dispatch",
        skip(self, job),
        fields(
            bucket = %job.receive.bucket_id,
            receive_log = %job.receive.id,
            targets = job.targets.len()
        )
    )]
    pub async fn dispatch(&self, job: ForwardJob) -> DispatchReport {
        self.metrics.inc_events();

        let ForwardJob {
            receive,
            owner,
            ip,
            mut headers,
            targets,
            strip_authorization,
        } = job;

        if let Some(ip) = ip {
            headers.append(X_FORWARDED_FOR, ip);
        }
        let recorded_headers = headers.to_json().unwrap_or_else(|e| {
            error!(error = %e, "Failed to serialize forward headers");
            String::from("{}")
        });

        let bucket_id = receive.bucket_id.clone();
        let receive_record_id = receive.id.clone();
        let context = Arc::new(DeliveryContext {
            body: Bytes::from(receive.body.clone()),
            outbound_headers: outbound_headers(&headers, strip_authorization),
            recorded_headers,
            receive,
        });

        let mut deliveries = JoinSet::new();
        for target in targets {
            let span = debug_span!("forward_delivery", url = %target.url);
            deliveries.spawn(
                deliver_one(
                    Arc::clone(&self.store),
                    Arc::clone(&self.transport),
                    Arc::clone(&self.permits),
                    Arc::clone(&self.metrics),
                    Arc::clone(&context),
                    self.config.delivery_timeout,
                    target,
                )
                .instrument(span),
            );
        }

        let mut outcomes = Vec::with_capacity(deliveries.len());
        while let Some(joined) = deliveries.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(error = %e, "Delivery task aborted"),
            }
        }

        let notification = Notification::new(owner, bucket_id);
        let queued = self.queue.push(notification, self.config.notify_ttl);
        self.metrics.record_notification(queued);
        observability::record_notification(queued);
        observability::record_queue_depth(self.queue.len());

        let report = DispatchReport {
            receive_record_id,
            deliveries: outcomes,
            notification_queued: queued,
        };
        debug!(
            delivered = report.deliveries.len(),
            succeeded = report.succeeded(),
            notification_queued = queued,
            "Fan-out complete"
        );
        report
    }

    /// Stop accepting dispatches and wait up to `grace` for running ones
    #[instrument(name = "forward_dispatcher_shutdown", skip(self))]
    pub async fn shutdown(&self, grace: Duration) -> Result<(), DispatcherError> {
        self.tracker.close();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            let pending = self.tracker.len();
            warn!(pending, "Dispatches still running after grace period");
            return Err(DispatcherError::ShutdownTimeout { pending });
        }
        info!(summary = %self.metrics.snapshot(), "Forward dispatcher stopped");
        Ok(())
    }
}

/// Copy of `headers` without hop-by-hop and body-framing headers
fn outbound_headers(headers: &Headers, strip_authorization: bool) -> Headers {
    let mut outbound = Headers::new();
    for (name, values) in headers {
        if SKIPPED_HEADERS.contains(&name.as_str())
            || (strip_authorization && name.as_str() == "authorization")
        {
            continue;
        }
        for value in values {
            outbound.append(name, value.clone());
        }
    }
    outbound
}

async fn deliver_one<S, T>(
    store: Arc<S>,
    transport: Arc<T>,
    permits: Arc<Semaphore>,
    metrics: Arc<ForwardMetrics>,
    context: Arc<DeliveryContext>,
    timeout: Duration,
    target: ForwardTarget,
) -> DeliveryOutcome
where
    S: Store + Sync,
    T: Transport + Sync,
{
    metrics.delivery_started();
    let _permit = permits.acquire_owned().await.ok();

    let request = OutboundRequest {
        url: target.url.clone(),
        headers: context.outbound_headers.clone(),
        body: context.body.clone(),
    };

    let started = Instant::now();
    let result = match tokio::time::timeout(timeout, transport.deliver(&request)).await {
        Ok(result) => result,
        Err(_) => Err(ContractError::TransportTimeout {
            url: target.url.clone(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    };
    let elapsed = started.elapsed();
    metrics.delivery_finished();

    let (status, error) = match result {
        Ok(response) if response.is_success() => {
            debug!(status = response.status, "Forward delivered");
            metrics.record_response(response.status, elapsed.as_secs_f64() * 1000.0);
            observability::record_forward(ForwardOutcome::Success, elapsed);
            (Some(response.status), None)
        }
        Ok(response) => {
            warn!(status = response.status, "Forward answered with non-success status");
            metrics.record_response(response.status, elapsed.as_secs_f64() * 1000.0);
            observability::record_forward(ForwardOutcome::NonSuccess, elapsed);
            (Some(response.status), None)
        }
        Err(e) => {
            warn!(error = %e, "Forward delivery failed");
            metrics.inc_failure_count();
            observability::record_forward(ForwardOutcome::TransportFailure, elapsed);
            (None, Some(e.to_string()))
        }
    };

    let record = NewForwardRecord {
        bucket_id: context.receive.bucket_id.clone(),
        receive_record_id: context.receive.id.clone(),
        destination_url: target.url.clone(),
        body: context.receive.body.clone(),
        headers: context.recorded_headers.clone(),
        status_code: status,
    };
    let record_id = match store.insert_forward_record(record).await {
        Ok(stored) => Some(stored.id),
        Err(e) => {
            error!(error = %e, "Failed to record forward");
            metrics.inc_record_failure_count();
            None
        }
    };

    DeliveryOutcome {
        url: target.url,
        status,
        error,
        record_id,
    }
}
