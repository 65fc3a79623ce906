//! IngestionHandler - accept, persist and hand off one inbound event

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{Headers, NewReceiveRecord, ReceiveRecord, Store, Transport};
use dispatcher::{DispatchReport, ForwardDispatcher, ForwardJob};
use http::header::AUTHORIZATION;
use http::HeaderMap;
use observability::ReceiveOutcome;
use subtle::ConstantTimeEq;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::error::{IngestError, Result};
use crate::ip::client_ip;
use crate::payload::parse_object;

/// One inbound call on `POST /buckets/{slug}`
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    pub slug: &'a str,
    pub body: &'a [u8],
    pub headers: &'a HeaderMap,
    /// Transport-level peer address
    pub peer: Option<SocketAddr>,
}

/// An event that was persisted and handed to the dispatcher
#[derive(Debug)]
pub struct Accepted {
    pub record: ReceiveRecord,
    /// Targets the event is being relayed to
    pub forward_count: usize,
    /// Background fan-out; the caller is free to drop it
    pub dispatch: JoinHandle<DispatchReport>,
}

/// Ingestion counters
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    accepted: AtomicU64,
    rejected: AtomicU64,
    internal_errors: AtomicU64,
}

impl IngestionMetrics {
    fn record(&self, outcome: ReceiveOutcome) {
        let counter = match outcome {
            ReceiveOutcome::Accepted => &self.accepted,
            ReceiveOutcome::Internal => &self.internal_errors,
            _ => &self.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        observability::record_receive(outcome);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `IngestionMetrics`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub accepted: u64,
    /// Not found, bad request and unauthorized
    pub rejected: u64,
    pub internal_errors: u64,
}

/// Front door of the pipeline
///
/// Resolves the bucket, validates the body, persists the receive record,
/// looks up forward targets and starts the fan-out without waiting for it.
pub struct IngestionHandler<S, T> {
    store: Arc<S>,
    dispatcher: Arc<ForwardDispatcher<S, T>>,
    /// Expected bearer token; None accepts every caller
    ingest_token: Option<String>,
    metrics: IngestionMetrics,
}

impl<S, T> IngestionHandler<S, T>
where
    S: Store + Sync + 'static,
    T: Transport + Sync + 'static,
{
    pub fn new(store: Arc<S>, dispatcher: Arc<ForwardDispatcher<S, T>>) -> Self {
        Self {
            store,
            dispatcher,
            ingest_token: None,
            metrics: IngestionMetrics::default(),
        }
    }

    /// Require `Authorization: Bearer <token>` on every request
    pub fn with_ingest_token(mut self, token: Option<String>) -> Self {
        self.ingest_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn dispatcher(&self) -> &Arc<ForwardDispatcher<S, T>> {
        &self.dispatcher
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    #[instrument(name = "ingest_receive", skip(self, request), fields(slug = %request.slug))]
    pub async fn receive(&self, request: InboundRequest<'_>) -> Result<Accepted> {
        let result = self.accept(request).await;
        match &result {
            Ok(accepted) => {
                debug!(
                    receive_log = %accepted.record.id,
                    forwards = accepted.forward_count,
                    "Event accepted"
                );
                self.metrics.record(ReceiveOutcome::Accepted);
            }
            Err(e @ IngestError::Internal { .. }) => {
                error!(error = %e, "Event could not be stored");
                self.metrics.record(ReceiveOutcome::Internal);
            }
            Err(e) => {
                debug!(error = %e, "Event rejected");
                self.metrics.record(outcome_of(e));
            }
        }
        result
    }

    async fn accept(&self, request: InboundRequest<'_>) -> Result<Accepted> {
        self.authorize(request.headers)?;

        let bucket = self
            .store
            .find_bucket_by_slug(request.slug)
            .await
            .map_err(|e| IngestError::internal(e.to_string()))?
            .ok_or_else(|| IngestError::NotFound {
                slug: request.slug.to_string(),
            })?;

        let body = parse_object(request.body)?;
        let headers = Headers::from_header_map(request.headers);
        let serialized_headers = headers
            .to_json()
            .map_err(|e| IngestError::internal(e.to_string()))?;
        let ip = client_ip(request.headers, request.peer);
        if ip.is_none() {
            warn!("Caller ip could not be resolved");
        }

        let record = self
            .store
            .insert_receive_record(NewReceiveRecord {
                bucket_id: bucket.id.clone(),
                body,
                headers: serialized_headers,
                ip: ip.clone(),
            })
            .await
            .map_err(|e| IngestError::internal(e.to_string()))?;

        let targets = self
            .store
            .list_forward_targets(&bucket.id)
            .await
            .map_err(|e| IngestError::internal(e.to_string()))?;

        let forward_count = targets.len();
        let dispatch = self.dispatcher.spawn(ForwardJob {
            receive: record.clone(),
            owner: bucket.user_id,
            ip,
            headers,
            targets,
            strip_authorization: self.ingest_token.is_some(),
        });

        Ok(Accepted {
            record,
            forward_count,
            dispatch,
        })
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<()> {
        let Some(expected) = self.ingest_token.as_deref() else {
            return Ok(());
        };
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token);

        match presented {
            Some(token) if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
            _ => Err(IngestError::Unauthorized),
        }
    }
}

/// Credential of a `Bearer` authorization value; the scheme is case-insensitive
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

fn outcome_of(error: &IngestError) -> ReceiveOutcome {
    match error {
        IngestError::NotFound { .. } => ReceiveOutcome::NotFound,
        IngestError::BadRequest { .. } => ReceiveOutcome::BadRequest,
        IngestError::Unauthorized => ReceiveOutcome::Unauthorized,
        IngestError::Internal { .. } => ReceiveOutcome::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BucketConfig, ForwardTargetConfig, Notification, X_FORWARDED_FOR};
    use delay_queue::DelayQueue;
    use dispatcher::{DispatcherConfig, MockBehavior, MockTransport};
    use http::HeaderValue;
    use std::time::Duration;
    use store::{MemoryStore, MemoryStoreConfig};

    const A: &str = "http://a.test/hook";
    const B: &str = "http://b.test/hook";

    struct Fixture {
        store: Arc<MemoryStore>,
        transport: Arc<MockTransport>,
        queue: Arc<DelayQueue<Notification>>,
        handler: IngestionHandler<MemoryStore, MockTransport>,
    }

    fn seed() -> Vec<BucketConfig> {
        vec![BucketConfig {
            id: Some("bucket1".into()),
            slug: "b1".into(),
            name: String::new(),
            description: String::new(),
            user: "user1".into(),
            forwards: [A, B]
                .iter()
                .map(|url| ForwardTargetConfig {
                    name: String::new(),
                    url: url.to_string(),
                })
                .collect(),
        }]
    }

    fn fixture_with(store: MemoryStore, transport: MockTransport) -> Fixture {
        let store = Arc::new(store);
        let transport = Arc::new(transport);
        let queue = Arc::new(DelayQueue::new());
        let dispatcher = Arc::new(ForwardDispatcher::new(
            Arc::clone(&store),
            Arc::clone(&transport),
            Arc::clone(&queue),
            DispatcherConfig {
                delivery_timeout: Duration::from_secs(10),
                notify_ttl: Duration::from_secs(2),
                max_in_flight: 4,
            },
        ));
        let handler = IngestionHandler::new(Arc::clone(&store), dispatcher);
        Fixture {
            store,
            transport,
            queue,
            handler,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MemoryStore::from_seed(&seed()).unwrap(), MockTransport::new())
    }

    fn request<'a>(slug: &'a str, body: &'a [u8], headers: &'a HeaderMap) -> InboundRequest<'a> {
        InboundRequest {
            slug,
            body,
            headers,
            peer: Some("192.0.2.1:4000".parse().unwrap()),
        }
    }

    #[tokio::test]
    async fn test_accepts_and_forwards() {
        let f = fixture();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.4"));

        let accepted = f
            .handler
            .receive(request("b1", br#"{"x":1}"#, &headers))
            .await
            .unwrap();
        assert_eq!(accepted.forward_count, 2);
        assert_eq!(accepted.record.ip.as_deref(), Some("198.51.100.4"));
        assert_eq!(accepted.record.body, r#"{"x":1}"#);

        let report = accepted.dispatch.await.unwrap();
        assert_eq!(report.recorded(), 2);
        assert_eq!(f.queue.len(), 1);

        let records = f.store.list_forward_records(&accepted.record.id).await.unwrap();
        for record in records {
            let headers = Headers::from_json(&record.headers).unwrap();
            assert_eq!(
                headers.get_all(X_FORWARDED_FOR),
                ["198.51.100.4", "198.51.100.4"]
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_slug_persists_nothing() {
        let f = fixture();
        let err = f
            .handler
            .receive(request("does-not-exist", br#"{"x":1}"#, &HeaderMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NotFound { .. }));
        assert_eq!(f.store.receive_record_count(), 0);
        assert_eq!(f.handler.snapshot().rejected, 1);
    }

    #[tokio::test]
    async fn test_non_object_body_rejected() {
        let f = fixture();
        let err = f
            .handler
            .receive(request("b1", b"[1,2,3]", &HeaderMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::BadRequest { .. }));
        assert_eq!(f.store.receive_record_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_slug_checked_before_body() {
        let f = fixture();
        let err = f
            .handler
            .receive(request("nope", b"not json", &HeaderMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_and_skips_forwarding() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            fail_receive_inserts: true,
            ..Default::default()
        });
        store.seed(&seed()).unwrap();
        let f = fixture_with(store, MockTransport::new());

        let err = f
            .handler
            .receive(request("b1", br#"{"x":1}"#, &HeaderMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Internal { .. }));
        assert_eq!(f.handler.dispatcher().pending(), 0);
        assert!(f.queue.is_empty());
        assert_eq!(f.handler.snapshot().internal_errors, 1);
    }

    #[tokio::test]
    async fn test_target_lookup_failure_is_internal() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            fail_target_lookups: true,
            ..Default::default()
        });
        store.seed(&seed()).unwrap();
        let f = fixture_with(store, MockTransport::new());

        let err = f
            .handler
            .receive(request("b1", br#"{"x":1}"#, &HeaderMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Internal { .. }));
        assert!(f.queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_before_hanging_forward_completes() {
        let transport = MockTransport::new().with_route(A, MockBehavior::Hang);
        let f = fixture_with(MemoryStore::from_seed(&seed()).unwrap(), transport);

        let accepted = f
            .handler
            .receive(request("b1", br#"{"x":1}"#, &HeaderMap::new()))
            .await
            .unwrap();
        assert!(!accepted.dispatch.is_finished());
        assert!(f.queue.is_empty());

        let report = accepted.dispatch.await.unwrap();
        assert_eq!(report.deliveries.len(), 2);
        assert_eq!(f.queue.len(), 1);
    }

    #[tokio::test]
    async fn test_bearer_token_enforced() {
        let f = fixture();
        let handler = f.handler.with_ingest_token(Some("s3cret".into()));

        let err = handler
            .receive(request("b1", br#"{"x":1}"#, &HeaderMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Unauthorized));

        let mut wrong = HeaderMap::new();
        wrong.insert(AUTHORIZATION, HeaderValue::from_static("Bearer nope"));
        assert!(handler.receive(request("b1", br#"{}"#, &wrong)).await.is_err());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert!(handler.receive(request("b1", br#"{}"#, &headers)).await.is_ok());
    }

    #[tokio::test]
    async fn test_bearer_scheme_case_insensitive() {
        let handler = fixture().handler.with_ingest_token(Some("s3cret".into()));

        for value in ["bearer s3cret", "BEARER s3cret", "Bearer  s3cret "] {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
            assert!(
                handler.receive(request("b1", br#"{}"#, &headers)).await.is_ok(),
                "value: {value}"
            );
        }

        for value in ["Basic s3cret", "Bearer", "Bearer s3cre", "s3cret"] {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
            assert!(
                handler.receive(request("b1", br#"{}"#, &headers)).await.is_err(),
                "value: {value}"
            );
        }
    }

    #[tokio::test]
    async fn test_ingest_token_not_forwarded_but_recorded() {
        let f = fixture();
        let transport = Arc::clone(&f.transport);
        let store = Arc::clone(&f.store);
        let handler = f.handler.with_ingest_token(Some("s3cret".into()));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        headers.insert("x-trace", HeaderValue::from_static("t1"));
        let accepted = handler
            .receive(request("b1", br#"{"x":1}"#, &headers))
            .await
            .unwrap();
        accepted.dispatch.await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 2);
        for outbound in &sent {
            assert!(!outbound.headers.contains("authorization"));
            assert_eq!(outbound.headers.first("x-trace"), Some("t1"));
        }

        let records = store.list_forward_records(&accepted.record.id).await.unwrap();
        let recorded = Headers::from_json(&records[0].headers).unwrap();
        assert_eq!(recorded.first("authorization"), Some("Bearer s3cret"));
    }
}
