//! Service assembly
//!
//! Wires the store, transport, dispatcher, ingestion handler and realtime hub
//! from one validated `SplayConfig`.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use broadcast::{BroadcastLoop, RealtimeHub};
use contracts::{Notification, SplayConfig};
use delay_queue::DelayQueue;
use dispatcher::{DispatcherConfig, ForwardDispatcher, HttpTransport};
use ingestion::IngestionHandler;
use store::MemoryStore;
use tracing::info;

use crate::error::{CliError, Result};
use crate::server;

pub type AppDispatcher = ForwardDispatcher<MemoryStore, HttpTransport>;
pub type AppHandler = IngestionHandler<MemoryStore, HttpTransport>;

/// Extra time granted to in-flight dispatches beyond one forward timeout
const SHUTDOWN_SLACK: Duration = Duration::from_secs(1);

/// Every long-lived component of a running service
pub struct Services {
    pub config: SplayConfig,
    pub store: Arc<MemoryStore>,
    pub queue: Arc<DelayQueue<Notification>>,
    pub hub: Arc<RealtimeHub>,
    pub dispatcher: Arc<AppDispatcher>,
    pub handler: Arc<AppHandler>,
}

impl Services {
    pub fn build(config: SplayConfig) -> Result<Self> {
        let store = MemoryStore::from_seed(&config.buckets)
            .map_err(|e| CliError::startup(format!("seeding store: {e}")))?;
        let store = Arc::new(store);
        let transport = HttpTransport::new(&config.forward)
            .map_err(|e| CliError::startup(e.to_string()))?;

        let queue = Arc::new(DelayQueue::new());
        let dispatcher = Arc::new(ForwardDispatcher::new(
            Arc::clone(&store),
            Arc::new(transport),
            Arc::clone(&queue),
            DispatcherConfig::from_config(&config.forward, &config.notify),
        ));
        let handler = Arc::new(
            IngestionHandler::new(Arc::clone(&store), Arc::clone(&dispatcher))
                .with_ingest_token(config.server.ingest_token.clone()),
        );
        let hub = Arc::new(RealtimeHub::new(config.notify.client_buffer));

        info!(
            buckets = config.buckets.len(),
            forward_timeout_secs = config.forward.timeout_secs,
            notify_ttl_ms = config.notify.ttl_ms,
            "Services assembled"
        );

        Ok(Self {
            config,
            store,
            queue,
            hub,
            dispatcher,
            handler,
        })
    }

    pub fn router(&self) -> Router {
        server::router(Arc::clone(&self.handler), self.config.server.max_body_bytes)
    }

    pub fn broadcast_loop(&self) -> BroadcastLoop<RealtimeHub> {
        BroadcastLoop::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.hub),
            self.config.notify.poll_interval(),
        )
    }

    /// Wait for tracked dispatches, at most one forward timeout plus slack
    pub async fn drain(&self) -> Result<()> {
        let grace = self.config.forward.timeout() + SHUTDOWN_SLACK;
        self.dispatcher
            .shutdown(grace)
            .await
            .map_err(|e| CliError::shutdown(e.to_string()))
    }
}
