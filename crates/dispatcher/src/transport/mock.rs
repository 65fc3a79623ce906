//! Mock transport
//!
//! Scripted per-url behaviour for unit tests, including failure injection
//! and destinations that never answer.

use std::collections::HashMap;
use std::time::Duration;

use contracts::{ContractError, DeliveryResponse, OutboundRequest, Transport};
use parking_lot::Mutex;
use tracing::instrument;

/// What a mocked destination does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Answer with this status
    Status(u16),
    /// Fail at the transport level
    Fail(String),
    /// Never answer
    Hang,
}

/// In-memory transport recording every request it is handed
pub struct MockTransport {
    default: MockBehavior,
    routes: HashMap<String, MockBehavior>,
    latency: Option<Duration>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl MockTransport {
    /// Every destination answers 200
    pub fn new() -> Self {
        Self {
            default: MockBehavior::Status(200),
            routes: HashMap::new(),
            latency: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Override behaviour for one url
    pub fn with_route(mut self, url: impl Into<String>, behavior: MockBehavior) -> Self {
        self.routes.insert(url.into(), behavior);
        self
    }

    /// Delay applied before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Requests handed to the transport so far
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    #[instrument(name = "mock_transport_deliver", skip(self, request), fields(url = %request.url))]
    async fn deliver(&self, request: &OutboundRequest) -> Result<DeliveryResponse, ContractError> {
        self.requests.lock().push(request.clone());

        let behavior = self
            .routes
            .get(&request.url)
            .unwrap_or(&self.default)
            .clone();

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match behavior {
            MockBehavior::Status(status) => Ok(DeliveryResponse { status }),
            MockBehavior::Fail(message) => Err(ContractError::transport(&request.url, message)),
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}
