//! # Dispatcher
//!
//! Forward fan-out.
//!
//! Responsibilities:
//! - Relay one accepted event to every forward target of its bucket, concurrently
//! - Bound each delivery by a deadline; a failing target never stops its siblings
//! - Persist one forward record per target, status or no status
//! - Queue a single owner notification after every delivery has finished
//!
//! Transports: `HttpTransport` (reqwest) for real deliveries, `MockTransport`
//! for tests.

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod transport;

pub use contracts::{DeliveryResponse, OutboundRequest, Transport};
pub use dispatcher::{
    DeliveryOutcome, DispatchReport, DispatcherConfig, ForwardDispatcher, ForwardJob,
};
pub use error::DispatcherError;
pub use metrics::{ForwardMetrics, MetricsSnapshot};
pub use transport::{HttpTransport, MockBehavior, MockTransport};
