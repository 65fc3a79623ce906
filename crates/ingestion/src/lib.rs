//! # Ingestion
//!
//! Webhook ingestion module.
//!
//! Responsibilities:
//! - Resolve the bucket addressed by an inbound call
//! - Accept JSON object bodies only
//! - Attribute the caller ip (`X-Forwarded-For`, then peer address)
//! - Persist the receive record, then start the forward fan-out without
//!   waiting on it
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionHandler, InboundRequest};
//!
//! let handler = IngestionHandler::new(store, dispatcher).with_ingest_token(token);
//! let accepted = handler
//!     .receive(InboundRequest { slug: "b1", body: &body, headers: &headers, peer })
//!     .await?;
//! // accepted.dispatch completes once every target has been tried
//! ```

mod error;
mod handler;
mod ip;
mod payload;

pub use error::{IngestError, Result};
pub use handler::{Accepted, InboundRequest, IngestionHandler, IngestionMetrics, MetricsSnapshot};
pub use ip::client_ip;
pub use payload::parse_object;
