//! # Contracts
//!
//! Frozen interface contracts shared by every splay crate: the persisted data
//! model, the collaborator traits (`Store`, `Transport`, `Broadcaster`) and the
//! configuration schema. Business crates depend on this crate only, never on
//! each other's internals.
//!
//! ## Time Model
//! - Persisted timestamps are wall-clock UTC (`chrono::DateTime<Utc>`)
//! - Queue due-times are monotonic and live in `delay_queue`

mod config;
mod error;
mod headers;
mod id;
mod notification;
mod realtime;
mod records;
mod store;
mod transport;

pub use config::*;
pub use error::*;
pub use headers::{Headers, X_FORWARDED_FOR};
pub use id::{BucketId, RecordId, UserId};
pub use notification::{Identify, Notification, Topic};
pub use realtime::*;
pub use records::*;
pub use store::{LocalStore, Store};
pub use transport::*;
