//! # Store
//!
//! In-process `Store` implementation.
//!
//! Responsibilities:
//! - Hold buckets, forward targets, receive logs and forward logs in memory
//! - Assign record ids and creation timestamps
//! - Seed buckets and targets from configuration
//! - Inject failures for tests (`MemoryStoreConfig`)

mod error;
mod memory;

pub use contracts::Store;
pub use error::{Result, StoreError};
pub use memory::{MemoryStore, MemoryStoreConfig};
