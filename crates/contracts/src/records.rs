//! Persisted records
//!
//! Rows written and read through the `Store`. Records are created once and
//! never mutated by the relay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BucketId, RecordId, UserId};

/// Tenant-scoped ingestion endpoint, addressed publicly by `slug`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub id: BucketId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Owner, and the only user notified about this bucket
    pub user_id: UserId,
}

/// Registered destination every event on a bucket is relayed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardTarget {
    pub id: RecordId,
    pub bucket_id: BucketId,
    #[serde(default)]
    pub name: String,
    pub url: String,
}

/// Receive log as handed to the store (id and timestamps are store-assigned)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReceiveRecord {
    pub bucket_id: BucketId,
    /// Serialized JSON object body
    pub body: String,
    /// Serialized `Headers`
    pub headers: String,
    pub ip: Option<String>,
}

/// One accepted inbound event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveRecord {
    pub id: RecordId,
    pub bucket_id: BucketId,
    pub body: String,
    pub headers: String,
    pub ip: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Forward log as handed to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewForwardRecord {
    pub bucket_id: BucketId,
    pub receive_record_id: RecordId,
    pub destination_url: String,
    pub body: String,
    pub headers: String,
    /// `None` when the delivery never produced a response
    pub status_code: Option<u16>,
}

/// One attempted delivery to one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardRecord {
    pub id: RecordId,
    pub bucket_id: BucketId,
    pub receive_record_id: RecordId,
    pub destination_url: String,
    pub body: String,
    pub headers: String,
    pub status_code: Option<u16>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl ForwardRecord {
    /// Delivery produced a 2xx response
    pub fn is_success(&self) -> bool {
        self.status_code.is_some_and(|s| (200..300).contains(&s))
    }
}
