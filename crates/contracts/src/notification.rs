//! Notification - "something changed for this user in this bucket"
//!
//! In-memory only. Two notifications are the same entity iff their
//! (user, bucket) pair matches.

use serde::{Deserialize, Serialize};

use crate::{BucketId, UserId};

/// A value with a stable identity, used as the delay-queue dedup key
pub trait Identify {
    fn identity(&self) -> String;
}

/// A value that maps to a realtime subscription channel
pub trait Topic {
    fn topic(&self) -> String;
}

/// Debounced change signal for one (user, bucket) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub bucket_id: BucketId,
}

impl Notification {
    pub fn new(user_id: impl Into<UserId>, bucket_id: impl Into<BucketId>) -> Self {
        Self {
            user_id: user_id.into(),
            bucket_id: bucket_id.into(),
        }
    }
}

impl Identify for Notification {
    fn identity(&self) -> String {
        format!("{}/{}", self.user_id, self.bucket_id)
    }
}

impl Topic for Notification {
    fn topic(&self) -> String {
        format!("users/{}/buckets/{}/logs", self.user_id, self.bucket_id)
    }
}
