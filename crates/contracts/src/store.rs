//! Store trait - persistence collaborator
//!
//! The storage engine and its schema are owned elsewhere; the relay only
//! needs these operations.

use crate::{
    Bucket, BucketId, ContractError, ForwardRecord, ForwardTarget, NewForwardRecord,
    NewReceiveRecord, ReceiveRecord, RecordId,
};

/// Persistence interface
///
/// All store implementations must implement this trait.
#[trait_variant::make(Store: Send)]
pub trait LocalStore {
    /// Resolve a bucket by its public slug
    async fn find_bucket_by_slug(&self, slug: &str) -> Result<Option<Bucket>, ContractError>;

    /// Persist a receive log, returning it with store-assigned id and timestamps
    async fn insert_receive_record(
        &self,
        record: NewReceiveRecord,
    ) -> Result<ReceiveRecord, ContractError>;

    /// Forward targets registered on a bucket
    async fn list_forward_targets(
        &self,
        bucket_id: &BucketId,
    ) -> Result<Vec<ForwardTarget>, ContractError>;

    /// Persist the outcome of one delivery attempt
    async fn insert_forward_record(
        &self,
        record: NewForwardRecord,
    ) -> Result<ForwardRecord, ContractError>;

    /// Receive logs of a bucket, oldest first
    async fn list_receive_records(
        &self,
        bucket_id: &BucketId,
    ) -> Result<Vec<ReceiveRecord>, ContractError>;

    /// Forward logs produced for one receive log, oldest first
    async fn list_forward_records(
        &self,
        receive_record_id: &RecordId,
    ) -> Result<Vec<ForwardRecord>, ContractError>;
}
