//! Store error types

use contracts::ContractError;
use thiserror::Error;

/// Errors raised while managing store contents (seeding, registration)
#[derive(Debug, Error)]
pub enum StoreError {
    /// Slug already taken by another bucket
    #[error("bucket slug '{slug}' already exists")]
    DuplicateSlug { slug: String },

    /// Forward target registered on an unknown bucket
    #[error("bucket '{bucket_id}' not found")]
    BucketNotFound { bucket_id: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// Result alias
pub type Result<T> = std::result::Result<T, StoreError>;
