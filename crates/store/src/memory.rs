//! MemoryStore - in-process store
//!
//! Backs the single-node service and every test; supports injecting failures
//! per operation.

use std::collections::HashMap;

use chrono::Utc;
use contracts::{
    Bucket, BucketConfig, BucketId, ContractError, ForwardRecord, ForwardTarget,
    NewForwardRecord, NewReceiveRecord, ReceiveRecord, RecordId, Store, UserId,
};
use parking_lot::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// Failure injection switches
#[derive(Debug, Default, Clone)]
pub struct MemoryStoreConfig {
    /// Every receive log insert fails
    pub fail_receive_inserts: bool,
    /// Every forward target lookup fails
    pub fail_target_lookups: bool,
    /// Forward log inserts for these destination urls fail
    pub fail_forward_inserts_for: Vec<String>,
}

#[derive(Default)]
struct Tables {
    buckets: HashMap<BucketId, Bucket>,
    /// slug -> bucket id
    slugs: HashMap<String, BucketId>,
    targets: Vec<ForwardTarget>,
    receive_logs: Vec<ReceiveRecord>,
    forward_logs: Vec<ForwardRecord>,
}

/// In-memory store
pub struct MemoryStore {
    config: MemoryStoreConfig,
    tables: RwLock<Tables>,
}

fn new_record_id() -> RecordId {
    Uuid::new_v4().simple().to_string().into()
}

impl MemoryStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Create store with failure injection
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            config,
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Create store and load seeded buckets
    pub fn from_seed(buckets: &[BucketConfig]) -> Result<Self> {
        let store = Self::new();
        store.seed(buckets)?;
        Ok(store)
    }

    /// Register configured buckets and their forward targets
    pub fn seed(&self, buckets: &[BucketConfig]) -> Result<()> {
        for config in buckets {
            let bucket = Bucket {
                id: config
                    .id
                    .clone()
                    .map(BucketId::from)
                    .unwrap_or_else(|| BucketId::from(new_record_id().as_str())),
                slug: config.slug.clone(),
                name: config.name.clone(),
                description: config.description.clone(),
                user_id: UserId::from(config.user.as_str()),
            };
            let bucket_id = bucket.id.clone();
            self.insert_bucket(bucket)?;

            for forward in &config.forwards {
                self.add_forward_target(&bucket_id, &forward.name, &forward.url)?;
            }
        }
        Ok(())
    }

    /// Register a bucket
    pub fn insert_bucket(&self, bucket: Bucket) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.slugs.contains_key(&bucket.slug) {
            return Err(StoreError::DuplicateSlug { slug: bucket.slug });
        }
        debug!(bucket = %bucket.id, slug = %bucket.slug, "bucket registered");
        tables.slugs.insert(bucket.slug.clone(), bucket.id.clone());
        tables.buckets.insert(bucket.id.clone(), bucket);
        Ok(())
    }

    /// Register a forward target on an existing bucket
    pub fn add_forward_target(
        &self,
        bucket_id: &BucketId,
        name: &str,
        url: &str,
    ) -> Result<ForwardTarget> {
        let mut tables = self.tables.write();
        if !tables.buckets.contains_key(bucket_id) {
            return Err(StoreError::BucketNotFound {
                bucket_id: bucket_id.to_string(),
            });
        }
        let target = ForwardTarget {
            id: new_record_id(),
            bucket_id: bucket_id.clone(),
            name: name.to_string(),
            url: url.to_string(),
        };
        tables.targets.push(target.clone());
        Ok(target)
    }

    /// Every registered bucket
    pub fn buckets(&self) -> Vec<Bucket> {
        self.tables.read().buckets.values().cloned().collect()
    }

    /// Total receive logs across buckets
    pub fn receive_record_count(&self) -> usize {
        self.tables.read().receive_logs.len()
    }

    /// Total forward logs across buckets
    pub fn forward_record_count(&self) -> usize {
        self.tables.read().forward_logs.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    #[instrument(name = "memory_store_find_bucket", skip(self))]
    async fn find_bucket_by_slug(&self, slug: &str) -> std::result::Result<Option<Bucket>, ContractError> {
        let tables = self.tables.read();
        Ok(tables
            .slugs
            .get(slug)
            .and_then(|id| tables.buckets.get(id))
            .cloned())
    }

    #[instrument(
        name = "memory_store_insert_receive_record",
        skip(self, record),
        fields(bucket = %record.bucket_id)
    )]
    async fn insert_receive_record(
        &self,
        record: NewReceiveRecord,
    ) -> std::result::Result<ReceiveRecord, ContractError> {
        if self.config.fail_receive_inserts {
            return Err(ContractError::store("insert_receive_record", "mock failure"));
        }

        let now = Utc::now();
        let stored = ReceiveRecord {
            id: new_record_id(),
            bucket_id: record.bucket_id,
            body: record.body,
            headers: record.headers,
            ip: record.ip,
            created: now,
            updated: now,
        };
        self.tables.write().receive_logs.push(stored.clone());
        Ok(stored)
    }

    #[instrument(name = "memory_store_list_forward_targets", skip(self), fields(bucket = %bucket_id))]
    async fn list_forward_targets(
        &self,
        bucket_id: &BucketId,
    ) -> std::result::Result<Vec<ForwardTarget>, ContractError> {
        if self.config.fail_target_lookups {
            return Err(ContractError::store("list_forward_targets", "mock failure"));
        }

        Ok(self
            .tables
            .read()
            .targets
            .iter()
            .filter(|t| &t.bucket_id == bucket_id)
            .cloned()
            .collect())
    }

    #[instrument(
        name = "memory_store_insert_forward_record",
        skip(self, record),
        fields(url = %record.destination_url)
    )]
    async fn insert_forward_record(
        &self,
        record: NewForwardRecord,
    ) -> std::result::Result<ForwardRecord, ContractError> {
        if self
            .config
            .fail_forward_inserts_for
            .contains(&record.destination_url)
        {
            return Err(ContractError::store("insert_forward_record", "mock failure"));
        }

        let now = Utc::now();
        let stored = ForwardRecord {
            id: new_record_id(),
            bucket_id: record.bucket_id,
            receive_record_id: record.receive_record_id,
            destination_url: record.destination_url,
            body: record.body,
            headers: record.headers,
            status_code: record.status_code,
            created: now,
            updated: now,
        };
        self.tables.write().forward_logs.push(stored.clone());
        Ok(stored)
    }

    async fn list_receive_records(
        &self,
        bucket_id: &BucketId,
    ) -> std::result::Result<Vec<ReceiveRecord>, ContractError> {
        Ok(self
            .tables
            .read()
            .receive_logs
            .iter()
            .filter(|r| &r.bucket_id == bucket_id)
            .cloned()
            .collect())
    }

    async fn list_forward_records(
        &self,
        receive_record_id: &RecordId,
    ) -> std::result::Result<Vec<ForwardRecord>, ContractError> {
        Ok(self
            .tables
            .read()
            .forward_logs
            .iter()
            .filter(|r| &r.receive_record_id == receive_record_id)
            .cloned()
            .collect())
    }
}
