//! Persistence of received records as individual objects.

use std::sync::Arc;

use bytes::Bytes;
use object_store::{ObjectStore, PutPayload, path::Path};

use crate::config::RetryPolicy;
use crate::error::{TicksinkError, TicksinkResult};

/// Identity of a persisted object, formatted into its storage path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKey {
    /// Loop-local counter, zero-based. Not stable across restarts.
    Sequence(u64),
    /// The record's durable log coordinates. Restart-safe and idempotent.
    PartitionOffset {
        /// Source partition.
        partition: i32,
        /// Offset within the partition.
        offset: i64,
    },
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKey::Sequence(seq) => write!(f, "{seq}"),
            ObjectKey::PartitionOffset { partition, offset } => {
                write!(f, "p{partition}-{offset}")
            }
        }
    }
}

/// Writes one object per record under a fixed prefix.
///
/// Writes run against a bounded retry budget; when it is exhausted the error
/// surfaces to the caller, which decides whether the record is dropped.
#[derive(Debug, Clone)]
pub struct ObjectSink {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    retry: RetryPolicy,
}

impl ObjectSink {
    /// Sink with the default retry budget.
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self::with_retry(store, prefix, RetryPolicy::default())
    }

    /// Sink with an explicit retry budget.
    pub fn with_retry(
        store: Arc<dyn ObjectStore>,
        prefix: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            retry,
        }
    }

    /// Storage path for a key: `<prefix>_<key>.json`.
    pub fn path_for(&self, key: &ObjectKey) -> Path {
        Path::from(format!("{}_{}.json", self.prefix, key))
    }

    /// Persists one payload, retrying within the budget.
    #[tracing::instrument(skip_all, name = "persist", fields(key = %key))]
    pub async fn persist(&self, key: &ObjectKey, payload: Bytes) -> TicksinkResult<Path> {
        let path = self.path_for(key);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            match self
                .store
                .put(&path, PutPayload::from_bytes(payload.clone()))
                .await
            {
                Ok(_) => return Ok(path),
                Err(err) if attempt < self.retry.attempts => {
                    tracing::warn!(
                        attempt,
                        "storage write failed, retrying: {:#?}",
                        err
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(err) => {
                    tracing::error!(attempt, "storage write failed: {:#?}", err);
                    return Err(TicksinkError::StorageRetriesExhausted {
                        key: key.to_string(),
                        attempts: attempt,
                    });
                }
            }
        }
    }
}
