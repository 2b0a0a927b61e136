//! Crate-wide error type.

use thiserror::Error;

/// Convenience alias used by every fallible operation in the crate.
pub type TicksinkResult<T> = Result<T, TicksinkError>;

/// Error type for the whole pipeline.
#[derive(Error, Debug)]
pub enum TicksinkError {
    /// Generic Error for arbitrary errors that are generally not classified but should still convey information.
    #[error("{0}")]
    Generic(String),
    /// Rejected configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The row source was constructed with zero rows.
    #[error("row source has no rows")]
    EmptyRowSource,
    /// A dataset line could not be turned into a record.
    #[error("malformed dataset row: {0}")]
    MalformedRow(String),
    /// A storage write ran out of its retry budget.
    #[error("storage write for {key} gave up after {attempts} attempts")]
    StorageRetriesExhausted {
        /// Object key whose write was abandoned.
        key: String,
        /// Attempts made before giving up.
        attempts: u32,
    },

    // Inferred
    /// Serde JSON Error.
    #[error("Serde JSON Error")]
    SerdeJsonError(#[from] serde_json::Error),
    /// ObjectStore Error.
    #[error("ObjectStore Error")]
    ObjectStoreError(#[from] object_store::Error),
    /// Kafka client Error.
    #[error("Kafka Error")]
    KafkaError(#[from] rdkafka::error::KafkaError),
    /// IO Error.
    #[error("IO Error")]
    IoError(#[from] std::io::Error),
}
