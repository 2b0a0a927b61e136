//! The seam between the pipeline and the external durable log.
//!
//! Both loops talk to the log through these traits only. The Kafka-backed
//! implementations live in [`kafka`]; tests substitute channel-backed doubles.
//! The log itself (topic storage, partitioning, group coordination, offset
//! durability) is entirely the broker's problem.

pub mod kafka;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TicksinkResult;
use crate::shutdown::ShutdownHandle;

/// A record as handed back by the log, carrying its durable coordinates.
///
/// Partition and offset are the broker's own position for the record, which
/// makes them the only restart-safe identity available to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredRecord {
    /// Topic the record was read from.
    pub topic: String,
    /// Partition within the topic.
    pub partition: i32,
    /// Offset within the partition.
    pub offset: i64,
    /// Serialized record payload.
    pub payload: Bytes,
}

/// Write side of the log.
///
/// `publish` is fire and forget: it enqueues into the client's internal
/// buffer and returns without waiting for broker acknowledgment. Buffered
/// payloads only become durable once `flush` drains them, which is why
/// shutdown must flush before the handle is released.
#[async_trait]
pub trait RecordPublisher: Send {
    /// Enqueues one payload for asynchronous delivery.
    async fn publish(&mut self, payload: Bytes) -> TicksinkResult<()>;

    /// Blocks until buffered payloads are acknowledged or the timeout lapses.
    async fn flush(&mut self, timeout: Duration) -> TicksinkResult<()>;

    /// Releases the client handle.
    async fn close(&mut self);
}

/// Read side of the log.
#[async_trait]
pub trait RecordSubscriber: Send {
    /// Waits for the next record.
    ///
    /// The wait is unbounded in the absence of traffic, so it races against
    /// the shutdown token: `Ok(None)` means shutdown was requested or the
    /// log has no more records to give, and the loop should stop polling.
    async fn recv(&mut self, shutdown: &ShutdownHandle) -> TicksinkResult<Option<DeliveredRecord>>;

    /// Commits the record's offset, marking it consumed for the group.
    ///
    /// Only called under [`CommitMode::AfterPersist`]; under auto-commit the
    /// broker client commits on its own timer.
    ///
    /// [`CommitMode::AfterPersist`]: crate::config::CommitMode::AfterPersist
    async fn commit(&mut self, record: &DeliveredRecord) -> TicksinkResult<()>;

    /// Releases the client handle.
    async fn close(&mut self);
}
