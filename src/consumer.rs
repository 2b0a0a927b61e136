//! The consumer loop: receive, persist, acknowledge.

use crate::config::{CommitMode, ConsumerConfig, KeyMode, TransportErrorPolicy};
use crate::error::TicksinkResult;
use crate::log::RecordSubscriber;
use crate::record::Record;
use crate::shutdown::ShutdownHandle;
use crate::sink::{ObjectKey, ObjectSink};

/// What the consumer loop did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    /// Records delivered from the log.
    pub received: u64,
    /// Records durably written to storage.
    pub persisted: u64,
    /// Records dropped (malformed payloads, or writes that ran out of
    /// retries). Dropped records leave a gap in sequence keys, never a
    /// duplicate.
    pub dropped: u64,
}

/// Drains the topic into object storage until shutdown.
///
/// Each delivered record is assigned its object key first, so the key
/// advances exactly once per record whether or not the write succeeds.
/// Under [`CommitMode::AfterPersist`] the offset is committed only after
/// the write; under [`CommitMode::Auto`] the broker client commits on its
/// own timer, which can lose a record that crashes between receipt and
/// persistence. There is no drain phase: a record received but not yet
/// persisted when shutdown lands is lost.
#[tracing::instrument(skip_all, name = "consumer")]
pub async fn run_consumer(
    mut subscriber: Box<dyn RecordSubscriber>,
    sink: ObjectSink,
    config: ConsumerConfig,
    shutdown: ShutdownHandle,
) -> TicksinkResult<ConsumerReport> {
    let mut report = ConsumerReport::default();
    let mut sequence: u64 = 0;
    let mut fatal = None;

    tracing::info!("consumer started");

    loop {
        let delivered = match subscriber.recv(&shutdown).await {
            Ok(Some(delivered)) => delivered,
            Ok(None) => break,
            Err(err) => match config.transport_errors {
                TransportErrorPolicy::Fatal => {
                    tracing::error!("receive failed: {:#?}", err);
                    fatal = Some(err);
                    break;
                }
                TransportErrorPolicy::LogAndContinue => {
                    tracing::warn!("receive failed, continuing: {:#?}", err);
                    continue;
                }
            },
        };

        report.received += 1;

        let key = match config.key_mode {
            KeyMode::Sequence => ObjectKey::Sequence(sequence),
            KeyMode::PartitionOffset => ObjectKey::PartitionOffset {
                partition: delivered.partition,
                offset: delivered.offset,
            },
        };
        sequence += 1;

        // Parse and re-serialize so storage always holds the canonical
        // encoding, and malformed payloads are skipped instead of written.
        let payload = match Record::from_payload(&delivered.payload).and_then(|r| r.to_payload()) {
            Ok(payload) => payload,
            Err(err) => {
                report.dropped += 1;
                tracing::warn!(
                    offset = delivered.offset,
                    "skipping malformed payload: {:#?}",
                    err
                );
                continue;
            }
        };

        match sink.persist(&key, payload).await {
            Ok(path) => {
                report.persisted += 1;
                tracing::info!(path = %path, offset = delivered.offset, "record persisted");

                if matches!(config.commit_mode, CommitMode::AfterPersist) {
                    if let Err(err) = subscriber.commit(&delivered).await {
                        // The write is durable; a failed commit only risks
                        // redelivery, which the same key absorbs.
                        tracing::warn!(offset = delivered.offset, "commit failed: {:#?}", err);
                    }
                }
            }
            Err(err) => {
                report.dropped += 1;
                tracing::error!(
                    offset = delivered.offset,
                    "dropping record, storage write failed: {:#?}",
                    err
                );
            }
        }
    }

    subscriber.close().await;

    if let Some(err) = fatal {
        return Err(err);
    }

    tracing::info!(
        received = report.received,
        persisted = report.persisted,
        dropped = report.dropped,
        "consumer stopped"
    );

    Ok(report)
}
