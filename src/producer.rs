//! The producer loop: sample, serialize, publish, wait.

use tokio::time::MissedTickBehavior;

use crate::config::{ProducerConfig, TransportErrorPolicy};
use crate::error::TicksinkResult;
use crate::log::RecordPublisher;
use crate::shutdown::ShutdownHandle;
use crate::source::RowSource;

/// What the producer loop did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerReport {
    /// Payloads handed to the log client.
    pub sent: u64,
    /// Records dropped before publish (serialization failures, or publish
    /// errors under the log-and-continue policy).
    pub skipped: u64,
}

/// Publishes one sampled row per cadence interval until shutdown.
///
/// The loop owns the row source outright and holds no state between records.
/// Publishing is fire and forget; on shutdown the client buffer is flushed
/// synchronously before the handle is released, in that order, so nothing
/// in flight is silently dropped.
#[tracing::instrument(skip_all, name = "producer")]
pub async fn run_producer(
    mut source: RowSource,
    mut publisher: Box<dyn RecordPublisher>,
    config: ProducerConfig,
    shutdown: ShutdownHandle,
) -> TicksinkResult<ProducerReport> {
    let mut report = ProducerReport::default();
    let mut fatal = None;

    let mut interval = tokio::time::interval(config.cadence);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(rows = source.len(), "producer started");

    loop {
        tokio::select! {
            _ = shutdown.triggered() => break,
            _ = interval.tick() => {}
        }

        let record = source.sample();

        let payload = match record.to_payload() {
            Ok(payload) => payload,
            Err(err) => {
                // One bad row must not halt the stream.
                report.skipped += 1;
                tracing::warn!("skipping unserializable record: {:#?}", err);
                continue;
            }
        };

        match publisher.publish(payload).await {
            Ok(()) => {
                report.sent += 1;
                tracing::info!(sent = report.sent, "record published");
            }
            Err(err) => match config.transport_errors {
                TransportErrorPolicy::Fatal => {
                    tracing::error!("publish failed: {:#?}", err);
                    fatal = Some(err);
                    break;
                }
                TransportErrorPolicy::LogAndContinue => {
                    report.skipped += 1;
                    tracing::warn!("publish failed, continuing: {:#?}", err);
                }
            },
        }
    }

    // Flush-then-close, even when the loop is bailing out on an error.
    let flush_result = publisher.flush(config.flush_timeout).await;
    publisher.close().await;

    if let Some(err) = fatal {
        return Err(err);
    }
    flush_result?;

    tracing::info!(
        sent = report.sent,
        skipped = report.skipped,
        "producer stopped"
    );

    Ok(report)
}
