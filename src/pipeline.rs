//! Wiring the two loops together.

use crate::config::PipelineConfig;
use crate::consumer::{ConsumerReport, run_consumer};
use crate::error::{TicksinkError, TicksinkResult};
use crate::log::{RecordPublisher, RecordSubscriber};
use crate::producer::{ProducerReport, run_producer};
use crate::shutdown::ShutdownHandle;
use crate::sink::ObjectSink;
use crate::source::RowSource;

/// Combined outcome of a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Producer loop summary.
    pub producer: ProducerReport,
    /// Consumer loop summary.
    pub consumer: ConsumerReport,
}

/// Runs producer and consumer as independent tasks until shutdown.
///
/// The consumer starts first and gets a warm-up delay so its subscription is
/// established before records begin to flow; that is best effort, the
/// earliest-offset reset policy is the real safety net. The two tasks share
/// nothing in process and never signal each other. Shutdown waits for both:
/// a failure in one loop is held until the other has finished on its own.
#[tracing::instrument(skip_all, name = "pipeline")]
pub async fn run_pipeline(
    source: RowSource,
    publisher: Box<dyn RecordPublisher>,
    subscriber: Box<dyn RecordSubscriber>,
    sink: ObjectSink,
    config: PipelineConfig,
    shutdown: ShutdownHandle,
) -> TicksinkResult<PipelineReport> {
    let consumer_task = tokio::spawn(run_consumer(
        subscriber,
        sink,
        config.consumer.clone(),
        shutdown.clone(),
    ));

    tokio::select! {
        _ = shutdown.triggered() => {}
        _ = tokio::time::sleep(config.warmup) => {}
    }

    let producer_task = tokio::spawn(run_producer(
        source,
        publisher,
        config.producer.clone(),
        shutdown.clone(),
    ));

    let (consumer_result, producer_result) = tokio::join!(consumer_task, producer_task);

    let consumer_result = consumer_result
        .map_err(|err| TicksinkError::Generic(format!("consumer task panicked: {err}")))?;
    let producer_result = producer_result
        .map_err(|err| TicksinkError::Generic(format!("producer task panicked: {err}")))?;

    // Surface one failure without masking the other loop's outcome.
    match (producer_result, consumer_result) {
        (Ok(producer), Ok(consumer)) => Ok(PipelineReport { producer, consumer }),
        (Err(err), Ok(consumer)) => {
            tracing::error!(
                persisted = consumer.persisted,
                "producer loop failed: {:#?}",
                err
            );
            Err(err)
        }
        (Ok(producer), Err(err)) => {
            tracing::error!(sent = producer.sent, "consumer loop failed: {:#?}", err);
            Err(err)
        }
        (Err(producer_err), Err(consumer_err)) => {
            tracing::error!("consumer loop failed: {:#?}", consumer_err);
            Err(producer_err)
        }
    }
}
