use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use ticksink::config::Settings;
use ticksink::log::kafka::{KafkaPublisher, KafkaSubscriber};
use ticksink::shutdown::spawn_signal_listener;
use ticksink::{ObjectSink, RowSource, ShutdownHandle, run_pipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;

    tracing::info!(
        brokers = ?settings.broker.bootstrap_servers,
        topic = %settings.broker.topic,
        group = %settings.broker.group_id,
        bucket = %settings.storage.bucket,
        "starting ticksink"
    );

    let source = RowSource::from_csv_path(&settings.dataset, settings.seed)?;
    tracing::info!(rows = source.len(), dataset = %settings.dataset, "dataset loaded");

    let publisher = Box::new(KafkaPublisher::new(&settings.broker)?);
    let subscriber = Box::new(KafkaSubscriber::new(
        &settings.broker,
        &settings.pipeline.consumer,
    )?);

    let store = AmazonS3Builder::from_env()
        .with_bucket_name(&settings.storage.bucket)
        .build()?;
    let sink = ObjectSink::new(Arc::new(store), settings.storage.prefix.clone());

    let shutdown = ShutdownHandle::new();
    let _signal_listener = spawn_signal_listener(shutdown.clone());

    let report = run_pipeline(
        source,
        publisher,
        subscriber,
        sink,
        settings.pipeline.clone(),
        shutdown,
    )
    .await?;

    tracing::info!(
        sent = report.producer.sent,
        persisted = report.consumer.persisted,
        dropped = report.consumer.dropped,
        "pipeline finished"
    );

    Ok(())
}
