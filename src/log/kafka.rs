//! Kafka-backed implementations of the log seam.
//!
//! Thin adapters over `rdkafka`: a [`FutureProducer`] whose delivery futures
//! are deliberately dropped (the loop never waits per message), and a
//! [`StreamConsumer`] whose blocking receive races the shutdown token.
//! Transport retry and backoff below this layer belong to librdkafka.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::Message;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode as KafkaCommitMode, Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::topic_partition_list::TopicPartitionList;
use rdkafka::util::Timeout;

use crate::config::{BrokerConfig, CommitMode, ConsumerConfig};
use crate::error::{TicksinkError, TicksinkResult};
use crate::log::{DeliveredRecord, RecordPublisher, RecordSubscriber};
use crate::shutdown::ShutdownHandle;

/// Fire-and-forget publisher over a [`FutureProducer`].
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
}

impl KafkaPublisher {
    /// Connects a producer for the configured topic.
    pub fn new(config: &BrokerConfig) -> TicksinkResult<Self> {
        config.validate()?;

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", config.bootstrap_servers.join(","))
            .set(
                "client.id",
                format!("ticksink-producer-{}", uuid::Uuid::new_v4()),
            )
            .set(
                "message.timeout.ms",
                config.message_timeout.as_millis().to_string(),
            )
            .create()?;

        Ok(Self {
            producer,
            topic: config.topic.clone(),
        })
    }
}

#[async_trait]
impl RecordPublisher for KafkaPublisher {
    async fn publish(&mut self, payload: Bytes) -> TicksinkResult<()> {
        let record = FutureRecord::<(), [u8]>::to(&self.topic).payload(payload.as_ref());

        // Enqueue only. The delivery future is dropped on purpose; the
        // shutdown flush is what guarantees the buffer drains.
        let _delivery = self
            .producer
            .send_result(record)
            .map_err(|(err, _)| TicksinkError::from(err))?;

        Ok(())
    }

    async fn flush(&mut self, timeout: Duration) -> TicksinkResult<()> {
        let producer = self.producer.clone();

        // librdkafka's flush blocks the calling thread.
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|err| TicksinkError::Generic(format!("flush task failed: {err}")))??;

        Ok(())
    }

    async fn close(&mut self) {
        tracing::info!(topic = %self.topic, "producer connection closed");
    }
}

/// Group subscriber over a [`StreamConsumer`].
pub struct KafkaSubscriber {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaSubscriber {
    /// Connects and subscribes a consumer under the configured group.
    ///
    /// Auto-commit is enabled only under [`CommitMode::Auto`]; with
    /// [`CommitMode::AfterPersist`] the loop commits explicitly instead.
    pub fn new(broker: &BrokerConfig, config: &ConsumerConfig) -> TicksinkResult<Self> {
        broker.validate()?;

        let auto_commit = matches!(config.commit_mode, CommitMode::Auto);

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", broker.bootstrap_servers.join(","))
            .set("group.id", &broker.group_id)
            .set(
                "client.id",
                format!("ticksink-consumer-{}", uuid::Uuid::new_v4()),
            )
            .set("auto.offset.reset", broker.offset_reset.as_str())
            .set("enable.auto.commit", auto_commit.to_string())
            .set(
                "auto.commit.interval.ms",
                broker.auto_commit_interval.as_millis().to_string(),
            )
            .set(
                "session.timeout.ms",
                broker.session_timeout.as_millis().to_string(),
            )
            .set("enable.partition.eof", "false")
            .create()?;

        consumer.subscribe(&[broker.topic.as_str()])?;

        Ok(Self {
            consumer,
            topic: broker.topic.clone(),
        })
    }
}

#[async_trait]
impl RecordSubscriber for KafkaSubscriber {
    async fn recv(&mut self, shutdown: &ShutdownHandle) -> TicksinkResult<Option<DeliveredRecord>> {
        tokio::select! {
            _ = shutdown.triggered() => Ok(None),
            result = self.consumer.recv() => {
                let message = result?;

                let payload = message
                    .payload()
                    .map(Bytes::copy_from_slice)
                    .unwrap_or_default();

                Ok(Some(DeliveredRecord {
                    topic: message.topic().to_string(),
                    partition: message.partition(),
                    offset: message.offset(),
                    payload,
                }))
            }
        }
    }

    async fn commit(&mut self, record: &DeliveredRecord) -> TicksinkResult<()> {
        let mut offsets = TopicPartitionList::new();
        offsets.add_partition_offset(
            &record.topic,
            record.partition,
            rdkafka::Offset::Offset(record.offset + 1),
        )?;

        self.consumer.commit(&offsets, KafkaCommitMode::Async)?;

        Ok(())
    }

    async fn close(&mut self) {
        self.consumer.unsubscribe();
        tracing::info!(topic = %self.topic, "consumer connection closed");
    }
}
