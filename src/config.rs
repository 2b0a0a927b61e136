//! Configuration for the broker connection, the two loops, and the sink.
//!
//! Everything that spec'd behavior hangs off (offset reset, commit ordering,
//! object key derivation, transport-error handling) is an explicit knob here
//! rather than a hard-coded choice. The binary fills these structs from
//! `TICKSINK_*` environment variables; the library takes them as plain values.

use std::str::FromStr;
use std::time::Duration;

use crate::error::{TicksinkError, TicksinkResult};

/// Where a fresh consumer group starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetReset {
    /// Start from the oldest retained record.
    #[default]
    Earliest,
    /// Start from new records only.
    Latest,
}

impl OffsetReset {
    /// The broker-side configuration value.
    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
        }
    }
}

impl FromStr for OffsetReset {
    type Err = TicksinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earliest" => Ok(OffsetReset::Earliest),
            "latest" => Ok(OffsetReset::Latest),
            other => Err(TicksinkError::Config(format!(
                "invalid offset reset '{other}': must be 'earliest' or 'latest'"
            ))),
        }
    }
}

/// When the consumer marks a record as consumed.
///
/// `Auto` keeps the broker's periodic auto-commit, which can commit a record
/// before its object write is durable: a crash in that window loses the
/// record without redelivery. `AfterPersist` commits only once the write
/// succeeded, trading that loss window for possible duplicates on retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    /// Broker-side periodic auto-commit, possibly before persistence.
    Auto,
    /// Explicit commit after each successful storage write.
    #[default]
    AfterPersist,
}

impl FromStr for CommitMode {
    type Err = TicksinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(CommitMode::Auto),
            "after-persist" => Ok(CommitMode::AfterPersist),
            other => Err(TicksinkError::Config(format!(
                "invalid commit mode '{other}': must be 'auto' or 'after-persist'"
            ))),
        }
    }
}

/// How object keys are derived for persisted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMode {
    /// Key from the log's own partition and offset. Stable across restarts,
    /// so re-processing an offset rewrites the same object.
    #[default]
    PartitionOffset,
    /// In-process counter starting at zero per consumer loop instance. Resets
    /// on restart and can overwrite earlier objects at the same names.
    Sequence,
}

impl FromStr for KeyMode {
    type Err = TicksinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "partition-offset" => Ok(KeyMode::PartitionOffset),
            "sequence" => Ok(KeyMode::Sequence),
            other => Err(TicksinkError::Config(format!(
                "invalid key mode '{other}': must be 'partition-offset' or 'sequence'"
            ))),
        }
    }
}

/// What a loop does when its log client reports a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorPolicy {
    /// Stop the loop and surface the error.
    Fatal,
    /// Log the error and keep going, leaning on the client's own retries.
    LogAndContinue,
}

impl Default for TransportErrorPolicy {
    fn default() -> Self {
        TransportErrorPolicy::LogAndContinue
    }
}

/// Retry budget for storage writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. At least one.
    pub attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

/// Connection details shared by both Kafka clients.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Broker endpoints as `host:port`.
    pub bootstrap_servers: Vec<String>,
    /// Topic both loops reference by name.
    pub topic: String,
    /// Consumer group identity for offset tracking.
    pub group_id: String,
    /// Initial offset policy for a group with no committed position.
    pub offset_reset: OffsetReset,
    /// Consumer session timeout.
    pub session_timeout: Duration,
    /// Broker-side auto-commit interval, used under [`CommitMode::Auto`].
    pub auto_commit_interval: Duration,
    /// Producer-side delivery timeout per message.
    pub message_timeout: Duration,
}

impl BrokerConfig {
    /// Builds a validated config with defaulted timeouts.
    pub fn new(
        bootstrap_servers: Vec<String>,
        topic: impl Into<String>,
        group_id: impl Into<String>,
    ) -> TicksinkResult<Self> {
        let config = Self {
            bootstrap_servers,
            topic: topic.into(),
            group_id: group_id.into(),
            offset_reset: OffsetReset::default(),
            session_timeout: Duration::from_secs(6),
            auto_commit_interval: Duration::from_secs(5),
            message_timeout: Duration::from_secs(5),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects empty endpoints, topic or group.
    pub fn validate(&self) -> TicksinkResult<()> {
        if self.bootstrap_servers.is_empty()
            || self.bootstrap_servers.iter().any(|s| s.trim().is_empty())
        {
            return Err(TicksinkError::Config(
                "bootstrap servers must not be empty".to_string(),
            ));
        }
        if self.topic.trim().is_empty() {
            return Err(TicksinkError::Config("topic must not be empty".to_string()));
        }
        if self.group_id.trim().is_empty() {
            return Err(TicksinkError::Config(
                "group id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Knobs for the producer loop.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Fixed delay between publishes.
    pub cadence: Duration,
    /// How long the shutdown flush may block.
    pub flush_timeout: Duration,
    /// What to do when a publish fails at the transport level.
    pub transport_errors: TransportErrorPolicy,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            cadence: Duration::from_secs(1),
            flush_timeout: Duration::from_secs(5),
            transport_errors: TransportErrorPolicy::Fatal,
        }
    }
}

/// Knobs for the consumer loop.
#[derive(Debug, Clone, Default)]
pub struct ConsumerConfig {
    /// Commit ordering relative to persistence.
    pub commit_mode: CommitMode,
    /// Object key derivation.
    pub key_mode: KeyMode,
    /// What to do when a receive fails at the transport level.
    pub transport_errors: TransportErrorPolicy,
}

/// Wiring for the whole pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Delay between starting the consumer and the producer, giving the
    /// subscription a head start. Best effort only; the earliest offset
    /// reset policy is what actually prevents missed records.
    pub warmup: Duration,
    /// Producer loop knobs.
    pub producer: ProducerConfig,
    /// Consumer loop knobs.
    pub consumer: ConsumerConfig,
}

/// Destination for persisted objects.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket name.
    pub bucket: String,
    /// Key prefix, e.g. `stock_market` for objects named
    /// `stock_market_<key>.json`.
    pub prefix: String,
}

/// Everything the binary needs, resolved from `TICKSINK_*` environment
/// variables with the original demo's values as defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Broker connection details.
    pub broker: BrokerConfig,
    /// Object storage destination.
    pub storage: StorageConfig,
    /// Loop and lifecycle knobs.
    pub pipeline: PipelineConfig,
    /// Path of the CSV dataset to sample.
    pub dataset: String,
    /// Sampling seed, zero for clock-seeded.
    pub seed: u64,
}

impl Settings {
    /// Reads settings from the environment.
    pub fn from_env() -> TicksinkResult<Self> {
        let bootstrap_servers = env_or("TICKSINK_BROKERS", "localhost:9092")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let mut broker = BrokerConfig::new(
            bootstrap_servers,
            env_or("TICKSINK_TOPIC", "demo-ticks"),
            env_or("TICKSINK_GROUP", "ticksink-combined-group"),
        )?;
        broker.offset_reset = env_parsed("TICKSINK_OFFSET_RESET")?.unwrap_or_default();

        let mut pipeline = PipelineConfig {
            warmup: Duration::from_millis(env_u64("TICKSINK_WARMUP_MS")?.unwrap_or(2_000)),
            ..PipelineConfig::default()
        };
        pipeline.producer.cadence =
            Duration::from_millis(env_u64("TICKSINK_CADENCE_MS")?.unwrap_or(1_000));
        pipeline.consumer.commit_mode = env_parsed("TICKSINK_COMMIT_MODE")?.unwrap_or_default();
        pipeline.consumer.key_mode = env_parsed("TICKSINK_KEY_MODE")?.unwrap_or_default();

        let storage = StorageConfig {
            bucket: env_or("TICKSINK_BUCKET", "kafka-stock-market"),
            prefix: env_or("TICKSINK_PREFIX", "stock_market"),
        };

        Ok(Self {
            broker,
            storage,
            pipeline,
            dataset: env_or("TICKSINK_DATASET", "indexProcessed.csv"),
            seed: env_u64("TICKSINK_SEED")?.unwrap_or(0),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: FromStr<Err = TicksinkError>>(key: &str) -> TicksinkResult<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map(Some),
        Err(_) => Ok(None),
    }
}

fn env_u64(key: &str) -> TicksinkResult<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|err| TicksinkError::Config(format!("invalid {key}: {err}"))),
        Err(_) => Ok(None),
    }
}
