//! Ticksink
//!
//! Bridges a finite dataset through a Kafka topic into object storage: a
//! producer task samples rows and publishes them at a fixed cadence, while a
//! consumer task drains the same topic and persists each record as its own
//! JSON object. The broker and the storage service do all the hard work;
//! this crate is the lifecycle, coordination and failure-policy layer
//! around them.
//!
//! example usage:
//!
//! ```no_run
//! # async fn demo() -> ticksink::error::TicksinkResult<()> {
//! use std::sync::Arc;
//! use ticksink::config::{BrokerConfig, PipelineConfig};
//! use ticksink::log::kafka::{KafkaPublisher, KafkaSubscriber};
//! use ticksink::{ObjectSink, RowSource, ShutdownHandle, run_pipeline};
//!
//! let broker = BrokerConfig::new(
//!     vec!["localhost:9092".to_string()],
//!     "demo-ticks",
//!     "ticksink-combined-group",
//! )?;
//! let config = PipelineConfig::default();
//!
//! let source = RowSource::from_csv_path("indexProcessed.csv", 0)?;
//! let publisher = Box::new(KafkaPublisher::new(&broker)?);
//! let subscriber = Box::new(KafkaSubscriber::new(&broker, &config.consumer)?);
//! let sink = ObjectSink::new(
//!     Arc::new(object_store::memory::InMemory::new()),
//!     "stock_market",
//! );
//!
//! let shutdown = ShutdownHandle::new();
//! let _listener = ticksink::shutdown::spawn_signal_listener(shutdown.clone());
//!
//! let _report = run_pipeline(source, publisher, subscriber, sink, config, shutdown).await?;
//! # Ok(())
//! # }
//! ```
#![deny(missing_docs)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod log;
pub mod record;
pub mod shutdown;
pub mod sink;
pub mod source;

mod consumer;
mod pipeline;
mod producer;

pub use consumer::{ConsumerReport, run_consumer};
pub use error::{TicksinkError, TicksinkResult};
pub use log::DeliveredRecord;
pub use object_store;
pub use pipeline::{PipelineReport, run_pipeline};
pub use producer::{ProducerReport, run_producer};
pub use record::{Record, Scalar};
pub use shutdown::ShutdownHandle;
pub use sink::{ObjectKey, ObjectSink};
pub use source::RowSource;
