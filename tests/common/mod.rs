//! Test doubles for the log seam and the object store.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use futures::stream::BoxStream;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore, PutMultipartOpts,
    PutOptions, PutPayload, PutResult,
};
use tokio::sync::mpsc;

use ticksink::error::{TicksinkError, TicksinkResult};
use ticksink::log::{DeliveredRecord, RecordPublisher, RecordSubscriber};
use ticksink::shutdown::ShutdownHandle;

pub const TEST_TOPIC: &str = "test-topic";

/// Channel-backed publisher. In buffered mode payloads stay in the client
/// buffer until `flush`, mirroring a real producer's internal queue.
pub struct MemoryPublisher {
    tx: Option<mpsc::UnboundedSender<Bytes>>,
    buffer: Vec<Bytes>,
    buffered: bool,
    published: Arc<AtomicU64>,
}

impl MemoryPublisher {
    pub fn published_counter(&self) -> Arc<AtomicU64> {
        self.published.clone()
    }

    fn send(tx: &Option<mpsc::UnboundedSender<Bytes>>, payload: Bytes) -> TicksinkResult<()> {
        tx.as_ref()
            .ok_or_else(|| TicksinkError::Generic("publisher closed".to_string()))?
            .send(payload)
            .map_err(|err| TicksinkError::Generic(format!("log unavailable: {err}")))
    }
}

#[async_trait]
impl RecordPublisher for MemoryPublisher {
    async fn publish(&mut self, payload: Bytes) -> TicksinkResult<()> {
        self.published.fetch_add(1, Ordering::Relaxed);
        if self.buffered {
            self.buffer.push(payload);
            Ok(())
        } else {
            Self::send(&self.tx, payload)
        }
    }

    async fn flush(&mut self, _timeout: Duration) -> TicksinkResult<()> {
        for payload in self.buffer.drain(..) {
            Self::send(&self.tx, payload)?;
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.tx = None;
    }
}

/// Subscriber end of the in-memory log. Assigns offsets in arrival order and
/// records every explicit commit for assertions.
pub struct ChannelSubscriber {
    rx: mpsc::UnboundedReceiver<Bytes>,
    next_offset: i64,
    committed: Arc<Mutex<Vec<i64>>>,
}

#[async_trait]
impl RecordSubscriber for ChannelSubscriber {
    async fn recv(&mut self, shutdown: &ShutdownHandle) -> TicksinkResult<Option<DeliveredRecord>> {
        tokio::select! {
            // Drain queued records before observing shutdown, so tests see a
            // deterministic handoff.
            biased;
            payload = self.rx.recv() => Ok(payload.map(|payload| {
                let offset = self.next_offset;
                self.next_offset += 1;
                DeliveredRecord {
                    topic: TEST_TOPIC.to_string(),
                    partition: 0,
                    offset,
                    payload,
                }
            })),
            _ = shutdown.triggered() => Ok(None),
        }
    }

    async fn commit(&mut self, record: &DeliveredRecord) -> TicksinkResult<()> {
        self.committed
            .lock()
            .expect("committed lock poisoned")
            .push(record.offset);
        Ok(())
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}

/// A connected publisher/subscriber pair plus the commit ledger.
pub fn memory_log(buffered: bool) -> (MemoryPublisher, ChannelSubscriber, Arc<Mutex<Vec<i64>>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let committed = Arc::new(Mutex::new(Vec::new()));

    let publisher = MemoryPublisher {
        tx: Some(tx),
        buffer: Vec::new(),
        buffered,
        published: Arc::new(AtomicU64::new(0)),
    };
    let subscriber = ChannelSubscriber {
        rx,
        next_offset: 0,
        committed: committed.clone(),
    };

    (publisher, subscriber, committed)
}

/// Subscriber that replays a fixed set of delivered records, then reports the
/// log exhausted. Lets a test simulate redelivery after a restart.
pub struct ReplaySubscriber {
    queue: VecDeque<DeliveredRecord>,
    committed: Arc<Mutex<Vec<i64>>>,
}

impl ReplaySubscriber {
    pub fn new(records: Vec<DeliveredRecord>) -> (Self, Arc<Mutex<Vec<i64>>>) {
        let committed = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                queue: records.into(),
                committed: committed.clone(),
            },
            committed,
        )
    }
}

#[async_trait]
impl RecordSubscriber for ReplaySubscriber {
    async fn recv(&mut self, shutdown: &ShutdownHandle) -> TicksinkResult<Option<DeliveredRecord>> {
        if shutdown.is_triggered() {
            return Ok(None);
        }
        Ok(self.queue.pop_front())
    }

    async fn commit(&mut self, record: &DeliveredRecord) -> TicksinkResult<()> {
        self.committed
            .lock()
            .expect("committed lock poisoned")
            .push(record.offset);
        Ok(())
    }

    async fn close(&mut self) {}
}

pub fn delivered(offset: i64, payload: &[u8]) -> DeliveredRecord {
    DeliveredRecord {
        topic: TEST_TOPIC.to_string(),
        partition: 0,
        offset,
        payload: Bytes::copy_from_slice(payload),
    }
}

/// Publisher whose every publish fails at the transport level.
pub struct FailingPublisher;

#[async_trait]
impl RecordPublisher for FailingPublisher {
    async fn publish(&mut self, _payload: Bytes) -> TicksinkResult<()> {
        Err(TicksinkError::Generic("broker unreachable".to_string()))
    }

    async fn flush(&mut self, _timeout: Duration) -> TicksinkResult<()> {
        Ok(())
    }

    async fn close(&mut self) {}
}

/// Object store wrapper that fails the first `fail_first` writes, then
/// delegates to an in-memory store.
#[derive(Debug)]
pub struct FlakyStore {
    inner: InMemory,
    remaining_failures: AtomicU64,
}

impl FlakyStore {
    pub fn new(fail_first: u64) -> Self {
        Self {
            inner: InMemory::new(),
            remaining_failures: AtomicU64::new(fail_first),
        }
    }
}

impl std::fmt::Display for FlakyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FlakyStore")
    }
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        if self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(object_store::Error::Generic {
                store: "FlakyStore",
                source: "injected write failure".into(),
            });
        }
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &Path,
        opts: PutMultipartOpts,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get_opts(
        &self,
        location: &Path,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &Path) -> object_store::Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'static, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(
        &self,
        prefix: Option<&Path>,
    ) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}

/// Sorted object paths currently in the store.
pub async fn list_paths(store: &dyn ObjectStore) -> Vec<String> {
    let mut paths: Vec<String> = store
        .list(None)
        .try_collect::<Vec<ObjectMeta>>()
        .await
        .expect("listing the store should not fail")
        .into_iter()
        .map(|meta| meta.location.to_string())
        .collect();
    paths.sort();
    paths
}
