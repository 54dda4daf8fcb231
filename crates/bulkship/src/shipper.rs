// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shipper facade and flush coordinator.
//!
//! The facade accepts one event at a time, serializes it off the caller's
//! synchronous path, appends it to the queue, and triggers an automatic
//! background flush once the buffer threshold is reached. The coordinator
//! owns the single-flight guarantee: a flush cycle runs under an exclusive
//! lock through snapshot, serialize, transport send and file write, so two
//! cycles never overlap. A concurrent flush call blocks until the running
//! cycle completes, then drains whatever queued in the meantime.

use crate::bulk::BulkFormatter;
use crate::config::ShipperConfig;
use crate::error::ShipperError;
use crate::file_sink::FileSink;
use crate::queue::{EventQueue, QueuedItem};
use crate::transport::{BulkTransport, HttpTransport};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on the shutdown drain flush.
pub const SHUTDOWN_DRAIN: Duration = Duration::from_millis(1000);

/// Counters observable through [`Shipper::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShipperStats {
    /// Events accepted into the queue.
    pub events_queued: u64,
    /// Events dropped because payload serialization failed.
    pub events_dropped: u64,
    /// Batches accepted by the bulk endpoint.
    pub batches_sent: u64,
    /// Failed bulk requests (each one is a lost batch for the network sink).
    pub transport_errors: u64,
    /// Failed file sink writes.
    pub file_errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    events_queued: AtomicU64,
    events_dropped: AtomicU64,
    batches_sent: AtomicU64,
    transport_errors: AtomicU64,
    file_errors: AtomicU64,
}

struct Inner<T> {
    config: ShipperConfig,
    queue: EventQueue,
    flush_lock: tokio::sync::Mutex<()>,
    transport: T,
    file_sink: Option<FileSink>,
    formatter: BulkFormatter,
    counters: Counters,
}

/// Buffered bulk event shipper.
///
/// Cheap to clone; clones share the queue and the flush lock. The instance
/// is caller-owned: create it, log through it, and call [`Shipper::shutdown`]
/// before dropping it to drain the buffer (best-effort, bounded by
/// [`SHUTDOWN_DRAIN`]).
pub struct Shipper<T: BulkTransport = HttpTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: BulkTransport> Clone for Shipper<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Shipper<HttpTransport> {
    /// Create a shipper with the HTTP transport. Fails fast on a malformed
    /// server URL or, when the file sink is enabled, an unusable directory.
    pub fn new(config: ShipperConfig) -> Result<Self, ShipperError> {
        let transport = HttpTransport::new(&config.server)?;
        Self::with_transport(config, transport)
    }
}

impl<T: BulkTransport> Shipper<T> {
    /// Create a shipper over a custom transport.
    pub fn with_transport(config: ShipperConfig, transport: T) -> Result<Self, ShipperError> {
        config.validate()?;

        let file_sink = if config.file_sink_enabled {
            Some(FileSink::new(&config)?)
        } else {
            None
        };
        let formatter = BulkFormatter::wire(config.index_date_pattern.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                queue: EventQueue::new(),
                flush_lock: tokio::sync::Mutex::new(()),
                transport,
                file_sink,
                formatter,
                counters: Counters::default(),
            }),
        })
    }

    /// Enqueue one event for the given destination index and type.
    ///
    /// No-op when the shipper is disabled. The payload is serialized on a
    /// blocking worker; a serialization failure drops the event and is only
    /// visible through diagnostics and stats, never to the caller. When
    /// auto-flush is on and the buffer reaches the threshold, a flush is
    /// dispatched as a detached task; this call does not wait for it.
    pub async fn log<E>(&self, index: &str, doc_type: &str, event: E)
    where
        E: Serialize + Send + 'static,
    {
        let inner = &self.inner;
        if !inner.config.enabled {
            return;
        }

        if inner.config.diagnostics {
            tracing::debug!(doc_type, "serializing event");
        }

        let payload =
            match tokio::task::spawn_blocking(move || serde_json::to_string(&event)).await {
                Ok(Ok(json)) => json,
                Ok(Err(err)) => {
                    let err = ShipperError::Serialize(err);
                    inner.counters.events_dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(doc_type, error = %err, "event serialization failed, dropping event");
                    return;
                }
                Err(err) => {
                    inner.counters.events_dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(doc_type, error = %err, "serializer task failed, dropping event");
                    return;
                }
            };

        let queued = inner
            .queue
            .append(QueuedItem::new(index, doc_type, payload));
        inner.counters.events_queued.fetch_add(1, Ordering::Relaxed);

        if inner.config.diagnostics {
            tracing::debug!(doc_type, queued, "event queued");
        }

        if inner.config.auto_flush && queued >= inner.config.buffer_threshold {
            let shipper = self.clone();
            tokio::spawn(async move {
                shipper.flush().await;
            });
        }
    }

    /// Run one flush cycle: snapshot-and-clear the queue, ship the batch to
    /// the bulk endpoint, and mirror it to the file sink if enabled.
    ///
    /// Never fails from the caller's perspective; sink errors are caught,
    /// counted and logged. The file sink runs regardless of the transport
    /// outcome. An empty snapshot makes no network call.
    pub async fn flush(&self) {
        let inner = &self.inner;
        let _guard = inner.flush_lock.lock().await;

        let items = inner.queue.snapshot_and_clear();
        if items.is_empty() {
            return;
        }
        let batch_len = items.len();

        if inner.config.diagnostics {
            tracing::debug!(items = batch_len, "flush started");
        }

        let body = inner.formatter.format(&items);
        match inner.transport.send(body).await {
            Ok(status) => {
                inner.counters.batches_sent.fetch_add(1, Ordering::Relaxed);
                if inner.config.diagnostics {
                    tracing::debug!(items = batch_len, %status, "bulk request accepted");
                }
            }
            Err(err) => {
                inner
                    .counters
                    .transport_errors
                    .fetch_add(1, Ordering::Relaxed);
                tracing::error!(items = batch_len, error = %err, "bulk request failed, batch lost");
            }
        }

        if let Some(sink) = &inner.file_sink {
            let sink = sink.clone();
            match tokio::task::spawn_blocking(move || sink.write(&items)).await {
                Ok(Ok(())) => {
                    if inner.config.diagnostics {
                        tracing::debug!(items = batch_len, "file sink write complete");
                    }
                }
                Ok(Err(err)) => {
                    inner.counters.file_errors.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(error = %err, "file sink write failed");
                }
                Err(err) => {
                    inner.counters.file_errors.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(error = %err, "file sink task failed");
                }
            }
        }
    }

    /// Drain remaining items, waiting at most [`SHUTDOWN_DRAIN`].
    ///
    /// On timeout this simply returns; the flush keeps running (or is
    /// abandoned with the runtime) in the background. Best-effort by design.
    pub async fn shutdown(&self) {
        if self.inner.queue.is_empty() {
            return;
        }

        if self.inner.config.diagnostics {
            tracing::debug!(
                pending = self.inner.queue.len(),
                "shutting down with pending events, flushing"
            );
        }

        let shipper = self.clone();
        let drain = tokio::spawn(async move {
            shipper.flush().await;
        });

        if tokio::time::timeout(SHUTDOWN_DRAIN, drain).await.is_err() {
            tracing::warn!(
                deadline_ms = SHUTDOWN_DRAIN.as_millis() as u64,
                "shutdown drain deadline exceeded, abandoning remaining items"
            );
        }
    }

    /// Number of items currently buffered.
    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }

    /// Snapshot of the shipper counters.
    pub fn stats(&self) -> ShipperStats {
        let c = &self.inner.counters;
        ShipperStats {
            events_queued: c.events_queued.load(Ordering::Relaxed),
            events_dropped: c.events_dropped.load(Ordering::Relaxed),
            batches_sent: c.batches_sent.load(Ordering::Relaxed),
            transport_errors: c.transport_errors.load(Ordering::Relaxed),
            file_errors: c.file_errors.load(Ordering::Relaxed),
        }
    }

    /// The configuration this shipper was built with.
    pub fn config(&self) -> &ShipperConfig {
        &self.inner.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct MockState {
        bodies: Mutex<Vec<String>>,
        fail: bool,
        delay: Option<Duration>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[derive(Debug, Clone, Default)]
    struct MockTransport {
        state: Arc<MockState>,
    }

    impl MockTransport {
        fn new() -> Self {
            Self::default()
        }

        fn failing() -> Self {
            Self {
                state: Arc::new(MockState {
                    fail: true,
                    ..Default::default()
                }),
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                state: Arc::new(MockState {
                    delay: Some(delay),
                    ..Default::default()
                }),
            }
        }

        fn bodies(&self) -> Vec<String> {
            self.state.bodies.lock().unwrap().clone()
        }

        fn max_in_flight(&self) -> usize {
            self.state.max_in_flight.load(Ordering::SeqCst)
        }
    }

    impl BulkTransport for MockTransport {
        async fn send(&self, body: String) -> Result<String, ShipperError> {
            let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.state.delay {
                tokio::time::sleep(delay).await;
            }

            self.state.bodies.lock().unwrap().push(body);
            self.state.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.state.fail {
                Err(ShipperError::Transport {
                    message: "mock transport failure".to_string(),
                    status: Some(500),
                })
            } else {
                Ok("OK".to_string())
            }
        }
    }

    fn shipper_with(config: ShipperConfig, transport: &MockTransport) -> Shipper<MockTransport> {
        Shipper::with_transport(config, transport.clone()).unwrap()
    }

    /// Source lines of a bulk body (every second line after an action line).
    fn payload_lines(body: &str) -> Vec<String> {
        body.lines().skip(1).step_by(2).map(str::to_string).collect()
    }

    #[tokio::test]
    async fn test_threshold_triggers_two_auto_flushes() {
        let transport = MockTransport::new();
        let config = ShipperConfig::new("http://localhost:9200").buffer_threshold(3);
        let shipper = shipper_with(config, &transport);

        for n in 1..=7u32 {
            shipper.log("soxportal", "event1", json!({ "n": n })).await;
            // Give the detached flush task time to run.
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let bodies = transport.bodies();
        assert_eq!(bodies.len(), 2);
        assert_eq!(
            payload_lines(&bodies[0]),
            vec!["{\"n\":1}", "{\"n\":2}", "{\"n\":3}"]
        );
        assert_eq!(
            payload_lines(&bodies[1]),
            vec!["{\"n\":4}", "{\"n\":5}", "{\"n\":6}"]
        );
        assert_eq!(shipper.pending(), 1);
        assert_eq!(shipper.stats().batches_sent, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_flush_every_item_exactly_once() {
        let transport = MockTransport::new();
        let config = ShipperConfig::new("http://localhost:9200").buffer_threshold(5);
        let shipper = shipper_with(config, &transport);

        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let shipper = shipper.clone();
                tokio::spawn(async move {
                    for n in 0..50u32 {
                        shipper.log("idx", "t", json!({ "p": p, "n": n })).await;
                    }
                })
            })
            .collect();
        for task in producers {
            task.await.unwrap();
        }

        // Let detached auto-flushes settle, then drain the remainder.
        tokio::time::sleep(Duration::from_millis(100)).await;
        shipper.flush().await;

        let mut all: Vec<String> = transport
            .bodies()
            .iter()
            .flat_map(|body| payload_lines(body))
            .collect();
        assert_eq!(all.len(), 200);
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 200);
        assert_eq!(shipper.pending(), 0);
        assert_eq!(shipper.stats().events_queued, 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight_flush() {
        let transport = MockTransport::slow(Duration::from_millis(50));
        let config = ShipperConfig::new("http://localhost:9200").auto_flush(false);
        let shipper = shipper_with(config, &transport);

        shipper.log("idx", "t", json!({ "n": 1 })).await;
        let second = shipper.clone();
        tokio::join!(shipper.flush(), second.flush());

        shipper.log("idx", "t", json!({ "n": 2 })).await;
        shipper.flush().await;

        assert_eq!(transport.max_in_flight(), 1);
        // The losing concurrent flush saw an empty queue and skipped the send.
        assert_eq!(transport.bodies().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue_in_order() {
        let transport = MockTransport::new();
        let config = ShipperConfig::new("http://localhost:9200").auto_flush(false);
        let shipper = shipper_with(config, &transport);

        shipper.log("idx", "t", json!({ "n": 1 })).await;
        shipper.log("idx", "t", json!({ "n": 2 })).await;
        shipper.shutdown().await;

        let bodies = transport.bodies();
        assert_eq!(bodies.len(), 1);
        assert_eq!(payload_lines(&bodies[0]), vec!["{\"n\":1}", "{\"n\":2}"]);
        assert_eq!(shipper.pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_returns_at_drain_deadline() {
        let transport = MockTransport::slow(Duration::from_secs(3));
        let config = ShipperConfig::new("http://localhost:9200").auto_flush(false);
        let shipper = shipper_with(config, &transport);

        shipper.log("idx", "t", json!({ "n": 1 })).await;

        let started = std::time::Instant::now();
        shipper.shutdown().await;
        let elapsed = started.elapsed();
        assert!(elapsed >= SHUTDOWN_DRAIN);
        assert!(elapsed < Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_block_file_sink() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::failing();
        let config = ShipperConfig::new("http://localhost:9200")
            .auto_flush(false)
            .file_sink_enabled(true)
            .file_log_dir(dir.path());
        let shipper = shipper_with(config, &transport);

        shipper.log("soxportal", "event1", json!({ "a": 1 })).await;
        shipper.log("soxportal", "event2", json!({ "b": 2 })).await;
        shipper.flush().await;

        let stats = shipper.stats();
        assert_eq!(stats.transport_errors, 1);
        assert_eq!(stats.file_errors, 0);
        assert_eq!(shipper.pending(), 0);

        let mut files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        files.sort();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("-soxportal-event1.json"));
        assert!(files[1].ends_with("-soxportal-event2.json"));
    }

    #[tokio::test]
    async fn test_disabled_shipper_drops_everything() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        let config = ShipperConfig::new("http://localhost:9200")
            .enabled(false)
            .file_sink_enabled(true)
            .file_log_dir(dir.path());
        let shipper = shipper_with(config, &transport);

        for n in 0..3u32 {
            shipper.log("idx", "t", json!({ "n": n })).await;
        }
        assert_eq!(shipper.pending(), 0);

        shipper.flush().await;
        assert!(transport.bodies().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(shipper.stats().events_queued, 0);
    }

    #[tokio::test]
    async fn test_flush_on_empty_queue_makes_no_network_call() {
        let transport = MockTransport::new();
        let config = ShipperConfig::new("http://localhost:9200");
        let shipper = shipper_with(config, &transport);

        shipper.flush().await;
        shipper.shutdown().await;
        assert!(transport.bodies().is_empty());
    }

    #[tokio::test]
    async fn test_construction_rejects_bad_config() {
        let transport = MockTransport::new();
        let bad_url = ShipperConfig::new("not a url");
        assert!(Shipper::with_transport(bad_url, transport.clone()).is_err());

        let bad_threshold = ShipperConfig::new("http://localhost:9200").buffer_threshold(0);
        assert!(Shipper::with_transport(bad_threshold, transport).is_err());
    }
}
