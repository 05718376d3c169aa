use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Process-wide metrics collector.
///
/// Thread-safe and cheap to clone; shared across handlers and the
/// pipeline.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    batches_submitted: AtomicUsize,
    batches_completed: AtomicUsize,
    pages_processed: AtomicUsize,
    pages_done: AtomicUsize,
    pages_failed: AtomicUsize,
    broadcasts_sent: AtomicUsize,
    ws_connections_active: AtomicUsize,
    start_time: Instant,
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub batches_submitted: usize,
    pub batches_completed: usize,
    pub pages_processed: usize,
    pub pages_done: usize,
    pub pages_failed: usize,
    pub broadcasts_sent: usize,
    pub ws_connections_active: usize,
    pub uptime_seconds: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                batches_submitted: AtomicUsize::new(0),
                batches_completed: AtomicUsize::new(0),
                pages_processed: AtomicUsize::new(0),
                pages_done: AtomicUsize::new(0),
                pages_failed: AtomicUsize::new(0),
                broadcasts_sent: AtomicUsize::new(0),
                ws_connections_active: AtomicUsize::new(0),
                start_time: Instant::now(),
            }),
        }
    }

    pub fn record_batch_submitted(&self) {
        self.inner.batches_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_completed(&self) {
        self.inner.batches_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page_done(&self) {
        self.inner.pages_processed.fetch_add(1, Ordering::Relaxed);
        self.inner.pages_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page_failed(&self) {
        self.inner.pages_processed.fetch_add(1, Ordering::Relaxed);
        self.inner.pages_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_broadcast(&self) {
        self.inner.broadcasts_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ws_connected(&self) {
        self.inner
            .ws_connections_active
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn ws_disconnected(&self) {
        self.inner
            .ws_connections_active
            .fetch_sub(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_submitted: self.inner.batches_submitted.load(Ordering::Relaxed),
            batches_completed: self.inner.batches_completed.load(Ordering::Relaxed),
            pages_processed: self.inner.pages_processed.load(Ordering::Relaxed),
            pages_done: self.inner.pages_done.load(Ordering::Relaxed),
            pages_failed: self.inner.pages_failed.load(Ordering::Relaxed),
            broadcasts_sent: self.inner.broadcasts_sent.load(Ordering::Relaxed),
            ws_connections_active: self.inner.ws_connections_active.load(Ordering::Relaxed),
            uptime_seconds: self.inner.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
