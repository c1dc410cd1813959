//! Logging setup and in-process counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Counters for the acquisition pipeline
#[derive(Debug, Default)]
pub struct Metrics {
    items_evaluated: AtomicU64,
    items_queued: AtomicU64,
    documents_fetched: AtomicU64,
    documents_cached: AtomicU64,
    documents_failed: AtomicU64,
    dockets_fetched: AtomicU64,
    auth_successes: AtomicU64,
    auth_failures: AtomicU64,
    cents_spent: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items_evaluated(&self, n: usize) {
        self.items_evaluated.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn item_queued(&self) {
        self.items_queued.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "items_queued", "Metric incremented");
    }

    pub fn document_fetched(&self, cents: i64) {
        self.documents_fetched.fetch_add(1, Ordering::Relaxed);
        self.cents_spent.fetch_add(cents.max(0) as u64, Ordering::Relaxed);
        tracing::debug!(counter = "documents_fetched", "Metric incremented");
    }

    pub fn document_cached(&self) {
        self.documents_cached.fetch_add(1, Ordering::Relaxed);
    }

    pub fn document_failed(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "documents_failed", "Metric incremented");
    }

    pub fn docket_fetched(&self, cents: i64) {
        self.dockets_fetched.fetch_add(1, Ordering::Relaxed);
        self.cents_spent.fetch_add(cents.max(0) as u64, Ordering::Relaxed);
    }

    pub fn auth_result(&self, success: bool) {
        let counter = if success { &self.auth_successes } else { &self.auth_failures };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_evaluated: self.items_evaluated.load(Ordering::Relaxed),
            items_queued: self.items_queued.load(Ordering::Relaxed),
            documents_fetched: self.documents_fetched.load(Ordering::Relaxed),
            documents_cached: self.documents_cached.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            dockets_fetched: self.dockets_fetched.load(Ordering::Relaxed),
            auth_successes: self.auth_successes.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            cents_spent: self.cents_spent.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub items_evaluated: u64,
    pub items_queued: u64,
    pub documents_fetched: u64,
    pub documents_cached: u64,
    pub documents_failed: u64,
    pub dockets_fetched: u64,
    pub auth_successes: u64,
    pub auth_failures: u64,
    pub cents_spent: u64,
}
