use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for completion calls and normalization outcomes.
/// All metrics are atomic counters for thread-safety
#[derive(Clone, Default, Debug)]
pub struct Metrics {
    /// Completion call latency in milliseconds (sum)
    pub completion_latency_ms: Arc<AtomicU64>,
    /// Successful completion calls
    pub completions_total: Arc<AtomicU64>,
    /// Completion calls that returned an error
    pub fetch_errors_total: Arc<AtomicU64>,
    /// Answers replaced by the fallback message
    pub fallback_count: Arc<AtomicU64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_completion(&self, latency_ms: u64) {
        self.completions_total.fetch_add(1, Ordering::Relaxed);
        self.completion_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_fetch_error(&self) {
        self.fetch_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallback_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completions(&self) -> u64 {
        self.completions_total.load(Ordering::Relaxed)
    }

    pub fn fetch_errors(&self) -> u64 {
        self.fetch_errors_total.load(Ordering::Relaxed)
    }

    pub fn fallbacks(&self) -> u64 {
        self.fallback_count.load(Ordering::Relaxed)
    }
}
