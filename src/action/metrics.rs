use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters plus a bounded window of execution durations.
///
/// Shared between the engine (execution counters) and the interpreter
/// (memo-cache hits).
#[derive(Debug)]
pub struct ExecutionMetrics {
    actions_executed: AtomicU64,
    actions_succeeded: AtomicU64,
    actions_failed: AtomicU64,
    retry_attempts: AtomicU64,
    cache_hits: AtomicU64,
    durations: Mutex<VecDeque<Duration>>,
    window_cap: usize,
    window_keep: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub actions_executed: u64,
    pub actions_succeeded: u64,
    pub actions_failed: u64,
    pub retry_attempts: u64,
    pub cache_hits: u64,
    /// Milliseconds, averaged over the retained window.
    pub average_execution_time: f64,
}

/// Emitted once per dispatch that reached a verb handler, retries included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    pub action_type: String,
    pub component_id: Option<String>,
    pub duration_ms: f64,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new(100, 50)
    }
}

impl ExecutionMetrics {
    pub fn new(window_cap: usize, window_keep: usize) -> Self {
        Self {
            actions_executed: AtomicU64::new(0),
            actions_succeeded: AtomicU64::new(0),
            actions_failed: AtomicU64::new(0),
            retry_attempts: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            durations: Mutex::new(VecDeque::with_capacity(window_cap)),
            window_cap: window_cap.max(1),
            window_keep: window_keep.min(window_cap).max(1),
        }
    }

    pub fn record_executed(&self) {
        self.actions_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.actions_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.actions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retry_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Appends a sample; once the window exceeds its cap only the newest
    /// `window_keep` samples survive.
    pub fn record_duration(&self, duration: Duration) {
        let mut durations = self.durations();
        durations.push_back(duration);
        if durations.len() > self.window_cap {
            let excess = durations.len() - self.window_keep;
            durations.drain(..excess);
        }
    }

    pub fn average_execution_time(&self) -> f64 {
        let durations = self.durations();
        if durations.is_empty() {
            return 0.0;
        }
        let total: f64 = durations.iter().map(|d| d.as_secs_f64() * 1000.0).sum();
        total / durations.len() as f64
    }

    pub fn sample_count(&self) -> usize {
        self.durations().len()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            actions_executed: self.actions_executed.load(Ordering::Relaxed),
            actions_succeeded: self.actions_succeeded.load(Ordering::Relaxed),
            actions_failed: self.actions_failed.load(Ordering::Relaxed),
            retry_attempts: self.retry_attempts.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            average_execution_time: self.average_execution_time(),
        }
    }

    pub fn reset(&self) {
        self.actions_executed.store(0, Ordering::Relaxed);
        self.actions_succeeded.store(0, Ordering::Relaxed);
        self.actions_failed.store(0, Ordering::Relaxed);
        self.retry_attempts.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.durations().clear();
    }

    fn durations(&self) -> MutexGuard<'_, VecDeque<Duration>> {
        // samples stay usable even if a recorder panicked mid-push
        self.durations.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
