// src/pipeline/metrics.rs
//
// Run counters for every stage. Logged as a JSON summary when the run ends.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub windows_processed: Arc<AtomicU64>,
    pub windows_with_detections: Arc<AtomicU64>,
    pub events_accumulated: Arc<AtomicU64>,
    pub out_of_bounds_events: Arc<AtomicU64>,
    pub clustering_failures: Arc<AtomicU64>,
    pub entities_created: Arc<AtomicU64>,
    pub entities_evicted: Arc<AtomicU64>,
    pub rows_written: Arc<AtomicU64>,
    pub display_failures: Arc<AtomicU64>,
    pub window_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            windows_processed: Arc::new(AtomicU64::new(0)),
            windows_with_detections: Arc::new(AtomicU64::new(0)),
            events_accumulated: Arc::new(AtomicU64::new(0)),
            out_of_bounds_events: Arc::new(AtomicU64::new(0)),
            clustering_failures: Arc::new(AtomicU64::new(0)),
            entities_created: Arc::new(AtomicU64::new(0)),
            entities_evicted: Arc::new(AtomicU64::new(0)),
            rows_written: Arc::new(AtomicU64::new(0)),
            display_failures: Arc::new(AtomicU64::new(0)),
            window_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn get(&self, counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    pub fn windows_per_sec(&self) -> f64 {
        let windows = self.windows_processed.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            windows as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            windows_processed: self.get(&self.windows_processed),
            windows_with_detections: self.get(&self.windows_with_detections),
            windows_per_sec: self.windows_per_sec(),
            events_accumulated: self.get(&self.events_accumulated),
            out_of_bounds_events: self.get(&self.out_of_bounds_events),
            clustering_failures: self.get(&self.clustering_failures),
            entities_created: self.get(&self.entities_created),
            entities_evicted: self.get(&self.entities_evicted),
            rows_written: self.get(&self.rows_written),
            display_failures: self.get(&self.display_failures),
            last_window_us: self.get(&self.window_time_us),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub windows_processed: u64,
    pub windows_with_detections: u64,
    pub windows_per_sec: f64,
    pub events_accumulated: u64,
    pub out_of_bounds_events: u64,
    pub clustering_failures: u64,
    pub entities_created: u64,
    pub entities_evicted: u64,
    pub rows_written: u64,
    pub display_failures: u64,
    pub last_window_us: u64,
    pub elapsed_secs: f64,
}
