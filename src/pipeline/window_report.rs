// src/pipeline/window_report.rs
//
// Everything known about one closed window once tracking has run.
// The output stages read from this instead of reaching into the tracker.

use crate::tracking::{Entity, WindowUpdate};
use crate::types::Centroid;

#[derive(Debug, Clone)]
pub struct WindowReport {
    pub frame_number: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub event_count: usize,

    // Detection
    pub combined_centroids: Vec<Centroid>,
    pub positive_centroids: Vec<Centroid>,
    pub negative_centroids: Vec<Centroid>,

    // Tracking
    pub update: WindowUpdate,
    pub entities: Vec<Entity>,

    // Output
    pub rows_written: usize,
}

impl WindowReport {
    /// Did the combined mask yield any marker body this window?
    pub fn has_detections(&self) -> bool {
        !self.combined_centroids.is_empty()
    }

    pub fn headed_count(&self) -> usize {
        self.entities.iter().filter(|e| e.angle.is_some()).count()
    }
}
