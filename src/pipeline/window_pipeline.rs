// src/pipeline/window_pipeline.rs
//
// Per-window orchestrator: clustering -> centroids -> identity tracker ->
// orientation -> tracking log + display.
//
// Single entry point: call process_window() for every closed window.
// The pipeline owns the tracker, so entity identities live exactly as long
// as the pipeline does.

use super::metrics::PipelineMetrics;
use super::window_report::WindowReport;
use crate::accumulator::{BinaryMask, WindowMasks};
use crate::clustering::{self, Clusterer, Dbscan};
use crate::display::FrameSink;
use crate::event_log::TrackingLogWriter;
use crate::tracking::IdentityTracker;
use crate::types::{Centroid, ClusteringConfig, Point, TrackerConfig};
use anyhow::Result;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct WindowPipeline {
    combined: Box<dyn Clusterer>,
    positive: Box<dyn Clusterer>,
    negative: Box<dyn Clusterer>,
    tracker: IdentityTracker,
    log: Option<TrackingLogWriter>,
    sink: Box<dyn FrameSink>,
    metrics: PipelineMetrics,
}

impl WindowPipeline {
    pub fn new(
        clustering: &ClusteringConfig,
        tracker: TrackerConfig,
        log: Option<TrackingLogWriter>,
        sink: Box<dyn FrameSink>,
        metrics: PipelineMetrics,
    ) -> Self {
        info!(
            "🔧 Window pipeline: combined eps={} min_pts={} | wings eps={}/{} min_pts={}/{} | \
             bot_width={}",
            clustering.combined.eps,
            clustering.combined.min_pts,
            clustering.positive.eps,
            clustering.negative.eps,
            clustering.positive.min_pts,
            clustering.negative.min_pts,
            tracker.bot_width
        );

        Self {
            combined: Box::new(Dbscan::new(clustering.combined)),
            positive: Box::new(Dbscan::new(clustering.positive)),
            negative: Box::new(Dbscan::new(clustering.negative)),
            tracker: IdentityTracker::new(tracker),
            log,
            sink,
            metrics,
        }
    }

    pub fn tracker(&self) -> &IdentityTracker {
        &self.tracker
    }

    #[cfg(test)]
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn process_window(&mut self, masks: &WindowMasks) -> Result<WindowReport> {
        let started = Instant::now();
        let m = &self.metrics;

        // ── 1. Clustering + centroids ───────────────────────────
        let combined_centroids = detect(self.combined.as_ref(), &masks.combined, "combined", m);
        let positive_centroids = detect(self.positive.as_ref(), &masks.positive, "positive", m);
        let negative_centroids = detect(self.negative.as_ref(), &masks.negative, "negative", m);

        // ── 2. Identity tracking + headings ─────────────────────
        let update = self.tracker.update(
            &to_points(&combined_centroids),
            &to_points(&positive_centroids),
            &to_points(&negative_centroids),
        );
        let entities = self.tracker.snapshot();

        // ── 3. Tracking log ─────────────────────────────────────
        let rows_written = match self.log.as_mut() {
            Some(log) => log.write_window(masks.frame_number, &entities)?,
            None => 0,
        };

        // ── 4. Display ──────────────────────────────────────────
        if let Err(e) = self.sink.show(masks.frame_number, &masks.combined, &entities) {
            warn!("⚠️  Display failed on window {}: {:#}", masks.frame_number, e);
            m.inc(&m.display_failures);
        }

        let report = WindowReport {
            frame_number: masks.frame_number,
            start_time: masks.start_time,
            end_time: masks.end_time,
            event_count: masks.event_count,
            combined_centroids,
            positive_centroids,
            negative_centroids,
            update,
            entities,
            rows_written,
        };

        m.inc(&m.windows_processed);
        m.add(&m.events_accumulated, masks.event_count as u64);
        m.add(&m.entities_created, report.update.created.len() as u64);
        m.add(&m.entities_evicted, report.update.evicted.len() as u64);
        m.add(&m.rows_written, rows_written as u64);
        if report.has_detections() {
            m.inc(&m.windows_with_detections);
        }
        m.set_timing(&m.window_time_us, started.elapsed().as_micros() as u64);

        debug!(
            "Window {} [{}..{}]: {} events | {} bodies, {}+ / {}- wings | {} entities, {} headed",
            report.frame_number,
            report.start_time,
            report.end_time,
            report.event_count,
            report.combined_centroids.len(),
            report.positive_centroids.len(),
            report.negative_centroids.len(),
            report.entities.len(),
            report.headed_count()
        );

        Ok(report)
    }
}

/// Clusters one mask. A failed pass counts as no detections.
fn detect(
    clusterer: &dyn Clusterer,
    mask: &BinaryMask,
    label: &str,
    metrics: &PipelineMetrics,
) -> Vec<Centroid> {
    match clusterer.cluster(mask) {
        Ok(clusters) => clustering::centroids(&clusters),
        Err(e) => {
            metrics.inc(&metrics.clustering_failures);
            if mask.active_count() == 0 {
                debug!("Clustering skipped on empty {} mask: {}", label, e);
            } else {
                warn!("⚠️  Clustering failed on {} mask: {:#}", label, e);
            }
            Vec::new()
        }
    }
}

fn to_points(centroids: &[Centroid]) -> Vec<Point> {
    centroids.iter().map(|c| c.to_point()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::HeadlessSink;
    use crate::event_log::{fixed_offset, TrackingLogReader};
    use crate::types::DbscanParams;
    use std::fs;
    use std::path::PathBuf;

    const ROWS: usize = 640;
    const COLS: usize = 480;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "radvision-pipeline-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn blob(mask: &mut BinaryMask, row: usize, col: usize, radius: i64) {
        for dr in -radius..=radius {
            for dc in -radius..=radius {
                if dr * dr + dc * dc <= radius * radius {
                    mask.set_active((row as i64 + dr) as usize, (col as i64 + dc) as usize);
                }
            }
        }
    }

    fn empty_window(frame_number: u64) -> WindowMasks {
        WindowMasks {
            frame_number,
            start_time: frame_number * 100_000,
            end_time: (frame_number + 1) * 100_000,
            event_count: 0,
            positive: BinaryMask::new(ROWS, COLS),
            negative: BinaryMask::new(ROWS, COLS),
            combined: BinaryMask::new(ROWS, COLS),
        }
    }

    fn small_blob_clustering() -> ClusteringConfig {
        ClusteringConfig {
            combined: DbscanParams::new(15.0, 50),
            ..ClusteringConfig::default()
        }
    }

    fn pipeline(log: Option<TrackingLogWriter>) -> WindowPipeline {
        WindowPipeline::new(
            &small_blob_clustering(),
            TrackerConfig::default(),
            log,
            Box::new(HeadlessSink::default()),
            PipelineMetrics::new(),
        )
    }

    #[test]
    fn test_single_blob_end_to_end() {
        let dir = scratch_dir("blob");
        let path = dir.join("log.csv");
        let log = TrackingLogWriter::create_at(&path, fixed_offset(-5).unwrap()).unwrap();
        let mut p = pipeline(Some(log));

        let mut masks = empty_window(0);
        blob(&mut masks.combined, 50, 50, 5);
        assert_eq!(masks.combined.active_count(), 81);

        let report = p.process_window(&masks).unwrap();
        assert_eq!(report.combined_centroids, vec![Centroid::new(50, 50)]);
        assert!(report.positive_centroids.is_empty());
        assert!(report.negative_centroids.is_empty());
        assert_eq!(report.entities.len(), 1);
        assert_eq!(report.entities[0].position, Point::new(50, 50));
        assert_eq!(report.entities[0].angle, None);
        assert_eq!(report.rows_written, 1);

        let rows = TrackingLogReader::read(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].x, rows[0].y), (50.0, 50.0));
        assert_eq!(rows[0].angle, None);
        assert_eq!(rows[0].entity_id, 0);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.trim_end().ends_with(",,0"), "angle field should be empty: {}", raw);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_default_combined_params_treat_small_blob_as_noise() {
        let mut p = WindowPipeline::new(
            &ClusteringConfig::default(),
            TrackerConfig::default(),
            None,
            Box::new(HeadlessSink::default()),
            PipelineMetrics::new(),
        );
        let mut masks = empty_window(0);
        blob(&mut masks.combined, 50, 50, 5);

        let report = p.process_window(&masks).unwrap();
        assert!(report.entities.is_empty());
        assert!(!report.has_detections());
    }

    #[test]
    fn test_identity_survives_across_windows_with_heading() {
        let mut p = pipeline(None);

        let mut first = empty_window(0);
        blob(&mut first.combined, 100, 100, 5);
        let id = p.process_window(&first).unwrap().entities[0].id;

        // Body drifts 20 px; wings appear either side of it
        let mut second = empty_window(1);
        blob(&mut second.combined, 100, 120, 5);
        blob(&mut second.positive, 90, 120, 5);
        blob(&mut second.negative, 110, 120, 5);

        let report = p.process_window(&second).unwrap();
        assert_eq!(report.entities.len(), 1);
        let e = &report.entities[0];
        assert_eq!(e.id, id);
        assert_eq!(e.position, Point::new(120, 100));
        assert_eq!(e.positive_centroid, Some(Point::new(120, 90)));
        assert_eq!(e.negative_centroid, Some(Point::new(120, 110)));
        // wings stacked along the row axis: raw bearing 0, remapped to 270
        assert_eq!(e.angle, Some(270.0));
        assert_eq!(report.headed_count(), 1);
    }

    #[test]
    fn test_empty_window_counts_failures_but_keeps_entities() {
        let mut p = pipeline(None);

        let mut first = empty_window(0);
        blob(&mut first.combined, 200, 200, 5);
        p.process_window(&first).unwrap();

        let report = p.process_window(&empty_window(1)).unwrap();
        assert_eq!(report.entities.len(), 1);

        let m = p.metrics();
        assert_eq!(m.get(&m.windows_processed), 2);
        assert_eq!(m.get(&m.windows_with_detections), 1);
        assert_eq!(m.get(&m.entities_created), 1);
        // two polarity masks in window 0, all three in window 1
        assert_eq!(m.get(&m.clustering_failures), 5);
    }

    #[test]
    fn test_failing_display_does_not_stop_tracking() {
        struct BrokenSink;
        impl FrameSink for BrokenSink {
            fn show(
                &mut self,
                _: u64,
                _: &BinaryMask,
                _: &[crate::tracking::Entity],
            ) -> Result<()> {
                anyhow::bail!("no screen")
            }
        }

        let mut p = WindowPipeline::new(
            &small_blob_clustering(),
            TrackerConfig::default(),
            None,
            Box::new(BrokenSink),
            PipelineMetrics::new(),
        );
        let mut masks = empty_window(0);
        blob(&mut masks.combined, 50, 60, 5);

        let report = p.process_window(&masks).unwrap();
        assert_eq!(report.entities.len(), 1);
        let m = p.metrics();
        assert_eq!(m.get(&m.display_failures), 1);
        assert_eq!(p.tracker().len(), 1);
    }
}
