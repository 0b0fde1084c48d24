// src/pipeline/runner.rs
//
// Drives one whole run: read the event log, fold events into windows and
// hand each closed window to the WindowPipeline.

use super::metrics::{MetricsSummary, PipelineMetrics};
use super::window_pipeline::WindowPipeline;
use crate::accumulator::TemporalAccumulator;
use crate::display::{self, FrameSink};
use crate::event_log::{self, TrackingLogWriter};
use crate::types::Config;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};

pub fn run(config: &Config, input: &Path) -> Result<MetricsSummary> {
    let sink = display::build_sink(&config.display)?;
    run_with_sink(config, input, sink)
}

pub fn run_with_sink(
    config: &Config,
    input: &Path,
    sink: Box<dyn FrameSink>,
) -> Result<MetricsSummary> {
    let metrics = PipelineMetrics::new();

    let events = event_log::read_events(input)?;
    if events.is_empty() {
        warn!("⚠️  Event log {} is empty, nothing to track", input.display());
        return Ok(metrics.summary());
    }

    let offset = event_log::fixed_offset(config.output.utc_offset_hours)?;
    let log = TrackingLogWriter::create(Path::new(&config.output.dir), offset)?;

    let mut pipeline = WindowPipeline::new(
        &config.clustering,
        config.tracker,
        Some(log),
        sink,
        metrics.clone(),
    );
    let mut accumulator =
        TemporalAccumulator::new(&config.window, config.sensor.rows, config.sensor.cols);

    info!(
        "▶️  Tracking {} event(s) | {}x{} sensor | {} µs windows",
        events.len(),
        config.sensor.rows,
        config.sensor.cols,
        config.window.accumulation_time
    );

    for event in &events {
        if let Some(masks) = accumulator.push(event) {
            pipeline
                .process_window(&masks)
                .with_context(|| format!("processing window {}", masks.frame_number))?;
        }
    }

    if config.window.flush_trailing_window {
        if let Some(masks) = accumulator.finish() {
            pipeline
                .process_window(&masks)
                .with_context(|| format!("processing trailing window {}", masks.frame_number))?;
        }
    } else {
        debug!("Trailing window dropped (flush_trailing_window = false)");
    }

    metrics.add(&metrics.out_of_bounds_events, accumulator.out_of_bounds_events());
    if accumulator.out_of_bounds_events() > 0 {
        warn!(
            "⚠️  Skipped {} event(s) outside the {}x{} sensor",
            accumulator.out_of_bounds_events(),
            config.sensor.rows,
            config.sensor.cols
        );
    }

    let summary = metrics.summary();
    info!(
        "✅ Run complete: {} window(s), {} entit(ies) live, {} id(s) issued",
        summary.windows_processed,
        pipeline.tracker().len(),
        pipeline.tracker().ids_issued()
    );
    info!("📊 Metrics: {}", serde_json::to_string(&summary)?);

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::HeadlessSink;
    use crate::event_log::TrackingLogReader;
    use crate::types::DbscanParams;
    use std::fs;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "radvision-runner-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn test_config(out: &Path) -> Config {
        let mut config = Config::default();
        config.output.dir = out.to_string_lossy().into_owned();
        config.display.enabled = false;
        config.clustering.combined = DbscanParams::new(15.0, 50);
        config
    }

    /// Negative events for a radius-5 disc, all at `timestamp`
    fn disc_events(row: i64, col: i64, timestamp: u64) -> String {
        let mut out = String::new();
        for dr in -5i64..=5 {
            for dc in -5i64..=5 {
                if dr * dr + dc * dc <= 25 {
                    out.push_str(&format!("{},{},0,{}\n", row + dr, col + dc, timestamp));
                }
            }
        }
        out
    }

    fn tracking_logs(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with("_eventlog.csv"))
            .collect()
    }

    #[test]
    fn test_run_tracks_blob_over_two_windows() {
        let dir = scratch_dir("two-windows");
        let input = dir.join("events.csv");
        let mut csv = disc_events(50, 50, 1_000);
        csv.push_str(&disc_events(50, 60, 200_000));
        fs::write(&input, csv).unwrap();

        let out = dir.join("out");
        let config = test_config(&out);
        let summary =
            run_with_sink(&config, &input, Box::new(HeadlessSink::default())).unwrap();

        assert_eq!(summary.windows_processed, 2);
        assert_eq!(summary.entities_created, 1);
        assert_eq!(summary.rows_written, 2);
        assert_eq!(summary.events_accumulated, 162);

        let logs = tracking_logs(&out);
        assert_eq!(logs.len(), 1);
        let rows = TrackingLogReader::read(&logs[0]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].frame_number, rows[0].x, rows[0].y), (0, 50.0, 50.0));
        assert_eq!((rows[1].frame_number, rows[1].x, rows[1].y), (1, 60.0, 50.0));
        assert!(rows.iter().all(|r| r.entity_id == 0));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_run_without_trailing_flush_drops_last_window() {
        let dir = scratch_dir("no-flush");
        let input = dir.join("events.csv");
        let mut csv = disc_events(50, 50, 1_000);
        csv.push_str(&disc_events(50, 60, 200_000));
        fs::write(&input, csv).unwrap();

        let out = dir.join("out");
        let mut config = test_config(&out);
        config.window.flush_trailing_window = false;
        let summary =
            run_with_sink(&config, &input, Box::new(HeadlessSink::default())).unwrap();

        assert_eq!(summary.windows_processed, 1);
        assert_eq!(summary.rows_written, 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_run_on_empty_log_writes_nothing() {
        let dir = scratch_dir("empty");
        let input = dir.join("events.csv");
        fs::write(&input, "").unwrap();

        let out = dir.join("out");
        let summary =
            run_with_sink(&test_config(&out), &input, Box::new(HeadlessSink::default())).unwrap();

        assert_eq!(summary.windows_processed, 0);
        assert!(!out.exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_run_counts_out_of_bounds_events() {
        let dir = scratch_dir("oob");
        let input = dir.join("events.csv");
        let mut csv = disc_events(50, 50, 1_000);
        csv.push_str("9999,10,1,1500\n");
        fs::write(&input, csv).unwrap();

        let out = dir.join("out");
        let summary =
            run_with_sink(&test_config(&out), &input, Box::new(HeadlessSink::default())).unwrap();

        assert_eq!(summary.out_of_bounds_events, 1);
        assert_eq!(summary.entities_created, 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_run_missing_input_is_an_error() {
        let dir = scratch_dir("missing");
        let err = run_with_sink(
            &test_config(&dir),
            &dir.join("nope.csv"),
            Box::new(HeadlessSink::default()),
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("nope.csv"));

        let _ = fs::remove_dir_all(&dir);
    }
}
