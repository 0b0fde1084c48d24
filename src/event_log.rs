// src/event_log.rs
//
// CSV in and out.
//
// Input:  headerless rows `x,y,polarity,timestamp` from the event camera.
// Output: headerless rows `time_in_seconds,frame_number,x,y,angle,entity_id`,
//         one per live entity per closed window, appended to a log named
//         after the process start time.

use crate::tracking::Entity;
use crate::types::{Event, Polarity};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// INPUT
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawEventRow {
    x: u32,
    y: u32,
    polarity: u8,
    timestamp: u64,
}

/// Reads the whole event log up front
pub fn read_events(path: &Path) -> Result<Vec<Event>> {
    let file = File::open(path)
        .with_context(|| format!("opening event log {}", path.display()))?;
    let events =
        parse_events(file).with_context(|| format!("parsing event log {}", path.display()))?;
    info!(
        "📥 Loaded {} event(s) from {}",
        events.len(),
        path.display()
    );
    Ok(events)
}

pub fn parse_events<R: Read>(source: R) -> Result<Vec<Event>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(source);

    let mut events = Vec::new();
    for (row, record) in reader.deserialize::<RawEventRow>().enumerate() {
        let raw = record.with_context(|| format!("row {}", row + 1))?;
        let polarity = Polarity::from_raw(raw.polarity).ok_or_else(|| {
            anyhow!(
                "row {}: polarity must be 0 or 1, got {}",
                row + 1,
                raw.polarity
            )
        })?;
        events.push(Event::new(raw.x, raw.y, polarity, raw.timestamp));
    }
    Ok(events)
}

// ============================================================================
// OUTPUT
// ============================================================================

/// One tracking-log row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingRow {
    pub time_in_seconds: f64,
    pub frame_number: u64,
    pub x: f64,
    pub y: f64,
    pub angle: Option<f64>,
    pub entity_id: u32,
}

impl TrackingRow {
    pub fn from_entity(entity: &Entity, frame_number: u64, time_in_seconds: f64) -> Self {
        Self {
            time_in_seconds,
            frame_number,
            x: round_to_hundredth(entity.position.x as f64),
            y: round_to_hundredth(entity.position.y as f64),
            angle: entity.angle,
            entity_id: entity.id,
        }
    }
}

pub fn round_to_hundredth(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Seconds since local midnight at microsecond resolution
pub fn seconds_of_day<Tz: chrono::TimeZone>(now: &DateTime<Tz>) -> f64 {
    let whole = now.hour() * 3600 + now.minute() * 60 + now.second();
    // leap-second nanos can exceed 1e9; keep them inside the same second
    let micros = (now.nanosecond() % 1_000_000_000) / 1_000;
    whole as f64 + micros as f64 * 1e-6
}

pub fn log_file_name(started_at: &DateTime<FixedOffset>) -> String {
    format!("{}_eventlog.csv", started_at.format("%Y-%m-%d-%H-%M-%S-%6f"))
}

pub fn fixed_offset(hours: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(hours * 3600)
        .ok_or_else(|| anyhow!("utc offset of {} hours is out of range", hours))
}

pub struct TrackingLogWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
    offset: FixedOffset,
}

impl TrackingLogWriter {
    /// Creates `<dir>/<start time>_eventlog.csv`
    pub fn create(dir: &Path, offset: FixedOffset) -> Result<Self> {
        let started_at = Utc::now().with_timezone(&offset);
        let path = dir.join(log_file_name(&started_at));
        Self::create_at(&path, offset)
    }

    pub fn create_at(path: &Path, offset: FixedOffset) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output dir {}", parent.display()))?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening tracking log {}", path.display()))?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        info!("💾 Tracking log: {}", path.display());
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            offset,
        })
    }

    /// Appends one row per entity stamped with the current wall clock
    pub fn write_window(&mut self, frame_number: u64, entities: &[Entity]) -> Result<usize> {
        let now = Utc::now().with_timezone(&self.offset);
        self.write_window_at(seconds_of_day(&now), frame_number, entities)
    }

    pub fn write_window_at(
        &mut self,
        time_in_seconds: f64,
        frame_number: u64,
        entities: &[Entity],
    ) -> Result<usize> {
        for entity in entities {
            self.writer
                .serialize(TrackingRow::from_entity(entity, frame_number, time_in_seconds))
                .with_context(|| {
                    format!("writing entity #{} to {}", entity.id, self.path.display())
                })?;
        }
        self.writer
            .flush()
            .with_context(|| format!("flushing {}", self.path.display()))?;
        Ok(entities.len())
    }
}

pub struct TrackingLogReader;

impl TrackingLogReader {
    pub fn read(path: &Path) -> Result<Vec<TrackingRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("opening tracking log {}", path.display()))?;
        let mut rows = Vec::new();
        for (i, record) in reader.deserialize::<TrackingRow>().enumerate() {
            rows.push(record.with_context(|| format!("{} row {}", path.display(), i + 1))?);
        }
        Ok(rows)
    }
}
