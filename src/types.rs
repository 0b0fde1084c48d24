// src/types.rs

use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub sensor: SensorConfig,
    pub window: WindowConfig,
    pub clustering: ClusteringConfig,
    pub tracker: TrackerConfig,
    pub output: OutputConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Event log to replay when no path is given on the command line
    pub path: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: "./data/4botcircle100.csv".to_string(),
        }
    }
}

/// Mask geometry. Rows are indexed by event `x`, columns by event `y`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub rows: usize,
    pub cols: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self { rows: 640, cols: 480 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window length in event-timestamp units (microseconds for the DVS logs)
    pub accumulation_time: u64,
    /// Emit the partially filled window left over at end of stream
    pub flush_trailing_window: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            accumulation_time: 100_000,
            flush_trailing_window: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DbscanParams {
    pub eps: f64,
    pub min_pts: usize,
}

impl DbscanParams {
    pub fn new(eps: f64, min_pts: usize) -> Self {
        Self { eps, min_pts }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Marker bodies: large and dense
    pub combined: DbscanParams,
    /// Polarity wings: smaller and sparser
    pub positive: DbscanParams,
    pub negative: DbscanParams,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            combined: DbscanParams::new(15.0, 170),
            positive: DbscanParams::new(6.0, 50),
            negative: DbscanParams::new(6.0, 50),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum centroid displacement (pixels) still treated as the same marker
    pub bot_width: f64,
    /// Windows an entity may go unmatched before eviction. `None` keeps
    /// every entity for the whole run.
    pub max_missed_windows: Option<u32>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            bot_width: 100.0,
            max_missed_windows: Some(50),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    /// Fixed UTC offset used for log file names and row timestamps
    pub utc_offset_hours: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
            utc_offset_hours: -5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub enabled: bool,
    pub wait_ms: i32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            wait_ms: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "radvision_tracker=info".to_string(),
        }
    }
}

// ============================================================================
// EVENTS & GEOMETRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    Negative,
    Positive,
}

impl Polarity {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Negative),
            1 => Some(Self::Positive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negative => "NEG",
            Self::Positive => "POS",
        }
    }
}

/// A single brightness change reported by the event camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub x: u32,
    pub y: u32,
    pub polarity: Polarity,
    pub timestamp: u64,
}

impl Event {
    pub fn new(x: u32, y: u32, polarity: Polarity, timestamp: u64) -> Self {
        Self {
            x,
            y,
            polarity,
            timestamp,
        }
    }
}

/// Integer image coordinate: `x` is the mask column, `y` the mask row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(&self, other: &Point) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }
}

/// Mean (row, col) of a cluster, truncated toward zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Centroid {
    pub row: i32,
    pub col: i32,
}

impl Centroid {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Image-space point used by the tracker and annotator
    pub fn to_point(self) -> Point {
        Point::new(self.col, self.row)
    }
}
