// src/accumulator.rs
//
// Folds the raw event stream into per-window binary masks.
//
// A window covers [start, start + accumulation_time]. The first event past
// the window end closes it: the three masks are emitted, cleared, and the
// closing event becomes the first event of the next window, so a frame
// boundary never drops an event.

use crate::types::{Event, Polarity, WindowConfig};
use tracing::debug;

pub const BACKGROUND: u8 = 255;
pub const ACTIVE: u8 = 0;

// ============================================================================
// MASK
// ============================================================================

/// Row-major binary image. Active pixels are black on a white background so
/// the combined mask can be shown as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl BinaryMask {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![BACKGROUND; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[cfg(feature = "display")]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    /// Marks a pixel active. Returns false when it lies outside the mask.
    pub fn set_active(&mut self, row: usize, col: usize) -> bool {
        if !self.in_bounds(row, col) {
            return false;
        }
        self.data[row * self.cols + col] = ACTIVE;
        true
    }

    pub fn is_active(&self, row: usize, col: usize) -> bool {
        self.in_bounds(row, col) && self.data[row * self.cols + col] == ACTIVE
    }

    /// Active pixels as (row, col), in row-major order
    pub fn active_pixels(&self) -> Vec<(usize, usize)> {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == ACTIVE)
            .map(|(i, _)| (i / self.cols, i % self.cols))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.data.iter().filter(|&&v| v == ACTIVE).count()
    }

    pub fn clear(&mut self) {
        self.data.fill(BACKGROUND);
    }
}

/// Everything one closed window hands to the rest of the pipeline
#[derive(Debug, Clone)]
pub struct WindowMasks {
    pub frame_number: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub event_count: usize,
    pub positive: BinaryMask,
    pub negative: BinaryMask,
    pub combined: BinaryMask,
}

// ============================================================================
// ACCUMULATOR
// ============================================================================

pub struct TemporalAccumulator {
    accumulation_time: u64,
    positive: BinaryMask,
    negative: BinaryMask,
    combined: BinaryMask,
    /// (start, end) of the open window; None until the first event arrives
    window: Option<(u64, u64)>,
    event_count: usize,
    frame_number: u64,
    out_of_bounds: u64,
}

impl TemporalAccumulator {
    pub fn new(config: &WindowConfig, rows: usize, cols: usize) -> Self {
        Self {
            accumulation_time: config.accumulation_time,
            positive: BinaryMask::new(rows, cols),
            negative: BinaryMask::new(rows, cols),
            combined: BinaryMask::new(rows, cols),
            window: None,
            event_count: 0,
            frame_number: 0,
            out_of_bounds: 0,
        }
    }

    /// Feed one event. Returns the masks of the window it closed, if any.
    pub fn push(&mut self, event: &Event) -> Option<WindowMasks> {
        let (_, end) = *self
            .window
            .get_or_insert((event.timestamp, event.timestamp + self.accumulation_time));

        let closed = if event.timestamp > end {
            let masks = self.take_window();
            self.window = Some((event.timestamp, event.timestamp + self.accumulation_time));
            Some(masks)
        } else {
            None
        };

        self.apply(event);
        closed
    }

    /// Emit whatever is left in the open window at end of stream
    pub fn finish(&mut self) -> Option<WindowMasks> {
        if self.window.is_none() || self.event_count == 0 {
            return None;
        }
        let masks = self.take_window();
        self.window = None;
        Some(masks)
    }

    pub fn out_of_bounds_events(&self) -> u64 {
        self.out_of_bounds
    }

    fn apply(&mut self, event: &Event) {
        let row = event.x as usize;
        let col = event.y as usize;

        if !self.combined.set_active(row, col) {
            self.out_of_bounds += 1;
            debug!(
                "Event ({}, {}) outside {}x{} mask, skipped",
                event.x,
                event.y,
                self.combined.rows(),
                self.combined.cols()
            );
            return;
        }

        match event.polarity {
            Polarity::Positive => self.positive.set_active(row, col),
            Polarity::Negative => self.negative.set_active(row, col),
        };
        self.event_count += 1;
    }

    fn take_window(&mut self) -> WindowMasks {
        let (start_time, end_time) = self.window.unwrap_or((0, 0));
        let (rows, cols) = (self.combined.rows(), self.combined.cols());

        let masks = WindowMasks {
            frame_number: self.frame_number,
            start_time,
            end_time,
            event_count: self.event_count,
            positive: std::mem::replace(&mut self.positive, BinaryMask::new(rows, cols)),
            negative: std::mem::replace(&mut self.negative, BinaryMask::new(rows, cols)),
            combined: std::mem::replace(&mut self.combined, BinaryMask::new(rows, cols)),
        };

        debug!(
            "Window #{} closed: [{}, {}] with {} event(s)",
            masks.frame_number, start_time, end_time, masks.event_count
        );

        self.frame_number += 1;
        self.event_count = 0;
        masks
    }
}
