// src/tracking/entity.rs

use crate::types::{Point, Polarity};

pub type EntityId = u32;

/// One persistently identified marker
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    /// Latest combined-mask centroid; replaced on every match
    pub position: Point,
    /// Latest polarity centroids; kept across windows without a match
    pub positive_centroid: Option<Point>,
    pub negative_centroid: Option<Point>,
    /// Heading in degrees, one decimal
    pub angle: Option<f64>,
    /// Consecutive closed windows without a combined-mask match
    pub missed_windows: u32,
}

impl Entity {
    pub fn new(id: EntityId, position: Point) -> Self {
        Self {
            id,
            position,
            positive_centroid: None,
            negative_centroid: None,
            angle: None,
            missed_windows: 0,
        }
    }

    pub fn set_sub_centroid(&mut self, polarity: Polarity, point: Point) {
        match polarity {
            Polarity::Positive => self.positive_centroid = Some(point),
            Polarity::Negative => self.negative_centroid = Some(point),
        }
    }

    /// Both wings, once each has been seen at least once
    pub fn sub_centroids(&self) -> Option<(Point, Point)> {
        Some((self.positive_centroid?, self.negative_centroid?))
    }
}
