// src/tracking/orientation.rs
//
// Heading from the two polarity wings of a marker.
//
// The raw bearing runs from the positive wing to the negative wing as
// atan2(dx, dy) in degrees, with x the mask column and y the mask row.
// remap_heading() then maps it into the marker's physical heading frame.

use super::entity::Entity;
use crate::types::Point;

/// Raw bearing in degrees, (-180, 180]
pub fn raw_bearing(positive: Point, negative: Point) -> f64 {
    let dx = (negative.x - positive.x) as f64;
    let dy = (negative.y - positive.y) as f64;
    dx.atan2(dy).to_degrees()
}

/// Piecewise remap from trigonometric bearing to marker heading.
/// Branch order matters: exact values are tested before the open ranges.
pub fn remap_heading(angle: f64) -> f64 {
    if angle == 0.0 {
        270.0
    } else if angle == -90.0 {
        0.0
    } else if angle >= 179.0 || angle <= -179.0 {
        90.0
    } else if angle == 90.0 {
        180.0
    } else if angle < 0.0 && angle > -90.0 {
        -angle + 270.0
    } else if angle < -90.0 && angle > -180.0 {
        -angle - 90.0
    } else if angle > 0.0 && angle < 180.0 {
        270.0 - angle
    } else {
        // NaN falls through untouched
        angle
    }
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Heading for a pair of wings, rounded to one decimal
pub fn heading(positive: Point, negative: Point) -> Option<f64> {
    let angle = round_to_tenth(remap_heading(raw_bearing(positive, negative)));
    angle.is_finite().then_some(angle)
}

/// Refreshes `angle` on every entity whose wings are both known.
/// Returns how many entities were updated.
pub fn update_headings<'a>(entities: impl IntoIterator<Item = &'a mut Entity>) -> usize {
    let mut updated = 0;
    for entity in entities {
        let Some((pos, neg)) = entity.sub_centroids() else {
            continue;
        };
        if let Some(angle) = heading(pos, neg) {
            entity.angle = Some(angle);
            updated += 1;
        }
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_boundaries() {
        let inputs = [0.0, -90.0, 90.0, 179.0, -179.0, 180.0];
        let expected = [270.0, 0.0, 180.0, 90.0, 90.0, 90.0];
        for (raw, want) in inputs.iter().zip(expected.iter()) {
            assert_eq!(remap_heading(*raw), *want, "raw={}", raw);
        }
    }

    #[test]
    fn test_remap_fourth_quadrant() {
        for raw in [-0.5, -1.0, -45.0, -89.9] {
            assert_eq!(remap_heading(raw), -raw + 270.0);
        }
    }

    #[test]
    fn test_remap_third_quadrant() {
        for raw in [-90.5, -135.0, -178.9] {
            assert_eq!(remap_heading(raw), -raw - 90.0);
        }
    }

    #[test]
    fn test_remap_upper_half() {
        for raw in [0.5, 45.0, 89.9, 90.1, 135.0, 178.9] {
            assert_eq!(remap_heading(raw), 270.0 - raw);
        }
    }

    #[test]
    fn test_remap_near_pi_collapses() {
        assert_eq!(remap_heading(179.5), 90.0);
        assert_eq!(remap_heading(-179.5), 90.0);
    }

    #[test]
    fn test_remap_nan_passes_through() {
        assert!(remap_heading(f64::NAN).is_nan());
    }

    #[test]
    fn test_raw_bearing_axes() {
        let origin = Point::new(0, 0);
        assert_eq!(raw_bearing(origin, Point::new(0, 10)), 0.0);
        assert_eq!(raw_bearing(origin, Point::new(10, 0)), 90.0);
        assert_eq!(raw_bearing(origin, Point::new(-10, 0)), -90.0);
        assert_eq!(raw_bearing(origin, Point::new(0, -10)), 180.0);
    }

    #[test]
    fn test_heading_rounds_to_one_decimal() {
        // atan2(1, 3) = 18.43°, remapped 251.565... -> 251.6
        let h = heading(Point::new(0, 0), Point::new(1, 3)).unwrap();
        assert_eq!(h, 251.6);
    }

    #[test]
    fn test_heading_coincident_wings() {
        // atan2(0, 0) = 0 -> 270
        assert_eq!(heading(Point::new(4, 4), Point::new(4, 4)), Some(270.0));
    }

    #[test]
    fn test_update_headings_skips_partial_entities() {
        let mut complete = Entity::new(0, Point::new(50, 50));
        complete.positive_centroid = Some(Point::new(40, 50));
        complete.negative_centroid = Some(Point::new(60, 50));

        let mut partial = Entity::new(1, Point::new(200, 200));
        partial.positive_centroid = Some(Point::new(190, 200));
        partial.angle = Some(12.5);

        let mut entities = vec![complete, partial];
        assert_eq!(update_headings(entities.iter_mut()), 1);
        // dx = 20, dy = 0 -> raw 90 -> 180
        assert_eq!(entities[0].angle, Some(180.0));
        assert_eq!(entities[1].angle, Some(12.5));
    }
}
