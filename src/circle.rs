use std::cmp::Reverse;

/// A circle found in the sheet, in source image pixel coordinates.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DetectedCircle {
    /// Center of the circle, (x, y)
    pub center: (u32, u32),
    /// Radius in pixels, always greater than zero
    pub radius: u32,
}

impl DetectedCircle {
    /// Squared distance between the centers of two circles
    pub fn center_distance_sq(&self, other: &DetectedCircle) -> u64 {
        let dx = i64::from(self.center.0) - i64::from(other.center.0);
        let dy = i64::from(self.center.1) - i64::from(other.center.1);

        (dx * dx + dy * dy) as u64
    }
}

/// Drop circles whose center lies too close to an already accepted circle.
///
/// Candidates are considered largest first, so when two detections overlap
/// the bigger circle survives and the smaller one is treated as a duplicate
/// sighting of the same avatar.
pub fn suppress_close_centers(
    mut candidates: Vec<DetectedCircle>,
    min_center_distance: u32,
) -> Vec<DetectedCircle> {
    let min_distance_sq = u64::from(min_center_distance) * u64::from(min_center_distance);
    candidates.sort_by_key(|c| Reverse(c.radius));

    let mut kept: Vec<DetectedCircle> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let is_duplicate = kept
            .iter()
            .any(|k| k.center_distance_sq(&candidate) < min_distance_sq);
        if !is_duplicate {
            kept.push(candidate);
        }
    }

    kept
}

/// Sort circles into the grid's visual order: rows top to bottom, then left
/// to right inside each row.
///
/// Two circles belong to the same row while their y coordinates differ by
/// less than `row_tolerance`. The reference y of a row is the y of its
/// topmost circle.
pub fn sort_into_grid_order(circles: &mut Vec<DetectedCircle>, row_tolerance: u32) {
    circles.sort_by_key(|c| (c.center.1, c.center.0));

    let mut rows: Vec<Vec<DetectedCircle>> = vec![];
    for circle in circles.drain(..) {
        match rows.last_mut() {
            Some(row) if circle.center.1.abs_diff(row[0].center.1) < row_tolerance => {
                row.push(circle);
            }
            _ => rows.push(vec![circle]),
        }
    }

    for mut row in rows {
        row.sort_by_key(|c| c.center.0);
        circles.extend(row);
    }
}
