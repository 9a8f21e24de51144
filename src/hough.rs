use image::RgbaImage;
use std::cmp::Reverse;

use crate::circle::DetectedCircle;
use crate::detect::DetectionStrategy;
use crate::detect::DetectorConfig;
use crate::sheet;

/// Number of points sampled on the circle border when voting.
const ANGLE_SAMPLES: usize = 360;

lazy_static::lazy_static! {
    /// Unit circle sampled at ANGLE_SAMPLES evenly spaced angles.
    static ref UNIT_CIRCLE: [(f32, f32); ANGLE_SAMPLES] = {
        let mut table = [(0.0, 0.0); ANGLE_SAMPLES];
        for (i, entry) in table.iter_mut().enumerate() {
            let theta = i as f32 * (2.0 * std::f32::consts::PI / ANGLE_SAMPLES as f32);
            *entry = (theta.cos(), theta.sin());
        }
        table
    };
}

/// Parametric circle detector: vote in (center, radius) space over the edge
/// map of the sheet.
///
/// More expensive than the contour pass, but it does not need any
/// foreground/background separation, so it still works on sheets with no
/// transparency and a busy background.
pub struct HoughDetector {
    pub config: DetectorConfig,
}

impl DetectionStrategy for HoughDetector {
    fn detect(&self, sheet: &RgbaImage) -> Vec<DetectedCircle> {
        let cfg = &self.config;
        let gray = sheet::to_grayscale(sheet);
        let blurred = imageproc::filter::gaussian_blur_f32(&gray, cfg.blur_sigma);
        let edges = imageproc::edges::canny(&blurred, cfg.canny_low, cfg.canny_high);

        let edge_points: Vec<(u32, u32)> = edges
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .map(|(x, y, _)| (x, y))
            .collect();
        if edge_points.is_empty() {
            return vec![];
        }

        let (w, h) = edges.dimensions();
        let min_votes = (cfg.min_vote_fraction * ANGLE_SAMPLES as f32) as u32;
        let mut candidates: Vec<(DetectedCircle, u32)> = vec![];
        // One accumulator plane, reused for every radius. Keeps the memory
        // usage at one w*h buffer instead of w*h*radius_range.
        let mut accumulator = vec![0u32; w as usize * h as usize];
        for radius in cfg.min_radius..=cfg.max_radius {
            accumulator.fill(0);
            vote_for_centers(&mut accumulator, (w, h), &edge_points, radius);

            for (i, &votes) in accumulator.iter().enumerate() {
                if votes >= min_votes {
                    let x = i as u32 % w;
                    let y = i as u32 / w;
                    candidates.push((
                        DetectedCircle {
                            center: (x, y),
                            radius,
                        },
                        votes,
                    ));
                }
            }
        }

        log::debug!(
            "hough pass: {} edge points, {} raw center candidates",
            edge_points.len(),
            candidates.len()
        );

        strongest_non_overlapping(candidates, cfg.min_center_distance)
    }
}

/// Each edge point votes for every center that would put it on a circle of
/// the given radius.
fn vote_for_centers(
    accumulator: &mut [u32],
    (w, h): (u32, u32),
    edge_points: &[(u32, u32)],
    radius: u32,
) {
    let r = radius as f32;
    for &(x, y) in edge_points {
        for &(cos_theta, sin_theta) in UNIT_CIRCLE.iter() {
            let cx = (x as f32 - r * cos_theta).round();
            let cy = (y as f32 - r * sin_theta).round();
            if cx < 0.0 || cy < 0.0 || cx >= w as f32 || cy >= h as f32 {
                continue;
            }
            accumulator[cy as usize * w as usize + cx as usize] += 1;
        }
    }
}

/// Greedy peak selection: the strongest accumulator cells win, and anything
/// closer than `min_center_distance` to an already selected center is the
/// same circle seen again (a neighboring cell or a neighboring radius).
fn strongest_non_overlapping(
    mut candidates: Vec<(DetectedCircle, u32)>,
    min_center_distance: u32,
) -> Vec<DetectedCircle> {
    let min_distance_sq = u64::from(min_center_distance) * u64::from(min_center_distance);
    candidates.sort_by_key(|&(_, votes)| Reverse(votes));

    let mut kept: Vec<DetectedCircle> = vec![];
    for (candidate, _votes) in candidates {
        let is_duplicate = kept
            .iter()
            .any(|k| k.center_distance_sq(&candidate) < min_distance_sq);
        if !is_duplicate {
            kept.push(candidate);
        }
    }

    kept
}
