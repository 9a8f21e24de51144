use image::RgbaImage;
use imageproc::contours::BorderType;
use imageproc::point::Point;

use crate::circle;
use crate::circle::DetectedCircle;
use crate::hough::HoughDetector;
use crate::sheet;

/// Tunable thresholds for both detection passes.
///
/// The defaults are sized for the usual avatar sheets: circles with a radius
/// of roughly 40 to 70 pixels, laid out on a grid with at least 80 pixels
/// between neighboring centers.
#[derive(Clone, Debug)]
pub struct DetectorConfig {
    /// Pixels at least this opaque count as foreground on sheets with an
    /// alpha channel. Default 16.
    pub alpha_threshold: u8,
    /// Pixels at most this bright count as foreground on fully opaque
    /// sheets. Default 240.
    pub luminance_threshold: u8,
    /// Contours enclosing a smaller area than this are noise. Default 1000.
    pub min_contour_area: f32,
    /// Lower bound on `4*pi*area / perimeter^2` for a contour to count as a
    /// circle. Default 0.7.
    pub min_circularity: f32,
    /// Smallest accepted circle radius, in pixels. Default 40.
    pub min_radius: u32,
    /// Largest accepted circle radius, in pixels. Default 70.
    pub max_radius: u32,
    /// Two circles closer than this are the same avatar detected twice.
    /// Default 80.
    pub min_center_distance: u32,
    /// Circles whose y coordinates differ by less than this sit on the same
    /// grid row. Default 30.
    pub row_tolerance: u32,
    /// Gaussian blur applied before edge detection in the fallback pass.
    /// Default 2.0.
    pub blur_sigma: f32,
    /// Canny hysteresis thresholds for the fallback pass. Defaults 50, 150.
    pub canny_low: f32,
    pub canny_high: f32,
    /// Fraction of the sampled circle border that must vote for a center in
    /// the fallback pass. Default 0.4.
    pub min_vote_fraction: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            alpha_threshold: 16,
            luminance_threshold: 240,
            min_contour_area: 1000.0,
            min_circularity: 0.7,
            min_radius: 40,
            max_radius: 70,
            min_center_distance: 80,
            row_tolerance: 30,
            blur_sigma: 2.0,
            canny_low: 50.0,
            canny_high: 150.0,
            min_vote_fraction: 0.4,
        }
    }
}

/// A way to locate candidate circles in a sheet.
///
/// Implementations return candidates in no particular order and without
/// deduplication; the orchestrator applies overlap suppression and grid
/// ordering afterwards.
pub trait DetectionStrategy {
    fn detect(&self, sheet: &RgbaImage) -> Vec<DetectedCircle>;
}

/// Which strategy produced the final circle list.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DetectionMethod {
    /// The primary pass: contour analysis of the binarized sheet
    Contour,
    /// The fallback pass: circular Hough transform on the edge map
    Hough,
}

/// Result of a full detection run.
#[derive(Clone, Debug)]
pub struct Detection {
    /// Accepted circles, in grid order
    pub circles: Vec<DetectedCircle>,
    /// The pass that produced `circles`
    pub method: DetectionMethod,
}

/// Contour based detector: binarize the sheet, trace the outer border of
/// each connected blob and accept the blobs that are round enough and of
/// the expected size.
pub struct ContourDetector {
    pub config: DetectorConfig,
}

impl DetectionStrategy for ContourDetector {
    fn detect(&self, sheet: &RgbaImage) -> Vec<DetectedCircle> {
        let cfg = &self.config;
        let mask = sheet::foreground_mask(sheet, cfg.alpha_threshold, cfg.luminance_threshold);
        let contours = imageproc::contours::find_contours::<i32>(&mask);

        let mut found = vec![];
        for contour in &contours {
            // Only the outermost border of each blob. Holes inside an avatar
            // (and anything drawn inside them) produce child contours that
            // must not be counted as avatars again.
            if contour.border_type != BorderType::Outer || contour.parent.is_some() {
                continue;
            }

            let area = contour_area(&contour.points);
            if area < cfg.min_contour_area {
                continue;
            }

            let perimeter = contour_perimeter(&contour.points);
            if perimeter == 0.0 {
                continue;
            }
            let circularity = 4.0 * std::f32::consts::PI * area / (perimeter * perimeter);
            if circularity < cfg.min_circularity {
                continue;
            }

            let ((cx, cy), radius) = enclosing_circle(&contour.points);
            let radius = radius.round() as u32;
            if radius < cfg.min_radius || radius > cfg.max_radius {
                continue;
            }

            found.push(DetectedCircle {
                center: (cx.round() as u32, cy.round() as u32),
                radius,
            });
        }

        log::debug!(
            "contour pass: {} contours, {} accepted as circles",
            contours.len(),
            found.len()
        );

        found
    }
}

/// Detect avatar circles in the sheet.
///
/// Runs the contour pass first and the Hough fallback only when the contour
/// pass finds nothing. The returned circles are overlap suppressed and
/// sorted into grid order, so their positions match the output numbering of
/// the exporter.
pub fn detect_avatars(sheet: &RgbaImage, config: &DetectorConfig) -> Detection {
    let primary = ContourDetector {
        config: config.clone(),
    };
    let fallback = HoughDetector {
        config: config.clone(),
    };

    run_detection(sheet, &primary, &fallback, config)
}

/// Like [`detect_avatars`], but with caller supplied strategies.
///
/// The fallback runs exactly once, and only when the primary strategy
/// returns nothing. The method tag reflects which slot produced the result:
/// [`DetectionMethod::Contour`] for the primary, [`DetectionMethod::Hough`]
/// for the fallback.
pub fn run_detection(
    sheet: &RgbaImage,
    primary: &dyn DetectionStrategy,
    fallback: &dyn DetectionStrategy,
    config: &DetectorConfig,
) -> Detection {
    let mut candidates = primary.detect(sheet);
    let method = if candidates.is_empty() {
        log::debug!("primary pass found no circles, trying the fallback");
        candidates = fallback.detect(sheet);
        DetectionMethod::Hough
    } else {
        DetectionMethod::Contour
    };

    let mut circles = circle::suppress_close_centers(candidates, config.min_center_distance);
    circle::sort_into_grid_order(&mut circles, config.row_tolerance);

    Detection { circles, method }
}

/// Area enclosed by the contour: shoelace formula over the border points.
fn contour_area(points: &[Point<i32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut twice_area: i64 = 0;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        twice_area += (i64::from(points[j].x) + i64::from(points[i].x))
            * (i64::from(points[j].y) - i64::from(points[i].y));
        j = i;
    }

    twice_area.abs() as f32 / 2.0
}

/// Length of the closed border polyline.
fn contour_perimeter(points: &[Point<i32>]) -> f32 {
    if points.len() < 2 {
        return 0.0;
    }

    let mut length = 0.0;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let dx = (points[i].x - points[j].x) as f32;
        let dy = (points[i].y - points[j].y) as f32;
        length += (dx * dx + dy * dy).sqrt();
        j = i;
    }

    length
}

/// Circle around the border centroid that encloses every border point.
///
/// Not the minimal enclosing circle, but close enough for blobs that
/// already passed the circularity test.
fn enclosing_circle(points: &[Point<i32>]) -> ((f32, f32), f32) {
    let n = points.len() as f32;
    let cx = points.iter().map(|p| p.x as f32).sum::<f32>() / n;
    let cy = points.iter().map(|p| p.y as f32).sum::<f32>() / n;
    let radius = points
        .iter()
        .map(|p| {
            let dx = p.x as f32 - cx;
            let dy = p.y as f32 - cy;
            (dx * dx + dy * dy).sqrt()
        })
        .fold(0.0, f32::max);

    ((cx, cy), radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use imageproc::drawing::draw_filled_circle_mut;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use std::cell::Cell;

    struct FixedStrategy {
        calls: Cell<u32>,
        circles: Vec<DetectedCircle>,
    }

    impl FixedStrategy {
        fn returning(circles: Vec<DetectedCircle>) -> Self {
            FixedStrategy {
                calls: Cell::new(0),
                circles,
            }
        }
    }

    impl DetectionStrategy for FixedStrategy {
        fn detect(&self, _sheet: &RgbaImage) -> Vec<DetectedCircle> {
            self.calls.set(self.calls.get() + 1);
            self.circles.clone()
        }
    }

    #[test]
    fn fallback_runs_exactly_once_when_primary_is_empty() {
        let sheet = RgbaImage::new(10, 10);
        let primary = FixedStrategy::returning(vec![]);
        let fallback = FixedStrategy::returning(vec![DetectedCircle {
            center: (5, 5),
            radius: 3,
        }]);

        let detection = run_detection(&sheet, &primary, &fallback, &DetectorConfig::default());

        assert_eq!(primary.calls.get(), 1);
        assert_eq!(fallback.calls.get(), 1);
        assert_eq!(detection.method, DetectionMethod::Hough);
        assert_eq!(detection.circles.len(), 1);
    }

    #[test]
    fn fallback_is_skipped_when_primary_finds_circles() {
        let sheet = RgbaImage::new(10, 10);
        let primary = FixedStrategy::returning(vec![DetectedCircle {
            center: (5, 5),
            radius: 3,
        }]);
        let fallback = FixedStrategy::returning(vec![]);

        let detection = run_detection(&sheet, &primary, &fallback, &DetectorConfig::default());

        assert_eq!(primary.calls.get(), 1);
        assert_eq!(fallback.calls.get(), 0);
        assert_eq!(detection.method, DetectionMethod::Contour);
    }

    #[test]
    fn detects_all_circles_in_a_transparent_grid() {
        let mut sheet = RgbaImage::new(360, 250);
        let centers = [
            (60, 60),
            (170, 60),
            (280, 60),
            (60, 170),
            (170, 170),
            (280, 170),
        ];
        for &(x, y) in &centers {
            draw_filled_circle_mut(&mut sheet, (x, y), 45, Rgba([200, 30, 30, 255]));
        }

        let detection = detect_avatars(&sheet, &DetectorConfig::default());

        assert_eq!(detection.method, DetectionMethod::Contour);
        assert_eq!(detection.circles.len(), centers.len());
        // The circles come back in grid order, matching the centers array
        for (circle, &(x, y)) in detection.circles.iter().zip(centers.iter()) {
            assert!(circle.center.0.abs_diff(x as u32) <= 2);
            assert!(circle.center.1.abs_diff(y as u32) <= 2);
            assert!(circle.radius.abs_diff(45) <= 2);
        }
    }

    #[test]
    fn opaque_sheet_with_light_background_uses_the_luminance_mask() {
        let mut sheet = RgbaImage::from_pixel(200, 200, Rgba([255, 255, 255, 255]));
        draw_filled_circle_mut(&mut sheet, (100, 100), 45, Rgba([30, 60, 90, 255]));

        let detection = detect_avatars(&sheet, &DetectorConfig::default());

        assert_eq!(detection.method, DetectionMethod::Contour);
        assert_eq!(detection.circles.len(), 1);
    }

    #[test]
    fn blobs_outside_the_radius_range_are_rejected() {
        let mut sheet = RgbaImage::new(500, 200);
        let opaque = Rgba([80, 80, 80, 255]);
        // In range, too small, too big
        draw_filled_circle_mut(&mut sheet, (60, 100), 45, opaque);
        draw_filled_circle_mut(&mut sheet, (170, 100), 20, opaque);
        draw_filled_circle_mut(&mut sheet, (380, 100), 90, opaque);

        let detection = detect_avatars(&sheet, &DetectorConfig::default());

        assert_eq!(detection.method, DetectionMethod::Contour);
        assert_eq!(detection.circles.len(), 1);
        assert!(detection.circles[0].center.0.abs_diff(60) <= 2);
    }

    #[test]
    fn elongated_blobs_are_not_circles() {
        // A 100x30 bar: its enclosing circle radius is in range, but the
        // shape is nowhere near circular
        let mut sheet = RgbaImage::new(300, 150);
        draw_filled_rect_mut(
            &mut sheet,
            Rect::at(100, 60).of_size(100, 30),
            Rgba([80, 80, 80, 255]),
        );

        let detection = detect_avatars(&sheet, &DetectorConfig::default());

        assert_eq!(detection.circles.len(), 0);
    }

    #[test]
    fn empty_sheet_reports_zero_avatars() {
        let sheet = RgbaImage::new(200, 200);

        let detection = detect_avatars(&sheet, &DetectorConfig::default());

        assert_eq!(detection.circles.len(), 0);
    }
}
