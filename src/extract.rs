use image::RgbaImage;
use std::fs;
use std::path::PathBuf;

use crate::circle::DetectedCircle;
use crate::error::Error;

/// Where and how the cropped avatars are written.
#[derive(Clone, Debug)]
pub struct ExportConfig {
    /// Directory the numbered files are written to, created if absent.
    /// Default `avatars`.
    pub output_dir: PathBuf,
    /// Extra pixels kept around the circle in the square crop. Default 2.
    pub margin: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            output_dir: PathBuf::from("avatars"),
            margin: 2,
        }
    }
}

/// Cut one avatar out of the sheet.
///
/// The crop is a square of side `2 * (radius + margin)` centered on the
/// circle and clamped to the sheet bounds, so crops near an edge come out
/// smaller than the nominal size. Pixels outside the circle are fully
/// transparent; pixels inside keep the sheet's color and alpha.
pub fn cut_avatar(sheet: &RgbaImage, circle: &DetectedCircle, margin: u32) -> RgbaImage {
    let (sheet_w, sheet_h) = sheet.dimensions();
    let (cx, cy) = circle.center;
    let reach = circle.radius + margin;

    let x_min = cx.saturating_sub(reach);
    let y_min = cy.saturating_sub(reach);
    let x_max = std::cmp::min(cx.saturating_add(reach), sheet_w);
    let y_max = std::cmp::min(cy.saturating_add(reach), sheet_h);

    let clamped = cx < reach
        || cy < reach
        || cx.saturating_add(reach) > sheet_w
        || cy.saturating_add(reach) > sheet_h;
    if clamped {
        log::warn!(
            "crop for the avatar at ({}, {}) reaches outside the sheet, clamped to {}x{}",
            cx,
            cy,
            x_max - x_min,
            y_max - y_min
        );
    }

    // A new RgbaImage starts all zero, which is fully transparent. Only the
    // pixels inside the circle are filled in.
    let mut avatar = RgbaImage::new(x_max - x_min, y_max - y_min);
    let radius_sq = u64::from(circle.radius) * u64::from(circle.radius);
    for (out_x, out_y, pixel) in avatar.enumerate_pixels_mut() {
        let sheet_x = x_min + out_x;
        let sheet_y = y_min + out_y;
        let dx = i64::from(sheet_x) - i64::from(cx);
        let dy = i64::from(sheet_y) - i64::from(cy);
        if (dx * dx + dy * dy) as u64 <= radius_sq {
            *pixel = *sheet.get_pixel(sheet_x, sheet_y);
        }
    }

    avatar
}

/// Write one numbered PNG per detected circle and return the written paths.
///
/// Files are named `avatar_1.png`, `avatar_2.png`, ... following the order
/// of `circles`, so with circles in grid order the numbering matches the
/// sheet's visual layout. Existing files with the same names are
/// overwritten.
pub fn export_avatars(
    sheet: &RgbaImage,
    circles: &[DetectedCircle],
    config: &ExportConfig,
) -> Result<Vec<PathBuf>, Error> {
    fs::create_dir_all(&config.output_dir).map_err(|source| Error::Output {
        path: config.output_dir.clone(),
        source: image::ImageError::IoError(source),
    })?;

    let mut written = Vec::with_capacity(circles.len());
    for (idx, circle) in circles.iter().enumerate() {
        let avatar = cut_avatar(sheet, circle, config.margin);
        let path = config.output_dir.join(format!("avatar_{}.png", idx + 1));
        avatar.save(&path).map_err(|source| Error::Output {
            path: path.clone(),
            source,
        })?;
        log::info!("saved {}", path.display());
        written.push(path);
    }

    Ok(written)
}
