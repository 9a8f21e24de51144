use image::GrayImage;
use image::Luma;
use image::RgbaImage;
use std::path::Path;

use crate::error::Error;

/// Load the input sheet, promoting it to RGBA.
///
/// Inputs without an alpha channel gain a fully opaque one, so the rest of
/// the pipeline only ever deals with one pixel format.
pub fn load_sheet<P: AsRef<Path>>(path: P) -> Result<RgbaImage, Error> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|source| Error::Input {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(img.to_rgba8())
}

/// Grayscale version of the sheet, used by the edge based fallback detector.
pub fn to_grayscale(sheet: &RgbaImage) -> GrayImage {
    image::imageops::grayscale(sheet)
}

/// True if the alpha channel of the sheet carries any information.
pub fn has_meaningful_alpha(sheet: &RgbaImage) -> bool {
    sheet.pixels().any(|p| p[3] != 255)
}

/// Binary mask separating the avatar blobs (255) from the background (0).
///
/// Sheets with transparency are segmented on the alpha channel. Fully opaque
/// sheets fall back to a luminance threshold, which assumes the background
/// is lighter than the avatars.
pub fn foreground_mask(
    sheet: &RgbaImage,
    alpha_threshold: u8,
    luminance_threshold: u8,
) -> GrayImage {
    if has_meaningful_alpha(sheet) {
        imageproc::map::map_colors(sheet, |p| {
            if p[3] >= alpha_threshold {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    } else {
        imageproc::map::map_colors(&to_grayscale(sheet), |p| {
            if p[0] <= luminance_threshold {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use image::RgbImage;
    use image::Rgba;
    use imageproc::drawing::draw_filled_circle_mut;

    #[test]
    fn missing_input_file_is_an_input_error() {
        let err = load_sheet("this_file_does_not_exist.png").unwrap_err();

        assert!(matches!(err, Error::Input { .. }));
    }

    #[test]
    fn opaque_inputs_gain_an_alpha_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opaque.png");
        let rgb = RgbImage::from_pixel(8, 8, Rgb([10, 20, 30]));
        rgb.save(&path).unwrap();

        let sheet = load_sheet(&path).unwrap();

        assert_eq!(sheet.dimensions(), (8, 8));
        assert!(sheet.pixels().all(|p| *p == Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn transparent_sheets_are_segmented_on_alpha() {
        // The avatar is black on a transparent background: a luminance
        // threshold could not separate it, the alpha channel can
        let mut sheet = RgbaImage::new(100, 100);
        draw_filled_circle_mut(&mut sheet, (50, 50), 20, Rgba([0, 0, 0, 255]));

        let mask = foreground_mask(&sheet, 16, 240);

        assert_eq!(mask.get_pixel(50, 50)[0], 255);
        assert_eq!(mask.get_pixel(5, 5)[0], 0);
    }

    #[test]
    fn opaque_sheets_fall_back_to_luminance() {
        let mut sheet = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        draw_filled_circle_mut(&mut sheet, (50, 50), 20, Rgba([40, 40, 40, 255]));

        let mask = foreground_mask(&sheet, 16, 240);

        assert_eq!(mask.get_pixel(50, 50)[0], 255);
        assert_eq!(mask.get_pixel(5, 5)[0], 0);
    }
}
