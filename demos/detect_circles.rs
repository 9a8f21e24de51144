//! Draw the detected avatar circles on top of each sheet supplied as an
//! argument, to check the detector thresholds on a new sheet layout.
use avatar_grid_extractor::detect::detect_avatars;
use avatar_grid_extractor::detect::DetectorConfig;
use avatar_grid_extractor::sheet::load_sheet;
use image::Rgba;

fn main() {
    env_logger::init();

    for sheet_path in std::env::args().skip(1) {
        println!("Processing {}", sheet_path);
        let sheet = load_sheet(&sheet_path).expect("could not load sheet");

        let detection = detect_avatars(&sheet, &DetectorConfig::default());
        println!("Detected {} avatars", detection.circles.len());

        let mut annotated = image::DynamicImage::ImageRgba8(sheet);
        for circle in &detection.circles {
            imageproc::drawing::draw_hollow_circle_mut(
                &mut annotated,
                (circle.center.0 as i32, circle.center.1 as i32),
                circle.radius as i32,
                Rgba([255, 0, 0, 255]),
            );
        }

        let out_path = sheet_path
            .strip_suffix(".png")
            .expect("image path should end with .png");
        let out_path = format!("{}_detected.png", out_path);
        annotated.save(&out_path).unwrap();
        println!("Detection overlay saved as {}", out_path);
    }
}
