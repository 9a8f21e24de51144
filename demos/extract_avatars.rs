//! Extract the circular avatars from all the sheet images supplied as
//! arguments and write them to the `avatars/` directory.
use avatar_grid_extractor::detect::detect_avatars;
use avatar_grid_extractor::detect::DetectionMethod;
use avatar_grid_extractor::detect::DetectorConfig;
use avatar_grid_extractor::extract::export_avatars;
use avatar_grid_extractor::extract::ExportConfig;
use avatar_grid_extractor::sheet::load_sheet;

fn main() {
    env_logger::init();

    let mut failed = false;
    for sheet_path in std::env::args().skip(1) {
        println!("Processing {}", sheet_path);

        let sheet = match load_sheet(&sheet_path) {
            Ok(sheet) => sheet,
            Err(e) => {
                eprintln!("Error: {}", e);
                failed = true;
                continue;
            }
        };

        let detection = detect_avatars(&sheet, &DetectorConfig::default());
        if detection.method == DetectionMethod::Hough {
            println!("No circles found by contour analysis, used the circle transform fallback");
        }
        println!("Detected {} avatars", detection.circles.len());

        let config = ExportConfig::default();
        match export_avatars(&sheet, &detection.circles, &config) {
            Ok(written) => {
                for path in &written {
                    println!("Saved {}", path.display());
                }
                println!(
                    "Extraction complete! {} avatars saved to '{}'",
                    written.len(),
                    config.output_dir.display()
                );
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}
