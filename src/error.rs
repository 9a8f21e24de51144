use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the sheet loader and the avatar exporter.
///
/// An empty detection result is not an error: the detector returns an empty
/// circle list and the caller reports a count of zero.
#[derive(Debug, Error)]
pub enum Error {
    /// The input sheet could not be read or decoded
    #[error("could not load sheet image from {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// The output directory or one of the avatar files could not be written
    #[error("could not write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
