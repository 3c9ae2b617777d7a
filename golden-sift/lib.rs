//! Scale-invariant keypoint detection and gradient-histogram descriptors.
//!
//! Images are normalised, optionally doubled, and turned into a Gaussian
//! scale space. Extrema of the difference-of-Gaussian stack are refined to
//! subpixel accuracy, assigned one or more dominant orientations and
//! described by 4x4x8 orientation histograms.

pub mod builder;
pub mod config;
pub mod descriptor;
pub mod detector;
pub mod error;
pub mod extrema;
pub mod preprocessing;
pub mod pyramid;
pub mod refinement;
pub mod types;

pub use builder::ExtractorBuilder;
pub use config::ExtractorConfig;
pub use detector::SiftExtractor;
pub use error::{ConfigError, ConfigResult};

use golden_core::{CoreResult, Descriptor, Image, Keypoint};

/// Extract features with the default configuration
pub fn extract(img: &Image) -> CoreResult<(Vec<Keypoint>, Vec<Descriptor>)> {
    SiftExtractor::new(ExtractorConfig::default())?.extract(img)
}
