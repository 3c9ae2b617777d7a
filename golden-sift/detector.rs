use golden_core::{CoreResult, Descriptor, Image, Keypoint};
use rayon::prelude::*;
use tracing::debug;

use crate::config::ExtractorConfig;
use crate::descriptor::DescriptorGenerator;
use crate::extrema::ExtremaDetector;
use crate::preprocessing::ImagePreprocessing;
use crate::pyramid::{ImagePyramid, Octave};
use crate::refinement::KeypointRefinement;

/// Scale-invariant keypoint detector and descriptor extractor
#[derive(Debug, Clone)]
pub struct SiftExtractor {
    cfg: ExtractorConfig,
}

impl SiftExtractor {
    /// Creates a new extractor with validation
    pub fn new(cfg: ExtractorConfig) -> CoreResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Extract keypoints and their descriptors.
    ///
    /// The two sequences are positionally paired. An image without structure
    /// yields two empty sequences; an image without pixels is an error.
    pub fn extract(&self, img: &Image) -> CoreResult<(Vec<Keypoint>, Vec<Descriptor>)> {
        img.ensure_non_empty()?;

        let base = ImagePreprocessing::base_image(img, self.cfg.sigma, self.cfg.upscale);
        let octaves = ImagePyramid::build(base, self.cfg.n_octave_layers, self.cfg.sigma);
        debug!(
            width = img.width(),
            height = img.height(),
            octaves = octaves.len(),
            "Built scale space"
        );

        let mut features = Vec::new();
        for octave in &octaves {
            let found = self.describe_octave(octave);
            debug!(octave = octave.index, features = found.len(), "Described octave");
            features.extend(found);
        }

        let before = features.len();
        let features = KeypointRefinement::remove_duplicates(features);
        let features = KeypointRefinement::retain_best(features, self.cfg.max_features);
        debug!(
            raw = before,
            kept = features.len(),
            "Extracted features"
        );

        Ok(features.into_iter().unzip())
    }

    /// Detect keypoints only
    pub fn detect(&self, img: &Image) -> CoreResult<Vec<Keypoint>> {
        self.extract(img).map(|(keypoints, _)| keypoints)
    }

    /// Get extractor configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.cfg
    }

    /// Refine, orient and describe every extremum of one octave, in detection order
    fn describe_octave(&self, octave: &Octave) -> Vec<(Keypoint, Descriptor)> {
        let layers = self.cfg.n_octave_layers;
        let threshold = 0.5 * self.cfg.contrast_threshold / layers as f32;
        let extrema = ExtremaDetector::detect(octave, layers, threshold);

        // Octave coordinates back to input pixels
        let base_scale = if self.cfg.upscale { 0.5 } else { 1.0 };
        let octave_scale = (1u32 << octave.index) as f32 * base_scale;
        let octave_id = octave.index as i32 - i32::from(self.cfg.upscale);

        extrema
            .par_iter()
            .flat_map_iter(|&extremum| {
                let refined = KeypointRefinement::refine_extremum(
                    octave,
                    extremum,
                    layers,
                    self.cfg.contrast_threshold,
                    self.cfg.edge_threshold,
                );

                refined.into_iter().flat_map(move |point| {
                    let img = &octave.gaussians[point.layer];
                    let scale = self.cfg.sigma * 2f32.powf((point.layer as f32 + point.offset[2]) / layers as f32);
                    let fx = point.x as f32 + point.offset[0];
                    let fy = point.y as f32 + point.offset[1];

                    KeypointRefinement::orientation_peaks(img, point.x, point.y, scale)
                        .into_iter()
                        .map(move |angle| {
                            let descriptor = DescriptorGenerator::compute(img, fx, fy, angle, scale);
                            let keypoint = Keypoint {
                                x: fx * octave_scale,
                                y: fy * octave_scale,
                                size: scale * 2.0 * octave_scale,
                                angle: to_unit_radians(angle),
                                response: point.contrast.abs(),
                                octave: octave_id,
                            };
                            (keypoint, descriptor)
                        })
                })
            })
            .collect()
    }
}

/// Degrees in `[0, 360)` to radians in `[0, 2π)`
fn to_unit_radians(degrees: f32) -> f32 {
    let radians = degrees.to_radians();
    if radians >= std::f32::consts::TAU { 0.0 } else { radians }
}
