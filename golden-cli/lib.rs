//! Golden-image comparison: extract features from a reference and a query
//! capture, match them, score the match and render the correspondences.

pub mod config;
pub mod error;
pub mod render;
pub mod session;

use golden_core::{CoreError, CoreResult, Descriptor, Image, Keypoint, MatchConfig, MatchResult};
use golden_match::{match_descriptors, ratio_test, score_with_floor, CandidatePair};
use golden_sift::{ExtractorConfig, SiftExtractor};
use image::RgbImage;
use tracing::debug;

pub use config::PipelineConfig;
pub use error::{GoldenError, GoldenResult};
pub use golden_core::{self, Verdict};
pub use session::{ComparisonReport, ComparisonRequest, QuerySource};

/// Keypoints and their positionally paired descriptors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Features {
    keypoints: Vec<Keypoint>,
    descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn new(keypoints: Vec<Keypoint>, descriptors: Vec<Descriptor>) -> CoreResult<Self> {
        if keypoints.len() != descriptors.len() {
            return Err(CoreError::MismatchedFeatures {
                keypoints: keypoints.len(),
                descriptors: descriptors.len(),
            });
        }
        Ok(Self { keypoints, descriptors })
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Everything produced by one comparison
#[derive(Debug, Clone)]
pub struct Comparison {
    pub result: MatchResult,
    pub reference: Features,
    pub query: Features,
    /// Two nearest query descriptors of each reference descriptor
    pub candidates: Vec<CandidatePair>,
    /// Ratio-test outcome per candidate pair
    pub mask: Vec<bool>,
}

impl Comparison {
    /// Side-by-side visualisation; returns the canvas and the number of match lines
    pub fn render(&self, reference: &Image, query: &Image) -> (RgbImage, usize) {
        render::render_matches(
            reference,
            self.reference.keypoints(),
            query,
            self.query.keypoints(),
            &self.candidates,
            &self.mask,
        )
    }
}

/// Configured extractor and matcher, reusable across comparisons
#[derive(Debug, Clone)]
pub struct Comparator {
    extractor: SiftExtractor,
    matching: MatchConfig,
}

impl Comparator {
    /// Create a comparator, validating both configurations
    pub fn new(extractor: ExtractorConfig, matching: MatchConfig) -> CoreResult<Self> {
        matching.validate()?;
        Ok(Self {
            extractor: SiftExtractor::new(extractor)?,
            matching,
        })
    }

    pub fn from_config(cfg: &PipelineConfig) -> CoreResult<Self> {
        Self::new(cfg.extractor.clone(), cfg.matching.clone())
    }

    /// Extract features for one image
    pub fn features(&self, img: &Image) -> CoreResult<Features> {
        let (keypoints, descriptors) = self.extractor.extract(img)?;
        Features::new(keypoints, descriptors)
    }

    /// Compare a query capture against a reference image
    pub fn compare(&self, reference: &Image, query: &Image) -> CoreResult<Comparison> {
        let (reference, query) = rayon::join(|| self.features(reference), || self.features(query));
        self.compare_features(reference?, query?)
    }

    /// Compare already extracted feature sets.
    ///
    /// The score is the share of reference keypoints whose best query match
    /// passes the ratio test.
    pub fn compare_features(&self, reference: Features, query: Features) -> CoreResult<Comparison> {
        debug!(
            reference = reference.len(),
            query = query.len(),
            "Comparing feature sets"
        );
        let candidates = match_descriptors(reference.descriptors(), query.descriptors(), &self.matching.search)?;
        let outcome = ratio_test(&candidates, self.matching.ratio);
        let result = score_with_floor(
            outcome.accepted_count,
            reference.len(),
            self.matching.threshold,
            self.matching.min_candidates,
        );

        Ok(Comparison {
            result,
            reference,
            query,
            candidates,
            mask: outcome.mask,
        })
    }

    pub fn extractor(&self) -> &SiftExtractor {
        &self.extractor
    }

    pub fn match_config(&self) -> &MatchConfig {
        &self.matching
    }
}

/// Compare two images with default extraction and the given ratio and threshold
pub fn compare_images(reference: &Image, query: &Image, ratio: f32, threshold: f64) -> CoreResult<MatchResult> {
    let matching = MatchConfig::default().with_ratio(ratio).with_threshold(threshold);
    let comparator = Comparator::new(ExtractorConfig::default(), matching)?;
    Ok(comparator.compare(reference, query)?.result)
}
