use golden_core::CoreResult;

use crate::config::ExtractorConfig;
use crate::detector::SiftExtractor;

/// Builder for creating a `SiftExtractor`
#[derive(Debug, Clone, Default)]
pub struct ExtractorBuilder {
    config: ExtractorConfig,
}

impl ExtractorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of scale-space layers per octave
    pub fn layers(mut self, n_octave_layers: usize) -> Self {
        self.config.n_octave_layers = n_octave_layers;
        self
    }

    /// Set the minimum DoG contrast
    pub fn contrast_threshold(mut self, threshold: f32) -> Self {
        self.config.contrast_threshold = threshold;
        self
    }

    /// Set the principal curvature ratio above which points count as edges
    pub fn edge_threshold(mut self, threshold: f32) -> Self {
        self.config.edge_threshold = threshold;
        self
    }

    /// Set the base scale-space blur
    pub fn sigma(mut self, sigma: f32) -> Self {
        self.config.sigma = sigma;
        self
    }

    /// Enable or disable doubling the input before detection
    pub fn upscale(mut self, enable: bool) -> Self {
        self.config.upscale = enable;
        self
    }

    /// Keep at most `max` keypoints (0 keeps all)
    pub fn max_features(mut self, max: usize) -> Self {
        self.config.max_features = max;
        self
    }

    /// Apply the fast preset
    pub fn preset_fast(mut self) -> Self {
        self.config = ExtractorConfig::fast_preset();
        self
    }

    /// Apply the fine-detail preset
    pub fn preset_fine_detail(mut self) -> Self {
        self.config = ExtractorConfig::fine_detail_preset();
        self
    }

    /// Build the `SiftExtractor`
    pub fn build(self) -> CoreResult<SiftExtractor> {
        SiftExtractor::new(self.config)
    }

    /// Generate a summary of the builder's configuration
    pub fn summary(&self) -> String {
        self.config.summary()
    }

    /// Create a builder from an existing `ExtractorConfig`
    pub fn from_config(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Convert the builder into an `ExtractorConfig`
    pub fn to_config(self) -> ExtractorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use golden_core::CoreError;

    #[test]
    fn test_builder_sets_fields() {
        let cfg = ExtractorBuilder::new()
            .layers(4)
            .contrast_threshold(0.03)
            .edge_threshold(8.0)
            .sigma(1.4)
            .upscale(false)
            .max_features(200)
            .to_config();

        assert_eq!(cfg.n_octave_layers, 4);
        assert_eq!(cfg.contrast_threshold, 0.03);
        assert_eq!(cfg.edge_threshold, 8.0);
        assert_eq!(cfg.sigma, 1.4);
        assert!(!cfg.upscale);
        assert_eq!(cfg.max_features, 200);
    }

    #[test]
    fn test_presets_round_trip_through_config() {
        let builder = ExtractorBuilder::new().preset_fast();
        assert_eq!(builder.clone().to_config(), ExtractorConfig::fast_preset());
        assert_eq!(ExtractorConfig::fast_preset().to_builder().to_config(), builder.to_config());
        assert!(ExtractorBuilder::new().preset_fine_detail().summary().contains("contrast=0.020"));
    }

    #[test]
    fn test_build_validates() {
        assert!(ExtractorBuilder::new().build().is_ok());
        let err = ExtractorBuilder::new().layers(0).build().unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }
}
