use golden_core::{CoreError, CoreResult};

use crate::builder::ExtractorBuilder;
#[cfg(feature = "serde")]
use crate::error::ConfigResult;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Complete extractor configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExtractorConfig {
    /// Scale-space layers per octave
    pub n_octave_layers: usize,
    /// Minimum interpolated DoG contrast (intensities in `[0, 1]`)
    pub contrast_threshold: f32,
    /// Maximum ratio of principal curvatures before a point counts as an edge
    pub edge_threshold: f32,
    /// Blur of the base scale-space image
    pub sigma: f32,
    /// Double the input before building the scale space
    pub upscale: bool,
    /// Keep only the strongest responses; 0 keeps everything
    pub max_features: usize,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractorConfig {
    /// Create new configuration with default settings
    pub fn new() -> Self {
        Self {
            n_octave_layers: 3,
            contrast_threshold: 0.04,
            edge_threshold: 10.0,
            sigma: 1.6,
            upscale: true,
            max_features: 0,
            name: None,
            description: None,
        }
    }

    /// Fast preset: native resolution and a capped keypoint count
    pub fn fast_preset() -> Self {
        Self {
            upscale: false,
            max_features: 500,
            name: Some("Fast".to_string()),
            description: Some("Native resolution, strongest 500 keypoints".to_string()),
            ..Self::new()
        }
    }

    /// Fine-detail preset for small, low-contrast captures
    pub fn fine_detail_preset() -> Self {
        Self {
            contrast_threshold: 0.02,
            edge_threshold: 12.0,
            name: Some("Fine detail".to_string()),
            description: Some("Lower contrast floor for faint UI elements".to_string()),
            ..Self::new()
        }
    }

    /// Add metadata to configuration
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self
    }

    /// Convert to ExtractorBuilder for further customization
    pub fn to_builder(self) -> ExtractorBuilder {
        ExtractorBuilder::from_config(self)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "ExtractorConfig: layers={}, contrast={:.3}, edge={:.1}, sigma={:.2}, upscale={}, max_features={}",
            self.n_octave_layers,
            self.contrast_threshold,
            self.edge_threshold,
            self.sigma,
            self.upscale,
            self.max_features
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> CoreResult<()> {
        if self.n_octave_layers == 0 {
            return Err(CoreError::InvalidConfig("n_octave_layers must be positive".into()));
        }
        if !self.contrast_threshold.is_finite() || self.contrast_threshold < 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "contrast_threshold {} must be finite and non-negative",
                self.contrast_threshold
            )));
        }
        if !self.edge_threshold.is_finite() || self.edge_threshold <= 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "edge_threshold {} must be finite and positive",
                self.edge_threshold
            )));
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "sigma {} must be finite and positive",
                self.sigma
            )));
        }
        Ok(())
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> ConfigResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> ConfigResult<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
