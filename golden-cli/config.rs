use std::path::Path;

use golden_core::{CoreResult, MatchConfig};
use golden_sift::ExtractorConfig;
use serde::{Deserialize, Serialize};

use crate::error::{GoldenError, GoldenResult};

/// Extractor and matcher settings of one comparison, loadable from JSON or TOML
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub extractor: ExtractorConfig,
    pub matching: MatchConfig,
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> GoldenResult<Self> {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            _ => Err(GoldenError::UnsupportedConfigFormat(path.to_path_buf())),
        }
    }
}

impl PipelineConfig {
    /// Validate both halves
    pub fn validate(&self) -> CoreResult<()> {
        self.extractor.validate()?;
        self.matching.validate()
    }

    /// Load from a `.json` or `.toml` file and validate
    pub fn load<P: AsRef<Path>>(path: P) -> GoldenResult<Self> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let content = std::fs::read_to_string(path)?;
        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Save to a `.json` or `.toml` file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> GoldenResult<()> {
        let path = path.as_ref();
        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!("{}; {}", self.extractor.summary(), self.matching.summary())
    }
}
