use golden_core::CoreError;
use thiserror::Error;

/// Errors raised while reading, writing or validating extractor configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serde")]
    #[error("Malformed JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "serde")]
    #[error("Malformed TOML config: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[cfg(feature = "serde")]
    #[error("Failed to encode TOML config: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Invalid(#[from] CoreError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
