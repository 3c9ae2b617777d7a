use std::path::PathBuf;

use golden_core::CoreError;
use thiserror::Error;

/// Errors surfaced by the comparison pipeline, its file handling and the CLI
#[derive(Debug, Error)]
pub enum GoldenError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("no Golden image available at {}", .path.display())]
    GoldenMissing { path: PathBuf },

    #[error("no query images (*.png) found in {}", .dir.display())]
    NoQueryImages { dir: PathBuf },

    #[error("failed to read image {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write image {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unsupported config format {} (expected .json or .toml)", .0.display())]
    UnsupportedConfigFormat(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type GoldenResult<T> = Result<T, GoldenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_convert_transparently() {
        let core = CoreError::InsufficientDescriptors { required: 2, available: 0 };
        let err: GoldenError = core.clone().into();
        assert!(matches!(err, GoldenError::Core(_)));
        assert_eq!(err.to_string(), core.to_string());
    }
}
