use std::path::{Path, PathBuf};
use std::time::SystemTime;

use golden_core::{Image, MatchResult};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{GoldenError, GoldenResult};
use crate::Comparator;

/// Where the query capture comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    /// A specific image file
    File(PathBuf),
    /// The most recently modified `*.png` in a capture folder
    LatestIn(PathBuf),
}

impl QuerySource {
    pub fn resolve(&self) -> GoldenResult<PathBuf> {
        match self {
            QuerySource::File(path) => Ok(path.clone()),
            QuerySource::LatestIn(dir) => latest_png(dir),
        }
    }
}

/// Newest `*.png` in `dir` by modification time; ties go to the greater path
pub fn latest_png(dir: &Path) -> GoldenResult<PathBuf> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if !is_png || !path.is_file() {
            continue;
        }

        let modified = std::fs::metadata(&path)?.modified()?;
        let candidate = (modified, path);
        if newest.as_ref().is_none_or(|current| candidate > *current) {
            newest = Some(candidate);
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| GoldenError::NoQueryImages { dir: dir.to_path_buf() })
}

/// Decode any supported image file to 8-bit grayscale
pub fn load_grayscale(path: &Path) -> GoldenResult<Image> {
    let gray = image::open(path)
        .map_err(|source| GoldenError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_luma8();
    let (width, height) = gray.dimensions();
    Ok(Image::from_raw(width as usize, height as usize, gray.into_raw())?)
}

/// Location of a model's Golden image inside a Golden library folder
pub fn golden_path_for_model(library: &Path, model: &str) -> PathBuf {
    library.join(format!("{model}.png"))
}

/// Store `capture` as the Golden image of `model`, replacing any previous one
pub fn promote_to_golden(capture: &Path, library: &Path, model: &str) -> GoldenResult<PathBuf> {
    // Refuse files that would not load as a Golden image later
    load_grayscale(capture)?;
    std::fs::create_dir_all(library)?;
    let target = golden_path_for_model(library, model);
    std::fs::copy(capture, &target)?;
    info!(model, path = %target.display(), "Saved Golden image");
    Ok(target)
}

/// File name encoding the score and verdict, e.g. `comparison_93.75_PASS.png`
pub fn output_file_name(result: &MatchResult) -> String {
    format!("comparison_{:.2}_{}.png", result.ratio_percent(), result.verdict())
}

/// One comparison run: which images to compare, where to write, how to match
#[derive(Debug, Clone)]
pub struct ComparisonRequest {
    pub golden: PathBuf,
    pub query: QuerySource,
    /// Folder for the rendered comparison; nothing is written when unset
    pub output_dir: Option<PathBuf>,
    pub config: PipelineConfig,
}

/// Outcome of a [`ComparisonRequest`]
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub result: MatchResult,
    pub golden_path: PathBuf,
    pub query_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub reference_keypoints: usize,
    pub query_keypoints: usize,
}

impl ComparisonRequest {
    pub fn new(golden: impl Into<PathBuf>, query: QuerySource) -> Self {
        Self {
            golden: golden.into(),
            query,
            output_dir: None,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve the query, compare it with the Golden image and optionally
    /// save the rendered comparison
    pub fn run(&self) -> GoldenResult<ComparisonReport> {
        let comparator = Comparator::from_config(&self.config)?;
        let query_path = self.query.resolve()?;
        debug!(query = %query_path.display(), "Resolved query image");

        let golden = load_grayscale(&self.golden).map_err(|_| GoldenError::GoldenMissing {
            path: self.golden.clone(),
        })?;
        let query = load_grayscale(&query_path)?;

        let comparison = comparator.compare(&golden, &query)?;
        let result = comparison.result;

        let output_path = match &self.output_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let path = dir.join(output_file_name(&result));
                let (canvas, lines) = comparison.render(&golden, &query);
                canvas.save(&path).map_err(|source| GoldenError::Encode {
                    path: path.clone(),
                    source,
                })?;
                debug!(lines, path = %path.display(), "Saved comparison image");
                Some(path)
            }
            None => None,
        };

        info!(
            golden = %self.golden.display(),
            query = %query_path.display(),
            "{}", result
        );

        Ok(ComparisonReport {
            result,
            golden_path: self.golden.clone(),
            query_path,
            output_path,
            reference_keypoints: comparison.reference.len(),
            query_keypoints: comparison.query.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use golden_core::MatchConfig;
    use std::fs::File;
    use std::time::Duration;

    fn write_png(path: &Path, value: u8) {
        image::GrayImage::from_pixel(16, 16, image::Luma([value])).save(path).unwrap();
    }

    #[test]
    fn test_latest_png_uses_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("b_old.png");
        let new = dir.path().join("a_new.png");
        write_png(&old, 10);
        write_png(&new, 20);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let base = SystemTime::now() - Duration::from_secs(3600);
        File::options().write(true).open(&old).unwrap().set_modified(base).unwrap();
        File::options()
            .write(true)
            .open(&new)
            .unwrap()
            .set_modified(base + Duration::from_secs(60))
            .unwrap();

        assert_eq!(latest_png(dir.path()).unwrap(), new);
    }

    #[test]
    fn test_latest_png_in_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("capture.jpg"), "not a png").unwrap();
        assert!(matches!(latest_png(dir.path()), Err(GoldenError::NoQueryImages { .. })));
    }

    #[test]
    fn test_output_file_name() {
        let result = MatchResult::from_counts(15, 16, 90.0, 4);
        assert_eq!(output_file_name(&result), "comparison_93.75_PASS.png");
        let result = MatchResult::from_counts(0, 0, 90.0, 4);
        assert_eq!(output_file_name(&result), "comparison_0.00_FAIL.png");
    }

    #[test]
    fn test_missing_golden() {
        let dir = tempfile::tempdir().unwrap();
        let query = dir.path().join("query.png");
        write_png(&query, 90);

        let request = ComparisonRequest::new(dir.path().join("absent.png"), QuerySource::File(query));
        let err = request.run().unwrap_err();
        assert!(matches!(err, GoldenError::GoldenMissing { .. }));
        assert!(err.to_string().starts_with("no Golden image available"));
    }

    #[test]
    fn test_invalid_config_fails_before_io() {
        let mut config = PipelineConfig::default();
        config.matching = MatchConfig::default().with_threshold(f64::NAN);
        let request = ComparisonRequest::new("absent.png", QuerySource::LatestIn("absent-dir".into())).with_config(config);
        assert!(matches!(request.run(), Err(GoldenError::Core(_))));
    }

    #[test]
    fn test_promote_copies_into_library() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("capture.png");
        write_png(&capture, 140);
        let library = dir.path().join("Golden_image");

        let golden = promote_to_golden(&capture, &library, "PX-200").unwrap();
        assert_eq!(golden, library.join("PX-200.png"));
        assert_eq!(load_grayscale(&golden).unwrap().get(3, 3), 140);
    }

    #[test]
    fn test_promote_rejects_undecodable_capture() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("capture.png");
        std::fs::write(&capture, b"garbage").unwrap();
        let result = promote_to_golden(&capture, &dir.path().join("lib"), "m");
        assert!(matches!(result, Err(GoldenError::Decode { .. })));
    }
}
