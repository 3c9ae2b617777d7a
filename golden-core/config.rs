use crate::error::{CoreError, CoreResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nearest-neighbour index used by the matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SearchAlgorithm {
    /// Randomised kd-trees searched best-bin-first under a check budget
    #[default]
    KdForest,
    /// Exhaustive linear scan
    BruteForce,
}

/// Nearest-neighbour search parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SearchParams {
    pub algorithm: SearchAlgorithm,
    /// Number of randomised trees in the forest
    pub trees: usize,
    /// Maximum number of leaf points examined per query once two neighbours are known
    pub checks: usize,
    /// Seed for split-dimension selection; fixed so runs are reproducible
    pub seed: u64,
}

impl SearchParams {
    pub const DEFAULT_TREES: usize = 5;
    pub const DEFAULT_CHECKS: usize = 50;
    pub const DEFAULT_SEED: u64 = 0x2545_F491_4F6C_DD1D;

    pub fn brute_force() -> Self {
        Self {
            algorithm: SearchAlgorithm::BruteForce,
            ..Self::default()
        }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            algorithm: SearchAlgorithm::KdForest,
            trees: Self::DEFAULT_TREES,
            checks: Self::DEFAULT_CHECKS,
            seed: Self::DEFAULT_SEED,
        }
    }
}

/// Matching and scoring configuration
///
/// `ratio` defaults to 0.9, looser than the usual 0.7-0.8, so weaker
/// correspondences are accepted. Tighten it per deployment if screenshots
/// carry little visual noise.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatchConfig {
    /// Ratio-test factor in `(0, 1]`
    pub ratio: f32,
    /// Pass threshold as a percentage of reference keypoints
    pub threshold: f64,
    /// Reference keypoint counts below this flag the result as degenerate
    pub min_candidates: usize,
    pub n_threads: usize,
    pub search: SearchParams,
}

impl MatchConfig {
    pub const DEFAULT_RATIO: f32 = 0.9;
    pub const DEFAULT_THRESHOLD: f64 = 90.0;
    pub const DEFAULT_MIN_CANDIDATES: usize = 4;

    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_search(mut self, search: SearchParams) -> Self {
        self.search = search;
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> CoreResult<()> {
        if !self.ratio.is_finite() || self.ratio <= 0.0 || self.ratio > 1.0 {
            return Err(CoreError::InvalidConfig(format!(
                "ratio {} outside (0, 1]",
                self.ratio
            )));
        }
        if !self.threshold.is_finite() || !(0.0..=100.0).contains(&self.threshold) {
            return Err(CoreError::InvalidConfig(format!(
                "threshold {} outside [0, 100]",
                self.threshold
            )));
        }
        if self.search.trees == 0 {
            return Err(CoreError::InvalidConfig("search needs at least one tree".into()));
        }
        if self.search.checks == 0 {
            return Err(CoreError::InvalidConfig("search needs a positive check budget".into()));
        }
        if self.n_threads == 0 {
            return Err(CoreError::InvalidConfig("n_threads must be positive".into()));
        }
        Ok(())
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "MatchConfig: ratio={:.2}, threshold={:.1}%, min_candidates={}, search={:?}(trees={}, checks={}), threads={}",
            self.ratio,
            self.threshold,
            self.min_candidates,
            self.search.algorithm,
            self.search.trees,
            self.search.checks,
            self.n_threads
        )
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            ratio: Self::DEFAULT_RATIO,
            threshold: Self::DEFAULT_THRESHOLD,
            min_candidates: Self::DEFAULT_MIN_CANDIDATES,
            search: SearchParams::default(),
            n_threads: num_cpus::get().max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = MatchConfig::default();
        assert_eq!(cfg.ratio, 0.9);
        assert_eq!(cfg.threshold, 90.0);
        assert_eq!(cfg.search.trees, 5);
        assert_eq!(cfg.search.checks, 50);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_ratio_bounds() {
        assert!(MatchConfig::default().with_ratio(1.0).validate().is_ok());
        assert!(MatchConfig::default().with_ratio(0.0).validate().is_err());
        assert!(MatchConfig::default().with_ratio(1.01).validate().is_err());
        assert!(MatchConfig::default().with_ratio(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(MatchConfig::default().with_threshold(0.0).validate().is_ok());
        assert!(MatchConfig::default().with_threshold(100.0).validate().is_ok());
        assert!(MatchConfig::default().with_threshold(-1.0).validate().is_err());
        assert!(MatchConfig::default().with_threshold(f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_search_budget_must_be_positive() {
        let mut cfg = MatchConfig::default();
        cfg.search.trees = 0;
        assert!(matches!(cfg.validate(), Err(CoreError::InvalidConfig(_))));

        let mut cfg = MatchConfig::default();
        cfg.search.checks = 0;
        assert!(matches!(cfg.validate(), Err(CoreError::InvalidConfig(_))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: MatchConfig = serde_json::from_str(r#"{ "ratio": 0.75, "search": { "algorithm": "brute_force" } }"#).unwrap();
        assert_eq!(cfg.ratio, 0.75);
        assert_eq!(cfg.threshold, 90.0);
        assert_eq!(cfg.search.algorithm, SearchAlgorithm::BruteForce);
        assert_eq!(cfg.search.checks, SearchParams::DEFAULT_CHECKS);
    }
}
