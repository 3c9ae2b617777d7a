use golden_core::{MatchConfig, MatchResult};
use tracing::{info, warn};

/// Score accepted correspondences against the number of reference keypoints
pub fn score(accepted: usize, total: usize, threshold: f64) -> MatchResult {
    score_with_floor(accepted, total, threshold, MatchConfig::DEFAULT_MIN_CANDIDATES)
}

/// Like [`score`], flagging results with fewer than `min_candidates` references
pub fn score_with_floor(accepted: usize, total: usize, threshold: f64, min_candidates: usize) -> MatchResult {
    let result = MatchResult::from_counts(accepted, total, threshold, min_candidates);
    if result.degenerate() {
        warn!(
            total,
            min_candidates, "Reference has too few keypoints for a meaningful score"
        );
    }
    info!(
        accepted = result.match_count(),
        total,
        ratio_percent = result.ratio_percent(),
        verdict = %result.verdict(),
        "Scored comparison"
    );
    result
}
