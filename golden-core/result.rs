use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pass/fail classification of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail => write!(f, "FAIL"),
        }
    }
}

/// Outcome of one comparison, serialised as a flat record
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchResult {
    match_count: usize,
    total_candidates: usize,
    ratio_percent: f64,
    verdict: Verdict,
    degenerate: bool,
}

impl MatchResult {
    /// Score `accepted` out of `total` reference keypoints.
    ///
    /// Zero candidates score 0.0 rather than dividing by zero. Fewer than
    /// `min_candidates` reference keypoints marks the result degenerate.
    pub fn from_counts(accepted: usize, total: usize, threshold: f64, min_candidates: usize) -> Self {
        let match_count = accepted.min(total);
        let ratio_percent = if total == 0 {
            0.0
        } else {
            match_count as f64 * 100.0 / total as f64
        };
        let verdict = if ratio_percent >= threshold {
            Verdict::Pass
        } else {
            Verdict::Fail
        };

        Self {
            match_count,
            total_candidates: total,
            ratio_percent,
            verdict,
            degenerate: total < min_candidates,
        }
    }

    pub fn match_count(&self) -> usize {
        self.match_count
    }

    pub fn total_candidates(&self) -> usize {
        self.total_candidates
    }

    pub fn ratio_percent(&self) -> f64 {
        self.ratio_percent
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matching ratio: {:.2}%, Result: {}", self.ratio_percent, self.verdict)?;
        if self.degenerate {
            write!(f, " (degenerate: {} reference keypoints)", self.total_candidates)?;
        }
        Ok(())
    }
}
