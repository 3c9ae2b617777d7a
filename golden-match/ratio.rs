use crate::matcher::CandidatePair;

/// Accepted correspondences and a per-pair acceptance mask
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RatioOutcome {
    pub accepted_count: usize,
    /// One entry per candidate pair, in candidate order
    pub mask: Vec<bool>,
}

/// Whether a pair passes the nearest-neighbour distance ratio test
#[inline]
pub fn passes_ratio(pair: &CandidatePair, ratio: f32) -> bool {
    pair.best.distance < ratio * pair.second.distance
}

/// Keep pairs whose best match is clearly closer than the runner-up.
///
/// A pair is accepted iff `best < ratio × second`, so two equally distant
/// neighbours (including two exact copies) are always ambiguous.
pub fn ratio_test(candidates: &[CandidatePair], ratio: f32) -> RatioOutcome {
    let mask: Vec<bool> = candidates.iter().map(|pair| passes_ratio(pair, ratio)).collect();
    let accepted_count = mask.iter().filter(|&&kept| kept).count();
    RatioOutcome { accepted_count, mask }
}
