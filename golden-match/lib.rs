//! Correspondence search between descriptor sets, the nearest-neighbour
//! ratio test and the final percentage score.

pub mod brute_force;
pub mod kdtree;
pub mod matcher;
pub mod ratio;
pub mod score;
pub mod search;

pub use brute_force::BruteForce;
pub use kdtree::KdForest;
pub use matcher::{knn_pairs, match_descriptors, Candidate, CandidatePair};
pub use ratio::{passes_ratio, ratio_test, RatioOutcome};
pub use score::{score, score_with_floor};
pub use search::{distance_squared, Neighbor, NeighborSearch};
