use golden_core::{CoreError, CoreResult, Descriptor, SearchAlgorithm, SearchParams};
use rayon::prelude::*;
use tracing::debug;

use crate::brute_force::BruteForce;
use crate::kdtree::KdForest;
use crate::search::NeighborSearch;

/// One reference-to-query correspondence hypothesis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub reference_idx: usize,
    pub query_idx: usize,
    /// Euclidean distance between the two descriptors
    pub distance: f32,
}

/// The two nearest query descriptors of one reference descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidatePair {
    pub best: Candidate,
    pub second: Candidate,
}

/// Find the two nearest `query` descriptors of every `reference` descriptor.
///
/// Output has one pair per reference descriptor, in reference order. An
/// empty reference set yields no pairs; otherwise fewer than two query
/// descriptors is an error.
pub fn match_descriptors(
    reference: &[Descriptor],
    query: &[Descriptor],
    params: &SearchParams,
) -> CoreResult<Vec<CandidatePair>> {
    if reference.is_empty() {
        return Ok(Vec::new());
    }
    if query.len() < 2 {
        return Err(CoreError::InsufficientDescriptors {
            required: 2,
            available: query.len(),
        });
    }

    let pairs = match params.algorithm {
        SearchAlgorithm::KdForest => knn_pairs(&KdForest::build(query, params)?, reference),
        SearchAlgorithm::BruteForce => knn_pairs(&BruteForce::new(query)?, reference),
    };
    debug!(
        reference = reference.len(),
        query = query.len(),
        algorithm = ?params.algorithm,
        "Matched descriptors"
    );
    Ok(pairs)
}

/// Query `index` with every reference descriptor in parallel, keeping input order
pub fn knn_pairs<S: NeighborSearch>(index: &S, reference: &[Descriptor]) -> Vec<CandidatePair> {
    reference
        .par_iter()
        .enumerate()
        .map(|(reference_idx, descriptor)| {
            let [best, second] = index.nearest_two(descriptor);
            CandidatePair {
                best: Candidate {
                    reference_idx,
                    query_idx: best.index,
                    distance: best.distance,
                },
                second: Candidate {
                    reference_idx,
                    query_idx: second.index,
                    distance: second.distance,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use golden_core::DESCRIPTOR_LEN;

    fn spike(i: usize, v: f32) -> Descriptor {
        let mut d = [0.0; DESCRIPTOR_LEN];
        d[i] = v;
        d
    }

    #[test]
    fn test_empty_reference_checked_first() {
        let pairs = match_descriptors(&[], &[], &SearchParams::default()).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_single_query_descriptor_is_insufficient() {
        let reference = [spike(0, 10.0), spike(1, 10.0)];
        let query = [spike(0, 10.0)];
        for params in [SearchParams::default(), SearchParams::brute_force()] {
            let err = match_descriptors(&reference, &query, &params).unwrap_err();
            assert_eq!(err, CoreError::InsufficientDescriptors { required: 2, available: 1 });
        }
    }

    #[test]
    fn test_one_pair_per_reference_in_order() {
        let reference: Vec<Descriptor> = (0..10).map(|i| spike(i, 50.0 + i as f32)).collect();
        let query: Vec<Descriptor> = (0..10).rev().map(|i| spike(i, 50.0 + i as f32)).collect();

        for params in [SearchParams::default(), SearchParams::brute_force()] {
            let pairs = match_descriptors(&reference, &query, &params).unwrap();
            assert_eq!(pairs.len(), reference.len());
            for (i, pair) in pairs.iter().enumerate() {
                assert_eq!(pair.best.reference_idx, i);
                assert_eq!(pair.second.reference_idx, i);
                assert_eq!(pair.best.query_idx, 9 - i);
                assert_eq!(pair.best.distance, 0.0);
                assert!(pair.second.distance >= pair.best.distance);
                assert_ne!(pair.best.query_idx, pair.second.query_idx);
            }
        }
    }

    #[test]
    fn test_knn_pairs_with_brute_force_index() {
        let query = [spike(0, 1.0), spike(0, 4.0), spike(0, 8.0)];
        let index = BruteForce::new(&query).unwrap();
        let pairs = knn_pairs(&index, &[spike(0, 5.0)]);
        assert_eq!(pairs[0].best.query_idx, 1);
        assert_eq!(pairs[0].second.query_idx, 2);
        assert_eq!(pairs[0].best.distance, 1.0);
        assert_eq!(pairs[0].second.distance, 3.0);
    }
}
