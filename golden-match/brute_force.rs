use golden_core::{CoreError, CoreResult, Descriptor};

use crate::search::{distance_squared, BestTwo, Neighbor, NeighborSearch};

/// Exact nearest-neighbour search by linear scan
#[derive(Debug, Clone, Copy)]
pub struct BruteForce<'a> {
    points: &'a [Descriptor],
}

impl<'a> BruteForce<'a> {
    /// Index `points`; at least two are needed to answer two-neighbour queries
    pub fn new(points: &'a [Descriptor]) -> CoreResult<Self> {
        if points.len() < 2 {
            return Err(CoreError::InsufficientDescriptors {
                required: 2,
                available: points.len(),
            });
        }
        Ok(Self { points })
    }
}

impl NeighborSearch for BruteForce<'_> {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn nearest_two(&self, query: &Descriptor) -> [Neighbor; 2] {
        let mut best = BestTwo::new();
        for (index, point) in self.points.iter().enumerate() {
            best.push(index, distance_squared(query, point));
        }
        best.into_neighbors()
    }
}
