use std::cmp::Ordering;

use golden_core::Descriptor;

/// An indexed descriptor and its Euclidean distance to a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// Two-nearest-neighbour lookup over a fixed set of descriptors
pub trait NeighborSearch: Sync {
    /// Number of indexed descriptors
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The two closest indexed descriptors, ascending by distance.
    ///
    /// Implementations require at least two indexed descriptors.
    fn nearest_two(&self, query: &Descriptor) -> [Neighbor; 2];
}

/// Squared Euclidean distance between two descriptors
#[inline]
pub fn distance_squared(a: &Descriptor, b: &Descriptor) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Running pair of the smallest `(distance², index)` values seen.
///
/// Ties on distance resolve to the lower index so results do not depend on
/// visiting order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BestTwo {
    items: [(f32, usize); 2],
}

impl BestTwo {
    pub(crate) fn new() -> Self {
        Self {
            items: [(f32::INFINITY, usize::MAX); 2],
        }
    }

    fn precedes(a: (f32, usize), b: (f32, usize)) -> bool {
        match a.0.total_cmp(&b.0) {
            Ordering::Less => true,
            Ordering::Equal => a.1 < b.1,
            Ordering::Greater => false,
        }
    }

    pub(crate) fn push(&mut self, index: usize, dist_sq: f32) {
        let item = (dist_sq, index);
        if Self::precedes(item, self.items[0]) {
            self.items[1] = self.items[0];
            self.items[0] = item;
        } else if Self::precedes(item, self.items[1]) {
            self.items[1] = item;
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.items[1].1 != usize::MAX
    }

    /// Squared distance a candidate has to beat to enter the pair
    pub(crate) fn worst(&self) -> f32 {
        self.items[1].0
    }

    pub(crate) fn into_neighbors(self) -> [Neighbor; 2] {
        self.items.map(|(dist_sq, index)| Neighbor {
            index,
            distance: dist_sq.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use golden_core::DESCRIPTOR_LEN;

    #[test]
    fn test_distance_squared() {
        let a = [0.0; DESCRIPTOR_LEN];
        let mut b = [0.0; DESCRIPTOR_LEN];
        b[0] = 3.0;
        b[127] = 4.0;
        assert_eq!(distance_squared(&a, &b), 25.0);
        assert_eq!(distance_squared(&b, &b), 0.0);
    }

    #[test]
    fn test_best_two_keeps_smallest_in_order() {
        let mut best = BestTwo::new();
        assert!(!best.is_full());
        best.push(4, 9.0);
        assert!(!best.is_full());
        best.push(1, 16.0);
        best.push(7, 1.0);
        best.push(2, 25.0);
        assert!(best.is_full());
        assert_eq!(best.worst(), 9.0);

        let [first, second] = best.into_neighbors();
        assert_eq!((first.index, first.distance), (7, 1.0));
        assert_eq!((second.index, second.distance), (4, 3.0));
    }

    #[test]
    fn test_best_two_ties_prefer_lower_index() {
        let mut best = BestTwo::new();
        best.push(5, 4.0);
        best.push(3, 4.0);
        best.push(9, 4.0);
        let [first, second] = best.into_neighbors();
        assert_eq!((first.index, second.index), (3, 5));
    }
}
