//! Randomised kd-forest for approximate nearest-neighbour search.
//!
//! Every tree splits on a dimension drawn at random among the few with the
//! highest variance, at the mean value of that dimension. Queries descend
//! all trees, then keep exploring the closest unexplored branches across
//! the whole forest until the check budget is spent.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use golden_core::{CoreError, CoreResult, Descriptor, SearchParams, DESCRIPTOR_LEN};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::search::{distance_squared, BestTwo, Neighbor, NeighborSearch};

/// Points sampled to estimate per-dimension mean and variance
const SAMPLE_MEAN: usize = 100;
/// Split dimension is drawn among this many highest-variance dimensions
const RAND_DIM: usize = 5;

#[derive(Debug, Clone)]
enum KdNode {
    Leaf {
        point_idx: usize,
    },
    Split {
        dim: usize,
        value: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct KdTree {
    nodes: Vec<KdNode>,
    root: usize,
}

/// Unexplored subtree and a lower bound of its squared distance to the query
#[derive(Debug, Clone, Copy)]
struct Branch {
    min_dist: f32,
    tree: usize,
    node: usize,
}

impl PartialEq for Branch {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Branch {}

impl PartialOrd for Branch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Branch {
    fn cmp(&self, other: &Self) -> Ordering {
        self.min_dist
            .total_cmp(&other.min_dist)
            .then(self.tree.cmp(&other.tree))
            .then(self.node.cmp(&other.node))
    }
}

/// Per-query search state
struct SearchState<'q> {
    query: &'q Descriptor,
    /// Points already evaluated; bounded by the check budget
    checked: HashSet<usize>,
    checks: usize,
    heap: BinaryHeap<Reverse<Branch>>,
    best: BestTwo,
}

/// Forest of randomised kd-trees over borrowed descriptors
#[derive(Debug, Clone)]
pub struct KdForest<'a> {
    points: &'a [Descriptor],
    trees: Vec<KdTree>,
    max_checks: usize,
}

impl<'a> KdForest<'a> {
    /// Build `params.trees` trees over `points` from `params.seed`
    pub fn build(points: &'a [Descriptor], params: &SearchParams) -> CoreResult<Self> {
        if points.len() < 2 {
            return Err(CoreError::InsufficientDescriptors {
                required: 2,
                available: points.len(),
            });
        }
        if params.trees == 0 || params.checks == 0 {
            return Err(CoreError::InvalidConfig(
                "kd-forest needs at least one tree and a positive check budget".into(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.trees)
            .map(|_| {
                let mut indices: Vec<usize> = (0..points.len()).collect();
                indices.shuffle(&mut rng);
                let mut nodes = Vec::with_capacity(2 * points.len());
                let root = Self::build_recursive(points, &mut indices, &mut rng, &mut nodes);
                KdTree { nodes, root }
            })
            .collect();

        Ok(Self {
            points,
            trees,
            max_checks: params.checks,
        })
    }

    /// Number of trees in the forest
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn build_recursive(
        points: &[Descriptor],
        indices: &mut [usize],
        rng: &mut StdRng,
        nodes: &mut Vec<KdNode>,
    ) -> usize {
        if indices.len() == 1 {
            nodes.push(KdNode::Leaf { point_idx: indices[0] });
            return nodes.len() - 1;
        }

        let (dim, value) = Self::choose_split(points, indices, rng);
        let split = Self::partition(points, indices, dim, value);
        let (left_indices, right_indices) = indices.split_at_mut(split);

        let node_idx = nodes.len();
        nodes.push(KdNode::Leaf { point_idx: usize::MAX });
        let left = Self::build_recursive(points, left_indices, rng, nodes);
        let right = Self::build_recursive(points, right_indices, rng, nodes);
        nodes[node_idx] = KdNode::Split { dim, value, left, right };

        node_idx
    }

    /// Mean of a random high-variance dimension over a sample of the subset
    fn choose_split(points: &[Descriptor], indices: &[usize], rng: &mut StdRng) -> (usize, f32) {
        let sample = &indices[..indices.len().min(SAMPLE_MEAN)];
        let n = sample.len() as f32;

        let mut mean = [0.0f32; DESCRIPTOR_LEN];
        for &i in sample {
            for (m, v) in mean.iter_mut().zip(points[i].iter()) {
                *m += v;
            }
        }
        for m in mean.iter_mut() {
            *m /= n;
        }

        let mut var = [0.0f32; DESCRIPTOR_LEN];
        for &i in sample {
            for ((s, v), m) in var.iter_mut().zip(points[i].iter()).zip(mean.iter()) {
                let d = v - m;
                *s += d * d;
            }
        }

        let mut dims: Vec<usize> = (0..DESCRIPTOR_LEN).collect();
        dims.sort_by(|&a, &b| var[b].total_cmp(&var[a]).then(a.cmp(&b)));
        let dim = dims[rng.random_range(0..RAND_DIM)];

        (dim, mean[dim])
    }

    /// Reorder `indices` around `value` and return the size of the left part.
    ///
    /// Points below the split come first, then points equal to it. The cut
    /// is moved towards the middle when one side would be empty or the
    /// subset is heavily unbalanced.
    fn partition(points: &[Descriptor], indices: &mut [usize], dim: usize, value: f32) -> usize {
        let count = indices.len();

        let mut below = 0;
        for i in 0..count {
            if points[indices[i]][dim] < value {
                indices.swap(i, below);
                below += 1;
            }
        }
        let mut not_above = below;
        for i in below..count {
            if points[indices[i]][dim] <= value {
                indices.swap(i, not_above);
                not_above += 1;
            }
        }

        let split = if below > count / 2 {
            below
        } else if not_above < count / 2 {
            not_above
        } else {
            count / 2
        };
        if split == 0 || split == count { count / 2 } else { split }
    }

    fn search_level(&self, state: &mut SearchState<'_>, tree: usize, node: usize, min_dist: f32) {
        if state.best.is_full() && state.best.worst() < min_dist {
            return;
        }

        match self.trees[tree].nodes[node] {
            KdNode::Leaf { point_idx } => {
                if state.checks >= self.max_checks && state.best.is_full() {
                    return;
                }
                if !state.checked.insert(point_idx) {
                    return;
                }
                state.checks += 1;
                state.best.push(point_idx, distance_squared(state.query, &self.points[point_idx]));
            }
            KdNode::Split { dim, value, left, right } => {
                let diff = state.query[dim] - value;
                let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };

                let far_dist = min_dist + diff * diff;
                if !state.best.is_full() || far_dist < state.best.worst() {
                    state.heap.push(Reverse(Branch {
                        min_dist: far_dist,
                        tree,
                        node: far,
                    }));
                }
                self.search_level(state, tree, near, min_dist);
            }
        }
    }
}

impl NeighborSearch for KdForest<'_> {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn nearest_two(&self, query: &Descriptor) -> [Neighbor; 2] {
        self.search(query).best.into_neighbors()
    }
}

impl KdForest<'_> {
    fn search<'q>(&self, query: &'q Descriptor) -> SearchState<'q> {
        let mut state = SearchState {
            query,
            checked: HashSet::with_capacity(self.max_checks.min(self.points.len()) + 2),
            checks: 0,
            heap: BinaryHeap::new(),
            best: BestTwo::new(),
        };

        for (tree, kd) in self.trees.iter().enumerate() {
            self.search_level(&mut state, tree, kd.root, 0.0);
        }

        // Keep going past the budget until two neighbours are known
        while state.checks < self.max_checks || !state.best.is_full() {
            let Some(Reverse(branch)) = state.heap.pop() else {
                break;
            };
            self.search_level(&mut state, branch.tree, branch.node, branch.min_dist);
        }

        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brute_force::BruteForce;

    /// Deterministic pseudo-random descriptors with byte-valued components
    fn random_descriptors(n: usize, seed: u64) -> Vec<Descriptor> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let mut d = [0.0; DESCRIPTOR_LEN];
                for v in d.iter_mut() {
                    *v = rng.random_range(0..=255u8) as f32;
                }
                d
            })
            .collect()
    }

    #[test]
    fn test_build_rejects_small_sets() {
        let points = random_descriptors(1, 1);
        let result = KdForest::build(&points, &SearchParams::default());
        assert!(matches!(result, Err(CoreError::InsufficientDescriptors { available: 1, .. })));
    }

    #[test]
    fn test_build_rejects_zero_trees() {
        let points = random_descriptors(4, 1);
        let params = SearchParams { trees: 0, ..SearchParams::default() };
        assert!(matches!(KdForest::build(&points, &params), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_every_tree_holds_every_point_once() {
        let points = random_descriptors(37, 2);
        let forest = KdForest::build(&points, &SearchParams::default()).unwrap();
        assert_eq!(forest.tree_count(), SearchParams::DEFAULT_TREES);

        for tree in &forest.trees {
            let mut seen: Vec<usize> = tree
                .nodes
                .iter()
                .filter_map(|node| match node {
                    KdNode::Leaf { point_idx } => Some(*point_idx),
                    KdNode::Split { .. } => None,
                })
                .collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..37).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_identical_points_still_split() {
        let points = vec![[7.0; DESCRIPTOR_LEN]; 6];
        let forest = KdForest::build(&points, &SearchParams::default()).unwrap();
        let [first, second] = forest.nearest_two(&points[0]);
        assert_eq!(first.distance, 0.0);
        assert_eq!(second.distance, 0.0);
        assert_ne!(first.index, second.index);
    }

    #[test]
    fn test_always_returns_two_neighbours() {
        let points = random_descriptors(2, 3);
        let params = SearchParams { checks: 1, trees: 1, ..SearchParams::default() };
        let forest = KdForest::build(&points, &params).unwrap();
        let query = random_descriptors(1, 4)[0];
        let [first, second] = forest.nearest_two(&query);
        assert_ne!(first.index, second.index);
        assert!(first.distance <= second.distance);
    }

    #[test]
    fn test_finds_exact_copies() {
        let points = random_descriptors(200, 5);
        let forest = KdForest::build(&points, &SearchParams::default()).unwrap();
        for (i, p) in points.iter().enumerate().step_by(13) {
            let [first, second] = forest.nearest_two(p);
            assert_eq!(first.index, i);
            assert_eq!(first.distance, 0.0);
            assert!(second.distance > 0.0);
        }
    }

    #[test]
    fn test_never_beats_exact_search() {
        let points = random_descriptors(60, 6);
        let forest = KdForest::build(&points, &SearchParams::default()).unwrap();
        let exact = BruteForce::new(&points).unwrap();

        for query in random_descriptors(10, 7) {
            let approx = forest.nearest_two(&query);
            let truth = exact.nearest_two(&query);
            assert_ne!(approx[0].index, approx[1].index);
            assert!(approx[0].distance <= approx[1].distance);
            assert!(approx[0].distance >= truth[0].distance);
            assert!(approx[1].distance >= truth[1].distance);
        }
    }

    #[test]
    fn test_same_seed_same_answers() {
        let points = random_descriptors(120, 8);
        let queries = random_descriptors(20, 9);
        let a = KdForest::build(&points, &SearchParams::default()).unwrap();
        let b = KdForest::build(&points, &SearchParams::default()).unwrap();
        for q in &queries {
            assert_eq!(a.nearest_two(q), b.nearest_two(q));
        }
    }

    #[test]
    fn test_visited_points_stay_within_budget() {
        let points = random_descriptors(5000, 9);
        let params = SearchParams { checks: 20, ..SearchParams::default() };
        let forest = KdForest::build(&points, &params).unwrap();

        for query in random_descriptors(10, 10) {
            let state = forest.search(&query);
            assert!(state.checked.len() <= params.checks + 2, "visited {}", state.checked.len());
            assert_eq!(state.checked.len(), state.checks);
            assert!(state.best.is_full());
        }
    }
}
