//! Sum tree for prioritized sampling.
//!
//! The layout follows https://github.com/openai/baselines/blob/master/baselines/common/segment_tree.py:
//! the root is node 1 and the leaves of slots `0..capacity` are nodes
//! `n_leaves..n_leaves + capacity`, where `n_leaves` is a power of two.

/// Binary tree whose inner nodes hold the sum of their children.
///
/// Inner nodes are always recomputed as `left + right` from the leaves, never
/// adjusted by differences, so the totals do not drift.
#[derive(Debug, Clone)]
pub struct SumTree {
    capacity: usize,
    n_leaves: usize,
    tree: Vec<f64>,
}

impl SumTree {
    /// Creates a tree of `capacity` zero leaves.
    pub fn new(capacity: usize) -> Self {
        let n_leaves = capacity.next_power_of_two().max(2);
        Self {
            capacity,
            n_leaves,
            tree: vec![0f64; 2 * n_leaves],
        }
    }

    /// Sum of all leaves.
    pub fn total(&self) -> f64 {
        self.tree[1]
    }

    /// Value of leaf `ix`.
    pub fn get(&self, ix: usize) -> f64 {
        debug_assert!(ix < self.capacity);
        self.tree[self.n_leaves + ix]
    }

    /// Sets a single leaf.
    pub fn set(&mut self, ix: usize, p: f64) {
        self.set_many(std::iter::once((ix, p)));
    }

    /// Sets several leaves, then refreshes each affected inner node once.
    pub fn set_many(&mut self, items: impl IntoIterator<Item = (usize, f64)>) {
        let mut dirty = items
            .into_iter()
            .map(|(ix, p)| {
                debug_assert!(ix < self.capacity);
                debug_assert!(p >= 0.0);
                let node = self.n_leaves + ix;
                self.tree[node] = p;
                node / 2
            })
            .collect::<Vec<_>>();

        // All leaves sit on the same level, so the dirty nodes move up together.
        while !dirty.is_empty() {
            dirty.sort_unstable();
            dirty.dedup();
            for &node in dirty.iter() {
                self.tree[node] = self.tree[2 * node] + self.tree[2 * node + 1];
            }
            dirty = dirty.iter().filter(|&&n| n > 1).map(|&n| n / 2).collect();
        }
    }

    /// Returns the leaf whose prefix-sum interval contains `s`.
    ///
    /// A value falling exactly on the boundary between two subtrees goes to the
    /// left one. Zero-valued subtrees are never entered, so the result always has
    /// a positive value as long as [`SumTree::total()`] is positive.
    pub fn find(&self, mut s: f64) -> usize {
        let mut node = 1;
        while node < self.n_leaves {
            let left = 2 * node;
            let (l, r) = (self.tree[left], self.tree[left + 1]);
            if (s <= l && l > 0.0) || r <= 0.0 {
                node = left;
            } else {
                s -= l;
                node = left + 1;
            }
        }
        node - self.n_leaves
    }

    /// Sets every leaf to zero.
    pub fn clear(&mut self) {
        self.tree.iter_mut().for_each(|v| *v = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::SumTree;

    #[test]
    fn test_sum_tree_odd() {
        let data = vec![0.5f64, 0.2, 0.8, 0.3, 1.1, 2.5, 3.9];
        let mut sum_tree = SumTree::new(7);
        for ix in 0..data.len() {
            sum_tree.set(ix, data[ix]);
        }

        assert!((sum_tree.total() - data.iter().sum::<f64>()).abs() < 1e-9);
        assert_eq!(sum_tree.find(0.0), 0);
        assert_eq!(sum_tree.find(0.4), 0);
        assert_eq!(sum_tree.find(0.5), 0);
        assert_eq!(sum_tree.find(0.6), 1);
        assert_eq!(sum_tree.find(1.2), 2);
        assert_eq!(sum_tree.find(1.6), 3);
        assert_eq!(sum_tree.find(2.0), 4);
        assert_eq!(sum_tree.find(2.8), 4);
        assert_eq!(sum_tree.find(9.0), 6);
    }

    #[test]
    fn test_boundary_goes_left() {
        let mut sum_tree = SumTree::new(4);
        sum_tree.set_many(vec![(0, 1.0), (1, 1.0), (2, 1.0), (3, 1.0)]);
        assert_eq!(sum_tree.find(1.0), 0);
        assert_eq!(sum_tree.find(2.0), 1);
        assert_eq!(sum_tree.find(3.0), 2);
    }

    #[test]
    fn test_zero_leaves_are_skipped() {
        let mut sum_tree = SumTree::new(5);
        sum_tree.set_many(vec![(0, 0.0), (1, 0.0), (2, 2.0), (3, 0.0), (4, 0.0)]);
        assert_eq!(sum_tree.find(0.0), 2);
        assert_eq!(sum_tree.find(2.0), 2);
        assert_eq!(sum_tree.find(2.5), 2);

        sum_tree.set(2, 0.0);
        sum_tree.set(4, 1.0);
        assert_eq!(sum_tree.total(), 1.0);
        assert_eq!(sum_tree.find(0.3), 4);
    }

    #[test]
    fn test_single_slot() {
        let mut sum_tree = SumTree::new(1);
        sum_tree.set(0, 3.0);
        assert_eq!(sum_tree.total(), 3.0);
        assert_eq!(sum_tree.find(1.5), 0);
    }
}
