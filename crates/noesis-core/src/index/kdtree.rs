//! Exact k-d tree spatial index
//!
//! Const-generic over dimensionality `K`, so the same implementation serves
//! both the 3-dimensional trinity index and the 2-dimensional complex-plane
//! index. Nearest-neighbor search is exact: closer-subtree-first descent
//! with squared-distance pruning, rather than an approximate/graph-based
//! index.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Node<const K: usize> {
    id: String,
    point: [f64; K],
    left: Option<Box<Node<K>>>,
    right: Option<Box<Node<K>>>,
}

/// An exact k-d tree over `K`-dimensional points, keyed by node id.
///
/// Insertion-only: there is no delete. Duplicate ids may be inserted at
/// different points; queries may then return the same id more than once at
/// different distances, with deduplication (keeping the closer occurrence)
/// left to the caller.
pub struct KdTree<const K: usize> {
    root: Option<Box<Node<K>>>,
    len: usize,
}

impl<const K: usize> Default for KdTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const K: usize> KdTree<K> {
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `id` at `point`. Tolerates a previously-seen `id` at a
    /// different point: both occurrences remain in the tree.
    pub fn insert(&mut self, id: impl Into<String>, point: [f64; K]) {
        let id = id.into();
        Self::insert_at(&mut self.root, id, point, 0);
        self.len += 1;
    }

    fn insert_at(slot: &mut Option<Box<Node<K>>>, id: String, point: [f64; K], depth: usize) {
        match slot {
            None => {
                *slot = Some(Box::new(Node { id, point, left: None, right: None }));
            }
            Some(node) => {
                let axis = depth % K;
                if point[axis] < node.point[axis] {
                    Self::insert_at(&mut node.left, id, point, depth + 1);
                } else {
                    Self::insert_at(&mut node.right, id, point, depth + 1);
                }
            }
        }
    }

    /// The single nearest point to `query`, as `(id, distance)`, or `None`
    /// if the tree is empty.
    pub fn nearest(&self, query: &[f64; K]) -> Option<(String, f64)> {
        let mut best: Option<(String, f64)> = None;
        Self::nearest_at(self.root.as_deref(), query, 0, &mut best);
        best.map(|(id, dist_sq)| (id, dist_sq.sqrt()))
    }

    fn nearest_at(node: Option<&Node<K>>, query: &[f64; K], depth: usize, best: &mut Option<(String, f64)>) {
        let Some(node) = node else { return };

        let dist_sq = squared_distance(&node.point, query);
        if best.as_ref().is_none_or(|(_, b)| dist_sq < *b) {
            *best = Some((node.id.clone(), dist_sq));
        }

        let axis = depth % K;
        let diff = query[axis] - node.point[axis];
        let (first, second) = if diff < 0.0 {
            (node.left.as_deref(), node.right.as_deref())
        } else {
            (node.right.as_deref(), node.left.as_deref())
        };

        Self::nearest_at(first, query, depth + 1, best);
        if best.as_ref().is_none_or(|(_, b)| diff * diff < *b) {
            Self::nearest_at(second, query, depth + 1, best);
        }
    }

    /// The `k` nearest points to `query`, as `(id, distance)` pairs sorted
    /// ascending by distance (ties broken by id, ascending).
    pub fn k_nearest(&self, query: &[f64; K], k: usize) -> Vec<(String, f64)> {
        if k == 0 || self.root.is_none() {
            return Vec::new();
        }

        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(k);
        Self::k_nearest_at(self.root.as_deref(), query, 0, k, &mut heap);

        let mut result: Vec<(String, f64)> =
            heap.into_iter().map(|e| (e.id, e.dist_sq.sqrt())).collect();
        result.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
        result
    }

    fn k_nearest_at(
        node: Option<&Node<K>>,
        query: &[f64; K],
        depth: usize,
        k: usize,
        heap: &mut BinaryHeap<HeapEntry>,
    ) {
        let Some(node) = node else { return };

        let dist_sq = squared_distance(&node.point, query);
        if heap.len() < k {
            heap.push(HeapEntry { dist_sq, id: node.id.clone() });
        } else if let Some(worst) = heap.peek() {
            if dist_sq < worst.dist_sq || (dist_sq == worst.dist_sq && node.id < worst.id) {
                heap.pop();
                heap.push(HeapEntry { dist_sq, id: node.id.clone() });
            }
        }

        let axis = depth % K;
        let diff = query[axis] - node.point[axis];
        let (first, second) = if diff < 0.0 {
            (node.left.as_deref(), node.right.as_deref())
        } else {
            (node.right.as_deref(), node.left.as_deref())
        };

        Self::k_nearest_at(first, query, depth + 1, k, heap);

        let should_search_second = heap.len() < k || heap.peek().is_some_and(|worst| diff * diff < worst.dist_sq);
        if should_search_second {
            Self::k_nearest_at(second, query, depth + 1, k, heap);
        }
    }
}

fn squared_distance<const K: usize>(a: &[f64; K], b: &[f64; K]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

struct HeapEntry {
    dist_sq: f64,
    id: String,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.dist_sq == other.dist_sq && self.id == other.id
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .partial_cmp(&other.dist_sq)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_has_no_nearest() {
        let tree: KdTree<3> = KdTree::new();
        assert!(tree.nearest(&[0.0, 0.0, 0.0]).is_none());
        assert!(tree.k_nearest(&[0.0, 0.0, 0.0], 3).is_empty());
    }

    #[test]
    fn exact_match_has_zero_distance() {
        let mut tree: KdTree<3> = KdTree::new();
        tree.insert("a", [0.8, 0.7, 0.9]);
        tree.insert("b", [0.1, 0.1, 0.1]);
        let (id, dist) = tree.nearest(&[0.8, 0.7, 0.9]).unwrap();
        assert_eq!(id, "a");
        assert!(dist < 1e-12);
    }

    #[test]
    fn nearest_picks_closer_of_two_points() {
        let mut tree: KdTree<3> = KdTree::new();
        tree.insert("near", [0.5, 0.5, 0.5]);
        tree.insert("far", [0.0, 0.0, 0.0]);
        let (id, _) = tree.nearest(&[0.45, 0.5, 0.5]).unwrap();
        assert_eq!(id, "near");
    }

    #[test]
    fn k_nearest_returns_sorted_by_distance() {
        let mut tree: KdTree<2> = KdTree::new();
        for (id, point) in [("a", [0.0, 0.0]), ("b", [1.0, 0.0]), ("c", [2.0, 0.0]), ("d", [3.0, 0.0])] {
            tree.insert(id, point);
        }
        let result = tree.k_nearest(&[0.0, 0.0], 3);
        let ids: Vec<&str> = result.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        for pair in result.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
    }

    #[test]
    fn k_nearest_ties_break_on_id_ascending() {
        let mut tree: KdTree<2> = KdTree::new();
        tree.insert("z", [1.0, 0.0]);
        tree.insert("a", [-1.0, 0.0]);
        let result = tree.k_nearest(&[0.0, 0.0], 1);
        assert_eq!(result[0].0, "a");
    }

    #[test]
    fn duplicate_ids_are_tolerated_and_both_occurrences_are_queryable() {
        let mut tree: KdTree<2> = KdTree::new();
        tree.insert("x", [0.0, 0.0]);
        tree.insert("x", [10.0, 10.0]);
        assert_eq!(tree.len(), 2);
        let result = tree.k_nearest(&[0.0, 0.0], 2);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].0, "x");
        assert!(result[0].1 < result[1].1);
    }

    #[test]
    fn k_larger_than_tree_size_returns_all_points() {
        let mut tree: KdTree<3> = KdTree::new();
        tree.insert("only", [0.2, 0.3, 0.4]);
        let result = tree.k_nearest(&[0.0, 0.0, 0.0], 10);
        assert_eq!(result.len(), 1);
    }
}
