//! k-d tree: binary partitioning on rotating axes (axis = depth mod
//! m), logarithmic point queries on well-balanced insert sequences.
//!
//! Internal nodes are pure splits (`axis`, `split_value`); a leaf stores
//! exactly one [`Value`]. Because internal nodes
//! hold no value of their own, erase collapses a degenerate (zero- or
//! one-child) internal node into its surviving child rather than the
//! classic Bentley kd-tree's "replace with min/max of a subtree" rule —
//! that rule exists to patch a hole left by deleting a *point stored at an
//! internal node*, which cannot happen here. See `DESIGN.md`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::arena::{ArenaKind, NodeArena, NodeId};
use crate::bbox::Bbox;
use crate::error::PointError;
use crate::point::{Coordinate, Point};
use crate::predicate::{Predicate, PredicateList};
use crate::value::Value;

use super::{EntryIter, SpatialIndex};

enum Node<T: Coordinate, M> {
    Leaf(Value<T, M>),
    Internal {
        axis: usize,
        split_value: T,
        left: Option<NodeId>,
        right: Option<NodeId>,
    },
}

pub struct KdTree<T: Coordinate, M> {
    dim: usize,
    root: Option<NodeId>,
    arena: NodeArena<Node<T, M>>,
    len: usize,
    /// Flat mirror of every stored entry, kept in lockstep with the tree.
    /// `iter`/`find`/min-max read from here so they can hand back plain
    /// borrows instead of materialising a traversal on every call; the
    /// tree itself exists to prune range and nearest queries.
    entries: Vec<Value<T, M>>,
}

impl<T: Coordinate, M> KdTree<T, M> {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            root: None,
            arena: NodeArena::new(ArenaKind::Interleaved, 64),
            len: 0,
            entries: Vec::new(),
        }
    }

    fn axis_at(&self, depth: usize) -> usize {
        depth % self.dim.max(1)
    }

    fn insert_two(&self, depth: usize, existing: Value<T, M>, new: Value<T, M>) -> Result<NodeId, PointError>
    where
        M: Clone,
    {
        let axis = self.axis_at(depth);
        let split_value = existing.key.get(axis);
        let existing_left = existing.key.get(axis) <= split_value;
        let new_left = new.key.get(axis) <= split_value;
        if existing_left != new_left {
            let (left_v, right_v) = if new_left {
                (new, existing)
            } else {
                (existing, new)
            };
            let left = self.arena.alloc(Node::Leaf(left_v))?;
            let right = self.arena.alloc(Node::Leaf(right_v))?;
            self.arena.alloc(Node::Internal {
                axis,
                split_value,
                left: Some(left),
                right: Some(right),
            })
        } else {
            let child = self.insert_two(depth + 1, existing, new)?;
            self.arena.alloc(Node::Internal {
                axis,
                split_value,
                left: Some(child),
                right: None,
            })
        }
    }

    /// Returns `(new_subtree, inserted)`.
    fn insert_rec(
        &self,
        node: Option<NodeId>,
        depth: usize,
        value: Value<T, M>,
    ) -> Result<(Option<NodeId>, bool), PointError>
    where
        M: Clone,
    {
        match node {
            None => Ok((Some(self.arena.alloc(Node::Leaf(value))?), true)),
            Some(id) => {
                let is_duplicate_leaf = self
                    .arena
                    .with(id, |n| matches!(n, Node::Leaf(existing) if existing.key == value.key))
                    .unwrap_or(false);
                if is_duplicate_leaf {
                    return Ok((Some(id), false));
                }
                let existing_leaf = self.arena.with(id, |n| match n {
                    Node::Leaf(v) => Some(v.clone()),
                    Node::Internal { .. } => None,
                });
                if let Some(Some(existing)) = existing_leaf {
                    self.arena.dealloc(id);
                    let new_id = self.insert_two(depth, existing, value)?;
                    return Ok((Some(new_id), true));
                }

                let (axis, split_value, left, right) = self
                    .arena
                    .with(id, |n| match n {
                        Node::Internal {
                            axis,
                            split_value,
                            left,
                            right,
                        } => (*axis, *split_value, *left, *right),
                        Node::Leaf(_) => unreachable!(),
                    })
                    .unwrap();
                let goes_left = value.key.get(axis) <= split_value;
                if goes_left {
                    let (new_left, inserted) = self.insert_rec(left, depth + 1, value)?;
                    self.arena.with_mut(id, |n| {
                        if let Node::Internal { left, .. } = n {
                            *left = new_left;
                        }
                    });
                    Ok((Some(id), inserted))
                } else {
                    let (new_right, inserted) = self.insert_rec(right, depth + 1, value)?;
                    self.arena.with_mut(id, |n| {
                        if let Node::Internal { right, .. } = n {
                            *right = new_right;
                        }
                    });
                    Ok((Some(id), inserted))
                }
            }
        }
    }

    /// Returns `(new_subtree, removed_count)`.
    fn erase_rec(&self, node: Option<NodeId>, depth: usize, key: &Point<T>) -> (Option<NodeId>, usize) {
        match node {
            None => (None, 0),
            Some(id) => {
                let is_match_leaf = self
                    .arena
                    .with(id, |n| matches!(n, Node::Leaf(v) if &v.key == key))
                    .unwrap_or(false);
                if is_match_leaf {
                    self.arena.dealloc(id);
                    return (None, 1);
                }
                let is_leaf = self.arena.with(id, |n| matches!(n, Node::Leaf(_))).unwrap_or(false);
                if is_leaf {
                    return (Some(id), 0);
                }
                let (axis, split_value, left, right) = self
                    .arena
                    .with(id, |n| match n {
                        Node::Internal {
                            axis,
                            split_value,
                            left,
                            right,
                        } => (*axis, *split_value, *left, *right),
                        Node::Leaf(_) => unreachable!(),
                    })
                    .unwrap();
                let goes_left = key.get(axis) <= split_value;
                let (new_left, new_right, removed) = if goes_left {
                    let (nl, removed) = self.erase_rec(left, depth + 1, key);
                    (nl, right, removed)
                } else {
                    let (nr, removed) = self.erase_rec(right, depth + 1, key);
                    (left, nr, removed)
                };
                match (new_left, new_right) {
                    (None, None) => {
                        self.arena.dealloc(id);
                        (None, removed)
                    }
                    (Some(only), None) | (None, Some(only)) => {
                        self.arena.dealloc(id);
                        (Some(only), removed)
                    }
                    (Some(l), Some(r)) => {
                        self.arena.with_mut(id, |n| {
                            if let Node::Internal { left, right, .. } = n {
                                *left = Some(l);
                                *right = Some(r);
                            }
                        });
                        (Some(id), removed)
                    }
                }
            }
        }
    }

    fn node_box(&self, axis: usize, split_value: T, mut bounds: Bbox<T>, left: bool) -> Bbox<T> {
        let mut min = bounds.min().clone();
        let mut max = bounds.max().clone();
        if left {
            max.set(axis, split_value);
        } else {
            min.set(axis, split_value);
        }
        bounds = Bbox::new(min, max);
        bounds
    }

    /// Prunes via `might_pass` against each node's half-space box, then
    /// filters matching leaves via `pass`. Does not apply the nearest
    /// sort/truncate — `query` does that once, the same way
    /// `filter_matching` does for the linear backend.
    fn collect_matching(
        &self,
        node: Option<NodeId>,
        bounds: Bbox<T>,
        predicates: &PredicateList<T, M>,
        out: &mut Vec<Value<T, M>>,
    ) where
        M: Clone,
    {
        let Some(id) = node else { return };
        if !predicates.might_pass(&bounds) {
            return;
        }
        let is_leaf_value = self.arena.with(id, |n| match n {
            Node::Leaf(v) => Some(v.clone()),
            Node::Internal { .. } => None,
        });
        match is_leaf_value {
            Some(Some(v)) => {
                if predicates.pass(&v) {
                    out.push(v);
                }
            }
            _ => {
                let (axis, split_value, left, right) = self
                    .arena
                    .with(id, |n| match n {
                        Node::Internal {
                            axis,
                            split_value,
                            left,
                            right,
                        } => (*axis, *split_value, *left, *right),
                        Node::Leaf(_) => unreachable!(),
                    })
                    .unwrap();
                let left_box = self.node_box(axis, split_value, bounds.clone(), true);
                let right_box = self.node_box(axis, split_value, bounds, false);
                self.collect_matching(left, left_box, predicates, out);
                self.collect_matching(right, right_box, predicates, out);
            }
        }
    }

    fn nearest(&self, reference: &crate::predicate::NearestRef<T>, k: usize) -> Vec<Value<T, M>>
    where
        M: Clone,
    {
        struct QueueItem<T: Coordinate, M> {
            dist: f64,
            node: Option<NodeId>,
            bounds: Bbox<T>,
            leaf_value: Option<Value<T, M>>,
        }
        impl<T: Coordinate, M> PartialEq for QueueItem<T, M> {
            fn eq(&self, other: &Self) -> bool {
                self.dist == other.dist
            }
        }
        impl<T: Coordinate, M> Eq for QueueItem<T, M> {}
        impl<T: Coordinate, M> PartialOrd for QueueItem<T, M> {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }
        impl<T: Coordinate, M> Ord for QueueItem<T, M> {
            fn cmp(&self, other: &Self) -> Ordering {
                // Reverse for a min-heap via std's max-heap BinaryHeap.
                other
                    .dist
                    .partial_cmp(&self.dist)
                    .unwrap_or(Ordering::Equal)
            }
        }

        let mut heap = BinaryHeap::new();
        if let Some(root) = self.root {
            let universe = Bbox::universe(self.dim);
            heap.push(QueueItem {
                dist: reference.distance_to_box(&universe),
                node: Some(root),
                bounds: universe,
                leaf_value: None,
            });
        }

        let mut results: Vec<Value<T, M>> = Vec::with_capacity(k);
        while let Some(item) = heap.pop() {
            if results.len() >= k {
                break;
            }
            if let Some(v) = item.leaf_value {
                results.push(v);
                continue;
            }
            let Some(id) = item.node else { continue };
            let leaf_value = self.arena.with(id, |n| match n {
                Node::Leaf(v) => Some(v.clone()),
                Node::Internal { .. } => None,
            });
            match leaf_value {
                Some(Some(v)) => {
                    let dist = reference.distance_to_point(&v.key);
                    heap.push(QueueItem {
                        dist,
                        node: None,
                        bounds: item.bounds,
                        leaf_value: Some(v),
                    });
                }
                _ => {
                    let (axis, split_value, left, right) = self
                        .arena
                        .with(id, |n| match n {
                            Node::Internal {
                                axis,
                                split_value,
                                left,
                                right,
                            } => (*axis, *split_value, *left, *right),
                            Node::Leaf(_) => unreachable!(),
                        })
                        .unwrap();
                    let left_box = self.node_box(axis, split_value, item.bounds.clone(), true);
                    let right_box = self.node_box(axis, split_value, item.bounds, false);
                    if let Some(l) = left {
                        heap.push(QueueItem {
                            dist: reference.distance_to_box(&left_box),
                            node: Some(l),
                            bounds: left_box,
                            leaf_value: None,
                        });
                    }
                    if let Some(r) = right {
                        heap.push(QueueItem {
                            dist: reference.distance_to_box(&right_box),
                            node: Some(r),
                            bounds: right_box,
                            leaf_value: None,
                        });
                    }
                }
            }
        }
        results
    }
}

impl<T: Coordinate, M: Clone> Clone for KdTree<T, M> {
    fn clone(&self) -> Self {
        let mut fresh = KdTree::new(self.dim);
        for v in self.iter() {
            let _ = fresh.insert(v.clone());
        }
        fresh
    }
}

impl<T: Coordinate, M: Clone + PartialEq> SpatialIndex<T, M> for KdTree<T, M> {
    fn new(dim: usize) -> Self {
        Self::new(dim)
    }

    fn dimensions(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
        self.len = 0;
        self.entries.clear();
    }

    fn insert(&mut self, value: Value<T, M>) -> Result<bool, PointError> {
        if value.key.dimensions() != self.dim {
            return Err(PointError::DimensionMismatch {
                expected: self.dim,
                found: value.key.dimensions(),
            });
        }
        let (new_root, inserted) = self.insert_rec(self.root, 0, value.clone())?;
        self.root = new_root;
        if inserted {
            self.len += 1;
            self.entries.push(value);
        }
        Ok(inserted)
    }

    fn erase_key(&mut self, key: &Point<T>) -> usize {
        let (new_root, removed) = self.erase_rec(self.root, 0, key);
        self.root = new_root;
        self.len -= removed;
        let mut i = 0;
        while i < self.entries.len() {
            if &self.entries[i].key == key {
                self.entries.swap_remove(i);
            } else {
                i += 1;
            }
        }
        removed
    }

    fn find(&self, key: &Point<T>) -> Option<&Value<T, M>> {
        self.entries.iter().find(|v| &v.key == key)
    }

    fn min_value(&self, axis: usize) -> Option<T> {
        self.entries
            .iter()
            .map(|v| v.key.get(axis))
            .fold(None, |acc, x| match acc {
                None => Some(x),
                Some(a) => Some(a.min(x)),
            })
    }

    fn max_value(&self, axis: usize) -> Option<T> {
        self.entries
            .iter()
            .map(|v| v.key.get(axis))
            .fold(None, |acc, x| match acc {
                None => Some(x),
                Some(a) => Some(a.max(x)),
            })
    }

    fn iter(&self) -> EntryIter<'_, T, M> {
        EntryIter::new(&self.entries)
    }

    fn query(&self, predicates: &PredicateList<T, M>) -> Vec<&Value<T, M>> {
        // A bare `Nearest` predicate takes the best-first priority-queue
        // path; anything composed with other predicates falls back to a
        // might_pass-pruned traversal followed by sort+truncate, matching
        // `filter_matching`'s reference semantics exactly.
        let matched: Vec<Value<T, M>> =
            if let [Predicate::Nearest { reference, k }] = predicates.predicates() {
                self.nearest(reference, *k)
            } else {
                let mut out = Vec::new();
                self.collect_matching(self.root, Bbox::universe(self.dim), predicates, &mut out);
                if let Some((reference, k)) = predicates.nearest() {
                    out.sort_by(|a, b| {
                        reference
                            .distance_to_point(&a.key)
                            .partial_cmp(&reference.distance_to_point(&b.key))
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                    out.truncate(k);
                }
                out
            };
        // Re-borrow from the authoritative flat store so the result is
        // tied to `&self` without handing back owned clones.
        matched
            .iter()
            .filter_map(|m| self.entries.iter().find(|e| e.key == m.key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(v: Vec<f64>) -> Point<f64> {
        Point::new(v)
    }

    #[test]
    fn insert_and_len() {
        let mut tree: KdTree<f64, i32> = KdTree::new(2);
        assert!(tree.insert(Value::new(pt(vec![1.0, 2.0]), 1)).unwrap());
        assert!(tree.insert(Value::new(pt(vec![3.0, 4.0]), 2)).unwrap());
        assert!(!tree.insert(Value::new(pt(vec![1.0, 2.0]), 9)).unwrap());
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn erase_collapses_and_shrinks() {
        let mut tree: KdTree<f64, i32> = KdTree::new(1);
        for v in [1.0, 2.0, 3.0] {
            tree.insert(Value::new(pt(vec![v]), 0)).unwrap();
        }
        assert_eq!(tree.erase_key(&pt(vec![2.0])), 1);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.iter().count(), 2);
    }

    #[test]
    fn query_matches_linear_equivalent() {
        let mut tree: KdTree<f64, i32> = KdTree::new(2);
        let pts = [(0.1, 0.1), (0.9, 0.9), (0.4, 0.4), (0.2, 0.8)];
        for (x, y) in pts {
            tree.insert(Value::new(pt(vec![x, y]), 0)).unwrap();
        }
        let results = tree.begin_intersection(&Bbox::new(pt(vec![0.0, 0.0]), pt(vec![0.5, 0.5])));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn nearest_k_is_distance_ordered() {
        let mut tree: KdTree<f64, i32> = KdTree::new(2);
        for (x, y) in [(5.0, 5.0), (1.0, 1.0), (3.0, 3.0), (0.5, 0.5)] {
            tree.insert(Value::new(pt(vec![x, y]), 0)).unwrap();
        }
        let reference = crate::predicate::NearestRef::Point(pt(vec![0.0, 0.0]));
        let results = tree.nearest(&reference, 3);
        assert_eq!(results.len(), 3);
        for w in results.windows(2) {
            assert!(
                pt(vec![0.0, 0.0]).distance(&w[0].key) <= pt(vec![0.0, 0.0]).distance(&w[1].key)
            );
        }
    }
}
