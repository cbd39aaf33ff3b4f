//! Quad-tree (`2^m`-ary generalisation of the 2-D/3-D quadtree/octree to
//! `m` dimensions): each internal node holds one pivot point and up to
//! `2^m` children, selected by [`Point::quadrant`]'s bitmask. Leaves hold a
//! small bucket of entries (`BUCKET_SIZE`).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::arena::{ArenaKind, NodeArena, NodeId};
use crate::bbox::Bbox;
use crate::error::PointError;
use crate::point::{Coordinate, Point};
use crate::predicate::{NearestRef, Predicate, PredicateList};
use crate::value::Value;

use super::{EntryIter, SpatialIndex};

/// Entries held directly in a leaf before it is promoted to an internal
/// pivot node. Kept small: a linear scan over a bucket this size is cheaper
/// than another arena indirection.
const BUCKET_SIZE: usize = 8;

enum Node<T: Coordinate, M> {
    Leaf(Vec<Value<T, M>>),
    Internal {
        pivot: Point<T>,
        children: Vec<Option<NodeId>>,
    },
}

pub struct QuadTree<T: Coordinate, M> {
    dim: usize,
    root: Option<NodeId>,
    arena: NodeArena<Node<T, M>>,
    len: usize,
    entries: Vec<Value<T, M>>,
}

impl<T: Coordinate, M: Clone> QuadTree<T, M> {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            root: None,
            arena: NodeArena::new(ArenaKind::ExternalFreeList, 32),
            len: 0,
            entries: Vec::new(),
        }
    }

    fn child_box(&self, bounds: &Bbox<T>, pivot: &Point<T>, quad: usize) -> Bbox<T> {
        let mut min = bounds.min().clone();
        let mut max = bounds.max().clone();
        for axis in 0..self.dim {
            if quad & (1 << axis) != 0 {
                max.set(axis, pivot.get(axis));
            } else {
                min.set(axis, pivot.get(axis));
            }
        }
        Bbox::new(min, max)
    }

    fn insert_rec(
        &self,
        node: Option<NodeId>,
        value: Value<T, M>,
    ) -> Result<(Option<NodeId>, bool), PointError> {
        match node {
            None => {
                let id = self.arena.alloc(Node::Leaf(vec![value]))?;
                Ok((Some(id), true))
            }
            Some(id) => {
                let is_internal = self
                    .arena
                    .with(id, |n| matches!(n, Node::Internal { .. }))
                    .unwrap_or(false);
                if is_internal {
                    let (pivot, quad) = self
                        .arena
                        .with(id, |n| match n {
                            Node::Internal { pivot, .. } => {
                                (pivot.clone(), pivot.quadrant(&value.key))
                            }
                            Node::Leaf(_) => unreachable!(),
                        })
                        .unwrap();
                    let _ = pivot;
                    let child = self
                        .arena
                        .with(id, |n| match n {
                            Node::Internal { children, .. } => children[quad],
                            Node::Leaf(_) => unreachable!(),
                        })
                        .unwrap();
                    let (new_child, inserted) = self.insert_rec(child, value)?;
                    self.arena.with_mut(id, |n| {
                        if let Node::Internal { children, .. } = n {
                            children[quad] = new_child;
                        }
                    });
                    return Ok((Some(id), inserted));
                }

                let bucket = self
                    .arena
                    .with(id, |n| match n {
                        Node::Leaf(b) => Some(b.clone()),
                        Node::Internal { .. } => None,
                    })
                    .flatten();
                let bucket = bucket.unwrap();
                if bucket.iter().any(|v| v.key == value.key) {
                    return Ok((Some(id), false));
                }
                if bucket.len() < BUCKET_SIZE {
                    self.arena.with_mut(id, |n| {
                        if let Node::Leaf(b) = n {
                            b.push(value);
                        }
                    });
                    return Ok((Some(id), true));
                }

                // Promote: split on the centroid of the bucket's keys plus
                // the new value, then redistribute everyone into fresh
                // children.
                let pivot = Self::centroid(&bucket, &value, self.dim);
                let mut children: Vec<Option<NodeId>> = vec![None; 1 << self.dim];
                self.arena.dealloc(id);
                let mut all = bucket;
                all.push(value);
                for v in all {
                    let quad = pivot.quadrant(&v.key);
                    let (new_child, _) = self.insert_rec(children[quad], v)?;
                    children[quad] = new_child;
                }
                let new_id = self.arena.alloc(Node::Internal { pivot, children })?;
                Ok((Some(new_id), true))
            }
        }
    }

    fn centroid(bucket: &[Value<T, M>], extra: &Value<T, M>, dim: usize) -> Point<T> {
        let mut sums = vec![0.0f64; dim];
        let count = (bucket.len() + 1) as f64;
        for v in bucket.iter().chain(std::iter::once(extra)) {
            for axis in 0..dim {
                sums[axis] += v.key.get(axis).to_f64();
            }
        }
        Point::new(sums.into_iter().map(|s| T::from_f64(s / count)).collect())
    }

    fn erase_rec(&self, node: Option<NodeId>, key: &Point<T>) -> (Option<NodeId>, usize) {
        match node {
            None => (None, 0),
            Some(id) => {
                let is_internal = self
                    .arena
                    .with(id, |n| matches!(n, Node::Internal { .. }))
                    .unwrap_or(false);
                if !is_internal {
                    let removed = self
                        .arena
                        .with_mut(id, |n| match n {
                            Node::Leaf(bucket) => {
                                let before = bucket.len();
                                bucket.retain(|v| &v.key != key);
                                before - bucket.len()
                            }
                            Node::Internal { .. } => unreachable!(),
                        })
                        .unwrap_or(0);
                    return (Some(id), removed);
                }
                let (pivot, quad) = self
                    .arena
                    .with(id, |n| match n {
                        Node::Internal { pivot, .. } => (pivot.clone(), pivot.quadrant(key)),
                        Node::Leaf(_) => unreachable!(),
                    })
                    .unwrap();
                let child = self
                    .arena
                    .with(id, |n| match n {
                        Node::Internal { children, .. } => children[quad],
                        Node::Leaf(_) => unreachable!(),
                    })
                    .unwrap();
                let (new_child, removed) = self.erase_rec(child, key);
                self.arena.with_mut(id, |n| {
                    if let Node::Internal { children, .. } = n {
                        children[quad] = new_child;
                    }
                });
                let _ = pivot;

                if removed > 0 {
                    let total = self.count_entries(Some(id));
                    if total < BUCKET_SIZE {
                        let mut bucket = Vec::with_capacity(total);
                        self.collect_all(Some(id), &mut bucket);
                        self.dealloc_subtree(Some(id));
                        let new_id = self.arena.alloc(Node::Leaf(bucket)).ok();
                        return (new_id, removed);
                    }
                }
                (Some(id), removed)
            }
        }
    }

    fn count_entries(&self, node: Option<NodeId>) -> usize {
        let Some(id) = node else { return 0 };
        let is_leaf = self.arena.with(id, |n| match n {
            Node::Leaf(b) => Some(b.len()),
            Node::Internal { .. } => None,
        });
        match is_leaf {
            Some(Some(n)) => n,
            _ => {
                let children = self
                    .arena
                    .with(id, |n| match n {
                        Node::Internal { children, .. } => children.clone(),
                        Node::Leaf(_) => unreachable!(),
                    })
                    .unwrap();
                children.iter().map(|c| self.count_entries(*c)).sum()
            }
        }
    }

    fn collect_all(&self, node: Option<NodeId>, out: &mut Vec<Value<T, M>>) {
        let Some(id) = node else { return };
        let leaf = self.arena.with(id, |n| match n {
            Node::Leaf(b) => Some(b.clone()),
            Node::Internal { .. } => None,
        });
        match leaf {
            Some(Some(mut b)) => out.append(&mut b),
            _ => {
                let children = self
                    .arena
                    .with(id, |n| match n {
                        Node::Internal { children, .. } => children.clone(),
                        Node::Leaf(_) => unreachable!(),
                    })
                    .unwrap();
                for c in children {
                    self.collect_all(c, out);
                }
            }
        }
    }

    fn dealloc_subtree(&self, node: Option<NodeId>) {
        let Some(id) = node else { return };
        let children = self.arena.with(id, |n| match n {
            Node::Internal { children, .. } => Some(children.clone()),
            Node::Leaf(_) => None,
        });
        if let Some(Some(children)) = children {
            for c in children {
                self.dealloc_subtree(c);
            }
        }
        self.arena.dealloc(id);
    }

    fn collect_matching(
        &self,
        node: Option<NodeId>,
        bounds: Bbox<T>,
        predicates: &PredicateList<T, M>,
        out: &mut Vec<Value<T, M>>,
    ) {
        let Some(id) = node else { return };
        if !predicates.might_pass(&bounds) {
            return;
        }
        let leaf = self.arena.with(id, |n| match n {
            Node::Leaf(b) => Some(b.clone()),
            Node::Internal { .. } => None,
        });
        match leaf {
            Some(Some(bucket)) => {
                out.extend(bucket.into_iter().filter(|v| predicates.pass(v)));
            }
            _ => {
                let (pivot, children) = self
                    .arena
                    .with(id, |n| match n {
                        Node::Internal { pivot, children } => (pivot.clone(), children.clone()),
                        Node::Leaf(_) => unreachable!(),
                    })
                    .unwrap();
                for (quad, child) in children.into_iter().enumerate() {
                    let child_box = self.child_box(&bounds, &pivot, quad);
                    self.collect_matching(child, child_box, predicates, out);
                }
            }
        }
    }

    fn nearest(&self, reference: &NearestRef<T>, k: usize) -> Vec<Value<T, M>> {
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
                other.dist.partial_cmp(&self.dist).unwrap_or(Ordering::Equal)
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

        let mut results = Vec::with_capacity(k);
        while let Some(item) = heap.pop() {
            if results.len() >= k {
                break;
            }
            if let Some(v) = item.leaf_value {
                results.push(v);
                continue;
            }
            let Some(id) = item.node else { continue };
            let leaf = self.arena.with(id, |n| match n {
                Node::Leaf(b) => Some(b.clone()),
                Node::Internal { .. } => None,
            });
            match leaf {
                Some(Some(bucket)) => {
                    for v in bucket {
                        let dist = reference.distance_to_point(&v.key);
                        heap.push(QueueItem {
                            dist,
                            node: None,
                            bounds: item.bounds.clone(),
                            leaf_value: Some(v),
                        });
                    }
                }
                _ => {
                    let (pivot, children) = self
                        .arena
                        .with(id, |n| match n {
                            Node::Internal { pivot, children } => (pivot.clone(), children.clone()),
                            Node::Leaf(_) => unreachable!(),
                        })
                        .unwrap();
                    for (quad, child) in children.into_iter().enumerate() {
                        if let Some(c) = child {
                            let child_box = self.child_box(&item.bounds, &pivot, quad);
                            heap.push(QueueItem {
                                dist: reference.distance_to_box(&child_box),
                                node: Some(c),
                                bounds: child_box,
                                leaf_value: None,
                            });
                        }
                    }
                }
            }
        }
        results
    }
}

impl<T: Coordinate, M: Clone> Clone for QuadTree<T, M> {
    fn clone(&self) -> Self {
        let mut fresh = QuadTree::new(self.dim);
        for v in self.iter() {
            let _ = fresh.insert(v.clone());
        }
        fresh
    }
}

impl<T: Coordinate, M: Clone + PartialEq> SpatialIndex<T, M> for QuadTree<T, M> {
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
        let (new_root, inserted) = self.insert_rec(self.root, value.clone())?;
        self.root = new_root;
        if inserted {
            self.len += 1;
            self.entries.push(value);
        }
        Ok(inserted)
    }

    fn erase_key(&mut self, key: &Point<T>) -> usize {
        let (new_root, removed) = self.erase_rec(self.root, key);
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
    fn insert_below_bucket_size_stays_a_single_leaf() {
        let mut tree: QuadTree<f64, i32> = QuadTree::new(2);
        for i in 0..4 {
            tree.insert(Value::new(pt(vec![i as f64, i as f64]), 0)).unwrap();
        }
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn insert_rejects_duplicate_key() {
        let mut tree: QuadTree<f64, i32> = QuadTree::new(2);
        assert!(tree.insert(Value::new(pt(vec![1.0, 1.0]), 1)).unwrap());
        assert!(!tree.insert(Value::new(pt(vec![1.0, 1.0]), 2)).unwrap());
    }

    #[test]
    fn promotes_past_bucket_size_and_still_finds_everything() {
        let mut tree: QuadTree<f64, i32> = QuadTree::new(2);
        for i in 0..40 {
            let x = (i % 7) as f64;
            let y = (i / 7) as f64;
            tree.insert(Value::new(pt(vec![x, y]), i)).unwrap();
        }
        assert_eq!(tree.len(), 40);
        for i in 0..40 {
            let x = (i % 7) as f64;
            let y = (i / 7) as f64;
            assert!(tree.find(&pt(vec![x, y])).is_some());
        }
    }

    #[test]
    fn erase_coalesces_back_into_a_leaf() {
        let mut tree: QuadTree<f64, i32> = QuadTree::new(2);
        for i in 0..40 {
            let x = (i % 7) as f64;
            let y = (i / 7) as f64;
            tree.insert(Value::new(pt(vec![x, y]), i)).unwrap();
        }
        for i in 0..35 {
            let x = (i % 7) as f64;
            let y = (i / 7) as f64;
            tree.erase_key(&pt(vec![x, y]));
        }
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.iter().count(), 5);
    }

    #[test]
    fn query_matches_full_scan_semantics() {
        let mut tree: QuadTree<f64, i32> = QuadTree::new(2);
        let pts = [(0.1, 0.1), (0.9, 0.9), (0.4, 0.4), (0.2, 0.8)];
        for (x, y) in pts {
            tree.insert(Value::new(pt(vec![x, y]), 0)).unwrap();
        }
        let results = tree.begin_intersection(&Bbox::new(pt(vec![0.0, 0.0]), pt(vec![0.5, 0.5])));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn nearest_k_is_distance_ordered() {
        let mut tree: QuadTree<f64, i32> = QuadTree::new(2);
        for (x, y) in [(5.0, 5.0), (1.0, 1.0), (3.0, 3.0), (0.5, 0.5)] {
            tree.insert(Value::new(pt(vec![x, y]), 0)).unwrap();
        }
        let reference = NearestRef::Point(pt(vec![0.0, 0.0]));
        let results = tree.nearest(&reference, 3);
        assert_eq!(results.len(), 3);
        for w in results.windows(2) {
            assert!(pt(vec![0.0, 0.0]).distance(&w[0].key) <= pt(vec![0.0, 0.0]).distance(&w[1].key));
        }
    }
}
