//! R-tree: height-balanced `M`-ary tree of minimum bounding rectangles,
//! using Guttman's original quadratic-cost node split.
//!
//! Deletion collects every value orphaned by an underflowing node (below
//! `MIN_ENTRIES`) and reinserts them one at a time through the normal
//! insert path, rather than Guttman's original "reinsert orphaned subtrees
//! at the level they were removed from" — simpler, always correct, and the
//! resulting tree shape differs only in balance, not membership. See
//! `DESIGN.md`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::arena::{ArenaKind, NodeArena, NodeId};
use crate::bbox::Bbox;
use crate::error::PointError;
use crate::point::{Coordinate, Point};
use crate::predicate::{NearestRef, Predicate, PredicateList};
use crate::value::Value;

use super::{EntryIter, SpatialIndex};

pub(crate) const MAX_ENTRIES: usize = 8;
pub(crate) const MIN_ENTRIES: usize = MAX_ENTRIES / 2;

pub(crate) enum Node<T: Coordinate, M> {
    Leaf(Vec<Value<T, M>>),
    Internal(Vec<(Bbox<T>, NodeId)>),
}

pub(crate) fn mbr_of_values<T: Coordinate, M>(values: &[Value<T, M>]) -> Bbox<T> {
    let mut iter = values.iter();
    let first = iter.next().expect("mbr_of_values called on empty slice");
    let mut acc = Bbox::around_point(&first.key);
    for v in iter {
        acc = acc.combine(&Bbox::around_point(&v.key));
    }
    acc
}

pub(crate) fn mbr_of_children<T: Coordinate>(children: &[(Bbox<T>, NodeId)]) -> Bbox<T> {
    let mut iter = children.iter();
    let (first, _) = iter.next().expect("mbr_of_children called on empty slice");
    let mut acc = first.clone();
    for (b, _) in iter {
        acc = acc.combine(b);
    }
    acc
}

/// Guttman's PickSeeds: the pair whose combined box wastes the most area.
fn pick_seeds<T: Coordinate>(boxes: &[Bbox<T>]) -> (usize, usize) {
    let mut best = (0, 1);
    let mut best_waste = f64::NEG_INFINITY;
    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            let combined = boxes[i].combine(&boxes[j]);
            let waste = combined.volume() - boxes[i].volume() - boxes[j].volume();
            if waste > best_waste {
                best_waste = waste;
                best = (i, j);
            }
        }
    }
    best
}

/// Quadratic split over leaf entries.
pub(crate) fn quadratic_split_values<T: Coordinate, M>(
    mut items: Vec<Value<T, M>>,
) -> (Vec<Value<T, M>>, Vec<Value<T, M>>) {
    let boxes: Vec<Bbox<T>> = items.iter().map(|v| Bbox::around_point(&v.key)).collect();
    let (seed_a, seed_b) = pick_seeds(&boxes);
    let mut group_a_box = boxes[seed_a].clone();
    let mut group_b_box = boxes[seed_b].clone();
    let item_b = items.remove(seed_b.max(seed_a));
    let item_a = items.remove(seed_a.min(seed_b));
    let mut group_a = vec![item_a];
    let mut group_b = vec![item_b];
    let mut remaining: Vec<Value<T, M>> = items;

    while !remaining.is_empty() {
        let total_placed = group_a.len() + group_b.len();
        if group_a.len() + remaining.len() == MIN_ENTRIES.max(1) && total_placed < MIN_ENTRIES {
            group_a.extend(remaining.drain(..));
            break;
        }
        if group_b.len() + remaining.len() == MIN_ENTRIES.max(1) && total_placed < MIN_ENTRIES {
            group_b.extend(remaining.drain(..));
            break;
        }
        let mut best_idx = 0;
        let mut best_pref = f64::NEG_INFINITY;
        let mut best_d1 = 0.0;
        let mut best_d2 = 0.0;
        for (idx, v) in remaining.iter().enumerate() {
            let b = Bbox::around_point(&v.key);
            let d1 = group_a_box.combine(&b).volume() - group_a_box.volume();
            let d2 = group_b_box.combine(&b).volume() - group_b_box.volume();
            let pref = (d1 - d2).abs();
            if pref > best_pref {
                best_pref = pref;
                best_idx = idx;
                best_d1 = d1;
                best_d2 = d2;
            }
        }
        let v = remaining.remove(best_idx);
        let b = Bbox::around_point(&v.key);
        let goes_a = match best_d1.partial_cmp(&best_d2).unwrap_or(Ordering::Equal) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => group_a_box.volume() <= group_b_box.volume(),
        };
        if goes_a {
            group_a_box = group_a_box.combine(&b);
            group_a.push(v);
        } else {
            group_b_box = group_b_box.combine(&b);
            group_b.push(v);
        }
    }
    (group_a, group_b)
}

/// Quadratic split over internal child entries (same algorithm, different
/// item/box extraction).
pub(crate) fn quadratic_split_children<T: Coordinate>(
    mut items: Vec<(Bbox<T>, NodeId)>,
) -> (Vec<(Bbox<T>, NodeId)>, Vec<(Bbox<T>, NodeId)>) {
    let boxes: Vec<Bbox<T>> = items.iter().map(|(b, _)| b.clone()).collect();
    let (seed_a, seed_b) = pick_seeds(&boxes);
    let mut group_a_box = boxes[seed_a].clone();
    let mut group_b_box = boxes[seed_b].clone();
    let item_b = items.remove(seed_b.max(seed_a));
    let item_a = items.remove(seed_a.min(seed_b));
    let mut group_a = vec![item_a];
    let mut group_b = vec![item_b];
    let mut remaining: Vec<(Bbox<T>, NodeId)> = items;

    while !remaining.is_empty() {
        let total_placed = group_a.len() + group_b.len();
        if group_a.len() + remaining.len() == MIN_ENTRIES.max(1) && total_placed < MIN_ENTRIES {
            group_a.extend(remaining.drain(..));
            break;
        }
        if group_b.len() + remaining.len() == MIN_ENTRIES.max(1) && total_placed < MIN_ENTRIES {
            group_b.extend(remaining.drain(..));
            break;
        }
        let mut best_idx = 0;
        let mut best_pref = f64::NEG_INFINITY;
        let mut best_d1 = 0.0;
        let mut best_d2 = 0.0;
        for (idx, (b, _)) in remaining.iter().enumerate() {
            let d1 = group_a_box.combine(b).volume() - group_a_box.volume();
            let d2 = group_b_box.combine(b).volume() - group_b_box.volume();
            let pref = (d1 - d2).abs();
            if pref > best_pref {
                best_pref = pref;
                best_idx = idx;
                best_d1 = d1;
                best_d2 = d2;
            }
        }
        let (b, id) = remaining.remove(best_idx);
        let goes_a = match best_d1.partial_cmp(&best_d2).unwrap_or(Ordering::Equal) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => group_a_box.volume() <= group_b_box.volume(),
        };
        if goes_a {
            group_a_box = group_a_box.combine(&b);
            group_a.push((b, id));
        } else {
            group_b_box = group_b_box.combine(&b);
            group_b.push((b, id));
        }
    }
    (group_a, group_b)
}

/// Result of inserting into a subtree: either the subtree's identity is
/// unchanged (its MBR may have grown) or it split into two siblings.
pub(crate) enum InsertOutcome<T: Coordinate> {
    Unchanged(NodeId, Bbox<T>),
    Split((NodeId, Bbox<T>), (NodeId, Bbox<T>)),
}

pub struct RTree<T: Coordinate, M> {
    dim: usize,
    root: Option<NodeId>,
    arena: NodeArena<Node<T, M>>,
    len: usize,
    entries: Vec<Value<T, M>>,
}

impl<T: Coordinate, M: Clone> RTree<T, M> {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            root: None,
            arena: NodeArena::new(ArenaKind::Interleaved, 64),
            len: 0,
            entries: Vec::new(),
        }
    }

    fn node_mbr(&self, id: NodeId) -> Bbox<T> {
        self.arena
            .with(id, |n| match n {
                Node::Leaf(values) => mbr_of_values(values),
                Node::Internal(children) => mbr_of_children(children),
            })
            .expect("node id must be live")
    }

    /// Guttman's ChooseSubtree: least-enlargement child, ties broken by
    /// smaller resulting area.
    fn choose_child(children: &[(Bbox<T>, NodeId)], key_box: &Bbox<T>) -> usize {
        let mut best = 0;
        let mut best_enlargement = f64::INFINITY;
        let mut best_area = f64::INFINITY;
        for (i, (mbr, _)) in children.iter().enumerate() {
            let combined = mbr.combine(key_box);
            let enlargement = combined.volume() - mbr.volume();
            if enlargement < best_enlargement
                || (enlargement == best_enlargement && combined.volume() < best_area)
            {
                best = i;
                best_enlargement = enlargement;
                best_area = combined.volume();
            }
        }
        best
    }

    fn insert_rec(
        &self,
        node: NodeId,
        value: Value<T, M>,
    ) -> Result<(InsertOutcome<T>, bool), PointError> {
        let is_leaf = self
            .arena
            .with(node, |n| matches!(n, Node::Leaf(_)))
            .unwrap_or(false);
        if is_leaf {
            let duplicate = self
                .arena
                .with(node, |n| match n {
                    Node::Leaf(values) => values.iter().any(|v| v.key == value.key),
                    Node::Internal(_) => false,
                })
                .unwrap_or(false);
            if duplicate {
                let mbr = self.node_mbr(node);
                return Ok((InsertOutcome::Unchanged(node, mbr), false));
            }
            self.arena.with_mut(node, |n| {
                if let Node::Leaf(values) = n {
                    values.push(value);
                }
            });
            let len = self.arena.with(node, |n| match n {
                Node::Leaf(v) => v.len(),
                Node::Internal(_) => 0,
            }).unwrap_or(0);
            if len <= MAX_ENTRIES {
                let mbr = self.node_mbr(node);
                return Ok((InsertOutcome::Unchanged(node, mbr), true));
            }
            let values = self
                .arena
                .dealloc(node)
                .map(|n| match n {
                    Node::Leaf(v) => v,
                    Node::Internal(_) => unreachable!(),
                })
                .unwrap();
            let (group_a, group_b) = quadratic_split_values(values);
            log::trace!(
                "rtree: leaf overflow past {MAX_ENTRIES} entries, quadratic split into {} / {} values",
                group_a.len(),
                group_b.len()
            );
            let mbr_a = mbr_of_values(&group_a);
            let mbr_b = mbr_of_values(&group_b);
            let id_a = self.arena.alloc(Node::Leaf(group_a))?;
            let id_b = self.arena.alloc(Node::Leaf(group_b))?;
            return Ok((InsertOutcome::Split((id_a, mbr_a), (id_b, mbr_b)), true));
        }

        let key_box = Bbox::around_point(&value.key);
        let children = self
            .arena
            .with(node, |n| match n {
                Node::Internal(c) => c.clone(),
                Node::Leaf(_) => unreachable!(),
            })
            .unwrap();
        let idx = Self::choose_child(&children, &key_box);
        let (_, child_id) = children[idx];
        let (outcome, inserted) = self.insert_rec(child_id, value)?;
        let mut new_children = children;
        match outcome {
            InsertOutcome::Unchanged(id, mbr) => {
                new_children[idx] = (mbr, id);
                self.arena.with_mut(node, |n| {
                    if let Node::Internal(c) = n {
                        *c = new_children.clone();
                    }
                });
                let mbr = mbr_of_children(&new_children);
                Ok((InsertOutcome::Unchanged(node, mbr), inserted))
            }
            InsertOutcome::Split(a, b) => {
                new_children[idx] = a;
                new_children.push(b);
                if new_children.len() <= MAX_ENTRIES {
                    self.arena.with_mut(node, |n| {
                        if let Node::Internal(c) = n {
                            *c = new_children.clone();
                        }
                    });
                    let mbr = mbr_of_children(&new_children);
                    Ok((InsertOutcome::Unchanged(node, mbr), inserted))
                } else {
                    self.arena.dealloc(node);
                    let (group_a, group_b) = quadratic_split_children(new_children);
                    log::trace!(
                        "rtree: internal node overflow past {MAX_ENTRIES} children, quadratic split into {} / {} children",
                        group_a.len(),
                        group_b.len()
                    );
                    let mbr_a = mbr_of_children(&group_a);
                    let mbr_b = mbr_of_children(&group_b);
                    let id_a = self.arena.alloc(Node::Internal(group_a))?;
                    let id_b = self.arena.alloc(Node::Internal(group_b))?;
                    Ok((InsertOutcome::Split((id_a, mbr_a), (id_b, mbr_b)), inserted))
                }
            }
        }
    }

    /// Returns `(surviving node with its mbr, or None if dissolved;
    /// removed count; values orphaned by underflow elsewhere in the
    /// subtree, to be reinserted from the root)`.
    fn erase_rec(
        &self,
        node: NodeId,
        key: &Point<T>,
        is_root: bool,
    ) -> (Option<(NodeId, Bbox<T>)>, usize, Vec<Value<T, M>>) {
        let is_leaf = self
            .arena
            .with(node, |n| matches!(n, Node::Leaf(_)))
            .unwrap_or(false);
        if is_leaf {
            let had_match = self
                .arena
                .with(node, |n| match n {
                    Node::Leaf(values) => values.iter().any(|v| &v.key == key),
                    Node::Internal(_) => false,
                })
                .unwrap_or(false);
            if !had_match {
                let mbr = self.node_mbr(node);
                return (Some((node, mbr)), 0, Vec::new());
            }
            let remaining = self
                .arena
                .with_mut(node, |n| match n {
                    Node::Leaf(values) => {
                        values.retain(|v| &v.key != key);
                        values.clone()
                    }
                    Node::Internal(_) => unreachable!(),
                })
                .unwrap();
            if remaining.is_empty() {
                self.arena.dealloc(node);
                return (None, 1, Vec::new());
            }
            if remaining.len() >= MIN_ENTRIES || is_root {
                let mbr = mbr_of_values(&remaining);
                return (Some((node, mbr)), 1, Vec::new());
            }
            self.arena.dealloc(node);
            (None, 1, remaining)
        } else {
            let children = self
                .arena
                .with(node, |n| match n {
                    Node::Internal(c) => c.clone(),
                    Node::Leaf(_) => unreachable!(),
                })
                .unwrap();
            let mut new_children = Vec::with_capacity(children.len());
            let mut removed_total = 0;
            let mut orphans_total = Vec::new();
            let mut resolved = false;
            for (mbr, child_id) in children {
                if resolved || !mbr.contains_point(key) {
                    new_children.push((mbr, child_id));
                    continue;
                }
                let (result, removed, orphans) = self.erase_rec(child_id, key, false);
                if removed > 0 {
                    resolved = true;
                    removed_total = removed;
                    orphans_total = orphans;
                    if let Some((id, mbr)) = result {
                        new_children.push((mbr, id));
                    }
                } else {
                    new_children.push((mbr, child_id));
                }
            }
            if removed_total == 0 {
                let mbr = self.node_mbr(node);
                return (Some((node, mbr)), 0, Vec::new());
            }
            if new_children.is_empty() {
                self.arena.dealloc(node);
                return (None, removed_total, orphans_total);
            }
            if new_children.len() < MIN_ENTRIES && !is_root {
                self.arena.dealloc(node);
                let mut flattened = orphans_total;
                for (_, child_id) in &new_children {
                    self.collect_leaf_values(*child_id, &mut flattened);
                    self.dealloc_subtree(*child_id);
                }
                return (None, removed_total, flattened);
            }
            self.arena.with_mut(node, |n| {
                if let Node::Internal(c) = n {
                    *c = new_children.clone();
                }
            });
            let mbr = mbr_of_children(&new_children);
            (Some((node, mbr)), removed_total, orphans_total)
        }
    }

    fn collect_leaf_values(&self, node: NodeId, out: &mut Vec<Value<T, M>>) {
        let leaf = self.arena.with(node, |n| match n {
            Node::Leaf(v) => Some(v.clone()),
            Node::Internal(_) => None,
        });
        match leaf {
            Some(Some(values)) => out.extend(values),
            _ => {
                let children = self
                    .arena
                    .with(node, |n| match n {
                        Node::Internal(c) => c.clone(),
                        Node::Leaf(_) => unreachable!(),
                    })
                    .unwrap();
                for (_, child) in children {
                    self.collect_leaf_values(child, out);
                }
            }
        }
    }

    fn dealloc_subtree(&self, node: NodeId) {
        let children = self.arena.with(node, |n| match n {
            Node::Internal(c) => Some(c.clone()),
            Node::Leaf(_) => None,
        });
        if let Some(Some(children)) = children {
            for (_, c) in children {
                self.dealloc_subtree(c);
            }
        }
        self.arena.dealloc(node);
    }

    fn collect_matching(
        &self,
        node: Option<NodeId>,
        predicates: &PredicateList<T, M>,
        out: &mut Vec<Value<T, M>>,
    ) {
        let Some(id) = node else { return };
        let mbr = self.node_mbr(id);
        if !predicates.might_pass(&mbr) {
            return;
        }
        let leaf = self.arena.with(id, |n| match n {
            Node::Leaf(v) => Some(v.clone()),
            Node::Internal(_) => None,
        });
        match leaf {
            Some(Some(values)) => out.extend(values.into_iter().filter(|v| predicates.pass(v))),
            _ => {
                let children = self
                    .arena
                    .with(id, |n| match n {
                        Node::Internal(c) => c.clone(),
                        Node::Leaf(_) => unreachable!(),
                    })
                    .unwrap();
                for (child_mbr, child_id) in children {
                    if predicates.might_pass(&child_mbr) {
                        self.collect_matching(Some(child_id), predicates, out);
                    }
                }
            }
        }
    }

    fn nearest(&self, reference: &NearestRef<T>, k: usize) -> Vec<Value<T, M>> {
        struct QueueItem<T: Coordinate, M> {
            dist: f64,
            node: Option<NodeId>,
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
            let mbr = self.node_mbr(root);
            heap.push(QueueItem {
                dist: reference.distance_to_box(&mbr),
                node: Some(root),
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
                Node::Leaf(v) => Some(v.clone()),
                Node::Internal(_) => None,
            });
            match leaf {
                Some(Some(values)) => {
                    for v in values {
                        let dist = reference.distance_to_point(&v.key);
                        heap.push(QueueItem {
                            dist,
                            node: None,
                            leaf_value: Some(v),
                        });
                    }
                }
                _ => {
                    let children = self
                        .arena
                        .with(id, |n| match n {
                            Node::Internal(c) => c.clone(),
                            Node::Leaf(_) => unreachable!(),
                        })
                        .unwrap();
                    for (mbr, child_id) in children {
                        heap.push(QueueItem {
                            dist: reference.distance_to_box(&mbr),
                            node: Some(child_id),
                            leaf_value: None,
                        });
                    }
                }
            }
        }
        results
    }

    /// Inserts into the tree structure only, without touching `len` or the
    /// `entries` cache. Used both by the public `insert` (which layers the
    /// bookkeeping on top) and by deletion's orphan reinsertion, where the
    /// value is already accounted for in `len`/`entries` and must not be
    /// counted twice.
    fn insert_into_tree(&mut self, value: Value<T, M>) -> Result<bool, PointError> {
        match self.root {
            None => {
                let id = self.arena.alloc(Node::Leaf(vec![value]))?;
                self.root = Some(id);
                Ok(true)
            }
            Some(root) => {
                let (outcome, inserted) = self.insert_rec(root, value)?;
                match outcome {
                    InsertOutcome::Unchanged(id, _) => self.root = Some(id),
                    InsertOutcome::Split(a, b) => {
                        let new_root = self.arena.alloc(Node::Internal(vec![a, b]))?;
                        self.root = Some(new_root);
                    }
                }
                Ok(inserted)
            }
        }
    }
}

impl<T: Coordinate, M: Clone> Clone for RTree<T, M> {
    fn clone(&self) -> Self {
        let mut fresh = RTree::new(self.dim);
        for v in self.iter() {
            let _ = fresh.insert(v.clone());
        }
        fresh
    }
}

impl<T: Coordinate, M: Clone + PartialEq> SpatialIndex<T, M> for RTree<T, M> {
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
        let inserted = self.insert_into_tree(value.clone())?;
        if inserted {
            self.len += 1;
            self.entries.push(value);
        }
        Ok(inserted)
    }

    fn erase_key(&mut self, key: &Point<T>) -> usize {
        let Some(root) = self.root else { return 0 };
        let (result, removed, orphans) = self.erase_rec(root, key, true);
        self.root = result.map(|(id, _)| id);
        self.len -= removed;

        // Collapse chains of single-child internal roots.
        while let Some(id) = self.root {
            let single_child = self.arena.with(id, |n| match n {
                Node::Internal(c) if c.len() == 1 => Some(c[0].1),
                _ => None,
            });
            match single_child {
                Some(Some(only)) => {
                    self.arena.dealloc(id);
                    self.root = Some(only);
                }
                _ => break,
            }
        }

        if removed > 0 {
            let mut i = 0;
            while i < self.entries.len() {
                if &self.entries[i].key == key {
                    self.entries.swap_remove(i);
                } else {
                    i += 1;
                }
            }
        }

        for orphan in orphans {
            let _ = self.insert_into_tree(orphan);
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
                self.collect_matching(self.root, predicates, &mut out);
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
    fn insert_rejects_duplicate_key() {
        let mut tree: RTree<f64, i32> = RTree::new(2);
        assert!(tree.insert(Value::new(pt(vec![1.0, 1.0]), 1)).unwrap());
        assert!(!tree.insert(Value::new(pt(vec![1.0, 1.0]), 2)).unwrap());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn insert_past_max_entries_splits_and_preserves_membership() {
        let mut tree: RTree<f64, i32> = RTree::new(2);
        for i in 0..50 {
            let x = (i % 10) as f64;
            let y = (i / 10) as f64;
            tree.insert(Value::new(pt(vec![x, y]), i)).unwrap();
        }
        assert_eq!(tree.len(), 50);
        for i in 0..50 {
            let x = (i % 10) as f64;
            let y = (i / 10) as f64;
            assert!(tree.find(&pt(vec![x, y])).is_some());
        }
    }

    #[test]
    fn erase_then_reinsert_orphans_preserves_remaining_membership() {
        let mut tree: RTree<f64, i32> = RTree::new(2);
        for i in 0..60 {
            let x = (i % 10) as f64;
            let y = (i / 10) as f64;
            tree.insert(Value::new(pt(vec![x, y]), i)).unwrap();
        }
        for i in 0..40 {
            let x = (i % 10) as f64;
            let y = (i / 10) as f64;
            assert_eq!(tree.erase_key(&pt(vec![x, y])), 1);
        }
        assert_eq!(tree.len(), 20);
        for i in 40..60 {
            let x = (i % 10) as f64;
            let y = (i / 10) as f64;
            assert!(tree.find(&pt(vec![x, y])).is_some());
        }
    }

    #[test]
    fn query_matches_full_scan_semantics() {
        let mut tree: RTree<f64, i32> = RTree::new(2);
        let pts = [(0.1, 0.1), (0.9, 0.9), (0.4, 0.4), (0.2, 0.8)];
        for (x, y) in pts {
            tree.insert(Value::new(pt(vec![x, y]), 0)).unwrap();
        }
        let results = tree.begin_intersection(&Bbox::new(pt(vec![0.0, 0.0]), pt(vec![0.5, 0.5])));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn nearest_k_is_distance_ordered() {
        let mut tree: RTree<f64, i32> = RTree::new(2);
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
