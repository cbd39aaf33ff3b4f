//! R*-tree: Beckmann et al.'s refinement of the R-tree — overlap-aware
//! `ChooseSubtree` near the leaves, a margin/overlap-minimizing split, and a
//! forced-reinsertion pass that absorbs the first overflow an insert causes
//! before ever splitting.
//!
//! Shares `rtree`'s node representation, MBR helpers, and entry bounds
//! (`MAX_ENTRIES`/`MIN_ENTRIES`) — the two backends differ in insertion and
//! split policy, not in node shape.
//!
//! Simplification versus the original paper: forced reinsertion fires at
//! most once per top-level `insert` call (the paper fires it once per tree
//! *level* per insert). A single flag is far simpler to thread through the
//! recursion and still eliminates the large majority of avoidable splits —
//! see `DESIGN.md`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::arena::{ArenaKind, NodeArena, NodeId};
use crate::bbox::Bbox;
use crate::error::PointError;
use crate::point::{Coordinate, Point};
use crate::predicate::{NearestRef, Predicate, PredicateList};
use crate::value::Value;

use super::rtree::{mbr_of_children, mbr_of_values, Node, MAX_ENTRIES, MIN_ENTRIES};
use super::{EntryIter, SpatialIndex};

fn margin<T: Coordinate>(b: &Bbox<T>) -> f64 {
    let mut m = 0.0;
    for i in 0..b.dimensions() {
        m += b.max().get(i).to_f64() - b.min().get(i).to_f64();
    }
    m
}

fn combine_all<T: Coordinate, X>(items: &[(Bbox<T>, X)]) -> Bbox<T> {
    let mut iter = items.iter();
    let mut acc = iter.next().expect("combine_all called on empty slice").0.clone();
    for (b, _) in iter {
        acc = acc.combine(b);
    }
    acc
}

/// R*-tree's split: choose the axis minimizing the summed margin of every
/// valid distribution, then within that axis the distribution minimizing
/// overlap (ties broken by summed area).
fn rstar_split<T: Coordinate, X: Clone>(
    items: Vec<(Bbox<T>, X)>,
) -> (Vec<(Bbox<T>, X)>, Vec<(Bbox<T>, X)>) {
    let dim = items[0].0.dimensions();
    let n = items.len();
    let m = MIN_ENTRIES.min(n / 2).max(1);

    let mut best_axis = 0;
    let mut best_axis_margin_sum = f64::INFINITY;
    for axis in 0..dim {
        let mut margin_sum = 0.0;
        for by_upper in [false, true] {
            let mut sorted = items.clone();
            if by_upper {
                sorted.sort_by(|a, b| {
                    a.0.max()
                        .get(axis)
                        .partial_cmp(&b.0.max().get(axis))
                        .unwrap_or(Ordering::Equal)
                });
            } else {
                sorted.sort_by(|a, b| {
                    a.0.min()
                        .get(axis)
                        .partial_cmp(&b.0.min().get(axis))
                        .unwrap_or(Ordering::Equal)
                });
            }
            for k in m..=(n - m) {
                let (first, rest) = sorted.split_at(k);
                margin_sum += margin(&combine_all(first)) + margin(&combine_all(rest));
            }
        }
        if margin_sum < best_axis_margin_sum {
            best_axis_margin_sum = margin_sum;
            best_axis = axis;
        }
    }

    let mut best_group: Option<(Vec<(Bbox<T>, X)>, Vec<(Bbox<T>, X)>)> = None;
    let mut best_overlap = f64::INFINITY;
    let mut best_area = f64::INFINITY;
    for by_upper in [false, true] {
        let mut sorted = items.clone();
        if by_upper {
            sorted.sort_by(|a, b| {
                a.0.max()
                    .get(best_axis)
                    .partial_cmp(&b.0.max().get(best_axis))
                    .unwrap_or(Ordering::Equal)
            });
        } else {
            sorted.sort_by(|a, b| {
                a.0.min()
                    .get(best_axis)
                    .partial_cmp(&b.0.min().get(best_axis))
                    .unwrap_or(Ordering::Equal)
            });
        }
        for k in m..=(n - m) {
            let (first, rest) = sorted.split_at(k);
            let box1 = combine_all(first);
            let box2 = combine_all(rest);
            let overlap = box1.overlap_area(&box2);
            let area = box1.volume() + box2.volume();
            if overlap < best_overlap || (overlap == best_overlap && area < best_area) {
                best_overlap = overlap;
                best_area = area;
                best_group = Some((first.to_vec(), rest.to_vec()));
            }
        }
    }
    best_group.expect("at least one distribution exists when n >= 2*m")
}

fn rstar_split_values<T: Coordinate, M>(
    values: Vec<Value<T, M>>,
) -> (Vec<Value<T, M>>, Vec<Value<T, M>>) {
    let tagged: Vec<(Bbox<T>, Value<T, M>)> = values
        .into_iter()
        .map(|v| (Bbox::around_point(&v.key), v))
        .collect();
    let (a, b) = rstar_split(tagged);
    (
        a.into_iter().map(|(_, v)| v).collect(),
        b.into_iter().map(|(_, v)| v).collect(),
    )
}

pub(crate) enum InsertOutcome<T: Coordinate, M> {
    Unchanged(NodeId, Bbox<T>),
    Split((NodeId, Bbox<T>), (NodeId, Bbox<T>)),
    /// The node's identity is unchanged but it shed entries that must be
    /// reinserted from the root (forced reinsertion).
    Reinsert(NodeId, Bbox<T>, Vec<Value<T, M>>),
}

pub struct RStarTree<T: Coordinate, M> {
    dim: usize,
    root: Option<NodeId>,
    arena: NodeArena<Node<T, M>>,
    len: usize,
    entries: Vec<Value<T, M>>,
}

impl<T: Coordinate, M: Clone> RStarTree<T, M> {
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

    fn is_leaf(&self, id: NodeId) -> bool {
        self.arena.with(id, |n| matches!(n, Node::Leaf(_))).unwrap_or(false)
    }

    /// R*'s `ChooseSubtree`: when every child is a leaf, pick the child
    /// whose overlap with its siblings grows least (ties by area
    /// enlargement, then area); otherwise fall back to Guttman's
    /// least-enlargement rule, which is far cheaper and nearly as good away
    /// from the leaf level.
    fn choose_child(&self, children: &[(Bbox<T>, NodeId)], key_box: &Bbox<T>) -> usize {
        let children_are_leaves = children
            .first()
            .map(|(_, id)| self.is_leaf(*id))
            .unwrap_or(false);

        if children_are_leaves {
            let mut best = 0;
            let mut best_overlap_enlargement = f64::INFINITY;
            let mut best_area_enlargement = f64::INFINITY;
            let mut best_area = f64::INFINITY;
            for (i, (mbr, _)) in children.iter().enumerate() {
                let combined = mbr.combine(key_box);
                let overlap_before: f64 = children
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, (other, _))| mbr.overlap_area(other))
                    .sum();
                let overlap_after: f64 = children
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, (other, _))| combined.overlap_area(other))
                    .sum();
                let overlap_enlargement = overlap_after - overlap_before;
                let area_enlargement = combined.volume() - mbr.volume();
                if overlap_enlargement < best_overlap_enlargement
                    || (overlap_enlargement == best_overlap_enlargement
                        && area_enlargement < best_area_enlargement)
                    || (overlap_enlargement == best_overlap_enlargement
                        && area_enlargement == best_area_enlargement
                        && combined.volume() < best_area)
                {
                    best = i;
                    best_overlap_enlargement = overlap_enlargement;
                    best_area_enlargement = area_enlargement;
                    best_area = combined.volume();
                }
            }
            best
        } else {
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
    }

    fn insert_rec(
        &self,
        node: NodeId,
        value: Value<T, M>,
        reinserted: &mut bool,
    ) -> Result<(InsertOutcome<T, M>, bool), PointError> {
        if self.is_leaf(node) {
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
            let len = self
                .arena
                .with(node, |n| match n {
                    Node::Leaf(v) => v.len(),
                    Node::Internal(_) => 0,
                })
                .unwrap_or(0);
            if len <= MAX_ENTRIES {
                let mbr = self.node_mbr(node);
                return Ok((InsertOutcome::Unchanged(node, mbr), true));
            }

            let values = self
                .arena
                .with(node, |n| match n {
                    Node::Leaf(v) => v.clone(),
                    Node::Internal(_) => unreachable!(),
                })
                .unwrap();

            if !*reinserted {
                *reinserted = true;
                let centroid = mbr_of_values(&values).center();
                let mut with_dist: Vec<(f64, Value<T, M>)> = values
                    .into_iter()
                    .map(|v| (centroid.distance(&v.key), v))
                    .collect();
                with_dist.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
                let p = ((MAX_ENTRIES as f64) * 0.3).ceil().max(1.0) as usize;
                let p = p.min(with_dist.len().saturating_sub(MIN_ENTRIES).max(1));
                let orphans: Vec<Value<T, M>> =
                    with_dist.drain(..p).map(|(_, v)| v).collect();
                log::trace!(
                    "rstartree: leaf overflow past {MAX_ENTRIES} entries, forced reinsertion of {} farthest-from-centroid entries",
                    orphans.len()
                );
                let remaining: Vec<Value<T, M>> = with_dist.into_iter().map(|(_, v)| v).collect();
                let mbr = mbr_of_values(&remaining);
                self.arena.with_mut(node, |n| {
                    if let Node::Leaf(v) = n {
                        *v = remaining;
                    }
                });
                return Ok((InsertOutcome::Reinsert(node, mbr, orphans), true));
            }

            self.arena.dealloc(node);
            let (group_a, group_b) = rstar_split_values(values);
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
        let idx = self.choose_child(&children, &key_box);
        let (_, child_id) = children[idx];
        let (outcome, inserted) = self.insert_rec(child_id, value, reinserted)?;
        let mut new_children = children;
        match outcome {
            InsertOutcome::Unchanged(id, mbr) | InsertOutcome::Reinsert(id, mbr, _) => {
                new_children[idx] = (mbr, id);
                self.arena.with_mut(node, |n| {
                    if let Node::Internal(c) = n {
                        *c = new_children.clone();
                    }
                });
                let mbr = mbr_of_children(&new_children);
                let bubbled = match outcome {
                    InsertOutcome::Reinsert(_, _, orphans) => {
                        InsertOutcome::Reinsert(node, mbr, orphans)
                    }
                    _ => InsertOutcome::Unchanged(node, mbr),
                };
                Ok((bubbled, inserted))
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
                    let (group_a, group_b) = rstar_split(new_children);
                    let mbr_a = mbr_of_children(&group_a);
                    let mbr_b = mbr_of_children(&group_b);
                    let id_a = self.arena.alloc(Node::Internal(group_a))?;
                    let id_b = self.arena.alloc(Node::Internal(group_b))?;
                    Ok((InsertOutcome::Split((id_a, mbr_a), (id_b, mbr_b)), inserted))
                }
            }
        }
    }

    fn insert_into_tree(&mut self, value: Value<T, M>) -> Result<bool, PointError> {
        match self.root {
            None => {
                let id = self.arena.alloc(Node::Leaf(vec![value]))?;
                self.root = Some(id);
                Ok(true)
            }
            Some(root) => {
                let mut reinserted = false;
                let (outcome, inserted) = self.insert_rec(root, value, &mut reinserted)?;
                match outcome {
                    InsertOutcome::Unchanged(id, _) => self.root = Some(id),
                    InsertOutcome::Split(a, b) => {
                        let new_root = self.arena.alloc(Node::Internal(vec![a, b]))?;
                        self.root = Some(new_root);
                    }
                    InsertOutcome::Reinsert(id, _, orphans) => {
                        self.root = Some(id);
                        for orphan in orphans {
                            self.insert_into_tree(orphan)?;
                        }
                    }
                }
                Ok(inserted)
            }
        }
    }

    fn erase_rec(
        &self,
        node: NodeId,
        key: &Point<T>,
        is_root: bool,
    ) -> (Option<(NodeId, Bbox<T>)>, usize, Vec<Value<T, M>>) {
        if self.is_leaf(node) {
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
}

impl<T: Coordinate, M: Clone> Clone for RStarTree<T, M> {
    fn clone(&self) -> Self {
        let mut fresh = RStarTree::new(self.dim);
        for v in self.iter() {
            let _ = fresh.insert(v.clone());
        }
        fresh
    }
}

impl<T: Coordinate, M: Clone + PartialEq> SpatialIndex<T, M> for RStarTree<T, M> {
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
                            .unwrap_or(Ordering::Equal)
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
        let mut tree: RStarTree<f64, i32> = RStarTree::new(2);
        assert!(tree.insert(Value::new(pt(vec![1.0, 1.0]), 1)).unwrap());
        assert!(!tree.insert(Value::new(pt(vec![1.0, 1.0]), 2)).unwrap());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn forced_reinsertion_and_split_preserve_membership() {
        let mut tree: RStarTree<f64, i32> = RStarTree::new(2);
        for i in 0..80 {
            let x = (i % 10) as f64;
            let y = (i / 10) as f64;
            tree.insert(Value::new(pt(vec![x, y]), i)).unwrap();
        }
        assert_eq!(tree.len(), 80);
        for i in 0..80 {
            let x = (i % 10) as f64;
            let y = (i / 10) as f64;
            assert!(tree.find(&pt(vec![x, y])).is_some());
        }
    }

    #[test]
    fn erase_then_reinsert_orphans_preserves_remaining_membership() {
        let mut tree: RStarTree<f64, i32> = RStarTree::new(2);
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
        let mut tree: RStarTree<f64, i32> = RStarTree::new(2);
        let pts = [(0.1, 0.1), (0.9, 0.9), (0.4, 0.4), (0.2, 0.8)];
        for (x, y) in pts {
            tree.insert(Value::new(pt(vec![x, y]), 0)).unwrap();
        }
        let results = tree.begin_intersection(&Bbox::new(pt(vec![0.0, 0.0]), pt(vec![0.5, 0.5])));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn nearest_k_is_distance_ordered() {
        let mut tree: RStarTree<f64, i32> = RStarTree::new(2);
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
