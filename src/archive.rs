//! Archive: an ordered stack of [`crate::front::Front`]s stratified
//! by dominance rank, with a capacity cap enforced by crowding-based
//! eviction from the last rank.

use crate::bbox::Bbox;
use crate::error::PointError;
use crate::front::{Front, InsertOutcome};
use crate::index::SpatialIndex;
use crate::metrics::distribution;
use crate::point::{Coordinate, Direction, Point};
use crate::predicate::PredicateList;
use crate::value::Value;

pub struct Archive<T: Coordinate, M, I: SpatialIndex<T, M>> {
    ranks: Vec<Front<T, M, I>>,
    capacity: usize,
    direction: Vec<Direction>,
}

impl<T: Coordinate, M: Clone + PartialEq, I: SpatialIndex<T, M>> Archive<T, M, I> {
    pub fn new(dim: usize, direction: Vec<Direction>, capacity: usize) -> Self {
        debug_assert_eq!(dim, direction.len());
        Self {
            ranks: vec![Front::new(I::new(dim), direction.clone())],
            capacity,
            direction,
        }
    }

    pub fn direction(&self) -> &[Direction] {
        &self.direction
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dimensions(&self) -> usize {
        self.direction.len()
    }

    pub fn len(&self) -> usize {
        self.ranks.iter().map(|f| f.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rank_count(&self) -> usize {
        self.ranks.len()
    }

    /// The front at dominance rank `i`; rank 0 is the archive's own
    /// current Pareto frontier.
    pub fn rank(&self, i: usize) -> Option<&Front<T, M, I>> {
        self.ranks.get(i)
    }

    pub fn ranks(&self) -> &[Front<T, M, I>] {
        &self.ranks
    }

    pub fn clear(&mut self) {
        self.ranks.clear();
        self.ranks.push(Front::new(I::new(self.dimensions()), self.direction.clone()));
    }

    /// Inserts `value`, cascading it down the rank stack until it finds a
    /// front that accepts it, then cascading every front's displaced
    /// values into the next rank down. Never fails except for dimension
    /// mismatch.
    pub fn insert(&mut self, value: Value<T, M>) -> Result<(), PointError> {
        if value.key.dimensions() != self.dimensions() {
            return Err(PointError::DimensionMismatch {
                expected: self.dimensions(),
                found: value.key.dimensions(),
            });
        }
        self.cascade_insert(value, 0)?;
        self.enforce_capacity();
        Ok(())
    }

    fn cascade_insert(&mut self, value: Value<T, M>, rank: usize) -> Result<(), PointError> {
        if rank == self.ranks.len() {
            self.ranks
                .push(Front::new(I::new(self.dimensions()), self.direction.clone()));
        }
        let fallback = value.clone();
        match self.ranks[rank].insert(value)? {
            InsertOutcome::Dominated { .. } => self.cascade_insert(fallback, rank + 1),
            InsertOutcome::Inserted { displaced } => {
                for d in displaced {
                    self.cascade_insert(d, rank + 1)?;
                }
                Ok(())
            }
            InsertOutcome::Duplicate => Ok(()),
        }
    }

    /// Evicts the *least crowded* element from the last rank — the element
    /// with **maximum** crowding distance (inverted relative to the usual
    /// NSGA-II truncation direction): the point occupying the sparsest
    /// neighbourhood is the one removed, on the rationale that its loss is
    /// the least damaging to the rest of the front's local density. Ties
    /// are broken by keeping earliest-inserted points: among equal maximum
    /// crowding distances, the earliest-inserted candidate is evicted.
    fn enforce_capacity(&mut self) {
        while self.len() > self.capacity {
            let Some(last) = self.ranks.last() else { break };
            let keys = last.keys();
            if keys.is_empty() {
                self.ranks.pop();
                continue;
            }
            let distances = distribution::crowding_distances(&keys);
            let mut victim = 0;
            for i in 1..keys.len() {
                if distances[i] > distances[victim] {
                    victim = i;
                }
            }
            let victim_key = keys[victim].clone();
            if let Some(last) = self.ranks.last_mut() {
                last.erase(&victim_key);
                if last.is_empty() {
                    self.ranks.pop();
                }
            }
        }
    }

    /// `true` iff some key at rank 0 weakly dominates `p`. Dominance
    /// queries on the archive are answered by rank 0 alone, since every
    /// key in a later rank is dominated by or equal to some key in an
    /// earlier one — rank 0 is always the archive's dominance frontier.
    pub fn dominates_point(&self, p: &Point<T>) -> bool {
        self.ranks.first().map(|f0| f0.dominates_point(p)).unwrap_or(false)
    }

    pub fn begin_intersection(&self, query_box: &Bbox<T>) -> Vec<&Value<T, M>> {
        self.ranks
            .iter()
            .flat_map(|f| f.index().begin_intersection(query_box))
            .collect()
    }

    pub fn begin_within(&self, query_box: &Bbox<T>) -> Vec<&Value<T, M>> {
        self.ranks
            .iter()
            .flat_map(|f| f.index().begin_within(query_box))
            .collect()
    }

    pub fn begin_disjoint(&self, query_box: &Bbox<T>) -> Vec<&Value<T, M>> {
        self.ranks
            .iter()
            .flat_map(|f| f.index().begin_disjoint(query_box))
            .collect()
    }

    /// Merges k-best across ranks: collects each rank's own k-nearest,
    /// then re-sorts and truncates the union by distance to `reference`.
    pub fn begin_nearest(&self, reference: Point<T>, k: usize) -> Vec<&Value<T, M>> {
        let mut merged: Vec<&Value<T, M>> = self
            .ranks
            .iter()
            .flat_map(|f| f.index().begin_nearest(reference.clone(), k))
            .collect();
        merged.sort_by(|a, b| {
            reference
                .distance(&a.key)
                .partial_cmp(&reference.distance(&b.key))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        merged.truncate(k);
        merged
    }

    /// General query composing any predicates across every rank,
    /// concatenated; if a `Nearest` predicate is present, the merged
    /// result is re-sorted and truncated by distance, same as
    /// `begin_nearest`.
    pub fn query(&self, predicates: &PredicateList<T, M>) -> Vec<&Value<T, M>> {
        let mut results: Vec<&Value<T, M>> = self
            .ranks
            .iter()
            .flat_map(|f| f.index().query(predicates))
            .collect();
        if let Some((reference, k)) = predicates.nearest() {
            results.sort_by(|a, b| {
                reference
                    .distance_to_point(&a.key)
                    .partial_cmp(&reference.distance_to_point(&b.key))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            results.truncate(k);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::linear::LinearIndex;

    fn pt(v: Vec<f64>) -> Point<f64> {
        Point::new(v)
    }

    fn minimize_archive(capacity: usize) -> Archive<f64, i32, LinearIndex<f64, i32>> {
        Archive::new(2, vec![Direction::Minimize, Direction::Minimize], capacity)
    }

    /// Capacity is large enough to hold the whole cascade (5 values) so the
    /// rank stratification can be observed without eviction interfering;
    /// eviction itself is exercised separately below with a tight capacity.
    #[test]
    fn scenario_archive_cascade() {
        let mut a = minimize_archive(5);
        for (x, y, m) in [(1.0, 1.0, 1), (2.0, 2.0, 2), (3.0, 3.0, 3), (0.0, 4.0, 4), (4.0, 0.0, 5)] {
            a.insert(Value::new(pt(vec![x, y]), m)).unwrap();
        }
        assert_eq!(a.rank_count(), 3);
        let rank0: Vec<Point<f64>> = a.rank(0).unwrap().keys();
        assert_eq!(rank0.len(), 3);
        assert!(rank0.contains(&pt(vec![0.0, 4.0])));
        assert!(rank0.contains(&pt(vec![1.0, 1.0])));
        assert!(rank0.contains(&pt(vec![4.0, 0.0])));
        let rank1: Vec<Point<f64>> = a.rank(1).unwrap().keys();
        assert_eq!(rank1, vec![pt(vec![2.0, 2.0])]);
        let rank2: Vec<Point<f64>> = a.rank(2).unwrap().keys();
        assert_eq!(rank2, vec![pt(vec![3.0, 3.0])]);
        assert_eq!(a.len(), 5);
    }

    /// With a capacity tighter than the cascade depth, `enforce_capacity`
    /// runs after every insert (A2 holds after *any* operation, not just at
    /// the end), so the tail rank is trimmed or dropped as soon as the sum
    /// exceeds capacity — it never transiently grows past it.
    #[test]
    fn capacity_is_never_exceeded() {
        let mut a = minimize_archive(3);
        for (x, y, m) in [(1.0, 1.0, 1), (2.0, 2.0, 2), (3.0, 3.0, 3), (0.0, 4.0, 4), (4.0, 0.0, 5)] {
            a.insert(Value::new(pt(vec![x, y]), m)).unwrap();
            assert!(a.len() <= 3);
        }
        a.insert(Value::new(pt(vec![5.0, 5.0]), 6)).unwrap();
        assert!(a.len() <= 3);
    }

    #[test]
    fn insert_is_idempotent_for_repeated_value() {
        let mut a = minimize_archive(10);
        a.insert(Value::new(pt(vec![1.0, 1.0]), 1)).unwrap();
        let len_before = a.len();
        a.insert(Value::new(pt(vec![1.0, 1.0]), 1)).unwrap();
        assert_eq!(a.len(), len_before);
    }

    #[test]
    fn rank0_is_a_valid_dominance_frontier() {
        let mut a = minimize_archive(10);
        a.insert(Value::new(pt(vec![1.0, 1.0]), 1)).unwrap();
        a.insert(Value::new(pt(vec![5.0, 5.0]), 2)).unwrap();
        assert!(a.dominates_point(&pt(vec![5.0, 5.0])));
        assert!(!a.dominates_point(&pt(vec![0.0, 0.0])));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut a = minimize_archive(10);
        let err = a.insert(Value::new(pt(vec![1.0, 1.0, 1.0]), 1)).unwrap_err();
        assert!(matches!(err, PointError::DimensionMismatch { .. }));
    }
}
