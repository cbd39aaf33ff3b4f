//! Front: a [`crate::index::SpatialIndex`] plus a [`Direction`]
//! vector, maintaining the invariant that no two stored keys weakly
//! dominate each other — dominated values are removed automatically on
//! insert.

use std::marker::PhantomData;

use crate::bbox::Bbox;
use crate::error::PointError;
use crate::index::SpatialIndex;
use crate::metrics::{conflict, convergence, distribution, hypervolume};
use crate::point::{Coordinate, Direction, Point};
use crate::value::Value;

/// Outcome of [`Front::insert`]. Distinguishes the duplicate-key and
/// dominated-key cases: both are communicated
/// by return value, never by `Result`'s `Err` arm (that's reserved for
/// dimension-mismatch and resource-exhaustion, which `PointError` covers).
#[derive(Debug)]
pub enum InsertOutcome<T: Coordinate, M> {
    /// The value was accepted. `displaced` lists every key it made
    /// obsolete (now removed from the front).
    Inserted { displaced: Vec<Value<T, M>> },
    /// Some stored key already weakly dominates the candidate; it is
    /// returned as the dominator.
    Dominated { dominator: Point<T> },
    /// A value with an equal key was already present (the index's own
    /// equality policy, independent of dominance).
    Duplicate,
}

pub struct Front<T: Coordinate, M, I: SpatialIndex<T, M>> {
    index: I,
    direction: Vec<Direction>,
    _marker: PhantomData<(T, M)>,
}

impl<T: Coordinate, M: Clone + PartialEq, I: SpatialIndex<T, M>> Front<T, M, I> {
    /// Wraps an already-constructed index. `direction.len()` must equal
    /// `index.dimensions()`.
    pub fn new(index: I, direction: Vec<Direction>) -> Self {
        debug_assert_eq!(index.dimensions(), direction.len());
        Self {
            index,
            direction,
            _marker: PhantomData,
        }
    }

    pub fn direction(&self) -> &[Direction] {
        &self.direction
    }

    pub fn dimensions(&self) -> usize {
        self.direction.len()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.index.clear();
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn find(&self, key: &Point<T>) -> Option<&Value<T, M>> {
        self.index.find(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value<T, M>> {
        self.index.iter()
    }

    /// Owned snapshot of every stored key, in the index's native order.
    pub fn keys(&self) -> Vec<Point<T>> {
        self.index.iter().map(|v| v.key.clone()).collect()
    }

    /// The axis-aligned orthant whose corner is `key` and which extends
    /// toward the *better* side on every axis — candidates here are the
    /// only keys that could possibly weakly dominate `key`.
    fn dominating_region(&self, key: &Point<T>) -> Bbox<T> {
        let dim = self.dimensions();
        let mut min = Point::zeros(dim);
        let mut max = Point::zeros(dim);
        for i in 0..dim {
            match self.direction[i] {
                Direction::Minimize => {
                    min.set(i, T::neg_infinity());
                    max.set(i, key.get(i));
                }
                Direction::Maximize => {
                    min.set(i, key.get(i));
                    max.set(i, T::infinity());
                }
            }
        }
        Bbox::new(min, max)
    }

    /// The complementary orthant: candidates here are the only keys `key`
    /// could possibly weakly dominate.
    fn dominated_region(&self, key: &Point<T>) -> Bbox<T> {
        let dim = self.dimensions();
        let mut min = Point::zeros(dim);
        let mut max = Point::zeros(dim);
        for i in 0..dim {
            match self.direction[i] {
                Direction::Minimize => {
                    min.set(i, key.get(i));
                    max.set(i, T::infinity());
                }
                Direction::Maximize => {
                    min.set(i, T::neg_infinity());
                    max.set(i, key.get(i));
                }
            }
        }
        Bbox::new(min, max)
    }

    /// `true` iff some stored key weakly dominates `p`.
    pub fn dominates_point(&self, p: &Point<T>) -> bool {
        let region = self.dominating_region(p);
        self.index
            .begin_intersection(&region)
            .into_iter()
            .any(|v| v.key.dominates(p, &self.direction))
    }

    /// `true` iff every key in `other` is dominated by some key in `self`.
    pub fn dominates_front<M2: Clone + PartialEq, J: SpatialIndex<T, M2>>(
        &self,
        other: &Front<T, M2, J>,
    ) -> bool {
        other.iter().all(|v| self.dominates_point(&v.key))
    }

    /// Inserts `value`, removing every key it dominates. See
    /// [`InsertOutcome`] for the three possible results.
    pub fn insert(&mut self, value: Value<T, M>) -> Result<InsertOutcome<T, M>, PointError> {
        if value.key.dimensions() != self.dimensions() {
            return Err(PointError::DimensionMismatch {
                expected: self.dimensions(),
                found: value.key.dimensions(),
            });
        }

        let dominating = self.dominating_region(&value.key);
        if let Some(dominator) = self
            .index
            .begin_intersection(&dominating)
            .into_iter()
            .find(|v| v.key.dominates(&value.key, &self.direction))
        {
            return Ok(InsertOutcome::Dominated {
                dominator: dominator.key.clone(),
            });
        }

        let dominated_region = self.dominated_region(&value.key);
        let displaced: Vec<Value<T, M>> = self
            .index
            .begin_intersection(&dominated_region)
            .into_iter()
            .filter(|v| value.key.dominates(&v.key, &self.direction))
            .cloned()
            .collect();

        for v in &displaced {
            self.index.erase_key(&v.key);
        }

        if !self.index.insert(value)? {
            return Ok(InsertOutcome::Duplicate);
        }
        Ok(InsertOutcome::Inserted { displaced })
    }

    pub fn erase(&mut self, key: &Point<T>) -> usize {
        self.index.erase_key(key)
    }

    /// Best value observed per axis. `None` when empty.
    pub fn ideal(&self) -> Option<Point<T>> {
        self.axis_extreme(true)
    }

    /// Worst value among stored (non-dominated) keys per axis. `None` when
    /// empty. `worst` is an alias for the same quantity.
    pub fn nadir(&self) -> Option<Point<T>> {
        self.axis_extreme(false)
    }

    pub fn worst(&self) -> Option<Point<T>> {
        self.nadir()
    }

    fn axis_extreme(&self, best: bool) -> Option<Point<T>> {
        if self.is_empty() {
            return None;
        }
        let dim = self.dimensions();
        let mut coords = Vec::with_capacity(dim);
        for i in 0..dim {
            let minimize_wants_min = matches!(self.direction[i], Direction::Minimize) == best;
            let value = if minimize_wants_min {
                self.index.min_value(i)
            } else {
                self.index.max_value(i)
            };
            coords.push(value?);
        }
        Some(Point::new(coords))
    }

    // -- Metric algorithms, delegated to `crate::metrics` ----------

    pub fn hypervolume(&self, reference: &Point<T>) -> f64 {
        hypervolume::exact(&self.keys(), reference, &self.direction)
    }

    pub fn hypervolume_monte_carlo(&self, reference: &Point<T>, samples: usize, seed: u64) -> f64 {
        hypervolume::monte_carlo(&self.keys(), reference, &self.direction, samples, seed)
    }

    pub fn generational_distance(&self, truth: &[Point<T>]) -> f64 {
        convergence::generational_distance(&self.keys(), truth)
    }

    pub fn std_generational_distance(&self, truth: &[Point<T>]) -> f64 {
        convergence::std_generational_distance(&self.keys(), truth)
    }

    pub fn inverted_generational_distance(&self, truth: &[Point<T>]) -> f64 {
        convergence::inverted_generational_distance(&self.keys(), truth)
    }

    pub fn inverted_generational_distance_plus(&self, truth: &[Point<T>]) -> f64 {
        convergence::inverted_generational_distance_plus(&self.keys(), truth, &self.direction)
    }

    pub fn hausdorff_distance(&self, truth: &[Point<T>]) -> f64 {
        convergence::hausdorff(&self.keys(), truth)
    }

    pub fn coverage(&self, other: &[Point<T>]) -> f64 {
        convergence::coverage(&self.keys(), other, &self.direction)
    }

    pub fn coverage_ratio(&self, other: &[Point<T>]) -> f64 {
        convergence::coverage_ratio(&self.keys(), other, &self.direction)
    }

    pub fn uniformity(&self) -> f64 {
        distribution::uniformity(&self.keys())
    }

    pub fn average_distance(&self) -> f64 {
        distribution::average_distance(&self.keys())
    }

    pub fn average_nearest_distance(&self, k: usize) -> f64 {
        distribution::average_nearest_distance(&self.keys(), k)
    }

    pub fn crowding_distance(&self, key: &Point<T>) -> f64 {
        let keys = self.keys();
        let distances = distribution::crowding_distances(&keys);
        keys.iter()
            .position(|k| k == key)
            .map(|i| distances[i])
            .unwrap_or(f64::NAN)
    }

    pub fn average_crowding_distance(&self) -> f64 {
        distribution::average_crowding_distance(&self.keys())
    }

    pub fn conflict_direct(&self, i: usize, j: usize) -> f64 {
        conflict::direct(&self.keys(), i, j, &self.direction)
    }

    pub fn conflict_direct_normalized(&self, i: usize, j: usize) -> f64 {
        conflict::direct_normalized(&self.keys(), i, j, &self.direction)
    }

    pub fn conflict_maxmin(&self, i: usize, j: usize) -> f64 {
        conflict::maxmin(&self.keys(), i, j, &self.direction)
    }

    pub fn conflict_maxmin_normalized(&self, i: usize, j: usize) -> f64 {
        conflict::maxmin_normalized(&self.keys(), i, j, &self.direction)
    }

    pub fn conflict_non_parametric(&self, i: usize, j: usize) -> f64 {
        conflict::non_parametric(&self.keys(), i, j, &self.direction)
    }

    pub fn conflict_non_parametric_normalized(&self, i: usize, j: usize) -> f64 {
        conflict::non_parametric_normalized(&self.keys(), i, j, &self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::linear::LinearIndex;

    fn pt(v: Vec<f64>) -> Point<f64> {
        Point::new(v)
    }

    fn minimize_front(dim: usize) -> Front<f64, i32, LinearIndex<f64, i32>> {
        Front::new(LinearIndex::new(dim), vec![Direction::Minimize; dim])
    }

    #[test]
    fn insert_rejects_dominated_value() {
        let mut f = minimize_front(2);
        f.insert(Value::new(pt(vec![1.0, 1.0]), 1)).unwrap();
        let outcome = f.insert(Value::new(pt(vec![2.0, 2.0]), 2)).unwrap();
        assert!(matches!(outcome, InsertOutcome::Dominated { .. }));
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn insert_displaces_dominated_values() {
        let mut f = minimize_front(2);
        f.insert(Value::new(pt(vec![2.0, 2.0]), 1)).unwrap();
        f.insert(Value::new(pt(vec![3.0, 1.0]), 2)).unwrap();
        let outcome = f.insert(Value::new(pt(vec![1.0, 1.0]), 3)).unwrap();
        match outcome {
            InsertOutcome::Inserted { displaced } => assert_eq!(displaced.len(), 2),
            other => panic!("expected Inserted, got {other:?}"),
        }
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn scenario_pareto_minimize_maximize_2d() {
        let mut f = Front::new(
            LinearIndex::new(2),
            vec![Direction::Minimize, Direction::Maximize],
        );
        for (x, y, m) in [
            (0.68, 0.55, 17),
            (-0.20, 0.82, 8),
            (1.10, 0.98, 36),
            (-2.02, -1.25, 27),
            (-1.19, 1.05, 15),
            (1.01, -0.99, 33),
        ] {
            f.insert(Value::new(pt(vec![x, y]), m)).unwrap();
        }
        assert_eq!(f.len(), 3);
        assert!(f.find(&pt(vec![-1.19, 1.05])).is_some());
        assert!(f.find(&pt(vec![1.10, 0.98])).is_some());
        assert!(f.find(&pt(vec![-0.20, 0.82])).is_some());
        let ideal = f.ideal().unwrap();
        assert_eq!(ideal.get(0), -1.19);
        assert_eq!(ideal.get(1), 1.05);
    }

    #[test]
    fn duplicate_key_is_reported_distinctly_from_dominated() {
        let mut f = minimize_front(2);
        f.insert(Value::new(pt(vec![1.0, 1.0]), 1)).unwrap();
        let outcome = f.insert(Value::new(pt(vec![1.0, 1.0]), 2)).unwrap();
        assert!(matches!(outcome, InsertOutcome::Duplicate));
    }

    #[test]
    fn dimension_mismatch_leaves_front_unchanged() {
        let mut f = minimize_front(2);
        let err = f.insert(Value::new(pt(vec![1.0, 1.0, 1.0]), 1)).unwrap_err();
        assert!(matches!(err, PointError::DimensionMismatch { .. }));
        assert_eq!(f.len(), 0);
    }

    #[test]
    fn empty_front_has_no_ideal() {
        let f = minimize_front(2);
        assert!(f.ideal().is_none());
    }

    /// `reference = (1, 1)` would put both points exactly on the
    /// reference's boundary on one axis each, degenerating every
    /// `[point, reference]` box to zero area (true HV = 0); see
    /// `metrics::hypervolume::tests::two_point_front_minimise_exact_hv` for
    /// the full derivation. `reference = (2, 2)` keeps both points
    /// strictly dominated and gives exact HV = 3 (box union: 2 + 2 − 1).
    #[test]
    fn hypervolume_matches_known_case() {
        let mut f = minimize_front(2);
        f.insert(Value::new(pt(vec![0.0, 1.0]), 1)).unwrap();
        f.insert(Value::new(pt(vec![1.0, 0.0]), 2)).unwrap();
        let hv = f.hypervolume(&pt(vec![2.0, 2.0]));
        assert!((hv - 3.0).abs() < 1e-9);
    }

    #[test]
    fn dominates_front_checks_every_member() {
        let mut a = minimize_front(2);
        a.insert(Value::new(pt(vec![0.0, 0.0]), 1)).unwrap();
        let mut b = minimize_front(2);
        b.insert(Value::new(pt(vec![1.0, 1.0]), 1)).unwrap();
        b.insert(Value::new(pt(vec![2.0, 2.0]), 2)).unwrap();
        assert!(a.dominates_front(&b));
        assert!(!b.dominates_front(&a));
    }
}
