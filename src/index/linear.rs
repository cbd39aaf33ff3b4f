//! Linear index: the reference oracle. An unordered `Vec<Value>` with
//! a predicate-filtering full scan backing every query. O(n) for every
//! operation; used as the correctness baseline the tree backends are
//! checked against and as a practical choice for small n.

use crate::error::PointError;
use crate::point::{Coordinate, Point};
use crate::predicate::PredicateList;
use crate::value::Value;

use super::{filter_matching, EntryIter, SpatialIndex};

#[derive(Debug, Clone)]
pub struct LinearIndex<T: Coordinate, M> {
    dim: usize,
    entries: Vec<Value<T, M>>,
}

impl<T: Coordinate, M> LinearIndex<T, M> {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            entries: Vec::new(),
        }
    }
}

impl<T: Coordinate, M: PartialEq> SpatialIndex<T, M> for LinearIndex<T, M> {
    fn new(dim: usize) -> Self {
        Self::new(dim)
    }

    fn dimensions(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn insert(&mut self, value: Value<T, M>) -> Result<bool, PointError> {
        if value.key.dimensions() != self.dim {
            return Err(PointError::DimensionMismatch {
                expected: self.dim,
                found: value.key.dimensions(),
            });
        }
        if self.entries.iter().any(|v| v.key == value.key) {
            return Ok(false);
        }
        self.entries.push(value);
        Ok(true)
    }

    fn erase_key(&mut self, key: &Point<T>) -> usize {
        let before = self.entries.len();
        // swap_remove: erase does not need to preserve iteration order for
        // the linear backend (spec leaves full-range order
        // implementation-defined across tree variants).
        let mut i = 0;
        while i < self.entries.len() {
            if &self.entries[i].key == key {
                self.entries.swap_remove(i);
            } else {
                i += 1;
            }
        }
        before - self.entries.len()
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
        filter_matching(self.entries.iter(), predicates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::Bbox;
    use crate::predicate::{NearestRef, Predicate};

    fn pt(v: Vec<f64>) -> Point<f64> {
        Point::new(v)
    }

    #[test]
    fn insert_rejects_duplicate_key() {
        let mut idx: LinearIndex<f64, i32> = LinearIndex::new(2);
        assert!(idx.insert(Value::new(pt(vec![1.0, 1.0]), 1)).unwrap());
        assert!(!idx.insert(Value::new(pt(vec![1.0, 1.0]), 2)).unwrap());
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn insert_rejects_dimension_mismatch() {
        let mut idx: LinearIndex<f64, i32> = LinearIndex::new(2);
        let err = idx.insert(Value::new(pt(vec![1.0, 1.0, 1.0]), 1)).unwrap_err();
        assert!(matches!(err, PointError::DimensionMismatch { .. }));
        assert_eq!(idx.len(), 0);
    }

    #[test]
    fn erase_then_find_returns_none() {
        let mut idx: LinearIndex<f64, i32> = LinearIndex::new(2);
        idx.insert(Value::new(pt(vec![1.0, 1.0]), 1)).unwrap();
        assert_eq!(idx.erase_key(&pt(vec![1.0, 1.0])), 1);
        assert!(idx.find(&pt(vec![1.0, 1.0])).is_none());
    }

    #[test]
    fn min_max_value_scan() {
        let mut idx: LinearIndex<f64, i32> = LinearIndex::new(1);
        for v in [3.0, 1.0, 4.0, 1.5] {
            idx.insert(Value::new(pt(vec![v]), 0)).unwrap();
        }
        assert_eq!(idx.min_value(0), Some(1.0));
        assert_eq!(idx.max_value(0), Some(4.0));
    }

    #[test]
    fn query_composition_matches_full_scan_filter() {
        let mut idx: LinearIndex<f64, i32> = LinearIndex::new(2);
        for (x, y, m) in [(0.1, 0.1, 20), (0.6, 0.6, 20), (0.2, 0.3, 5)] {
            idx.insert(Value::new(pt(vec![x, y]), m)).unwrap();
        }
        let mut predicates = PredicateList::new();
        predicates.push(Predicate::Intersects(Bbox::new(
            pt(vec![0.0, 0.0]),
            pt(vec![0.5, 0.5]),
        )));
        predicates.push(Predicate::Satisfies(crate::predicate::SatisfiesFn::OnValue(
            std::rc::Rc::new(|v: &Value<f64, i32>| v.mapped > 10),
        )));
        let results = idx.query(&predicates);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].mapped, 20);
    }

    #[test]
    fn nearest_orders_by_non_decreasing_distance() {
        let mut idx: LinearIndex<f64, i32> = LinearIndex::new(2);
        for (x, y) in [(5.0, 5.0), (1.0, 1.0), (3.0, 3.0)] {
            idx.insert(Value::new(pt(vec![x, y]), 0)).unwrap();
        }
        let results = idx.begin_nearest(pt(vec![0.0, 0.0]), 2);
        assert_eq!(results.len(), 2);
        assert!(results[0].key.distance(&pt(vec![0.0, 0.0])) <= results[1].key.distance(&pt(vec![0.0, 0.0])));
        assert_eq!(results[0].key, pt(vec![1.0, 1.0]));
        let _ = NearestRef::Point(pt(vec![0.0, 0.0]));
    }
}
