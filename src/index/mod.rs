//! The spatial index contract every backend implements, plus the five
//! concrete backends.

pub mod kdtree;
pub mod linear;
pub mod quadtree;
pub mod rstartree;
pub mod rtree;

use crate::bbox::Bbox;
use crate::error::PointError;
use crate::point::{Coordinate, Point};
use crate::predicate::{NearestRef, Predicate, PredicateList};
use crate::value::Value;

/// A borrowed view over the entries currently stored by an index, produced
/// eagerly by every query method (see `DESIGN.md` for why these iterators
/// are buffered rather than lazily coupled to tree traversal state).
///
/// Models a forward iterator: `next()` advances; `DoubleEndedIterator` is
/// implemented for backends whose storage naturally supports it (linear
/// list, k-d tree, quad-tree, R-tree). Two `EntryIter`s over the same
/// exhausted state compare equal in the sense that both report `None`.
pub struct EntryIter<'a, T: Coordinate, M> {
    entries: std::slice::Iter<'a, Value<T, M>>,
}

impl<'a, T: Coordinate, M> EntryIter<'a, T, M> {
    pub(crate) fn new(entries: &'a [Value<T, M>]) -> Self {
        Self {
            entries: entries.iter(),
        }
    }
}

impl<'a, T: Coordinate, M> Iterator for EntryIter<'a, T, M> {
    type Item = &'a Value<T, M>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<'a, T: Coordinate, M> DoubleEndedIterator for EntryIter<'a, T, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.entries.next_back()
    }
}

impl<'a, T: Coordinate, M> ExactSizeIterator for EntryIter<'a, T, M> {}

/// Common contract implemented by every backend: insert, erase,
/// find, the five query iterator factories, and min/max axis accessors.
///
/// `insert`'s `bool` is `true` iff a new entry was produced; `false` iff an
/// equivalent key already existed under the index's equality policy
/// (communicated by return value, not by `Result`).
pub trait SpatialIndex<T: Coordinate, M> {
    /// Builds an empty index over `dim`-dimensional keys. Required so
    /// generic callers (`Front`, `Archive`) can construct fresh ranks
    /// without knowing which concrete backend they are parameterised
    /// over.
    fn new(dim: usize) -> Self
    where
        Self: Sized;

    fn dimensions(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn clear(&mut self);

    /// Inserts a single value. Returns `Err` only for dimension mismatch or
    /// resource exhaustion; returns `Ok((_, false))` for a duplicate key.
    fn insert(&mut self, value: Value<T, M>) -> Result<bool, PointError>;

    /// Bulk insert. Never stronger than a loop of single inserts: returns
    /// the count of values actually inserted (duplicates do not count).
    fn insert_all(&mut self, values: impl IntoIterator<Item = Value<T, M>>) -> Result<usize, PointError> {
        let mut inserted = 0;
        for v in values {
            if self.insert(v)? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Removes every entry whose key equals `key`. Returns the count
    /// removed (0 or 1 for indices with unique-key policy).
    fn erase_key(&mut self, key: &Point<T>) -> usize;

    fn find(&self, key: &Point<T>) -> Option<&Value<T, M>>;

    fn min_value(&self, axis: usize) -> Option<T>;
    fn max_value(&self, axis: usize) -> Option<T>;

    fn iter(&self) -> EntryIter<'_, T, M>;

    fn query(&self, predicates: &PredicateList<T, M>) -> Vec<&Value<T, M>>;

    fn begin_intersection(&self, query_box: &Bbox<T>) -> Vec<&Value<T, M>> {
        self.query(&PredicateList::single(Predicate::Intersects(
            query_box.clone(),
        )))
    }

    fn begin_within(&self, query_box: &Bbox<T>) -> Vec<&Value<T, M>> {
        self.query(&PredicateList::single(Predicate::Within(query_box.clone())))
    }

    fn begin_disjoint(&self, query_box: &Bbox<T>) -> Vec<&Value<T, M>> {
        self.query(&PredicateList::single(Predicate::Disjoint(
            query_box.clone(),
        )))
    }

    fn begin_nearest(&self, reference: Point<T>, k: usize) -> Vec<&Value<T, M>> {
        self.query(&PredicateList::single(Predicate::Nearest {
            reference: NearestRef::Point(reference),
            k,
        }))
    }
}

/// Conjunctive, pass-based evaluation of a predicate list against a full
/// scan — the reference semantics every backend's `query` must agree with.
/// Backends use this directly (linear index) or as the filter applied to
/// values surfaced by smarter traversal.
pub(crate) fn filter_matching<'a, T: Coordinate, M>(
    entries: impl Iterator<Item = &'a Value<T, M>>,
    predicates: &PredicateList<T, M>,
) -> Vec<&'a Value<T, M>> {
    let mut matches: Vec<&'a Value<T, M>> = entries.filter(|v| predicates.pass(v)).collect();
    if let Some((reference, k)) = predicates.nearest() {
        matches.sort_by(|a, b| {
            reference
                .distance_to_point(&a.key)
                .partial_cmp(&reference.distance_to_point(&b.key))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(k);
    }
    matches
}
