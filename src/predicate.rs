//! The predicate algebra: five predicate kinds, list compression, and
//! most-restrictive-first ordering, used to parameterise tree traversal so
//! one engine can service every query shape.
//!
//! Each predicate exposes two probes:
//!
//! - `pass(value)`: does this concrete value satisfy the predicate.
//! - `might_pass(box)`: can any descendant inside `box` possibly satisfy
//!   it. Must be monotone — false on a box implies false on every sub-box.

use std::fmt;
use std::rc::Rc;

use crate::bbox::Bbox;
use crate::point::{Coordinate, Point};
use crate::value::Value;

/// Reference object for a [`Predicate::Nearest`] query: either a point or a
/// hyperbox (points inside the box are distance zero).
#[derive(Clone)]
pub enum NearestRef<T: Coordinate> {
    Point(Point<T>),
    Box(Bbox<T>),
}

impl<T: Coordinate> NearestRef<T> {
    pub fn distance_to_point(&self, p: &Point<T>) -> f64 {
        match self {
            NearestRef::Point(r) => r.distance(p),
            NearestRef::Box(b) => b.distance_to_point(p),
        }
    }

    pub fn distance_to_box(&self, b: &Bbox<T>) -> f64 {
        match self {
            NearestRef::Point(r) => b.distance_to_point(r),
            NearestRef::Box(r) => r.distance_to_box(b),
        }
    }

    fn bounding_box(&self) -> Bbox<T> {
        match self {
            NearestRef::Point(p) => Bbox::around_point(p),
            NearestRef::Box(b) => b.clone(),
        }
    }
}

/// A user callable for [`Predicate::Satisfies`]: either `V -> bool` or
/// `P -> bool`.
#[derive(Clone)]
pub enum SatisfiesFn<T: Coordinate, M> {
    OnKey(Rc<dyn Fn(&Point<T>) -> bool>),
    OnValue(Rc<dyn Fn(&Value<T, M>) -> bool>),
}

impl<T: Coordinate, M> SatisfiesFn<T, M> {
    fn call(&self, value: &Value<T, M>) -> bool {
        match self {
            SatisfiesFn::OnKey(f) => f(&value.key),
            SatisfiesFn::OnValue(f) => f(value),
        }
    }
}

/// A single predicate in the algebra.
#[derive(Clone)]
pub enum Predicate<T: Coordinate, M> {
    Intersects(Bbox<T>),
    Within(Bbox<T>),
    Disjoint(Bbox<T>),
    Nearest { reference: NearestRef<T>, k: usize },
    Satisfies(SatisfiesFn<T, M>),
}

impl<T: Coordinate, M> fmt::Debug for Predicate<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Intersects(b) => f.debug_tuple("Intersects").field(b).finish(),
            Predicate::Within(b) => f.debug_tuple("Within").field(b).finish(),
            Predicate::Disjoint(b) => f.debug_tuple("Disjoint").field(b).finish(),
            Predicate::Nearest { k, .. } => f.debug_struct("Nearest").field("k", k).finish(),
            Predicate::Satisfies(_) => write!(f, "Satisfies(..)"),
        }
    }
}

impl<T: Coordinate, M> Predicate<T, M> {
    pub fn pass(&self, value: &Value<T, M>) -> bool {
        match self {
            Predicate::Intersects(b) => b.contains_point(&value.key),
            Predicate::Within(b) => b.contains_point_strictly(&value.key),
            Predicate::Disjoint(b) => !b.contains_point(&value.key),
            Predicate::Nearest { .. } => true,
            Predicate::Satisfies(f) => f.call(value),
        }
    }

    /// Monotone pruning probe: can any value inside `node_box` possibly
    /// pass this predicate.
    pub fn might_pass(&self, node_box: &Bbox<T>) -> bool {
        match self {
            Predicate::Intersects(b) => b.overlaps(node_box),
            Predicate::Within(b) => b.overlaps(node_box),
            Predicate::Disjoint(b) => !b.contains_box(node_box),
            Predicate::Nearest { .. } => true,
            Predicate::Satisfies(_) => true,
        }
    }

    /// Effective volume used to order predicates most-restrictive-first.
    /// Geometric predicates other than `Disjoint` sort by box volume;
    /// `Disjoint` sorts by the volume of its complement within `universe`
    /// (so a `Disjoint` predicate over a small hole is a weak filter and
    /// sorts late, since it prunes little). `Satisfies`/`Nearest` have
    /// no geometric volume and always sort last.
    fn sort_key(&self, universe_volume: f64) -> (u8, f64) {
        match self {
            Predicate::Intersects(b) | Predicate::Within(b) => (0, b.volume()),
            Predicate::Disjoint(b) => (0, (universe_volume - b.volume()).max(0.0)),
            Predicate::Nearest { .. } | Predicate::Satisfies(_) => (1, 0.0),
        }
    }

    fn as_geometric_box(&self) -> Option<&Bbox<T>> {
        match self {
            Predicate::Intersects(b) | Predicate::Within(b) | Predicate::Disjoint(b) => Some(b),
            _ => None,
        }
    }
}

/// An ordered, compressed sequence of predicates, composing any of the five
/// kinds (with at most one `Nearest`).
#[derive(Clone)]
pub struct PredicateList<T: Coordinate, M> {
    predicates: Vec<Predicate<T, M>>,
}

impl<T: Coordinate, M> Default for PredicateList<T, M> {
    fn default() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }
}

impl<T: Coordinate, M> PredicateList<T, M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(predicate: Predicate<T, M>) -> Self {
        let mut list = Self::new();
        list.push(predicate);
        list
    }

    /// Adds a predicate, then re-runs compression and ordering. This is a
    /// *semantic* simplification (the resulting list accepts the same
    /// values as before), not merely a performance tweak.
    pub fn push(&mut self, predicate: Predicate<T, M>) {
        self.predicates.push(predicate);
        self.compress();
        self.sort();
    }

    pub fn predicates(&self) -> &[Predicate<T, M>] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn pass(&self, value: &Value<T, M>) -> bool {
        self.predicates.iter().all(|p| p.pass(value))
    }

    pub fn might_pass(&self, node_box: &Bbox<T>) -> bool {
        self.predicates.iter().all(|p| p.might_pass(node_box))
    }

    pub fn nearest(&self) -> Option<(&NearestRef<T>, usize)> {
        self.predicates.iter().find_map(|p| match p {
            Predicate::Nearest { reference, k } => Some((reference, *k)),
            _ => None,
        })
    }

    /// Folds redundant predicate pairs per the compression table.
    /// Implements the cases that can be decided cheaply and exactly;
    /// the ambiguous "all borders touching" sub-case of
    /// `Intersects(P)+Within(Q)` is conservatively left unfolded (keeping
    /// both predicates is always semantically safe, just not maximally
    /// compressed — see `DESIGN.md`).
    fn compress(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            'outer: for i in 0..self.predicates.len() {
                for j in (i + 1)..self.predicates.len() {
                    if let Some(folded) = Self::try_fold(&self.predicates[i], &self.predicates[j])
                    {
                        self.predicates[i] = folded;
                        self.predicates.remove(j);
                        changed = true;
                        break 'outer;
                    }
                }
            }
        }
    }

    fn try_fold(a: &Predicate<T, M>, b: &Predicate<T, M>) -> Option<Predicate<T, M>> {
        use Predicate::*;
        match (a, b) {
            (Intersects(p), Intersects(q)) => {
                if p.contains_box(q) {
                    Some(Intersects(q.clone()))
                } else if q.contains_box(p) {
                    Some(Intersects(p.clone()))
                } else {
                    None
                }
            }
            (Within(p), Within(q)) => {
                if p.contains_box(q) {
                    Some(Within(q.clone()))
                } else if q.contains_box(p) {
                    Some(Within(p.clone()))
                } else {
                    None
                }
            }
            (Intersects(p), Within(q)) | (Within(q), Intersects(p)) => {
                if q.contains_box(p) {
                    // Q fully encloses P (no shared borders): Within(Q)
                    // already implies Intersects(P).
                    let p_strictly_inside = q.contains_point_strictly(p.min())
                        && q.contains_point_strictly(p.max());
                    if p_strictly_inside {
                        Some(Within(q.clone()))
                    } else {
                        None
                    }
                } else if p.contains_box(q) {
                    Some(Within(q.clone()))
                } else {
                    None
                }
            }
            (Intersects(p), Disjoint(q)) | (Disjoint(q), Intersects(p)) => {
                if !p.overlaps(q) {
                    Some(Intersects(p.clone()))
                } else {
                    None
                }
            }
            (Within(w), Disjoint(q)) | (Disjoint(q), Within(w)) => {
                if !w.overlaps(q) {
                    Some(Within(w.clone()))
                } else {
                    None
                }
            }
            (
                Nearest {
                    reference: r1,
                    k: k1,
                },
                Nearest {
                    reference: r2,
                    k: k2,
                },
            ) => {
                let merged_box = r1.bounding_box().combine(&r2.bounding_box());
                Some(Nearest {
                    reference: NearestRef::Box(merged_box),
                    k: (*k1).min(*k2),
                })
            }
            _ => None,
        }
    }

    /// Sorts predicates most-restrictive-first by effective volume;
    /// `Satisfies`/`Nearest` always sort last. Stable, so predicates with
    /// equal keys keep their relative insertion order.
    fn sort(&mut self) {
        let universe_volume = self
            .predicates
            .iter()
            .filter_map(|p| p.as_geometric_box())
            .map(|b| b.volume())
            .fold(0.0_f64, f64::max)
            .max(1.0);
        self.predicates
            .sort_by(|a, b| {
                a.sort_key(universe_volume)
                    .partial_cmp(&b.sort_key(universe_volume))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(v: Vec<f64>) -> Point<f64> {
        Point::new(v)
    }

    fn bx(min: Vec<f64>, max: Vec<f64>) -> Bbox<f64> {
        Bbox::new(pt(min), pt(max))
    }

    #[test]
    fn intersects_pass_is_closed_containment() {
        let p: Predicate<f64, i32> = Predicate::Intersects(bx(vec![0.0, 0.0], vec![1.0, 1.0]));
        assert!(p.pass(&Value::new(pt(vec![1.0, 1.0]), 0)));
        assert!(!p.pass(&Value::new(pt(vec![1.1, 1.0]), 0)));
    }

    #[test]
    fn within_pass_is_strict() {
        let p: Predicate<f64, i32> = Predicate::Within(bx(vec![0.0, 0.0], vec![1.0, 1.0]));
        assert!(!p.pass(&Value::new(pt(vec![0.0, 0.5]), 0)));
        assert!(p.pass(&Value::new(pt(vec![0.5, 0.5]), 0)));
    }

    #[test]
    fn might_pass_is_monotone_under_shrinking() {
        let p: Predicate<f64, i32> = Predicate::Intersects(bx(vec![5.0, 5.0], vec![6.0, 6.0]));
        let parent = bx(vec![0.0, 0.0], vec![10.0, 10.0]);
        let child = bx(vec![7.0, 7.0], vec![9.0, 9.0]);
        // might_pass(parent) is true (the query box lies inside it) while
        // might_pass(child) is false (the query box doesn't reach the
        // child's region) — true-to-false is the allowed direction.
        assert!(p.might_pass(&parent));
        assert!(!p.might_pass(&child));

        // P2: might_pass(box) = false must force might_pass(sub-box) =
        // false for every box nested inside it — the false-to-false
        // direction, which is the actual monotonicity guarantee.
        let disjoint_parent = bx(vec![20.0, 20.0], vec![30.0, 30.0]);
        let disjoint_child = bx(vec![22.0, 22.0], vec![24.0, 24.0]);
        assert!(!p.might_pass(&disjoint_parent));
        assert!(!p.might_pass(&disjoint_child));
    }

    #[test]
    fn compression_folds_nested_intersects() {
        let mut list: PredicateList<f64, i32> = PredicateList::new();
        list.push(Predicate::Intersects(bx(vec![0.0, 0.0], vec![10.0, 10.0])));
        list.push(Predicate::Intersects(bx(vec![2.0, 2.0], vec![3.0, 3.0])));
        assert_eq!(list.predicates().len(), 1);
    }

    #[test]
    fn compression_is_semantics_preserving() {
        // The compressed list accepts the same values as the
        // uncompressed one would.
        let outer = bx(vec![0.0, 0.0], vec![10.0, 10.0]);
        let inner = bx(vec![2.0, 2.0], vec![3.0, 3.0]);
        let mut list: PredicateList<f64, i32> = PredicateList::new();
        list.push(Predicate::Intersects(outer.clone()));
        list.push(Predicate::Intersects(inner.clone()));

        let inside = Value::new(pt(vec![2.5, 2.5]), 0);
        let outside_inner_inside_outer = Value::new(pt(vec![5.0, 5.0]), 0);

        let uncompressed_pass = |v: &Value<f64, i32>| {
            Predicate::Intersects(outer.clone()).pass(v) && Predicate::Intersects(inner.clone()).pass(v)
        };

        assert_eq!(list.pass(&inside), uncompressed_pass(&inside));
        assert_eq!(
            list.pass(&outside_inner_inside_outer),
            uncompressed_pass(&outside_inner_inside_outer)
        );
    }

    #[test]
    fn satisfies_and_nearest_sort_last() {
        let mut list: PredicateList<f64, i32> = PredicateList::new();
        list.push(Predicate::Satisfies(SatisfiesFn::OnValue(Rc::new(
            |v: &Value<f64, i32>| v.mapped > 0,
        ))));
        list.push(Predicate::Intersects(bx(vec![0.0, 0.0], vec![1.0, 1.0])));
        assert!(matches!(list.predicates()[0], Predicate::Intersects(_)));
        assert!(matches!(list.predicates()[1], Predicate::Satisfies(_)));
    }

    #[test]
    fn nearest_merge_takes_min_k() {
        let mut list: PredicateList<f64, i32> = PredicateList::new();
        list.push(Predicate::Nearest {
            reference: NearestRef::Point(pt(vec![0.0, 0.0])),
            k: 5,
        });
        list.push(Predicate::Nearest {
            reference: NearestRef::Point(pt(vec![1.0, 1.0])),
            k: 2,
        });
        let (_, k) = list.nearest().unwrap();
        assert_eq!(k, 2);
    }
}
