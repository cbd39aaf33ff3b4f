//! Convergence metrics: GD, IGD, IGD+, Hausdorff, coverage.
//!
//! All take two key sets directly (`approx`: the front under test, `truth`:
//! the reference/true Pareto front) rather than two [`crate::front::Front`]s,
//! so they can also be used to compare an [`crate::archive::Archive`]'s
//! rank-0 front against an external reference set.

use super::{mean, nearest_distance, stddev};
use crate::point::{Coordinate, Direction, Point};

/// Mean Euclidean distance from each point in `approx` to its nearest point
/// in `truth`. `f64::NAN` if either set is empty.
pub fn generational_distance<T: Coordinate>(approx: &[Point<T>], truth: &[Point<T>]) -> f64 {
    if approx.is_empty() || truth.is_empty() {
        return f64::NAN;
    }
    let refs: Vec<&Point<T>> = truth.iter().collect();
    let distances: Vec<f64> = approx.iter().map(|p| nearest_distance(p, &refs)).collect();
    mean(&distances)
}

/// Standard deviation of the per-point distances underlying
/// [`generational_distance`].
pub fn std_generational_distance<T: Coordinate>(approx: &[Point<T>], truth: &[Point<T>]) -> f64 {
    if approx.is_empty() || truth.is_empty() {
        return f64::NAN;
    }
    let refs: Vec<&Point<T>> = truth.iter().collect();
    let distances: Vec<f64> = approx.iter().map(|p| nearest_distance(p, &refs)).collect();
    stddev(&distances)
}

/// Inverted generational distance: generational distance with the two sets
/// swapped (mean distance from each `truth` point to its nearest `approx`
/// point).
pub fn inverted_generational_distance<T: Coordinate>(approx: &[Point<T>], truth: &[Point<T>]) -> f64 {
    generational_distance(truth, approx)
}

/// IGD+: like IGD, but the per-point distance is `distance_to_dominated_box`
/// (zero whenever some `approx` point already dominates the `truth` point),
/// — the distinguishing rule between IGD+ and IGD.
pub fn inverted_generational_distance_plus<T: Coordinate>(
    approx: &[Point<T>],
    truth: &[Point<T>],
    direction: &[Direction],
) -> f64 {
    if approx.is_empty() || truth.is_empty() {
        return f64::NAN;
    }
    let distances: Vec<f64> = truth
        .iter()
        .map(|t| {
            approx
                .iter()
                .map(|a| a.distance_to_dominated_box(t, direction))
                .fold(f64::INFINITY, f64::min)
        })
        .collect();
    mean(&distances)
}

/// `max(GD, IGD)`.
pub fn hausdorff<T: Coordinate>(approx: &[Point<T>], truth: &[Point<T>]) -> f64 {
    let gd = generational_distance(approx, truth);
    let igd = inverted_generational_distance(approx, truth);
    gd.max(igd)
}

/// Fraction of `other` weakly dominated (or equalled) by some key in
/// `front`. Not symmetric. `0.0` when `other` is empty (vacuous coverage).
pub fn coverage<T: Coordinate>(front: &[Point<T>], other: &[Point<T>], direction: &[Direction]) -> f64 {
    if other.is_empty() {
        return 0.0;
    }
    let covered = other
        .iter()
        .filter(|q| front.iter().any(|p| p.dominates(q, direction) || *p == **q))
        .count();
    covered as f64 / other.len() as f64
}

/// `C(front, other) / C(other, front)`, with the convention `0/0 = 1` and
/// `x/0 = +inf`.
pub fn coverage_ratio<T: Coordinate>(front: &[Point<T>], other: &[Point<T>], direction: &[Direction]) -> f64 {
    let c_fo = coverage(front, other, direction);
    let c_of = coverage(other, front, direction);
    if c_of == 0.0 {
        if c_fo == 0.0 {
            1.0
        } else {
            f64::INFINITY
        }
    } else {
        c_fo / c_of
    }
}
