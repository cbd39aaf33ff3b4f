//! Distribution metrics: uniformity, average pairwise distance,
//! average nearest-k distance, and NSGA-II-style crowding distance.

use super::mean;
use crate::point::{Coordinate, Point};

/// Minimum pairwise Euclidean distance across all stored keys.
/// `f64::INFINITY` when fewer than two points are given (vacuous minimum).
pub fn uniformity<T: Coordinate>(points: &[Point<T>]) -> f64 {
    let mut best = f64::INFINITY;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            best = best.min(points[i].distance(&points[j]));
        }
    }
    best
}

/// Mean pairwise Euclidean distance across all stored keys. `f64::NAN` when
/// fewer than two points are given.
pub fn average_distance<T: Coordinate>(points: &[Point<T>]) -> f64 {
    let mut distances = Vec::new();
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            distances.push(points[i].distance(&points[j]));
        }
    }
    mean(&distances)
}

/// Mean, over all keys, of the mean distance to the `k` nearest *other*
/// keys. `k` is clamped to `len - 1`. `f64::NAN` for fewer than two points.
pub fn average_nearest_distance<T: Coordinate>(points: &[Point<T>], k: usize) -> f64 {
    if points.len() < 2 {
        return f64::NAN;
    }
    let k = k.min(points.len() - 1).max(1);
    let per_point: Vec<f64> = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut dists: Vec<f64> = points
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, q)| p.distance(q))
                .collect();
            dists.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            dists.truncate(k);
            mean(&dists)
        })
        .collect();
    mean(&per_point)
}

/// NSGA-II crowding distance for every stored key, in the same order as
/// `points`. Fronts of size `<= 2` get `f64::INFINITY` for every member
/// (everyone is a boundary point). Otherwise, for each axis, boundary
/// points (min/max on that axis) get `+inf`; interior points accumulate
/// `(next - prev) / range` summed over axes.
pub fn crowding_distances<T: Coordinate>(points: &[Point<T>]) -> Vec<f64> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }
    if n <= 2 {
        return vec![f64::INFINITY; n];
    }
    let dim = points[0].dimensions();
    let mut distances = vec![0.0f64; n];

    for axis in 0..dim {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            points[a]
                .get(axis)
                .to_f64()
                .partial_cmp(&points[b].get(axis).to_f64())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let first = order[0];
        let last = order[n - 1];
        distances[first] = f64::INFINITY;
        distances[last] = f64::INFINITY;

        let lo = points[first].get(axis).to_f64();
        let hi = points[last].get(axis).to_f64();
        let range = if (hi - lo).abs() > 1e-10 { hi - lo } else { 1.0 };

        for w in 1..n - 1 {
            let i = order[w];
            if distances[i].is_infinite() {
                continue;
            }
            let prev = points[order[w - 1]].get(axis).to_f64();
            let next = points[order[w + 1]].get(axis).to_f64();
            distances[i] += (next - prev) / range;
        }
    }
    distances
}

/// Mean of [`crowding_distances`]. Often infinite for fronts larger than
/// two members, since boundary points always contribute `+inf` — this
/// mirrors the NSGA-II metric's own behaviour rather than a bug; use
/// [`crowding_distances`] directly to inspect interior-only spread.
pub fn average_crowding_distance<T: Coordinate>(points: &[Point<T>]) -> f64 {
    mean(&crowding_distances(points))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(v: Vec<f64>) -> Point<f64> {
        Point::new(v)
    }

    #[test]
    fn uniformity_is_min_pairwise_distance() {
        let points = vec![p(vec![0.0]), p(vec![1.0]), p(vec![3.0])];
        assert_eq!(uniformity(&points), 1.0);
    }

    #[test]
    fn small_fronts_are_all_boundary() {
        let points = vec![p(vec![0.0, 0.0]), p(vec![1.0, 1.0])];
        let d = crowding_distances(&points);
        assert!(d.iter().all(|x| x.is_infinite()));
    }

    #[test]
    fn interior_point_gets_finite_crowding_distance() {
        let points = vec![p(vec![0.0]), p(vec![1.0]), p(vec![2.0])];
        let d = crowding_distances(&points);
        assert!(d[0].is_infinite());
        assert!(d[2].is_infinite());
        assert!(d[1].is_finite());
        assert!((d[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn average_nearest_distance_clamps_k() {
        let points = vec![p(vec![0.0]), p(vec![1.0]), p(vec![5.0])];
        let avg = average_nearest_distance(&points, 10);
        assert!(avg.is_finite());
    }
}
