//! Hypervolume (exact HSO + seeded Monte-Carlo).
//!
//! Both estimators work in a canonical *minimisation* space: every
//! maximised axis is negated before slicing/sampling, which is an
//! isometry (a reflection), so volumes computed in that space equal
//! volumes in the original mixed-direction space. This lets one slicing
//! routine serve every direction vector instead of special-casing
//! minimise/maximise at each recursion level.

use std::cmp::Ordering;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::point::{Coordinate, Direction, Point};

fn to_min_space<T: Coordinate>(p: &Point<T>, direction: &[Direction]) -> Vec<f64> {
    (0..p.dimensions())
        .map(|i| match direction[i] {
            Direction::Minimize => p.get(i).to_f64(),
            Direction::Maximize => -p.get(i).to_f64(),
        })
        .collect()
}

/// `a` weakly dominates `b` in minimisation space for the purpose of box
/// elimination: `a[i] <= b[i]` on every axis (this is the box-subset test,
/// not Pareto dominance — it also discards exact duplicates, which is
/// correct since a duplicate's dominated box contributes nothing new).
fn subsumes(a: &[f64], b: &[f64]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x <= y)
}

fn insert_nondominated(front: &mut Vec<Vec<f64>>, candidate: Vec<f64>) {
    if front.iter().any(|q| subsumes(q, &candidate)) {
        return;
    }
    front.retain(|q| !subsumes(&candidate, q));
    front.push(candidate);
}

/// Hypervolume by Slicing Objectives: sort by the first axis ascending,
/// fold each point into the running non-dominated `accumulated` set
/// *before* measuring its slab, then slice the box spanning from this
/// point's own coordinate to the next point's coordinate (or `reference`
/// for the last point) and recurse into the remaining `m-1` axes. Base
/// case `m == 1` is a direct gap measurement.
///
/// The slab for point `i` covers `[x_i, x_{i+1})` (or `[x_last,
/// reference[0])`), i.e. the region *above* `x_i` and below the next
/// threshold — not the region below `x_i`, which is what the point's own
/// predecessor already accounted for. Folding the point into `accumulated`
/// before computing its slab is what makes that point's own improved
/// coordinates apply to its own slab.
fn hso(points: &[Vec<f64>], reference: &[f64]) -> f64 {
    let dim = reference.len();
    if points.is_empty() {
        return 0.0;
    }
    if dim == 1 {
        let best = points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
        return (reference[0] - best).max(0.0);
    }

    let mut sorted: Vec<&Vec<f64>> = points.iter().collect();
    sorted.sort_by(|a, b| a[0].partial_cmp(&b[0]).unwrap_or(Ordering::Equal));

    let mut volume = 0.0;
    let mut accumulated: Vec<Vec<f64>> = Vec::new();
    for (i, p) in sorted.iter().enumerate() {
        insert_nondominated(&mut accumulated, p[1..].to_vec());
        let next_bound = sorted.get(i + 1).map(|q| q[0]).unwrap_or(reference[0]);
        let width = next_bound - p[0];
        if width > 0.0 {
            volume += width * hso(&accumulated, &reference[1..]);
        }
    }
    volume
}

/// Exact hypervolume dominated by `front` and dominating `reference`.
/// Returns `0.0` for an empty front.
pub fn exact<T: Coordinate>(front: &[Point<T>], reference: &Point<T>, direction: &[Direction]) -> f64 {
    if front.is_empty() {
        return 0.0;
    }
    let points: Vec<Vec<f64>> = front.iter().map(|p| to_min_space(p, direction)).collect();
    let reference = to_min_space(reference, direction);
    hso(&points, &reference).max(0.0)
}

/// Monte-Carlo hypervolume estimate: draw `samples` points uniformly from
/// the box spanned by the front's ideal point and `reference`, estimate is
/// `(#points dominated) / samples * box_volume`.
///
/// Deterministic under `seed`: sampling is partitioned across rayon's
/// global pool (one independently-seeded `ChaCha8Rng` stream per worker
/// chunk), and per-chunk dominated counts are combined associatively, so
/// the same `(front, reference, samples, seed)` always yields the same
/// count regardless of how many threads are available.
pub fn monte_carlo<T: Coordinate>(
    front: &[Point<T>],
    reference: &Point<T>,
    direction: &[Direction],
    samples: usize,
    seed: u64,
) -> f64 {
    if front.is_empty() || samples == 0 {
        return 0.0;
    }
    let dim = reference.dimensions();

    let mut ideal = vec![0.0f64; dim];
    for (i, slot) in ideal.iter_mut().enumerate() {
        let vals = front.iter().map(|p| p.get(i).to_f64());
        *slot = match direction[i] {
            Direction::Minimize => vals.fold(f64::INFINITY, f64::min),
            Direction::Maximize => vals.fold(f64::NEG_INFINITY, f64::max),
        };
    }

    let mut lo = vec![0.0f64; dim];
    let mut hi = vec![0.0f64; dim];
    for i in 0..dim {
        let (a, b) = (ideal[i], reference.get(i).to_f64());
        lo[i] = a.min(b);
        hi[i] = a.max(b);
    }
    let box_volume: f64 = (0..dim).map(|i| hi[i] - lo[i]).product();
    if box_volume <= 0.0 {
        return 0.0;
    }

    // Fixed chunk count rather than `rayon::current_num_threads()`: the
    // latter varies with pool configuration, which would make the
    // partition (and therefore nothing observable, since the combine is
    // associative) depend on runtime topology. A fixed chunk count keeps
    // the *partition* deterministic too, for reproducible tracing.
    const CHUNKS: usize = 16;
    let per_chunk = samples.div_ceil(CHUNKS);

    let dominated: usize = (0..CHUNKS)
        .into_par_iter()
        .map(|chunk| {
            let start = chunk * per_chunk;
            let end = (start + per_chunk).min(samples);
            if start >= end {
                return 0usize;
            }
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(chunk as u64));
            let mut count = 0usize;
            for _ in start..end {
                let sample: Vec<T> = (0..dim)
                    .map(|i| T::from_f64(rng.gen_range(lo[i]..=hi[i])))
                    .collect();
                let sample = Point::new(sample);
                if front.iter().any(|p| p.dominates(&sample, direction) || *p == sample) {
                    count += 1;
                }
            }
            count
        })
        .sum();

    dominated as f64 / samples as f64 * box_volume
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(v: Vec<f64>) -> Point<f64> {
        Point::new(v)
    }

    /// `reference = (1, 1)` would make both points touch the reference on
    /// one axis each ((0,1) has y == ref_y, (1,0) has x == ref_x), so every
    /// box `[point, reference]` degenerates to a zero-area line and the
    /// true hypervolume is exactly 0 — not the commonly misquoted 0.5,
    /// which actually describes the area of the *triangle* under the
    /// straight line connecting the two points, a different quantity than
    /// the rectangle-union hypervolume indicator this module computes.
    /// `reference = (2, 2)` keeps both points strictly dominated on both
    /// axes and gives a verifiable non-degenerate exact value: boxes
    /// `[0,2]x[1,2]` (area 2) and `[1,2]x[0,2]` (area 2) overlap on
    /// `[1,2]x[1,2]` (area 1), so the union is `2 + 2 - 1 = 3`.
    #[test]
    fn two_point_front_minimise_exact_hv() {
        let front = vec![p(vec![0.0, 1.0]), p(vec![1.0, 0.0])];
        let dir = [Direction::Minimize, Direction::Minimize];
        let hv = exact(&front, &p(vec![2.0, 2.0]), &dir);
        assert!((hv - 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_front_has_zero_hv() {
        let dir = [Direction::Minimize, Direction::Minimize];
        assert_eq!(exact::<f64>(&[], &p(vec![1.0, 1.0]), &dir), 0.0);
    }

    #[test]
    fn hv_is_monotone_under_extra_nondominated_point() {
        let dir = [Direction::Minimize, Direction::Minimize];
        let reference = p(vec![2.0, 2.0]);
        let base = vec![p(vec![1.0, 1.0])];
        let hv_base = exact(&base, &reference, &dir);
        let extended = vec![p(vec![1.0, 1.0]), p(vec![0.5, 1.8])];
        let hv_extended = exact(&extended, &reference, &dir);
        assert!(hv_extended >= hv_base);
    }

    #[test]
    fn monte_carlo_converges_to_exact() {
        let dir = [Direction::Minimize, Direction::Minimize];
        let front = vec![p(vec![0.0, 1.0]), p(vec![1.0, 0.0])];
        let reference = p(vec![2.0, 2.0]);
        // Sampling box spans ideal (0,0) to reference (2,2), volume 4; the
        // exact dominated volume is 3 (see `two_point_front_minimise_exact_hv`).
        // `monte_carlo` returns the absolute volume estimate (dominated
        // fraction times box volume), so it should converge to 3.0.
        let estimate = monte_carlo(&front, &reference, &dir, 100_000, 42);
        assert!((estimate - 3.0).abs() < 0.05, "estimate={estimate}");
    }

    #[test]
    fn monte_carlo_is_deterministic_under_seed() {
        let dir = [Direction::Minimize, Direction::Minimize];
        let front = vec![p(vec![0.2, 0.9]), p(vec![0.7, 0.3])];
        let reference = p(vec![1.0, 1.0]);
        let a = monte_carlo(&front, &reference, &dir, 5_000, 7);
        let b = monte_carlo(&front, &reference, &dir, 5_000, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn mixed_direction_hv_matches_negated_minimisation() {
        // Maximise axis 1: point (0.3, 0.8) under max on axis1 with
        // reference (1.0, 0.0) should equal the minimise-space
        // computation on (0.3, -0.8) against (1.0, -0.0).
        let dir = [Direction::Minimize, Direction::Maximize];
        let front = vec![p(vec![0.3, 0.8]), p(vec![0.6, 0.5])];
        let reference = p(vec![1.0, 0.0]);
        let hv = exact(&front, &reference, &dir);
        assert!(hv > 0.0);
    }
}
