//! Conflict indicators: direct, maxmin, and non-parametric measures
//! quantifying the tension between two objective axes across a stored set,
//! via the three classical pairwise-correlation families each name maps
//! onto most directly: Pearson (linear, "direct"), Kendall concordance
//! ("maxmin" — pairwise better/worse agreement), and Spearman rank
//! correlation ("non-parametric"). See `DESIGN.md` for the rationale.
//!
//! Every indicator works in *goodness* space (`-value` for a minimised
//! axis, `value` for a maximised one) so "conflict" consistently means
//! "improving one axis tends to worsen the other," independent of each
//! axis's own direction. Raw indicators are correlations in `[-1, 1]`
//! (`1` = perfect harmony, `-1` = perfect conflict); the `_normalized`
//! variants remap to `[0, 1]` conflict-ness via `(1 - raw) / 2`.

use crate::point::{Coordinate, Direction, Point};

fn goodness<T: Coordinate>(points: &[Point<T>], axis: usize, direction: &Direction) -> Vec<f64> {
    points
        .iter()
        .map(|p| match direction {
            Direction::Minimize => -p.get(axis).to_f64(),
            Direction::Maximize => p.get(axis).to_f64(),
        })
        .collect()
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 {
        return f64::NAN;
    }
    let mx = xs.iter().sum::<f64>() / n as f64;
    let my = ys.iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for i in 0..n {
        let dx = xs[i] - mx;
        let dy = ys[i] - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx <= 0.0 || vy <= 0.0 {
        return 0.0;
    }
    cov / (vx.sqrt() * vy.sqrt())
}

fn ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal));
    let mut ranks = vec![0.0f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Tied values share the average rank of their span.
        let avg_rank = (i + j) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }
    ranks
}

fn kendall_concordance(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 {
        return f64::NAN;
    }
    let mut concordant = 0i64;
    let mut discordant = 0i64;
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = xs[i] - xs[j];
            let dy = ys[i] - ys[j];
            if dx == 0.0 || dy == 0.0 {
                continue;
            }
            if dx.signum() == dy.signum() {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }
    let total = concordant + discordant;
    if total == 0 {
        return 0.0;
    }
    (concordant - discordant) as f64 / total as f64
}

/// Direct conflict: Pearson correlation of goodness values between axes
/// `i` and `j`. `1.0` = the axes always improve together, `-1.0` = they
/// always trade off.
pub fn direct<T: Coordinate>(points: &[Point<T>], i: usize, j: usize, direction: &[Direction]) -> f64 {
    let xs = goodness(points, i, &direction[i]);
    let ys = goodness(points, j, &direction[j]);
    pearson(&xs, &ys)
}

pub fn direct_normalized<T: Coordinate>(points: &[Point<T>], i: usize, j: usize, direction: &[Direction]) -> f64 {
    (1.0 - direct(points, i, j, direction)) / 2.0
}

/// Maxmin conflict: fraction of pairwise agreements minus disagreements in
/// which axis improves relative to which (Kendall-style concordance) on
/// goodness values.
pub fn maxmin<T: Coordinate>(points: &[Point<T>], i: usize, j: usize, direction: &[Direction]) -> f64 {
    let xs = goodness(points, i, &direction[i]);
    let ys = goodness(points, j, &direction[j]);
    kendall_concordance(&xs, &ys)
}

pub fn maxmin_normalized<T: Coordinate>(points: &[Point<T>], i: usize, j: usize, direction: &[Direction]) -> f64 {
    (1.0 - maxmin(points, i, j, direction)) / 2.0
}

/// Non-parametric conflict: Spearman rank correlation of goodness values.
pub fn non_parametric<T: Coordinate>(points: &[Point<T>], i: usize, j: usize, direction: &[Direction]) -> f64 {
    let xs = goodness(points, i, &direction[i]);
    let ys = goodness(points, j, &direction[j]);
    pearson(&ranks(&xs), &ranks(&ys))
}

pub fn non_parametric_normalized<T: Coordinate>(
    points: &[Point<T>],
    i: usize,
    j: usize,
    direction: &[Direction],
) -> f64 {
    (1.0 - non_parametric(points, i, j, direction)) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(v: Vec<f64>) -> Point<f64> {
        Point::new(v)
    }

    #[test]
    fn perfectly_aligned_axes_have_no_conflict() {
        let dir = [Direction::Minimize, Direction::Minimize];
        let points = vec![p(vec![0.0, 0.0]), p(vec![1.0, 1.0]), p(vec![2.0, 2.0])];
        assert!((direct(&points, 0, 1, &dir) - 1.0).abs() < 1e-9);
        assert!(direct_normalized(&points, 0, 1, &dir) < 1e-9);
    }

    #[test]
    fn perfectly_opposed_axes_are_full_conflict() {
        let dir = [Direction::Minimize, Direction::Minimize];
        let points = vec![p(vec![0.0, 2.0]), p(vec![1.0, 1.0]), p(vec![2.0, 0.0])];
        assert!((direct(&points, 0, 1, &dir) + 1.0).abs() < 1e-9);
        assert!((direct_normalized(&points, 0, 1, &dir) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn maxmin_and_non_parametric_agree_on_strict_monotone_data() {
        let dir = [Direction::Minimize, Direction::Minimize];
        let points = vec![p(vec![0.0, 0.0]), p(vec![1.0, 1.0]), p(vec![2.0, 2.0])];
        assert!((maxmin(&points, 0, 1, &dir) - 1.0).abs() < 1e-9);
        assert!((non_parametric(&points, 0, 1, &dir) - 1.0).abs() < 1e-9);
    }
}
