//! Metric algorithms: hypervolume, convergence, distribution, and
//! conflict indicators exposed from [`crate::front::Front`].
//!
//! Split into submodules the way a crate this size typically separates
//! concerns by metric family rather than piling every formula into one
//! file (mirrors `optirustic`'s `src/metrics/` layout in the retrieval
//! pack, which keeps `hv_*`, convergence, and diversity metrics in
//! separate modules under one `metrics` directory).

pub mod conflict;
pub mod convergence;
pub mod distribution;
pub mod hypervolume;

use crate::point::{Coordinate, Point};

/// Shared helper: Euclidean distance from `p` to its nearest point in
/// `others` (excluding `p` itself by index when `skip` is given). Returns
/// `f64::NAN` when `others` is empty, per the empty-container sentinel
/// convention.
pub(crate) fn nearest_distance<T: Coordinate>(p: &Point<T>, others: &[&Point<T>]) -> f64 {
    others
        .iter()
        .map(|o| p.distance(o))
        .fold(f64::INFINITY, f64::min)
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
