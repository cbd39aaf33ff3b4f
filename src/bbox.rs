//! Axis-aligned hyperbox: pair (min, max) of [`Point`], normalised on
//! construction so that `min[i] <= max[i]` for every axis.

use crate::point::{Coordinate, Point};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Bbox<T: Coordinate> {
    min: Point<T>,
    max: Point<T>,
}

impl<T: Coordinate> Bbox<T> {
    /// Builds a box from two corners, swapping per-axis coordinates where
    /// inverted so the invariant `min[i] <= max[i]` always holds.
    pub fn new(mut min: Point<T>, mut max: Point<T>) -> Self {
        for i in 0..min.dimensions() {
            if min.get(i) > max.get(i) {
                let a = min.get(i);
                let b = max.get(i);
                min.set(i, b);
                max.set(i, a);
            }
        }
        Self { min, max }
    }

    /// The box spanning all of `R^dim` — the implicit bound of a full-range
    /// query.
    pub fn universe(dim: usize) -> Self {
        Self {
            min: Point::new(vec![T::neg_infinity(); dim]),
            max: Point::new(vec![T::infinity(); dim]),
        }
    }

    pub fn min(&self) -> &Point<T> {
        &self.min
    }

    pub fn max(&self) -> &Point<T> {
        &self.max
    }

    pub fn dimensions(&self) -> usize {
        self.min.dimensions()
    }

    pub fn volume(&self) -> f64 {
        let mut vol = 1.0f64;
        for i in 0..self.dimensions() {
            vol *= (self.max.get(i).to_f64() - self.min.get(i).to_f64()).max(0.0);
        }
        vol
    }

    /// Closed-interval overlap test: true iff the intersection is non-empty
    /// (touching borders count as overlapping).
    pub fn overlaps(&self, other: &Bbox<T>) -> bool {
        for i in 0..self.dimensions() {
            if self.max.get(i) < other.min.get(i) || other.max.get(i) < self.min.get(i) {
                return false;
            }
        }
        true
    }

    pub fn overlap_area(&self, other: &Bbox<T>) -> f64 {
        if !self.overlaps(other) {
            return 0.0;
        }
        let mut area = 1.0f64;
        for i in 0..self.dimensions() {
            let lo = self.min.get(i).max(other.min.get(i)).to_f64();
            let hi = self.max.get(i).min(other.max.get(i)).to_f64();
            area *= (hi - lo).max(0.0);
        }
        area
    }

    /// Closed-interval containment: every coordinate of `p` is within
    /// `[min, max]` on every axis.
    pub fn contains_point(&self, p: &Point<T>) -> bool {
        for i in 0..self.dimensions() {
            if p.get(i) < self.min.get(i) || p.get(i) > self.max.get(i) {
                return false;
            }
        }
        true
    }

    pub fn contains_box(&self, other: &Bbox<T>) -> bool {
        for i in 0..self.dimensions() {
            if other.min.get(i) < self.min.get(i) || other.max.get(i) > self.max.get(i) {
                return false;
            }
        }
        true
    }

    /// Strict interior containment: `p` lies strictly inside every axis
    /// bound (used by the `Within` predicate).
    pub fn contains_point_strictly(&self, p: &Point<T>) -> bool {
        for i in 0..self.dimensions() {
            if p.get(i) <= self.min.get(i) || p.get(i) >= self.max.get(i) {
                return false;
            }
        }
        true
    }

    /// Euclidean distance from `p` to the closest face of the box; zero if
    /// `p` is inside.
    pub fn distance_to_point(&self, p: &Point<T>) -> f64 {
        let mut sum = 0.0f64;
        for i in 0..self.dimensions() {
            let v = p.get(i).to_f64();
            let lo = self.min.get(i).to_f64();
            let hi = self.max.get(i).to_f64();
            let gap = if v < lo {
                lo - v
            } else if v > hi {
                v - hi
            } else {
                0.0
            };
            sum += gap * gap;
        }
        sum.sqrt()
    }

    /// Minimum possible distance from any point of `other` to this box.
    pub fn distance_to_box(&self, other: &Bbox<T>) -> f64 {
        let mut sum = 0.0f64;
        for i in 0..self.dimensions() {
            let gap = if other.max.get(i) < self.min.get(i) {
                self.min.get(i).to_f64() - other.max.get(i).to_f64()
            } else if other.min.get(i) > self.max.get(i) {
                other.min.get(i).to_f64() - self.max.get(i).to_f64()
            } else {
                0.0
            };
            sum += gap * gap;
        }
        sum.sqrt()
    }

    /// Expands `min`/`max` element-wise so the box contains `p`.
    pub fn stretch_to_contain(&mut self, p: &Point<T>) {
        for i in 0..self.dimensions() {
            if p.get(i) < self.min.get(i) {
                self.min.set(i, p.get(i));
            }
            if p.get(i) > self.max.get(i) {
                self.max.set(i, p.get(i));
            }
        }
    }

    /// Smallest enclosing box of `self` and `other`.
    pub fn combine(&self, other: &Bbox<T>) -> Bbox<T> {
        let mut result = self.clone();
        result.stretch_to_contain(other.min());
        result.stretch_to_contain(other.max());
        result
    }

    pub fn center(&self) -> Point<T> {
        let mut coords = Vec::with_capacity(self.dimensions());
        for i in 0..self.dimensions() {
            let mid = (self.min.get(i).to_f64() + self.max.get(i).to_f64()) / 2.0;
            coords.push(T::from_f64(mid));
        }
        Point::new(coords)
    }

    /// Tightest box around a single point (a zero-volume box).
    pub fn around_point(p: &Point<T>) -> Bbox<T> {
        Bbox {
            min: p.clone(),
            max: p.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(v: Vec<f64>) -> Point<f64> {
        Point::new(v)
    }

    #[test]
    fn normalises_inverted_corners() {
        let b = Bbox::new(pt(vec![5.0, 0.0]), pt(vec![0.0, 5.0]));
        assert_eq!(b.min().get(0), 0.0);
        assert_eq!(b.max().get(0), 5.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn round_trips_through_json() {
        let original = Bbox::new(pt(vec![0.0, -1.0]), pt(vec![2.5, 3.0]));
        let encoded = serde_json::to_string(&original).unwrap();
        let decoded: Bbox<f64> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn volume_is_product_of_extents() {
        let b = Bbox::new(pt(vec![0.0, 0.0]), pt(vec![2.0, 3.0]));
        assert_eq!(b.volume(), 6.0);
    }

    #[test]
    fn overlap_is_closed() {
        let a = Bbox::new(pt(vec![0.0, 0.0]), pt(vec![1.0, 1.0]));
        let b = Bbox::new(pt(vec![1.0, 1.0]), pt(vec![2.0, 2.0]));
        assert!(a.overlaps(&b));
    }

    #[test]
    fn within_is_strict() {
        let outer = Bbox::new(pt(vec![0.0, 0.0]), pt(vec![10.0, 10.0]));
        assert!(!outer.contains_point_strictly(&pt(vec![0.0, 5.0])));
        assert!(outer.contains_point_strictly(&pt(vec![1.0, 5.0])));
    }

    #[test]
    fn combine_yields_smallest_enclosing_box() {
        let a = Bbox::new(pt(vec![0.0, 0.0]), pt(vec![1.0, 1.0]));
        let b = Bbox::new(pt(vec![2.0, -1.0]), pt(vec![3.0, 0.5]));
        let c = a.combine(&b);
        assert_eq!(c.min().get(1), -1.0);
        assert_eq!(c.max().get(0), 3.0);
    }

    #[test]
    fn stretch_preserves_normalisation() {
        let mut b = Bbox::new(pt(vec![0.0]), pt(vec![1.0]));
        b.stretch_to_contain(&pt(vec![-5.0]));
        assert_eq!(b.min().get(0), -5.0);
        assert!(b.min().get(0) <= b.max().get(0));
    }
}
