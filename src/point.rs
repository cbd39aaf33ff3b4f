//! Point types: the runtime-dimension [`Point`] used throughout the spatial
//! engine, and the compile-time-dimension [`PointN`] companion for callers
//! who know `m` ahead of time and want a stack-allocated, allocation-free
//! representation (see `DESIGN.md` for why the tree engine itself is kept
//! monomorphic over `Point<T>` rather than generic over both storages).

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

/// Per-axis optimisation polarity. Owned by [`crate::front::Front`] and
/// [`crate::archive::Archive`]; determines dominance direction.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Minimize,
    Maximize,
}

/// Numeric trait bound satisfied by coordinate types (integer or floating).
///
/// Distance calculations always promote through `to_f64`; coordinate
/// arithmetic never does, so integer points stay exact under `+`/`-`/`*`/`/`.
pub trait Coordinate:
    Copy
    + Clone
    + PartialOrd
    + PartialEq
    + fmt::Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
{
    const ZERO: Self;
    const ONE: Self;

    /// Sentinel used as the "worse than anything" bound on the open side of
    /// an unbounded dominating-region query.
    fn neg_infinity() -> Self;
    fn infinity() -> Self;

    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;

    fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }

    fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }
}

macro_rules! impl_coordinate_float {
    ($t:ty) => {
        impl Coordinate for $t {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;

            fn neg_infinity() -> Self {
                <$t>::NEG_INFINITY
            }
            fn infinity() -> Self {
                <$t>::INFINITY
            }
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v as $t
            }
        }
    };
}

macro_rules! impl_coordinate_int {
    ($t:ty) => {
        impl Coordinate for $t {
            const ZERO: Self = 0;
            const ONE: Self = 1;

            fn neg_infinity() -> Self {
                <$t>::MIN
            }
            fn infinity() -> Self {
                <$t>::MAX
            }
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v as $t
            }
        }
    };
}

impl_coordinate_float!(f32);
impl_coordinate_float!(f64);
impl_coordinate_int!(i32);
impl_coordinate_int!(i64);

/// A point in `R^m`, `m` determined at runtime. Backed by a flat `Vec<T>`:
/// every coordinate of a point lives in one allocation rather than behind
/// per-coordinate pointers.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Point<T: Coordinate> {
    coords: Vec<T>,
}

impl<T: Coordinate> Point<T> {
    pub fn new(coords: Vec<T>) -> Self {
        Self { coords }
    }

    pub fn zeros(dim: usize) -> Self {
        Self {
            coords: vec![T::ZERO; dim],
        }
    }

    pub fn dimensions(&self) -> usize {
        self.coords.len()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.coords
    }

    pub fn get(&self, axis: usize) -> T {
        self.coords[axis]
    }

    pub fn set(&mut self, axis: usize, value: T) {
        self.coords[axis] = value;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.coords.iter()
    }

    /// Quadrant of `other` relative to `self`: bit `k` is set iff
    /// `other[k] <= self[k]`. Used by the quad-tree to select a child index.
    pub fn quadrant(&self, other: &Point<T>) -> usize {
        let mut quad = 0usize;
        for i in 0..self.dimensions() {
            if other.get(i) <= self.get(i) {
                quad |= 1 << i;
            }
        }
        quad
    }

    /// Euclidean distance, promoted to `f64` regardless of `T`.
    pub fn distance(&self, other: &Point<T>) -> f64 {
        let mut sum = 0.0f64;
        for i in 0..self.dimensions() {
            let d = self.get(i).to_f64() - other.get(i).to_f64();
            sum += d * d;
        }
        sum.sqrt()
    }

    /// Distance from `other` to the hyper-orthant that `self` dominates
    /// under `direction` — zero if `self` already dominates `other`.
    /// Used by the IGD+ convergence metric.
    pub fn distance_to_dominated_box(&self, other: &Point<T>, direction: &[Direction]) -> f64 {
        let mut sum = 0.0f64;
        for i in 0..self.dimensions() {
            let term = match direction[i] {
                Direction::Minimize => self.get(i).to_f64() - other.get(i).to_f64(),
                Direction::Maximize => other.get(i).to_f64() - self.get(i).to_f64(),
            };
            let clamped = term.max(0.0);
            sum += clamped * clamped;
        }
        sum.sqrt()
    }

    /// Weak Pareto dominance: no worse on every axis, strictly better on at
    /// least one, under `direction`.
    pub fn dominates(&self, other: &Point<T>, direction: &[Direction]) -> bool {
        let mut better_at_any = false;
        for i in 0..self.dimensions() {
            let (a, b) = (self.get(i), other.get(i));
            let worse = match direction[i] {
                Direction::Minimize => a > b,
                Direction::Maximize => a < b,
            };
            if worse {
                return false;
            }
            if !better_at_any {
                let better = match direction[i] {
                    Direction::Minimize => a < b,
                    Direction::Maximize => a > b,
                };
                if better {
                    better_at_any = true;
                }
            }
        }
        better_at_any
    }

    /// Strong Pareto dominance: strictly better on every axis.
    pub fn strongly_dominates(&self, other: &Point<T>, direction: &[Direction]) -> bool {
        for i in 0..self.dimensions() {
            let (a, b) = (self.get(i), other.get(i));
            let at_least_as_good = match direction[i] {
                Direction::Minimize => a < b,
                Direction::Maximize => a > b,
            };
            if !at_least_as_good {
                return false;
            }
        }
        true
    }

    /// Neither weakly dominates the other (includes equal points).
    pub fn non_dominates(&self, other: &Point<T>, direction: &[Direction]) -> bool {
        !self.dominates(other, direction) && !other.dominates(self, direction)
    }

    fn zip_map(&self, other: &Point<T>, f: impl Fn(T, T) -> T) -> Point<T> {
        let coords = self
            .coords
            .iter()
            .zip(other.coords.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Point { coords }
    }

    fn map_scalar(&self, scalar: T, f: impl Fn(T, T) -> T) -> Point<T> {
        let coords = self.coords.iter().map(|&a| f(a, scalar)).collect();
        Point { coords }
    }
}

impl<T: Coordinate> PartialEq for Point<T> {
    fn eq(&self, other: &Self) -> bool {
        self.coords == other.coords
    }
}

impl<T: Coordinate> PartialOrd for Point<T> {
    /// Lexicographic comparison. Two points compare equal iff every
    /// coordinate is equal (the Data Model invariant).
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        for i in 0..self.dimensions().min(other.dimensions()) {
            match self.get(i).partial_cmp(&other.get(i)) {
                Some(std::cmp::Ordering::Equal) => continue,
                ord => return ord,
            }
        }
        self.dimensions().partial_cmp(&other.dimensions())
    }
}

impl<T: Coordinate> Add for &Point<T> {
    type Output = Point<T>;
    fn add(self, rhs: &Point<T>) -> Point<T> {
        self.zip_map(rhs, |a, b| a + b)
    }
}

impl<T: Coordinate> Sub for &Point<T> {
    type Output = Point<T>;
    fn sub(self, rhs: &Point<T>) -> Point<T> {
        self.zip_map(rhs, |a, b| a - b)
    }
}

impl<T: Coordinate> Mul for &Point<T> {
    type Output = Point<T>;
    fn mul(self, rhs: &Point<T>) -> Point<T> {
        self.zip_map(rhs, |a, b| a * b)
    }
}

impl<T: Coordinate> Div for &Point<T> {
    type Output = Point<T>;
    fn div(self, rhs: &Point<T>) -> Point<T> {
        self.zip_map(rhs, |a, b| a / b)
    }
}

impl<T: Coordinate> Point<T> {
    pub fn add_scalar(&self, scalar: T) -> Point<T> {
        self.map_scalar(scalar, |a, b| a + b)
    }

    pub fn sub_scalar(&self, scalar: T) -> Point<T> {
        self.map_scalar(scalar, |a, b| a - b)
    }

    pub fn mul_scalar(&self, scalar: T) -> Point<T> {
        self.map_scalar(scalar, |a, b| a * b)
    }

    pub fn div_scalar(&self, scalar: T) -> Point<T> {
        self.map_scalar(scalar, |a, b| a / b)
    }
}

impl<T: Coordinate> fmt::Display for Point<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", c)?;
        }
        write!(f, ")")
    }
}

/// Compile-time-dimension companion to [`Point`]: a stack-allocated,
/// allocation-free point for callers who know `m` at compile time.
/// Carries the same arithmetic and dominance operations; converts
/// losslessly to and from [`Point<T>`] at the boundary of the spatial
/// engine (which is monomorphic over the heap-backed form).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointN<T: Coordinate, const D: usize> {
    coords: [T; D],
}

impl<T: Coordinate, const D: usize> PointN<T, D> {
    pub fn new(coords: [T; D]) -> Self {
        Self { coords }
    }

    pub fn dimensions(&self) -> usize {
        D
    }

    pub fn get(&self, axis: usize) -> T {
        self.coords[axis]
    }

    pub fn set(&mut self, axis: usize, value: T) {
        self.coords[axis] = value;
    }

    pub fn distance(&self, other: &PointN<T, D>) -> f64 {
        let mut sum = 0.0f64;
        for i in 0..D {
            let d = self.coords[i].to_f64() - other.coords[i].to_f64();
            sum += d * d;
        }
        sum.sqrt()
    }

    pub fn dominates(&self, other: &PointN<T, D>, direction: &[Direction]) -> bool {
        self.to_point().dominates(&other.to_point(), direction)
    }

    pub fn to_point(&self) -> Point<T> {
        Point::new(self.coords.to_vec())
    }
}

impl<T: Coordinate, const D: usize> From<PointN<T, D>> for Point<T> {
    fn from(p: PointN<T, D>) -> Self {
        p.to_point()
    }
}

impl<T: Coordinate, const D: usize> TryFrom<Point<T>> for PointN<T, D> {
    type Error = crate::error::PointError;

    fn try_from(p: Point<T>) -> Result<Self, Self::Error> {
        if p.dimensions() != D {
            return Err(crate::error::PointError::DimensionMismatch {
                expected: D,
                found: p.dimensions(),
            });
        }
        let mut coords = [T::ZERO; D];
        coords.copy_from_slice(p.as_slice());
        Ok(Self { coords })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(v: Vec<f64>) -> Point<f64> {
        Point::new(v)
    }

    #[test]
    fn equality_is_coordinatewise() {
        assert_eq!(p(vec![1.0, 2.0]), p(vec![1.0, 2.0]));
        assert_ne!(p(vec![1.0, 2.0]), p(vec![1.0, 2.1]));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn round_trips_through_json() {
        let original = p(vec![1.5, -2.25, 3.0]);
        let encoded = serde_json::to_string(&original).unwrap();
        let decoded: Point<f64> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn distance_matches_euclidean() {
        let a = p(vec![0.0, 0.0]);
        let b = p(vec![3.0, 4.0]);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn dominates_minimize() {
        let dir = [Direction::Minimize, Direction::Minimize];
        let a = p(vec![1.0, 1.0]);
        let b = p(vec![2.0, 2.0]);
        assert!(a.dominates(&b, &dir));
        assert!(!b.dominates(&a, &dir));
    }

    #[test]
    fn dominates_mixed_direction() {
        let dir = [Direction::Minimize, Direction::Maximize];
        let a = p(vec![1.0, 5.0]);
        let b = p(vec![2.0, 4.0]);
        assert!(a.dominates(&b, &dir));
    }

    #[test]
    fn equal_points_do_not_dominate() {
        let dir = [Direction::Minimize, Direction::Minimize];
        let a = p(vec![1.0, 1.0]);
        let b = p(vec![1.0, 1.0]);
        assert!(!a.dominates(&b, &dir));
        assert!(a.non_dominates(&b, &dir));
    }

    #[test]
    fn strongly_dominates_requires_strict_on_every_axis() {
        let dir = [Direction::Minimize, Direction::Minimize];
        let a = p(vec![1.0, 1.0]);
        let b = p(vec![1.0, 2.0]);
        assert!(a.dominates(&b, &dir));
        assert!(!a.strongly_dominates(&b, &dir));
    }

    #[test]
    fn quadrant_bitmask() {
        let center = p(vec![0.0, 0.0]);
        assert_eq!(center.quadrant(&p(vec![-1.0, -1.0])), 0b11);
        assert_eq!(center.quadrant(&p(vec![1.0, -1.0])), 0b10);
        assert_eq!(center.quadrant(&p(vec![-1.0, 1.0])), 0b01);
        assert_eq!(center.quadrant(&p(vec![1.0, 1.0])), 0b00);
    }

    #[test]
    fn pointn_roundtrips_through_point() {
        let fixed: PointN<f64, 3> = PointN::new([1.0, 2.0, 3.0]);
        let dynamic: Point<f64> = fixed.into();
        let back: PointN<f64, 3> = dynamic.try_into().unwrap();
        assert_eq!(fixed, back);
    }

    #[test]
    fn distance_to_dominated_box_is_zero_when_dominated() {
        let dir = [Direction::Minimize, Direction::Minimize];
        let ref_point = p(vec![1.0, 1.0]);
        let dominated = p(vec![2.0, 2.0]);
        assert_eq!(ref_point.distance_to_dominated_box(&dominated, &dir), 0.0);
    }
}
