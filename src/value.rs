//! [`Value`]: the (key, mapped) pair stored by every spatial index.

use crate::point::{Coordinate, Point};

/// A stored entry: an immutable `key` (the point indexing the structure)
/// paired with a user-supplied `mapped` value that may be mutated in
/// place after insertion.
///
/// Custom equality for `M` is not a separate hook: it falls out of Rust's
/// trait system. A caller who needs `M` to compare unequal in ways beyond
/// field-by-field `==` (for example, an opaque handle type) implements
/// `PartialEq` on their own `M` however they like; `Value` simply requires
/// `M: PartialEq` and defers to it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Value<T: Coordinate, M> {
    pub key: Point<T>,
    pub mapped: M,
}

impl<T: Coordinate, M> Value<T, M> {
    pub fn new(key: Point<T>, mapped: M) -> Self {
        Self { key, mapped }
    }
}

impl<T: Coordinate, M: PartialEq> PartialEq for Value<T, M> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.mapped == other.mapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "serde")]
    #[test]
    fn round_trips_through_json() {
        let original = Value::new(Point::new(vec![1.0, 2.0]), 42i32);
        let encoded = serde_json::to_string(&original).unwrap();
        let decoded: Value<f64, i32> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(original, decoded);
    }
}
