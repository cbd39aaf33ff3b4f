//! # pareto_rs — spatial containers for multi-objective optimization
//!
//! This crate provides a family of in-memory spatial indices (linear scan,
//! k-d tree, quad-tree, R-tree, R*-tree) unified behind one
//! [`index::SpatialIndex`] trait, a predicate algebra for composing spatial
//! queries ([`predicate::Predicate`]), and two layers built on top of that
//! foundation for multi-objective optimization:
//!
//! - [`front::Front`] maintains a single Pareto-optimal set: inserting a key
//!   automatically evicts every key it dominates, and rejects candidates
//!   already dominated by a stored key.
//! - [`archive::Archive`] stacks fronts into dominance ranks with a bounded
//!   total capacity, cascading displaced keys downward and evicting the
//!   least useful element from the last rank when the archive overflows.
//!
//! [`metrics`] implements the standard multi-objective quality indicators
//! (hypervolume, generational distance family, distribution/crowding
//! measures, and conflict indicators) against any `Vec<Point<T>>` snapshot,
//! and is exposed both standalone and via convenience methods on `Front`.
//!
//! ## Choosing a backend
//!
//! All five backends in [`index`] satisfy the same contract and therefore
//! the same query semantics (invariant: every backend agrees with the
//! reference, pass-based evaluation performed by [`index::filter_matching`]).
//! [`index::linear::LinearIndex`] is the simplest and is used throughout this
//! crate's own tests as the oracle the tree backends are checked against.
//! The tree backends trade that simplicity for sublinear range and nearest
//! queries on larger sets; see each module's doc comment for its own
//! structural tradeoffs (e.g. `rtree`'s quadratic-split heuristic,
//! `rstartree`'s forced-reinsertion policy).

pub mod archive;
pub mod arena;
pub mod bbox;
pub mod error;
pub mod front;
pub mod index;
pub mod metrics;
pub mod point;
pub mod predicate;
pub mod value;

pub use archive::Archive;
pub use bbox::Bbox;
pub use error::{PointError, Result};
pub use front::{Front, InsertOutcome};
pub use index::SpatialIndex;
pub use point::{Coordinate, Direction, Point};
pub use predicate::{NearestRef, Predicate, PredicateList};
pub use value::Value;
