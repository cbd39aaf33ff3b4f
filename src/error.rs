//! Structured error kinds for the crate.
//!
//! Per the error-handling model: not-found, duplicate-key, and dominated-key
//! are communicated through return values (end iterators, `(iter, bool)`
//! pairs), never through this enum. `PointError` only covers the failure
//! modes that truly abort a call and leave the container unchanged.

use thiserror::Error;

/// Errors that can be returned by a fallible container operation.
///
/// All variants are call-local: there is no background failure queue and
/// no internal retry. A container is left in its pre-call state whenever
/// one of these is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PointError {
    /// Attempted to insert a runtime-dimension key whose arity does not
    /// match the container's established dimension count.
    #[error("dimension mismatch: container has {expected} dimensions, value has {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A value-level predicate (`Satisfies` over `Value`) was evaluated in a
    /// key-only context, or vice versa.
    #[error("logic error: {0}")]
    LogicError(&'static str),

    /// The arena's underlying allocator could not satisfy a request.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(&'static str),
}

pub type Result<T> = std::result::Result<T, PointError>;
