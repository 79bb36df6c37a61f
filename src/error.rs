//! Errors reported by allocators, buffers, and vectors.

use thiserror::Error;

use crate::types::LogicalType;

/// The error type for all fallible operations in this crate.
///
/// None of these are retried internally: the allocator limit is a hard budget,
/// and index or type errors are contract violations by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The allocator cannot satisfy a request within its limit.
    #[error("cannot allocate {requested} bytes: {allocated} of {limit} bytes already allocated")]
    OutOfMemory { requested: u64, allocated: u64, limit: u64 },

    /// The host allocator could not materialize the memory.
    #[error("host allocation of {requested} bytes failed")]
    AllocationFailed { requested: u64 },

    /// An access outside of `[0, capacity)`.
    #[error("index out of bounds: index={index}, length={length}, capacity={capacity}")]
    IndexOutOfBounds { index: usize, length: usize, capacity: usize },

    /// The operation is not supported by this vector in its current configuration.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// Two vectors (or a vector and a value) of different kinds were combined.
    #[error("{operation} requires matching kinds: expected {expected}, found {found}")]
    TypeMismatch { operation: &'static str, expected: LogicalType, found: LogicalType },

    /// No field in the schema carries this name.
    #[error("no such field: {name}")]
    NoSuchField { name: String },

    /// More than one field in the schema carries this name.
    #[error("ambiguous field name: {name}")]
    AmbiguousField { name: String },
}

/// A `Result` defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Whether this error reports exhausted memory, either budget or host.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Error::OutOfMemory { .. } | Error::AllocationFailed { .. })
    }

    pub(crate) fn out_of_bounds(index: usize, length: usize, capacity: usize) -> Self {
        Error::IndexOutOfBounds { index, length, capacity }
    }
}
