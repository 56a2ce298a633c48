//! The crate's error type.
use thiserror::Error;

/// Everything that can go wrong in a fallible [`BiMap`](crate::BiMap) operation.
///
/// A failed operation never leaves a partial effect behind: the map is
/// exactly as it was before the call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// The left value is already mapped
    #[error("left value is already present in the map")]
    DuplicateLeft,

    /// The right value is already mapped
    #[error("right value is already present in the map")]
    DuplicateRight,

    /// No element has the requested left value
    #[error("no element with the requested left value")]
    MissingLeft,

    /// No element has the requested right value
    #[error("no element with the requested right value")]
    MissingRight,

    /// Memory for a new element (or a copy of the map) could not be obtained
    #[error("memory allocation failed")]
    AllocFailed,
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::AllocFailed
    }
}

/// Shorthand for results carrying the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
