//! Error types shared by topology construction, storage and caching.

use thiserror::Error;

/// Result alias using the crate-wide [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while building, loading or caching topologies.
///
/// Invariant violations inside a structure that was already built are not
/// represented here. They are debug assertions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The requested variant combination is not supported.
    #[error("not implemented: {0}")]
    NotImplemented(String),
    /// Malformed descriptor, unknown type name or inconsistent array lengths.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A stored structure no longer matches the live graph.
    #[error("stale topology: {0}")]
    Stale(String),
    /// The storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Shorthand for [`Error::NotImplemented`].
    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::NotImplemented(msg.into())
    }

    /// Shorthand for [`Error::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Shorthand for [`Error::Stale`].
    pub fn stale(msg: impl Into<String>) -> Self {
        Self::Stale(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_implemented("sort by destination type");
        assert_eq!(err.to_string(), "not implemented: sort by destination type");

        let err = Error::stale("type map size 3 != 2");
        assert_eq!(err.to_string(), "stale topology: type map size 3 != 2");
    }
}
