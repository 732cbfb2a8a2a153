//! Guard error types.

use std::fmt;

/// Why the guard refused an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardFailure {
    /// No trustworthy identity on the request.
    Unauthorized,
    /// Identity known but lacking the required role.
    AccessDenied,
}

impl fmt::Display for GuardFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "caller is not authenticated"),
            Self::AccessDenied => write!(f, "caller lacks the required role"),
        }
    }
}

impl std::error::Error for GuardFailure {}

/// Role lookup failed.
#[derive(Debug)]
pub enum RoleStoreError {
    /// The backing store could not be queried.
    QueryFailed {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for RoleStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueryFailed { details } => write!(f, "role lookup failed: {details}"),
        }
    }
}

impl std::error::Error for RoleStoreError {}
