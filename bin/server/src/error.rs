//! Domain error types for server operations.
//!
//! Request-time failures are [`AppError`] values that log their details
//! and answer with a user-safe message. Startup failures are
//! [`StartupError`] values reported through `rootcause`.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ebookdes_catalog::StoreError;

/// Errors a read handler can end with.
#[derive(Debug)]
pub enum AppError {
    /// The catalog store failed.
    Store { operation: &'static str, details: String },
}

impl AppError {
    /// Wraps a store error with the operation it interrupted.
    pub fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |e| Self::Store {
            operation,
            details: e.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store { operation, details } => {
                write!(f, "store error during {operation}: {details}")
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::Store { operation, details } => {
                tracing::error!(operation, error = %details, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Terjadi kesalahan. Silakan coba lagi.",
                )
                    .into_response()
            }
        }
    }
}

/// Errors that stop the server from starting.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration is missing or invalid.
    Config { details: String },
    /// The database could not be reached.
    DatabaseConnect { details: String },
    /// Migrations failed to apply.
    Migrate { details: String },
    /// The pool user cannot switch to the role progress queries run as.
    ScopedRole { role: String, details: String },
    /// The identity provider client could not be built.
    IdentityProvider { details: String },
    /// The listen address could not be bound.
    Bind { addr: String, details: String },
    /// The server stopped with an error.
    Serve { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "failed to load configuration: {details}"),
            Self::DatabaseConnect { details } => {
                write!(f, "failed to connect to database: {details}")
            }
            Self::Migrate { details } => write!(f, "failed to run migrations: {details}"),
            Self::ScopedRole { role, details } => write!(
                f,
                "cannot assume database role {role} for scoped queries \
                 (GRANT {role} TO the connecting user): {details}"
            ),
            Self::IdentityProvider { details } => {
                write!(f, "failed to create identity provider client: {details}")
            }
            Self::Bind { addr, details } => write!(f, "failed to bind to {addr}: {details}"),
            Self::Serve { details } => write!(f, "server error: {details}"),
        }
    }
}

impl std::error::Error for StartupError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_answer_500_without_details() {
        let err = AppError::store("list_ebooks")(StoreError::Database {
            details: "connection reset".to_string(),
        });
        assert!(err.to_string().contains("connection reset"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn scoped_role_error_names_the_grant() {
        let err = StartupError::ScopedRole {
            role: "authenticated".to_string(),
            details: "connecting user is not a member of the role".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("GRANT authenticated TO"));
        assert!(text.contains("not a member"));
    }
}
