//! Core domain types and utilities for EbookDes.
//!
//! This crate provides the identifier types and the error-handling
//! foundation shared by every other crate in the workspace.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{EbookId, ParseIdError, UserId};
