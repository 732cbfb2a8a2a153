//! Page handlers for the application.
//!
//! Each handler gathers what its page shows and returns it as a JSON
//! document, or performs a form action and redirects back with the outcome.

pub mod admin;
pub mod home;
pub mod library;
