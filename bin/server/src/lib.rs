//! EbookDes web server.
//!
//! This crate provides the axum application for the EbookDes e-book
//! catalog: the request gate, authentication routes against the hosted
//! identity service, Postgres repositories, and the page and form handlers.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod pages;
pub mod server_helpers;
pub mod types;
pub mod user;
