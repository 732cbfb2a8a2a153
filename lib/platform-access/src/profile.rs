//! Mirroring provider identities into the application's profile table.

use std::fmt;

use async_trait::async_trait;

use crate::user::User;

/// Profile write failed.
#[derive(Debug)]
pub struct ProfileStoreError {
    pub details: String,
}

impl fmt::Display for ProfileStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "profile upsert failed: {}", self.details)
    }
}

impl std::error::Error for ProfileStoreError {}

/// Keeps a profile row in step with what the identity provider reports.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Inserts or refreshes the row keyed by `user.id()`.
    async fn upsert_profile(&self, user: &User) -> Result<(), ProfileStoreError>;
}
