//! Postgres repositories for the EbookDes catalog.
//!
//! This module provides data access for:
//! - E-books (elevated access)
//! - Role rows and profile mirrors (elevated access)
//! - Reading progress (scoped to the caller, row policy applies)
//! - Editable page content (elevated access)
//!
//! [`PgCatalogStore`] composes the repositories behind the `CatalogStore`
//! trait the catalog crate defines.

pub mod ebook;
pub mod page_content;
pub mod profile;
pub mod progress;
pub mod role;

pub use ebook::EbookRepository;
pub use page_content::PageContentRepository;
pub use profile::ProfileRepository;
pub use progress::ProgressRepository;
pub use role::RoleRepository;

use async_trait::async_trait;
use ebookdes_catalog::{
    CatalogStore, Ebook, NewEbook, PageContent, PageContentUpdate, PageType, ProgressEntry,
    ProgressUpdate, ReadingProgress, StoreError,
};
use ebookdes_core::{EbookId, UserId};
use sqlx::PgPool;

/// Postgres SQLSTATE for a foreign key violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Maps a driver error onto the catalog's storage error.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
            StoreError::NotFound
        }
        _ => StoreError::Database {
            details: err.to_string(),
        },
    }
}

pub(crate) fn decode_error(column: &str, value: &str, reason: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("invalid {column} '{value}': {reason}"),
    )))
}

/// Catalog store over a shared pool.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
    ebooks: EbookRepository,
    progress: ProgressRepository,
    pages: PageContentRepository,
}

impl PgCatalogStore {
    /// `authenticated_role` is the database role progress queries run as.
    #[must_use]
    pub fn new(pool: PgPool, authenticated_role: String) -> Self {
        Self {
            ebooks: EbookRepository::new(pool.clone()),
            progress: ProgressRepository::new(pool.clone(), authenticated_role),
            pages: PageContentRepository::new(pool.clone()),
            pool,
        }
    }

    /// Checks that scoped progress queries will be able to switch roles.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the check itself fails, for example when
    /// the role does not exist.
    pub async fn can_assume_scoped_role(&self) -> Result<bool, sqlx::Error> {
        self.progress.can_assume_role().await
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn list_ebooks(&self, limit: Option<i64>) -> Result<Vec<Ebook>, StoreError> {
        self.ebooks.list(limit).await.map_err(store_error)
    }

    async fn get_ebook(&self, id: EbookId) -> Result<Option<Ebook>, StoreError> {
        self.ebooks.find_by_id(id).await.map_err(store_error)
    }

    async fn insert_ebook(&self, ebook: &NewEbook, created_by: UserId) -> Result<Ebook, StoreError> {
        self.ebooks.create(ebook, created_by).await.map_err(store_error)
    }

    async fn update_ebook(&self, id: EbookId, fields: &NewEbook) -> Result<Ebook, StoreError> {
        self.ebooks
            .update(id, fields)
            .await
            .map_err(store_error)?
            .ok_or(StoreError::NotFound)
    }

    async fn delete_ebook(&self, id: EbookId) -> Result<(), StoreError> {
        match self.ebooks.delete(id).await.map_err(store_error)? {
            0 => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }

    async fn get_progress(
        &self,
        user_id: UserId,
        ebook_id: EbookId,
    ) -> Result<Option<ReadingProgress>, StoreError> {
        self.progress.find(user_id, ebook_id).await.map_err(store_error)
    }

    async fn progress_for_user(&self, user_id: UserId) -> Result<Vec<ProgressEntry>, StoreError> {
        self.progress.list_for_user(user_id).await.map_err(store_error)
    }

    async fn upsert_progress(
        &self,
        user_id: UserId,
        update: &ProgressUpdate,
    ) -> Result<ReadingProgress, StoreError> {
        self.progress.upsert(user_id, update).await.map_err(store_error)
    }

    async fn get_page_content(
        &self,
        page_type: PageType,
    ) -> Result<Option<PageContent>, StoreError> {
        self.pages.find(page_type).await.map_err(store_error)
    }

    async fn upsert_page_content(
        &self,
        update: &PageContentUpdate,
        updated_by: UserId,
    ) -> Result<PageContent, StoreError> {
        self.pages.upsert(update, updated_by).await.map_err(store_error)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            store_error(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn other_errors_keep_details() {
        let err = store_error(sqlx::Error::PoolTimedOut);
        match err {
            StoreError::Database { details } => assert!(details.contains("timed out")),
            StoreError::NotFound => panic!("expected database error"),
        }
    }
}
