//! Persistence seam for the catalog.

use std::fmt;

use async_trait::async_trait;
use ebookdes_core::{EbookId, UserId};

use crate::model::{
    Ebook, NewEbook, PageContent, PageContentUpdate, PageType, ProgressEntry, ProgressUpdate,
    ReadingProgress,
};

/// Errors from catalog storage.
#[derive(Debug)]
pub enum StoreError {
    /// The targeted row does not exist.
    NotFound,
    /// The database rejected or failed the statement.
    Database {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "row not found"),
            Self::Database { details } => write!(f, "database error: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Catalog storage.
///
/// E-book, page-content and listing calls run with elevated access and must
/// only be reached after the guard has approved the caller. Progress calls
/// run scoped to `user_id`, so the database's row policy applies.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Newest first, optionally capped.
    async fn list_ebooks(&self, limit: Option<i64>) -> Result<Vec<Ebook>, StoreError>;

    async fn get_ebook(&self, id: EbookId) -> Result<Option<Ebook>, StoreError>;

    async fn insert_ebook(&self, ebook: &NewEbook, created_by: UserId)
    -> Result<Ebook, StoreError>;

    /// Replaces the editable fields. `NotFound` if `id` is absent.
    async fn update_ebook(&self, id: EbookId, fields: &NewEbook) -> Result<Ebook, StoreError>;

    /// `NotFound` if `id` is absent.
    async fn delete_ebook(&self, id: EbookId) -> Result<(), StoreError>;

    async fn get_progress(
        &self,
        user_id: UserId,
        ebook_id: EbookId,
    ) -> Result<Option<ReadingProgress>, StoreError>;

    async fn progress_for_user(&self, user_id: UserId) -> Result<Vec<ProgressEntry>, StoreError>;

    /// Inserts or overwrites the single row for `(user_id, update.ebook_id)`.
    /// `NotFound` if the e-book does not exist.
    async fn upsert_progress(
        &self,
        user_id: UserId,
        update: &ProgressUpdate,
    ) -> Result<ReadingProgress, StoreError>;

    async fn get_page_content(&self, page_type: PageType)
    -> Result<Option<PageContent>, StoreError>;

    /// Merges `update.content` into the stored map for the page.
    async fn upsert_page_content(
        &self,
        update: &PageContentUpdate,
        updated_by: UserId,
    ) -> Result<PageContent, StoreError>;

    /// Checks the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
