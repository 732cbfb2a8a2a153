//! In-memory catalog, role and profile store for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use ebookdes_authz::{RoleStore, RoleStoreError};
use ebookdes_core::{EbookId, UserId};
use ebookdes_platform_access::{ProfileStore, ProfileStoreError, User};

use crate::model::{
    Ebook, NewEbook, PageContent, PageContentUpdate, PageType, ProgressEntry, ProgressUpdate,
    ReadingProgress,
};
use crate::store::{CatalogStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    ebooks: Vec<Ebook>,
    progress: HashMap<(UserId, EbookId), ReadingProgress>,
    pages: HashMap<PageType, PageContent>,
    roles: HashMap<UserId, String>,
    profiles: HashMap<UserId, User>,
}

/// Catalog, role and profile store backed by maps.
///
/// Counts every write call it receives, successful or not, so tests can
/// assert that a rejected operation never reached storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    writes: AtomicUsize,
    role_lookups: AtomicUsize,
    failing_writes: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn set_role(&self, user_id: UserId, role: &str) {
        self.tables().roles.insert(user_id, role.to_string());
    }

    /// Makes every subsequent write fail with a database error.
    pub fn fail_writes(&self) {
        self.failing_writes.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Profile row mirrored for `user_id`, if any.
    #[must_use]
    pub fn profile(&self, user_id: UserId) -> Option<User> {
        self.tables().profiles.get(&user_id).cloned()
    }

    #[must_use]
    pub fn role_lookups(&self) -> usize {
        self.role_lookups.load(Ordering::SeqCst)
    }

    fn begin_write(&self) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database {
                details: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_ebooks(&self, limit: Option<i64>) -> Result<Vec<Ebook>, StoreError> {
        let mut ebooks = self.tables().ebooks.clone();
        ebooks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit.and_then(|l| usize::try_from(l).ok()) {
            ebooks.truncate(limit);
        }
        Ok(ebooks)
    }

    async fn get_ebook(&self, id: EbookId) -> Result<Option<Ebook>, StoreError> {
        Ok(self.tables().ebooks.iter().find(|e| e.id == id).cloned())
    }

    async fn insert_ebook(
        &self,
        ebook: &NewEbook,
        created_by: UserId,
    ) -> Result<Ebook, StoreError> {
        self.begin_write()?;
        let now = Utc::now();
        let created = Ebook {
            id: EbookId::new(),
            title: ebook.title.clone(),
            author: ebook.author.clone(),
            description: ebook.description.clone(),
            genre: ebook.genre.clone(),
            cover_image_url: ebook.cover_image_url.clone(),
            pdf_url: ebook.pdf_url.clone(),
            created_by: Some(created_by),
            created_at: now,
            updated_at: now,
        };
        self.tables().ebooks.push(created.clone());
        Ok(created)
    }

    async fn update_ebook(&self, id: EbookId, fields: &NewEbook) -> Result<Ebook, StoreError> {
        self.begin_write()?;
        let mut tables = self.tables();
        let ebook = tables
            .ebooks
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound)?;
        ebook.title = fields.title.clone();
        ebook.author = fields.author.clone();
        ebook.description = fields.description.clone();
        ebook.genre = fields.genre.clone();
        ebook.cover_image_url = fields.cover_image_url.clone();
        ebook.pdf_url = fields.pdf_url.clone();
        ebook.updated_at = Utc::now();
        Ok(ebook.clone())
    }

    async fn delete_ebook(&self, id: EbookId) -> Result<(), StoreError> {
        self.begin_write()?;
        let mut tables = self.tables();
        let before = tables.ebooks.len();
        tables.ebooks.retain(|e| e.id != id);
        if tables.ebooks.len() == before {
            return Err(StoreError::NotFound);
        }
        tables.progress.retain(|(_, ebook_id), _| *ebook_id != id);
        Ok(())
    }

    async fn get_progress(
        &self,
        user_id: UserId,
        ebook_id: EbookId,
    ) -> Result<Option<ReadingProgress>, StoreError> {
        Ok(self.tables().progress.get(&(user_id, ebook_id)).cloned())
    }

    async fn progress_for_user(&self, user_id: UserId) -> Result<Vec<ProgressEntry>, StoreError> {
        let tables = self.tables();
        let mut entries: Vec<ProgressEntry> = tables
            .progress
            .values()
            .filter(|p| p.user_id == user_id)
            .map(|p| {
                let ebook = tables
                    .ebooks
                    .iter()
                    .find(|e| e.id == p.ebook_id)
                    .map(Ebook::summary);
                ProgressEntry::new(p.clone(), ebook)
            })
            .collect();
        entries.sort_by(|a, b| b.progress.last_read_at.cmp(&a.progress.last_read_at));
        Ok(entries)
    }

    async fn upsert_progress(
        &self,
        user_id: UserId,
        update: &ProgressUpdate,
    ) -> Result<ReadingProgress, StoreError> {
        self.begin_write()?;
        let mut tables = self.tables();
        if !tables.ebooks.iter().any(|e| e.id == update.ebook_id) {
            return Err(StoreError::NotFound);
        }
        let progress = ReadingProgress {
            user_id,
            ebook_id: update.ebook_id,
            current_page: update.current_page,
            total_pages: update.total_pages,
            last_read_at: Utc::now(),
        };
        tables
            .progress
            .insert((user_id, update.ebook_id), progress.clone());
        Ok(progress)
    }

    async fn get_page_content(
        &self,
        page_type: PageType,
    ) -> Result<Option<PageContent>, StoreError> {
        Ok(self.tables().pages.get(&page_type).cloned())
    }

    async fn upsert_page_content(
        &self,
        update: &PageContentUpdate,
        updated_by: UserId,
    ) -> Result<PageContent, StoreError> {
        self.begin_write()?;
        let mut tables = self.tables();
        let page = tables
            .pages
            .entry(update.page_type)
            .or_insert_with(|| PageContent {
                page_type: update.page_type,
                content: BTreeMap::new(),
                updated_by: None,
                updated_at: None,
            });
        page.content
            .extend(update.content.iter().map(|(k, v)| (k.clone(), v.clone())));
        page.updated_by = Some(updated_by);
        page.updated_at = Some(Utc::now());
        Ok(page.clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_role(&self, user_id: UserId) -> Result<Option<String>, RoleStoreError> {
        self.role_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables().roles.get(&user_id).cloned())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn upsert_profile(&self, user: &User) -> Result<(), ProfileStoreError> {
        self.tables().profiles.insert(user.id(), user.clone());
        Ok(())
    }
}
