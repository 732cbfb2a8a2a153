//! Reading progress, scoped to the caller.
//!
//! Every statement here runs inside a transaction that first assumes the
//! authenticated database role and records the caller's id, so the row
//! policy on `reading_progress` decides which rows are visible. Both
//! settings are transaction-local and vanish on commit or rollback.

use chrono::{DateTime, Utc};
use ebookdes_catalog::{EbookSummary, ProgressEntry, ProgressUpdate, ReadingProgress};
use ebookdes_core::{EbookId, UserId};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(FromRow)]
struct ProgressRow {
    user_id: Uuid,
    ebook_id: Uuid,
    current_page: i32,
    total_pages: i32,
    last_read_at: DateTime<Utc>,
}

impl From<ProgressRow> for ReadingProgress {
    fn from(row: ProgressRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            ebook_id: EbookId::from_uuid(row.ebook_id),
            current_page: row.current_page,
            total_pages: row.total_pages,
            last_read_at: row.last_read_at,
        }
    }
}

/// Progress joined with the book it belongs to.
#[derive(FromRow)]
struct EntryRow {
    #[sqlx(flatten)]
    progress: ProgressRow,
    title: Option<String>,
    author: Option<String>,
    cover_image_url: Option<String>,
}

impl From<EntryRow> for ProgressEntry {
    fn from(row: EntryRow) -> Self {
        let ebook_id = EbookId::from_uuid(row.progress.ebook_id);
        let ebook = match (row.title, row.author) {
            (Some(title), Some(author)) => Some(EbookSummary {
                id: ebook_id,
                title,
                author,
                cover_image_url: row.cover_image_url,
            }),
            _ => None,
        };
        Self::new(row.progress.into(), ebook)
    }
}

/// Quotes a role name for use in `SET ROLE`.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[derive(Debug, Clone)]
pub struct ProgressRepository {
    pool: PgPool,
    authenticated_role: String,
}

impl ProgressRepository {
    pub fn new(pool: PgPool, authenticated_role: String) -> Self {
        Self {
            pool,
            authenticated_role,
        }
    }

    /// Whether the pool's login role may `SET ROLE` to the authenticated role.
    pub async fn can_assume_role(&self) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT pg_has_role(current_user, $1, 'MEMBER')")
            .bind(&self.authenticated_role)
            .fetch_one(&self.pool)
            .await
    }

    /// Opens a transaction running as the authenticated role on behalf of
    /// `user_id`.
    async fn scoped(&self, user_id: UserId) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT set_config('request.jwt.claim.sub', $1, true)")
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await?;
        let set_role = format!("SET LOCAL ROLE {}", quote_ident(&self.authenticated_role));
        sqlx::query(&set_role).execute(&mut *tx).await?;

        Ok(tx)
    }

    pub async fn find(
        &self,
        user_id: UserId,
        ebook_id: EbookId,
    ) -> Result<Option<ReadingProgress>, sqlx::Error> {
        let mut tx = self.scoped(user_id).await?;
        let row: Option<ProgressRow> = sqlx::query_as(
            r#"
            SELECT user_id, ebook_id, current_page, total_pages, last_read_at
            FROM reading_progress
            WHERE user_id = $1 AND ebook_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(ebook_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(row.map(ReadingProgress::from))
    }

    /// Most recently read first.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ProgressEntry>, sqlx::Error> {
        let mut tx = self.scoped(user_id).await?;
        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"
            SELECT p.user_id, p.ebook_id, p.current_page, p.total_pages, p.last_read_at,
                   e.title, e.author, e.cover_image_url
            FROM reading_progress p
            LEFT JOIN ebooks e ON e.id = p.ebook_id
            WHERE p.user_id = $1
            ORDER BY p.last_read_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(rows.into_iter().map(ProgressEntry::from).collect())
    }

    /// One row per `(user, ebook)`; a repeat report overwrites the last one.
    pub async fn upsert(
        &self,
        user_id: UserId,
        update: &ProgressUpdate,
    ) -> Result<ReadingProgress, sqlx::Error> {
        let mut tx = self.scoped(user_id).await?;
        let row: ProgressRow = sqlx::query_as(
            r#"
            INSERT INTO reading_progress (user_id, ebook_id, current_page, total_pages, last_read_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id, ebook_id) DO UPDATE
            SET current_page = EXCLUDED.current_page,
                total_pages = EXCLUDED.total_pages,
                last_read_at = EXCLUDED.last_read_at
            RETURNING user_id, ebook_id, current_page, total_pages, last_read_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(update.ebook_id.as_uuid())
        .bind(update.current_page)
        .bind(update.total_pages)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(row.into())
    }
}
