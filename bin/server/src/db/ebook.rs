//! Database repository for e-books.

use chrono::{DateTime, Utc};
use ebookdes_catalog::{Ebook, NewEbook};
use ebookdes_core::{EbookId, UserId};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Row type for e-book queries.
#[derive(FromRow)]
struct EbookRow {
    id: Uuid,
    title: String,
    author: String,
    description: Option<String>,
    genre: Option<String>,
    cover_image_url: Option<String>,
    pdf_url: String,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EbookRow> for Ebook {
    fn from(row: EbookRow) -> Self {
        Self {
            id: EbookId::from_uuid(row.id),
            title: row.title,
            author: row.author,
            description: row.description,
            genre: row.genre,
            cover_image_url: row.cover_image_url,
            pdf_url: row.pdf_url,
            created_by: row.created_by.map(UserId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, title, author, description, genre, cover_image_url, pdf_url, \
                       created_by, created_at, updated_at";

/// Repository for e-book rows. Connects with elevated access.
#[derive(Debug, Clone)]
pub struct EbookRepository {
    pool: PgPool,
}

impl EbookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Newest first.
    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<Ebook>, sqlx::Error> {
        let rows: Vec<EbookRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM ebooks ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Ebook::from).collect())
    }

    pub async fn find_by_id(&self, id: EbookId) -> Result<Option<Ebook>, sqlx::Error> {
        let row: Option<EbookRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM ebooks WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Ebook::from))
    }

    pub async fn create(&self, ebook: &NewEbook, created_by: UserId) -> Result<Ebook, sqlx::Error> {
        let row: EbookRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO ebooks (id, title, author, description, genre, cover_image_url, pdf_url, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(EbookId::new().as_uuid())
        .bind(&ebook.title)
        .bind(&ebook.author)
        .bind(&ebook.description)
        .bind(&ebook.genre)
        .bind(&ebook.cover_image_url)
        .bind(&ebook.pdf_url)
        .bind(created_by.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Replaces the editable fields. `None` if no row has `id`.
    pub async fn update(&self, id: EbookId, fields: &NewEbook) -> Result<Option<Ebook>, sqlx::Error> {
        let row: Option<EbookRow> = sqlx::query_as(&format!(
            r#"
            UPDATE ebooks
            SET title = $2, author = $3, description = $4, genre = $5,
                cover_image_url = $6, pdf_url = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(&fields.title)
        .bind(&fields.author)
        .bind(&fields.description)
        .bind(&fields.genre)
        .bind(&fields.cover_image_url)
        .bind(&fields.pdf_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Ebook::from))
    }

    /// Returns the number of rows removed.
    pub async fn delete(&self, id: EbookId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ebooks WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
