//! Editable site page content.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ebookdes_catalog::{PageContent, PageContentUpdate, PageType};
use ebookdes_core::UserId;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::decode_error;

#[derive(FromRow)]
struct PageContentRow {
    page_type: String,
    content: serde_json::Value,
    updated_by: Option<Uuid>,
    updated_at: Option<DateTime<Utc>>,
}

impl PageContentRow {
    fn try_into_content(self) -> Result<PageContent, sqlx::Error> {
        let page_type: PageType = self
            .page_type
            .parse()
            .map_err(|e| decode_error("page type", &self.page_type, e))?;
        // Non-string values are skipped rather than failing the page.
        let content: BTreeMap<String, String> = match self.content {
            serde_json::Value::Object(map) => map
                .into_iter()
                .filter_map(|(k, v)| match v {
                    serde_json::Value::String(s) => Some((k, s)),
                    _ => None,
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        Ok(PageContent {
            page_type,
            content,
            updated_by: self.updated_by.map(UserId::from_uuid),
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PageContentRepository {
    pool: PgPool,
}

impl PageContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, page_type: PageType) -> Result<Option<PageContent>, sqlx::Error> {
        let row: Option<PageContentRow> = sqlx::query_as(
            r#"
            SELECT page_type, content, updated_by, updated_at
            FROM page_content
            WHERE page_type = $1
            "#,
        )
        .bind(page_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PageContentRow::try_into_content).transpose()
    }

    /// Merges the submitted keys into the stored map in one statement.
    pub async fn upsert(
        &self,
        update: &PageContentUpdate,
        updated_by: UserId,
    ) -> Result<PageContent, sqlx::Error> {
        let content = serde_json::to_value(&update.content)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        let row: PageContentRow = sqlx::query_as(
            r#"
            INSERT INTO page_content (page_type, content, updated_by, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (page_type) DO UPDATE
            SET content = page_content.content || EXCLUDED.content,
                updated_by = EXCLUDED.updated_by,
                updated_at = EXCLUDED.updated_at
            RETURNING page_type, content, updated_by, updated_at
            "#,
        )
        .bind(update.page_type.as_str())
        .bind(content)
        .bind(updated_by.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        row.try_into_content()
    }
}
