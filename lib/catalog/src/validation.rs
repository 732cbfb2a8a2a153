//! Payload validation for catalog mutations.
//!
//! Forms arrive as loose string maps. Each `*Form` type deserializes
//! leniently (every field optional) and `validate` turns it into the typed
//! value a store accepts, or names the first field that is wrong.

use std::collections::BTreeMap;
use std::fmt;

use ebookdes_core::EbookId;
use serde::Deserialize;
use url::Url;

use crate::model::{EbookChanges, NewEbook, PageContentUpdate, PageType, ProgressUpdate};

/// A payload field is missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidationError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl std::error::Error for ValidationError {}

/// A non-blank value, kept exactly as submitted.
fn present(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

fn required(
    value: Option<&String>,
    field: &'static str,
    message: &'static str,
) -> Result<String, ValidationError> {
    present(value).ok_or(ValidationError::new(field, message))
}

fn web_url(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
}

/// Parses an e-book identifier from a form value.
///
/// # Errors
///
/// Fails unless the value is a UUID.
pub fn parse_ebook_id(raw: Option<&str>) -> Result<EbookId, ValidationError> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
        .ok_or(ValidationError::new("id", "ID eBook tidak valid."))
}

/// Create or update form for an e-book. `link` is used when `pdf_url` is
/// blank.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EbookForm {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl EbookForm {
    /// Validates the fields of a new e-book.
    ///
    /// # Errors
    ///
    /// Title, author and a web URL for the document are required; a cover
    /// URL, when given, must also be a web URL.
    pub fn validate(&self) -> Result<NewEbook, ValidationError> {
        let title = required(self.title.as_ref(), "title", "Judul wajib diisi.")?;
        let author = required(self.author.as_ref(), "author", "Penulis wajib diisi.")?;
        let pdf_url = present(self.pdf_url.as_ref())
            .or_else(|| present(self.link.as_ref()))
            .ok_or(ValidationError::new("pdf_url", "Link PDF wajib diisi."))?;
        if !web_url(&pdf_url) {
            return Err(ValidationError::new("pdf_url", "Link PDF tidak valid."));
        }
        let cover_image_url = present(self.cover_image_url.as_ref());
        if cover_image_url.as_deref().is_some_and(|u| !web_url(u)) {
            return Err(ValidationError::new(
                "cover_image_url",
                "Link gambar sampul tidak valid.",
            ));
        }

        Ok(NewEbook {
            title,
            author,
            description: present(self.description.as_ref()),
            genre: present(self.genre.as_ref()),
            cover_image_url,
            pdf_url,
        })
    }

    /// Validates an update: a valid target ID plus the same field rules.
    ///
    /// # Errors
    ///
    /// See [`parse_ebook_id`] and [`EbookForm::validate`].
    pub fn validate_changes(&self) -> Result<EbookChanges, ValidationError> {
        let id = parse_ebook_id(self.id.as_deref())?;
        Ok(EbookChanges {
            id,
            fields: self.validate()?,
        })
    }
}

/// Delete form: only the target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    pub id: Option<String>,
}

/// Progress report sent by the reader on every page turn.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressForm {
    #[serde(default, alias = "currentPage")]
    pub current_page: Option<i64>,
    #[serde(default, alias = "totalPages")]
    pub total_pages: Option<i64>,
}

impl ProgressForm {
    /// # Errors
    ///
    /// Both page numbers must be positive and the current page may not be
    /// past the last one.
    pub fn validate(&self, ebook_id: EbookId) -> Result<ProgressUpdate, ValidationError> {
        let page = |v: Option<i64>, field| {
            v.filter(|n| *n >= 1)
                .and_then(|n| i32::try_from(n).ok())
                .ok_or(ValidationError::new(field, "Nomor halaman tidak valid."))
        };
        let current_page = page(self.current_page, "current_page")?;
        let total_pages = page(self.total_pages, "total_pages")?;
        if current_page > total_pages {
            return Err(ValidationError::new(
                "current_page",
                "Halaman melebihi jumlah halaman.",
            ));
        }
        Ok(ProgressUpdate {
            ebook_id,
            current_page,
            total_pages,
        })
    }
}

/// Site content form: the page plus whichever of its keys were submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageContentForm {
    #[serde(default)]
    pub page_type: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl PageContentForm {
    /// Keeps only the keys defined for the page; other fields are dropped.
    ///
    /// # Errors
    ///
    /// Unknown page type, or none of the page's keys submitted.
    pub fn validate(&self) -> Result<PageContentUpdate, ValidationError> {
        let page_type: PageType = self
            .page_type
            .as_deref()
            .and_then(|v| v.parse().ok())
            .ok_or(ValidationError::new("page_type", "Jenis halaman tidak dikenal."))?;

        let content: BTreeMap<String, String> = page_type
            .keys()
            .iter()
            .filter_map(|key| {
                present(self.fields.get(*key)).map(|value| ((*key).to_string(), value))
            })
            .collect();
        if content.is_empty() {
            return Err(ValidationError::new("content", "Konten halaman wajib diisi."));
        }

        Ok(PageContentUpdate { page_type, content })
    }
}
