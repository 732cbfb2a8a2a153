//! Catalog domain types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ebookdes_core::{EbookId, UserId};
use serde::{Deserialize, Serialize};

/// An e-book in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ebook {
    pub id: EbookId,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub cover_image_url: Option<String>,
    pub pdf_url: String,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ebook {
    /// The fields shown next to a reading-progress entry.
    #[must_use]
    pub fn summary(&self) -> EbookSummary {
        EbookSummary {
            id: self.id,
            title: self.title.clone(),
            author: self.author.clone(),
            cover_image_url: self.cover_image_url.clone(),
        }
    }
}

/// Validated fields for creating or replacing an e-book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEbook {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub cover_image_url: Option<String>,
    pub pdf_url: String,
}

/// A validated update: the target and its new field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EbookChanges {
    pub id: EbookId,
    pub fields: NewEbook,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbookSummary {
    pub id: EbookId,
    pub title: String,
    pub author: String,
    pub cover_image_url: Option<String>,
}

/// Where a user is in a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingProgress {
    pub user_id: UserId,
    pub ebook_id: EbookId,
    pub current_page: i32,
    pub total_pages: i32,
    pub last_read_at: DateTime<Utc>,
}

impl ReadingProgress {
    /// Whole-number percentage read, capped at 100.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total_pages <= 0 {
            return 0;
        }
        let pct = i64::from(self.current_page) * 100 / i64::from(self.total_pages);
        u8::try_from(pct.clamp(0, 100)).unwrap_or(100)
    }
}

/// A progress row with the book it belongs to, for the library page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    #[serde(flatten)]
    pub progress: ReadingProgress,
    pub percent: u8,
    pub ebook: Option<EbookSummary>,
}

impl ProgressEntry {
    #[must_use]
    pub fn new(progress: ReadingProgress, ebook: Option<EbookSummary>) -> Self {
        Self {
            percent: progress.percent(),
            progress,
            ebook,
        }
    }
}

/// A validated progress report from the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub ebook_id: EbookId,
    pub current_page: i32,
    pub total_pages: i32,
}

/// Editable site pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Homepage,
    About,
}

impl PageType {
    pub const ALL: [PageType; 2] = [Self::Homepage, Self::About];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Homepage => "homepage",
            Self::About => "about",
        }
    }

    /// Content keys an editor may set for this page.
    #[must_use]
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            Self::Homepage => &["app_name", "hero_title", "hero_description"],
            Self::About => &["about_title", "about_description"],
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a page type string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPageType(pub String);

impl fmt::Display for UnknownPageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown page type: {}", self.0)
    }
}

impl std::error::Error for UnknownPageType {}

impl FromStr for PageType {
    type Err = UnknownPageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "homepage" => Ok(Self::Homepage),
            "about" => Ok(Self::About),
            other => Err(UnknownPageType(other.to_string())),
        }
    }
}

/// Editable text for a site page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub page_type: PageType,
    pub content: BTreeMap<String, String>,
    pub updated_by: Option<UserId>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PageContent {
    /// Text shown before an admin has edited the page.
    #[must_use]
    pub fn defaults(page_type: PageType) -> Self {
        let pairs: &[(&str, &str)] = match page_type {
            PageType::Homepage => &[
                ("app_name", "EbookDes"),
                ("hero_title", "Baca eBook Favoritmu Kapan Saja"),
                (
                    "hero_description",
                    "Jelajahi koleksi eBook dan lanjutkan bacaan tepat di halaman terakhir.",
                ),
            ],
            PageType::About => &[
                ("about_title", "Tentang EbookDes"),
                (
                    "about_description",
                    "EbookDes adalah perpustakaan digital untuk membaca eBook secara online.",
                ),
            ],
        };
        Self {
            page_type,
            content: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            updated_by: None,
            updated_at: None,
        }
    }

    /// Overlays stored values on the defaults so every key is present.
    #[must_use]
    pub fn with_defaults(stored: Option<Self>, page_type: PageType) -> Self {
        let mut page = Self::defaults(page_type);
        if let Some(stored) = stored {
            page.content.extend(
                stored
                    .content
                    .into_iter()
                    .filter(|(_, v)| !v.trim().is_empty()),
            );
            page.updated_by = stored.updated_by;
            page.updated_at = stored.updated_at;
        }
        page
    }
}

/// A validated content update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContentUpdate {
    pub page_type: PageType,
    pub content: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(current: i32, total: i32) -> ReadingProgress {
        ReadingProgress {
            user_id: UserId::new(),
            ebook_id: EbookId::new(),
            current_page: current,
            total_pages: total,
            last_read_at: Utc::now(),
        }
    }

    #[test]
    fn percent_rounds_down_and_caps() {
        assert_eq!(progress(1, 3).percent(), 33);
        assert_eq!(progress(3, 3).percent(), 100);
        assert_eq!(progress(9, 3).percent(), 100);
        assert_eq!(progress(1, 0).percent(), 0);
    }

    #[test]
    fn page_type_parses_known_values() {
        assert_eq!("homepage".parse::<PageType>(), Ok(PageType::Homepage));
        assert_eq!(" about ".parse::<PageType>(), Ok(PageType::About));
        assert!("contact".parse::<PageType>().is_err());
    }

    #[test]
    fn defaults_cover_every_key() {
        for page_type in PageType::ALL {
            let page = PageContent::defaults(page_type);
            for key in page_type.keys() {
                assert!(page.content.contains_key(*key), "{page_type} missing {key}");
            }
        }
    }

    #[test]
    fn stored_values_override_defaults() {
        let mut content = BTreeMap::new();
        content.insert("hero_title".to_string(), "Selamat Datang".to_string());
        content.insert("app_name".to_string(), "   ".to_string());
        let stored = PageContent {
            page_type: PageType::Homepage,
            content,
            updated_by: None,
            updated_at: None,
        };

        let page = PageContent::with_defaults(Some(stored), PageType::Homepage);
        assert_eq!(page.content["hero_title"], "Selamat Datang");
        assert_eq!(page.content["app_name"], "EbookDes");
    }

    #[test]
    fn progress_entry_serializes_flat() {
        let entry = ProgressEntry::new(progress(5, 10), None);
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json["current_page"], 5);
        assert_eq!(json["percent"], 50);
    }
}
