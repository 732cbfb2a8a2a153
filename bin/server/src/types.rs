//! Response documents returned by the page handlers.

use ebookdes_catalog::{Ebook, PageContent, ProgressEntry, ReadingProgress};
use ebookdes_core::UserId;
use ebookdes_platform_access::Role;
use serde::Serialize;

use crate::server_helpers::FlashQuery;

/// User info for display.
#[derive(Clone, Debug, Serialize)]
pub struct UserInfo {
    pub id: UserId,
    pub display_name: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub is_admin: bool,
}

/// `GET /`, `GET /about`.
#[derive(Debug, Serialize)]
pub struct SitePage {
    pub page: PageContent,
    pub user: Option<UserInfo>,
}

/// `GET /book`.
#[derive(Debug, Serialize)]
pub struct FeaturedBooks {
    pub ebooks: Vec<Ebook>,
}

/// `GET /dashboard`.
#[derive(Debug, Serialize)]
pub struct Library {
    pub user: UserInfo,
    pub is_admin: bool,
    pub ebooks: Vec<Ebook>,
    pub progress: Vec<ProgressEntry>,
    #[serde(flatten)]
    pub flash: FlashQuery,
}

/// `GET /read/{id}`.
#[derive(Debug, Serialize)]
pub struct Reader {
    pub ebook: Ebook,
    pub progress: Option<ReadingProgress>,
    pub percent: u8,
}

/// JSON answer to a reader-side action.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionReply {
    Success { message: String },
    Error { kind: ebookdes_catalog::FailureKind, message: String },
}
