//! Mutation entry points.
//!
//! Every state-changing operation follows the same sequence: guard
//! (identity, then role), validate the payload, run one store call. Each
//! step's failure ends the operation with a [`Failure`] the caller renders
//! as a message; nothing is retried.

use std::fmt;
use std::sync::Arc;

use ebookdes_authz::{GuardFailure, MutationGuard};
use ebookdes_core::EbookId;
use ebookdes_platform_access::{Role, SessionTokens, User};
use serde::Serialize;

use crate::store::{CatalogStore, StoreError};
use crate::validation::{
    DeleteForm, EbookForm, PageContentForm, ProgressForm, ValidationError, parse_ebook_id,
};

/// Why an action did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unauthorized,
    AccessDenied,
    ValidationError,
    NotFound,
    OperationFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Success {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    fn new(kind: FailureKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Failure {}

impl From<GuardFailure> for Failure {
    fn from(failure: GuardFailure) -> Self {
        match failure {
            GuardFailure::Unauthorized => {
                Self::new(FailureKind::Unauthorized, "Silakan masuk terlebih dahulu.")
            }
            GuardFailure::AccessDenied => Self::new(
                FailureKind::AccessDenied,
                "Akses ditolak. Hanya admin yang dapat melakukan tindakan ini.",
            ),
        }
    }
}

impl From<ValidationError> for Failure {
    fn from(err: ValidationError) -> Self {
        Self::new(FailureKind::ValidationError, err.message)
    }
}

/// Outcome of a mutation entry point.
pub type ActionOutcome = Result<Success, Failure>;

fn success(message: &str) -> ActionOutcome {
    Ok(Success {
        message: message.to_string(),
    })
}

fn store_failure(err: StoreError, operation: &str, failed: &str, not_found: &str) -> Failure {
    match err {
        StoreError::NotFound => Failure::new(FailureKind::NotFound, not_found),
        StoreError::Database { details } => {
            tracing::error!(operation, error = %details, "Catalog write failed");
            Failure::new(FailureKind::OperationFailed, failed)
        }
    }
}

const EBOOK_NOT_FOUND: &str = "eBook tidak ditemukan.";

/// Everything one request needs to run catalog operations.
///
/// Built per request from shared application state; holds no state of its
/// own beyond the caller's tokens and the identity the gate resolved.
#[derive(Clone)]
pub struct ActionContext {
    tokens: SessionTokens,
    user: Option<User>,
    guard: MutationGuard,
    store: Arc<dyn CatalogStore>,
}

impl ActionContext {
    #[must_use]
    pub fn new(
        tokens: SessionTokens,
        user: Option<User>,
        guard: MutationGuard,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            tokens,
            user,
            guard,
            store,
        }
    }

    /// Identity resolved by the request gate, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    #[must_use]
    pub fn guard(&self) -> &MutationGuard {
        &self.guard
    }

    /// Role of the gate-resolved user, for display. `None` when signed out.
    pub async fn role(&self) -> Option<Role> {
        match &self.user {
            Some(user) => Some(self.guard.role_of(user).await),
            None => None,
        }
    }

    pub async fn create_ebook(&self, form: &EbookForm) -> ActionOutcome {
        let admin = self.guard.require(&self.tokens, Role::Admin).await?;
        let ebook = form.validate()?;
        match self.store.insert_ebook(&ebook, admin.id()).await {
            Ok(created) => {
                tracing::info!(user_id = %admin.id(), ebook_id = %created.id, "eBook created");
                success("eBook berhasil ditambahkan.")
            }
            Err(e) => Err(store_failure(
                e,
                "create_ebook",
                "Gagal menambahkan eBook.",
                EBOOK_NOT_FOUND,
            )),
        }
    }

    pub async fn update_ebook(&self, form: &EbookForm) -> ActionOutcome {
        let admin = self.guard.require(&self.tokens, Role::Admin).await?;
        let changes = form.validate_changes()?;
        match self.store.update_ebook(changes.id, &changes.fields).await {
            Ok(_) => {
                tracing::info!(user_id = %admin.id(), ebook_id = %changes.id, "eBook updated");
                success("eBook berhasil diperbarui.")
            }
            Err(e) => Err(store_failure(
                e,
                "update_ebook",
                "Gagal mengubah eBook.",
                EBOOK_NOT_FOUND,
            )),
        }
    }

    pub async fn delete_ebook(&self, form: &DeleteForm) -> ActionOutcome {
        let admin = self.guard.require(&self.tokens, Role::Admin).await?;
        let id = parse_ebook_id(form.id.as_deref())?;
        match self.store.delete_ebook(id).await {
            Ok(()) => {
                tracing::info!(user_id = %admin.id(), ebook_id = %id, "eBook deleted");
                success("eBook berhasil dihapus.")
            }
            Err(e) => Err(store_failure(
                e,
                "delete_ebook",
                "Gagal menghapus eBook.",
                EBOOK_NOT_FOUND,
            )),
        }
    }

    /// Records the caller's own position in a book.
    ///
    /// Any signed-in user may do this; the row is always keyed by the
    /// session's user, never by anything in the payload.
    pub async fn update_reading_progress(
        &self,
        ebook_id: EbookId,
        form: &ProgressForm,
    ) -> ActionOutcome {
        let reader = self.guard.require(&self.tokens, Role::User).await?;
        let update = form.validate(ebook_id)?;
        match self.store.upsert_progress(reader.id(), &update).await {
            Ok(_) => success("Progres membaca disimpan."),
            Err(e) => Err(store_failure(
                e,
                "update_reading_progress",
                "Gagal menyimpan progres membaca.",
                EBOOK_NOT_FOUND,
            )),
        }
    }

    pub async fn update_page_content(&self, form: &PageContentForm) -> ActionOutcome {
        let admin = self.guard.require(&self.tokens, Role::Admin).await?;
        let update = form.validate()?;
        match self.store.upsert_page_content(&update, admin.id()).await {
            Ok(_) => {
                tracing::info!(
                    user_id = %admin.id(),
                    page_type = %update.page_type,
                    "Page content updated"
                );
                success("Konten halaman berhasil diperbarui.")
            }
            Err(e) => Err(store_failure(
                e,
                "update_page_content",
                "Gagal memperbarui konten halaman.",
                "Halaman tidak ditemukan.",
            )),
        }
    }

    /// Self-service promotion is disabled. Admins are provisioned directly
    /// in the database.
    pub async fn promote_self_to_admin(&self) -> ActionOutcome {
        if let Some(user) = &self.user {
            tracing::warn!(user_id = %user.id(), "Self-promotion to admin attempted");
        }
        Err(Failure::new(
            FailureKind::AccessDenied,
            "Fitur ini dinonaktifkan. Hubungi administrator.",
        ))
    }
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("user", &self.user.as_ref().map(User::id))
            .finish_non_exhaustive()
    }
}
