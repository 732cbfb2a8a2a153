//! E-book catalog for EbookDes.
//!
//! Models for e-books, reading progress and editable site pages, the
//! validation applied to submitted forms, the `CatalogStore` persistence
//! seam, and the guarded mutation entry points on [`ActionContext`].

pub mod action;
pub mod model;
pub mod store;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use action::{ActionContext, ActionOutcome, Failure, FailureKind, Success};
pub use model::{
    Ebook, EbookChanges, EbookSummary, NewEbook, PageContent, PageContentUpdate, PageType,
    ProgressEntry, ProgressUpdate, ReadingProgress,
};
pub use store::{CatalogStore, StoreError};
pub use validation::{
    DeleteForm, EbookForm, PageContentForm, ProgressForm, ValidationError, parse_ebook_id,
};
