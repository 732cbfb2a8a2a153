//! Admin-mutation guard for EbookDes.
//!
//! Every state-changing catalog operation first passes through
//! [`MutationGuard::require`], which re-resolves the caller from their
//! session tokens and checks their role row before any write happens.

mod error;
mod guard;
mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{GuardFailure, RoleStoreError};
pub use guard::MutationGuard;
pub use store::RoleStore;
