//! Platform access for EbookDes: who is calling, and may they reach this route.
//!
//! This crate provides:
//! - User identity (`User`) as issued by the hosted identity provider
//! - Roles (`Role`) read from the role table
//! - Session tokens and access-token inspection (`SessionTokens`, `TokenVerifier`)
//! - The `IdentityProvider` seam and `SessionResolver` (validate, refresh)
//! - The request authorization gate (`Gate`, `RoutePolicy`)
//! - The `ProfileStore` seam for mirroring identities into the profile table
//!
//! # Example
//!
//! ```
//! use ebookdes_platform_access::{Role, RoutePolicy};
//!
//! let policy = RoutePolicy::default();
//! assert!(policy.is_protected("/dashboard"));
//! assert!(policy.is_auth_page("/sign-in"));
//! assert!(Role::from_row(Some("admin")).is_admin());
//! assert!(!Role::from_row(None).is_admin());
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod profile;
pub mod provider;
pub mod role;
pub mod session;
pub mod user;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types at crate root
pub use config::{IdentityProviderConfig, IdentityProviderConfigBuilder};
pub use error::{AuthenticationError, ErrorClass};
pub use gate::{CookieUpdate, Gate, GateDecision, GateOutcome, RoutePolicy};
pub use profile::{ProfileStore, ProfileStoreError};
pub use provider::{
    AuthSession, Credentials, IdentityProvider, OAuthRequest, SessionResolution, SessionResolver,
};
pub use role::Role;
pub use session::{AccessClaims, SessionTokens, TokenState, TokenVerifier, UserMetadata};
pub use user::User;
