//! Authentication for the EbookDes server.
//!
//! This module provides:
//! - The request gate, run as axum middleware on every route
//! - Sign-in, sign-up, sign-out and password flows against the hosted
//!   identity service
//! - Google sign-in through the provider's PKCE authorization flow
//!
//! # Authorization Model
//!
//! Identity comes from the access token in the session cookies and is
//! validated locally on each request. Roles are never taken from the token:
//! mutating handlers go through the catalog's guarded entry points, which
//! look the caller's role up in the database at the moment of the write.

pub mod cookies;
pub mod middleware;
pub mod provider;
pub mod routes;

use std::sync::Arc;

use chrono::Duration;
use ebookdes_authz::{MutationGuard, RoleStore};
use ebookdes_catalog::{ActionContext, CatalogStore};
use ebookdes_platform_access::{
    Gate, IdentityProvider, IdentityProviderConfig, ProfileStore, RoutePolicy, SessionResolver,
    SessionTokens, TokenVerifier, User,
};

use crate::config::SessionConfig;

pub use middleware::gate;
pub use provider::HostedAuthClient;

/// Shared application state.
pub struct AppState {
    /// Request gate.
    pub gate: Gate,
    /// Role check in front of catalog writes.
    pub guard: MutationGuard,
    /// Hosted identity service.
    pub provider: Arc<dyn IdentityProvider>,
    /// Catalog persistence.
    pub store: Arc<dyn CatalogStore>,
    /// Profile mirror.
    pub profiles: Arc<dyn ProfileStore>,
    /// Identity provider configuration.
    pub auth_config: IdentityProviderConfig,
    /// Session cookie configuration.
    pub session_config: SessionConfig,
}

impl AppState {
    /// Wires the gate and guard around the given backends.
    pub fn new(
        auth_config: IdentityProviderConfig,
        session_config: SessionConfig,
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn CatalogStore>,
        roles: Arc<dyn RoleStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        let verifier = TokenVerifier::new(
            auth_config.jwt_secret(),
            auth_config.audience(),
            Duration::seconds(session_config.refresh_margin_seconds),
        );
        let resolver = SessionResolver::new(verifier, provider.clone());
        Self {
            gate: Gate::new(resolver.clone(), RoutePolicy::default()),
            guard: MutationGuard::new(resolver, roles),
            provider,
            store,
            profiles,
            auth_config,
            session_config,
        }
    }

    /// Request-scoped context for catalog reads and guarded writes.
    pub fn action_context(&self, tokens: SessionTokens, user: Option<User>) -> ActionContext {
        ActionContext::new(tokens, user, self.guard.clone(), self.store.clone())
    }

    /// Mirrors the provider's view of `user` into the profile table.
    ///
    /// A failure is logged; the sign-in it follows still succeeds.
    pub async fn mirror_profile(&self, user: &User) {
        if let Err(e) = self.profiles.upsert_profile(user).await {
            tracing::warn!(user_id = %user.id(), error = %e, "Failed to mirror profile");
        }
    }
}
