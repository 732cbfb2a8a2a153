//! Request authorization gate.
//!
//! Runs before routing on every non-static request. It resolves the
//! session (refreshing it if needed), decides what the response should do
//! with the session cookies, and redirects unauthenticated visitors away
//! from protected pages.

use crate::error::ErrorClass;
use crate::provider::SessionResolver;
use crate::session::SessionTokens;
use crate::user::User;

/// Which paths the gate protects, treats as auth pages, or skips entirely.
///
/// Prefix matching is segment-aware: `/dashboard` covers `/dashboard` and
/// `/dashboard/books` but not `/dashboards`.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    protected: Vec<String>,
    auth_pages: Vec<String>,
    bypass: Vec<String>,
    sign_in_path: String,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            protected: vec!["/dashboard".to_string(), "/read".to_string()],
            auth_pages: vec![
                "/sign-in".to_string(),
                "/sign-up".to_string(),
                "/forgot-password".to_string(),
                "/auth".to_string(),
                "/api/auth".to_string(),
            ],
            bypass: vec![
                "/public".to_string(),
                "/static".to_string(),
                "/favicon.ico".to_string(),
            ],
            sign_in_path: "/sign-in".to_string(),
        }
    }
}

impl RoutePolicy {
    #[must_use]
    pub fn new(
        protected: Vec<String>,
        auth_pages: Vec<String>,
        bypass: Vec<String>,
        sign_in_path: String,
    ) -> Self {
        Self {
            protected,
            auth_pages,
            bypass,
            sign_in_path,
        }
    }

    /// Pages that require a signed-in user.
    #[must_use]
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected.iter().any(|p| matches_prefix(path, p))
    }

    /// Pages used to establish a session. Never redirected to sign-in.
    #[must_use]
    pub fn is_auth_page(&self, path: &str) -> bool {
        self.auth_pages.iter().any(|p| matches_prefix(path, p))
    }

    /// Static assets the gate does not run for.
    #[must_use]
    pub fn bypasses(&self, path: &str) -> bool {
        self.bypass.iter().any(|p| matches_prefix(path, p))
    }

    #[must_use]
    pub fn sign_in_path(&self) -> &str {
        &self.sign_in_path
    }
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

/// What the response must do with the session cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieUpdate {
    Unchanged,
    /// Store the refreshed tokens.
    Replace(SessionTokens),
    /// Remove all session cookies.
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the request through to its handler.
    Proceed,
    /// Send the browser to the sign-in page.
    RedirectToSignIn,
}

/// The gate's verdict for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub user: Option<User>,
    pub cookies: CookieUpdate,
    pub decision: GateDecision,
}

/// Evaluates requests against a `RoutePolicy`.
#[derive(Debug, Clone)]
pub struct Gate {
    resolver: SessionResolver,
    policy: RoutePolicy,
}

impl Gate {
    #[must_use]
    pub fn new(resolver: SessionResolver, policy: RoutePolicy) -> Self {
        Self { resolver, policy }
    }

    #[must_use]
    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    #[must_use]
    pub fn resolver(&self) -> &SessionResolver {
        &self.resolver
    }

    /// Decides what happens to a request for `path` carrying `tokens`.
    pub async fn evaluate(&self, tokens: &SessionTokens, path: &str) -> GateOutcome {
        let mut outcome = GateOutcome {
            user: None,
            cookies: CookieUpdate::Unchanged,
            decision: GateDecision::Proceed,
        };

        match self.resolver.resolve(tokens).await {
            Ok(resolution) => {
                outcome.user = resolution.user;
                if let Some(refreshed) = resolution.refreshed {
                    outcome.cookies = CookieUpdate::Replace(refreshed);
                }
            }
            Err(e) => match e.class() {
                ErrorClass::Benign => {}
                ErrorClass::SessionInvalid => {
                    tracing::info!(path, error = %e, "Clearing unusable session");
                    outcome.cookies = CookieUpdate::Clear;
                    if !self.policy.is_auth_page(path) {
                        outcome.decision = GateDecision::RedirectToSignIn;
                        return outcome;
                    }
                }
                ErrorClass::Other => {
                    tracing::error!(path, error = %e, "Auth session error");
                }
            },
        }

        if outcome.user.is_none() && self.policy.is_protected(path) {
            outcome.decision = GateDecision::RedirectToSignIn;
        }
        outcome
    }
}
