//! The identity provider seam and session resolution.
//!
//! `IdentityProvider` is the narrow set of calls made to the hosted
//! identity service. `SessionResolver` combines it with local token
//! inspection to answer "who is this request from", refreshing the session
//! when the access token is close to or past expiry.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AuthenticationError;
use crate::session::{SessionTokens, TokenState, TokenVerifier};
use crate::user::User;

/// A session issued by the provider along with the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub tokens: SessionTokens,
    pub user: User,
}

/// Email and password as submitted on a form.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    /// Display name, only used when registering.
    pub full_name: Option<String>,
}

/// Parameters for starting an external OAuth sign-in.
#[derive(Debug, Clone)]
pub struct OAuthRequest {
    /// Where the provider sends the browser back to.
    pub redirect_to: String,
    /// PKCE S256 challenge.
    pub code_challenge: String,
}

/// Result of resolving the tokens on a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionResolution {
    pub user: Option<User>,
    /// Set when the session was refreshed; the caller must store these.
    pub refreshed: Option<SessionTokens>,
}

/// Calls made to the hosted identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchanges a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthenticationError>;

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthSession, AuthenticationError>;

    /// Registers a new account. Returns `None` when the provider requires
    /// email confirmation before issuing a session.
    async fn sign_up(
        &self,
        credentials: &Credentials,
        email_redirect_to: &str,
    ) -> Result<Option<AuthSession>, AuthenticationError>;

    /// Revokes the session server-side.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthenticationError>;

    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), AuthenticationError>;

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), AuthenticationError>;

    /// URL to send the browser to for external OAuth sign-in.
    fn authorize_url(&self, request: &OAuthRequest) -> Result<String, AuthenticationError>;

    /// Completes an OAuth sign-in with the authorization code and PKCE verifier.
    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthenticationError>;
}

/// Resolves request tokens to a user.
#[derive(Clone)]
pub struct SessionResolver {
    verifier: TokenVerifier,
    provider: Arc<dyn IdentityProvider>,
}

impl SessionResolver {
    #[must_use]
    pub fn new(verifier: TokenVerifier, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { verifier, provider }
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    /// Validates the session and refreshes it if needed.
    ///
    /// A near-expiry token whose refresh fails still resolves to its user;
    /// the failure is logged and the old tokens stay in place.
    ///
    /// # Errors
    ///
    /// `SessionMissing` when no tokens were sent, and the session-invalid or
    /// provider errors otherwise.
    pub async fn resolve(
        &self,
        tokens: &SessionTokens,
    ) -> Result<SessionResolution, AuthenticationError> {
        if tokens.is_empty() {
            return Err(AuthenticationError::SessionMissing);
        }

        let state = tokens.access_token().map(|t| self.verifier.inspect(t));
        match state {
            Some(TokenState::Valid(claims)) => Ok(SessionResolution {
                user: Some(claims.to_user()?),
                refreshed: None,
            }),
            Some(TokenState::NearExpiry(claims)) => {
                let current = claims.to_user()?;
                let Some(refresh_token) = tokens.refresh_token() else {
                    return Ok(SessionResolution {
                        user: Some(current),
                        refreshed: None,
                    });
                };
                match self.provider.refresh_session(refresh_token).await {
                    Ok(session) => Ok(SessionResolution {
                        user: Some(session.user),
                        refreshed: Some(session.tokens),
                    }),
                    Err(e) => {
                        tracing::warn!(
                            user_id = %current.id(),
                            error = %e,
                            "Session refresh failed, keeping current token"
                        );
                        Ok(SessionResolution {
                            user: Some(current),
                            refreshed: None,
                        })
                    }
                }
            }
            Some(TokenState::Expired) | None => {
                let refresh_token = tokens
                    .refresh_token()
                    .ok_or(AuthenticationError::RefreshTokenNotFound)?;
                let session = self.provider.refresh_session(refresh_token).await?;
                tracing::debug!(user_id = %session.user.id(), "Session refreshed");
                Ok(SessionResolution {
                    user: Some(session.user),
                    refreshed: Some(session.tokens),
                })
            }
            Some(TokenState::Invalid { reason }) => Err(AuthenticationError::InvalidToken { reason }),
        }
    }

    /// Validates the access token without refreshing.
    ///
    /// Returns `Ok(None)` when there is no access token.
    ///
    /// # Errors
    ///
    /// `TokenExpired` or `InvalidToken` when the token cannot be trusted.
    pub fn current_user(&self, tokens: &SessionTokens) -> Result<Option<User>, AuthenticationError> {
        let Some(access_token) = tokens.access_token() else {
            return Ok(None);
        };
        match self.verifier.inspect(access_token) {
            TokenState::Valid(claims) | TokenState::NearExpiry(claims) => {
                Ok(Some(claims.to_user()?))
            }
            TokenState::Expired => Err(AuthenticationError::TokenExpired),
            TokenState::Invalid { reason } => Err(AuthenticationError::InvalidToken { reason }),
        }
    }
}

impl std::fmt::Debug for SessionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionResolver")
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeIdentityProvider, TEST_SECRET, mint_access_token};
    use chrono::Duration;
    use ebookdes_core::UserId;

    fn resolver(provider: Arc<FakeIdentityProvider>) -> SessionResolver {
        SessionResolver::new(
            TokenVerifier::new(
                TEST_SECRET,
                TokenVerifier::DEFAULT_AUDIENCE,
                Duration::seconds(60),
            ),
            provider,
        )
    }

    #[tokio::test]
    async fn no_tokens_is_session_missing() {
        let provider = Arc::new(FakeIdentityProvider::new());
        let result = resolver(provider).resolve(&SessionTokens::none()).await;
        assert_eq!(result, Err(AuthenticationError::SessionMissing));
    }

    #[tokio::test]
    async fn valid_token_resolves_without_refresh() {
        let provider = Arc::new(FakeIdentityProvider::new());
        let user = User::new(UserId::new());
        let tokens = SessionTokens::issued(mint_access_token(TEST_SECRET, &user, 3600), "r1");

        let resolution = resolver(provider.clone()).resolve(&tokens).await.expect("ok");
        assert_eq!(resolution.user.map(|u| u.id()), Some(user.id()));
        assert!(resolution.refreshed.is_none());
        assert_eq!(provider.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed() {
        let provider = Arc::new(FakeIdentityProvider::new());
        let user = User::new(UserId::new());
        provider.allow_refresh("r1", &user);
        let tokens = SessionTokens::issued(mint_access_token(TEST_SECRET, &user, -10), "r1");

        let resolution = resolver(provider.clone()).resolve(&tokens).await.expect("ok");
        assert_eq!(resolution.user.map(|u| u.id()), Some(user.id()));
        assert!(resolution.refreshed.is_some());
        assert_eq!(provider.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn expired_token_without_refresh_token_is_invalid() {
        let provider = Arc::new(FakeIdentityProvider::new());
        let user = User::new(UserId::new());
        let tokens =
            SessionTokens::from_parts(Some(mint_access_token(TEST_SECRET, &user, -10)), None);

        let result = resolver(provider).resolve(&tokens).await;
        assert_eq!(result, Err(AuthenticationError::RefreshTokenNotFound));
    }

    #[tokio::test]
    async fn rejected_refresh_token_is_invalid() {
        let provider = Arc::new(FakeIdentityProvider::new());
        let tokens = SessionTokens::from_parts(None, Some("stale".to_string()));

        let err = resolver(provider).resolve(&tokens).await.expect_err("refresh fails");
        assert_eq!(err.class(), crate::ErrorClass::SessionInvalid);
    }

    #[tokio::test]
    async fn near_expiry_refresh_failure_keeps_user() {
        let provider = Arc::new(FakeIdentityProvider::new());
        let user = User::new(UserId::new());
        let tokens = SessionTokens::issued(mint_access_token(TEST_SECRET, &user, 20), "stale");

        let resolution = resolver(provider.clone()).resolve(&tokens).await.expect("ok");
        assert_eq!(resolution.user.map(|u| u.id()), Some(user.id()));
        assert!(resolution.refreshed.is_none());
        assert_eq!(provider.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn near_expiry_token_is_refreshed() {
        let provider = Arc::new(FakeIdentityProvider::new());
        let user = User::new(UserId::new());
        provider.allow_refresh("r1", &user);
        let tokens = SessionTokens::issued(mint_access_token(TEST_SECRET, &user, 20), "r1");

        let resolution = resolver(provider).resolve(&tokens).await.expect("ok");
        assert!(resolution.refreshed.is_some());
    }

    #[tokio::test]
    async fn forged_token_is_invalid_token() {
        let provider = Arc::new(FakeIdentityProvider::new());
        let user = User::new(UserId::new());
        let tokens = SessionTokens::issued(mint_access_token("forged", &user, 3600), "r1");

        let err = resolver(provider.clone()).resolve(&tokens).await.expect_err("invalid");
        assert!(matches!(err, AuthenticationError::InvalidToken { .. }));
        assert_eq!(provider.refresh_calls(), 0);
    }

    #[test]
    fn current_user_never_refreshes() {
        let provider = Arc::new(FakeIdentityProvider::new());
        let user = User::new(UserId::new());
        provider.allow_refresh("r1", &user);
        let resolver = resolver(provider.clone());

        let expired = SessionTokens::issued(mint_access_token(TEST_SECRET, &user, -10), "r1");
        assert_eq!(
            resolver.current_user(&expired),
            Err(AuthenticationError::TokenExpired)
        );

        let fresh = SessionTokens::issued(mint_access_token(TEST_SECRET, &user, 3600), "r1");
        assert_eq!(
            resolver.current_user(&fresh).expect("ok").map(|u| u.id()),
            Some(user.id())
        );
        assert_eq!(resolver.current_user(&SessionTokens::none()), Ok(None));
        assert_eq!(provider.refresh_calls(), 0);
    }
}
