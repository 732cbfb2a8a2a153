//! In-memory identity provider and token helpers for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use ebookdes_core::UserId;
use jsonwebtoken::{EncodingKey, Header, encode};

use crate::error::AuthenticationError;
use crate::provider::{AuthSession, Credentials, IdentityProvider, OAuthRequest, SessionResolver};
use crate::session::{AccessClaims, SessionTokens, TokenVerifier, UserMetadata};
use crate::user::User;

/// Secret the fake provider signs access tokens with.
pub const TEST_SECRET: &str = "ebookdes-test-secret-0123456789abcdef";

/// Signs an access token for `user` that expires `ttl_seconds` from now.
///
/// # Panics
///
/// Panics if encoding fails, which only happens for unusable keys.
#[must_use]
pub fn mint_access_token(secret: &str, user: &User, ttl_seconds: i64) -> String {
    let claims = AccessClaims {
        sub: user.id().to_string(),
        exp: Utc::now().timestamp() + ttl_seconds,
        aud: Some("authenticated".to_string()),
        email: user.email().map(str::to_string),
        user_metadata: UserMetadata {
            full_name: user.full_name().map(str::to_string),
            avatar_url: user.avatar_url().map(str::to_string),
            ..UserMetadata::default()
        },
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("encode test token")
}

/// Resolver verifying [`TEST_SECRET`] tokens with a one-minute refresh margin.
#[must_use]
pub fn test_resolver(provider: Arc<dyn IdentityProvider>) -> SessionResolver {
    let verifier = TokenVerifier::new(
        TEST_SECRET,
        TokenVerifier::DEFAULT_AUDIENCE,
        Duration::seconds(60),
    );
    SessionResolver::new(verifier, provider)
}

/// A session for `user` signed with [`TEST_SECRET`].
#[must_use]
pub fn session_for(user: &User, refresh_token: &str) -> AuthSession {
    AuthSession {
        tokens: SessionTokens::issued(mint_access_token(TEST_SECRET, user, 3600), refresh_token),
        user: user.clone(),
    }
}

/// Identity provider backed by in-memory maps.
#[derive(Debug, Default)]
pub struct FakeIdentityProvider {
    refreshable: Mutex<HashMap<String, User>>,
    accounts: Mutex<HashMap<String, (String, User)>>,
    oauth_codes: Mutex<HashMap<String, User>>,
    reset_requests: Mutex<Vec<String>>,
    refresh_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
    password_updates: AtomicUsize,
    oauth_disabled: AtomicBool,
    require_confirmation: AtomicBool,
}

impl FakeIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `refresh_token` and answers with a fresh session for `user`.
    pub fn allow_refresh(&self, refresh_token: &str, user: &User) {
        lock(&self.refreshable).insert(refresh_token.to_string(), user.clone());
    }

    /// Registers an email/password account.
    pub fn add_account(&self, email: &str, password: &str, user: &User) {
        lock(&self.accounts).insert(email.to_string(), (password.to_string(), user.clone()));
    }

    /// Makes `code` exchangeable for a session of `user`.
    pub fn allow_oauth_code(&self, code: &str, user: &User) {
        lock(&self.oauth_codes).insert(code.to_string(), user.clone());
    }

    /// Simulates the external OAuth provider being switched off.
    pub fn disable_oauth(&self) {
        self.oauth_disabled.store(true, Ordering::SeqCst);
    }

    /// Sign-up returns no session until the email is confirmed.
    pub fn require_email_confirmation(&self) {
        self.require_confirmation.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn password_updates(&self) -> usize {
        self.password_updates.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn reset_requests(&self) -> Vec<String> {
        lock(&self.reset_requests).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthenticationError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let user = lock(&self.refreshable).get(refresh_token).cloned();
        match user {
            Some(user) => Ok(session_for(&user, refresh_token)),
            None => Err(AuthenticationError::from_provider_response(
                400,
                Some("refresh_token_not_found"),
                "Invalid Refresh Token: Refresh Token Not Found",
            )),
        }
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthSession, AuthenticationError> {
        let accounts = lock(&self.accounts);
        match accounts.get(&credentials.email) {
            Some((password, user)) if *password == credentials.password => {
                Ok(session_for(user, &format!("refresh-{}", user.id())))
            }
            _ => Err(AuthenticationError::InvalidCredentials {
                reason: "Invalid login credentials".to_string(),
            }),
        }
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
        _email_redirect_to: &str,
    ) -> Result<Option<AuthSession>, AuthenticationError> {
        let mut accounts = lock(&self.accounts);
        if accounts.contains_key(&credentials.email) {
            return Err(AuthenticationError::ProviderError {
                status: 422,
                reason: "User already registered".to_string(),
            });
        }
        let user = User::new(UserId::new())
            .with_email(credentials.email.clone())
            .with_full_name(credentials.full_name.clone());
        accounts.insert(
            credentials.email.clone(),
            (credentials.password.clone(), user.clone()),
        );
        if self.require_confirmation.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(session_for(&user, &format!("refresh-{}", user.id()))))
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthenticationError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_password_reset(
        &self,
        email: &str,
        _redirect_to: &str,
    ) -> Result<(), AuthenticationError> {
        lock(&self.reset_requests).push(email.to_string());
        Ok(())
    }

    async fn update_password(
        &self,
        _access_token: &str,
        new_password: &str,
    ) -> Result<(), AuthenticationError> {
        if new_password.len() < 6 {
            return Err(AuthenticationError::ProviderError {
                status: 422,
                reason: "Password should be at least 6 characters".to_string(),
            });
        }
        self.password_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn authorize_url(&self, request: &OAuthRequest) -> Result<String, AuthenticationError> {
        Ok(format!(
            "https://id.test/auth/v1/authorize?provider=google&redirect_to={}&code_challenge={}&code_challenge_method=s256",
            request.redirect_to, request.code_challenge
        ))
    }

    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthenticationError> {
        if self.oauth_disabled.load(Ordering::SeqCst) {
            return Err(AuthenticationError::ProviderDisabled {
                reason: "Unsupported provider: provider is not enabled".to_string(),
            });
        }
        let user = lock(&self.oauth_codes).get(code).cloned();
        match user {
            Some(user) if !code_verifier.is_empty() => {
                Ok(session_for(&user, &format!("refresh-{}", user.id())))
            }
            _ => Err(AuthenticationError::ProviderError {
                status: 400,
                reason: "invalid flow state, no valid flow state found".to_string(),
            }),
        }
    }
}
