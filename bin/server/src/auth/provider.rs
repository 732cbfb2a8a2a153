//! HTTP client for the hosted identity service.
//!
//! Speaks the GoTrue REST dialect under `{base_url}/auth/v1`: password and
//! PKCE token grants, refresh, sign-up, logout, password recovery and user
//! updates. Every request carries the project's public API key.

use async_trait::async_trait;
use ebookdes_core::UserId;
use ebookdes_platform_access::{
    AuthSession, AuthenticationError, Credentials, IdentityProvider, IdentityProviderConfig,
    OAuthRequest, SessionTokens, User, UserMetadata,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use url::Url;

/// Session payload returned by token grants and sign-up.
#[derive(Debug, Deserialize)]
struct SessionBody {
    access_token: String,
    refresh_token: String,
    user: UserBody,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

/// The service has used several error shapes over time.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_code: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl UserBody {
    fn try_into_user(self) -> Result<User, AuthenticationError> {
        let id: UserId = self
            .id
            .parse()
            .map_err(|_| AuthenticationError::MissingClaim {
                claim: "user.id".to_string(),
            })?;
        let mut user = User::new(id)
            .with_full_name(self.user_metadata.preferred_name().map(str::to_string))
            .with_avatar_url(self.user_metadata.preferred_avatar().map(str::to_string));
        if let Some(email) = self.email {
            user = user.with_email(email);
        }
        Ok(user)
    }
}

impl SessionBody {
    fn try_into_session(self) -> Result<AuthSession, AuthenticationError> {
        Ok(AuthSession {
            tokens: SessionTokens::issued(self.access_token, self.refresh_token),
            user: self.user.try_into_user()?,
        })
    }
}

/// Identity provider backed by the hosted auth REST API.
#[derive(Debug, Clone)]
pub struct HostedAuthClient {
    http: reqwest::Client,
    config: IdentityProviderConfig,
}

impl HostedAuthClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: IdentityProviderConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &IdentityProviderConfig {
        &self.config
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, AuthenticationError> {
        let raw = format!("{}/auth/v1/{path}", self.config.base_url());
        Url::parse_with_params(&raw, query).map_err(|e| AuthenticationError::ProviderError {
            status: 0,
            reason: format!("invalid provider URL: {e}"),
        })
    }

    fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", self.config.anon_key())
            .bearer_auth(bearer.unwrap_or(self.config.anon_key()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, AuthenticationError> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthenticationError::Transport {
                reason: e.to_string(),
            })?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .error_description
            .or(body.msg)
            .or(body.message)
            .unwrap_or_else(|| format!("status {status}"));
        let code = body.error_code.or(body.error);
        let err = AuthenticationError::from_provider_response(status, code.as_deref(), &message);
        tracing::debug!(status, error = %err, "Identity provider rejected request");
        Err(err)
    }

    async fn session_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<AuthSession, AuthenticationError> {
        let url = self.endpoint("token", &[("grant_type", grant_type)])?;
        let response = self
            .send(self.request(Method::POST, url, None).json(&body))
            .await?;
        decode::<SessionBody>(response).await?.try_into_session()
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, AuthenticationError> {
    response
        .json()
        .await
        .map_err(|e| AuthenticationError::ProviderError {
            status: 200,
            reason: format!("unexpected response body: {e}"),
        })
}

#[async_trait]
impl IdentityProvider for HostedAuthClient {
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthenticationError> {
        self.session_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthSession, AuthenticationError> {
        self.session_grant(
            "password",
            json!({ "email": credentials.email, "password": credentials.password }),
        )
        .await
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
        email_redirect_to: &str,
    ) -> Result<Option<AuthSession>, AuthenticationError> {
        let url = self.endpoint("signup", &[("redirect_to", email_redirect_to)])?;
        let body = json!({
            "email": credentials.email,
            "password": credentials.password,
            "data": { "full_name": credentials.full_name },
        });
        let response = self
            .send(self.request(Method::POST, url, None).json(&body))
            .await?;

        // Without a session in the body the account awaits email confirmation.
        let value: serde_json::Value = decode(response).await?;
        if value.get("access_token").is_none() {
            return Ok(None);
        }
        let session: SessionBody =
            serde_json::from_value(value).map_err(|e| AuthenticationError::ProviderError {
                status: 200,
                reason: format!("unexpected sign-up body: {e}"),
            })?;
        Ok(Some(session.try_into_session()?))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthenticationError> {
        let url = self.endpoint("logout", &[])?;
        self.send(self.request(Method::POST, url, Some(access_token)))
            .await?;
        Ok(())
    }

    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), AuthenticationError> {
        let url = self.endpoint("recover", &[("redirect_to", redirect_to)])?;
        self.send(
            self.request(Method::POST, url, None)
                .json(&json!({ "email": email })),
        )
        .await?;
        Ok(())
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), AuthenticationError> {
        let url = self.endpoint("user", &[])?;
        self.send(
            self.request(Method::PUT, url, Some(access_token))
                .json(&json!({ "password": new_password })),
        )
        .await?;
        Ok(())
    }

    fn authorize_url(&self, request: &OAuthRequest) -> Result<String, AuthenticationError> {
        let url = self.endpoint(
            "authorize",
            &[
                ("provider", self.config.oauth_provider()),
                ("redirect_to", &request.redirect_to),
                ("code_challenge", &request.code_challenge),
                ("code_challenge_method", "s256"),
            ],
        )?;
        Ok(url.to_string())
    }

    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthenticationError> {
        self.session_grant(
            "pkce",
            json!({ "auth_code": code, "code_verifier": code_verifier }),
        )
        .await
    }
}
