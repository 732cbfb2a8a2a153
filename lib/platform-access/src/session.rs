//! Session tokens and access-token inspection.
//!
//! A session is a pair of tokens issued by the identity provider: a short
//! lived signed access token (HS256 JWT) and an opaque refresh token. The
//! access token is checked locally; only refreshing needs a round trip.

use chrono::{Duration, Utc};
use ebookdes_core::UserId;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::error::AuthenticationError;
use crate::user::User;

/// Tokens carried by a request, usually read from cookies.
///
/// Either half may be missing: cookies expire independently and clients can
/// send anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl SessionTokens {
    /// Tokens freshly issued by the provider.
    #[must_use]
    pub fn issued(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Tokens as found on a request. Empty strings count as absent.
    #[must_use]
    pub fn from_parts(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.filter(|t| !t.is_empty()),
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
        }
    }

    /// No tokens at all.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Returns true if neither token is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Profile fields the provider copies into the access token.
///
/// OAuth sign-ins carry both the provider's own keys (`name`, `picture`)
/// and the normalized ones, so each is kept separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl UserMetadata {
    /// `full_name`, falling back to `name`.
    #[must_use]
    pub fn preferred_name(&self) -> Option<&str> {
        self.full_name.as_deref().or(self.name.as_deref())
    }

    /// `avatar_url`, falling back to `picture`.
    #[must_use]
    pub fn preferred_avatar(&self) -> Option<&str> {
        self.avatar_url.as_deref().or(self.picture.as_deref())
    }
}

/// Claims of a provider-issued access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl AccessClaims {
    /// Builds the user these claims vouch for.
    ///
    /// # Errors
    ///
    /// Returns `MissingClaim` if the subject is not a user ID.
    pub fn to_user(&self) -> Result<User, AuthenticationError> {
        let id: UserId = self
            .sub
            .parse()
            .map_err(|_| AuthenticationError::MissingClaim {
                claim: "sub".to_string(),
            })?;
        let mut user = User::new(id)
            .with_full_name(self.user_metadata.preferred_name().map(str::to_string))
            .with_avatar_url(self.user_metadata.preferred_avatar().map(str::to_string));
        if let Some(email) = &self.email {
            user = user.with_email(email.clone());
        }
        Ok(user)
    }
}

/// What local inspection of an access token found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    /// Signature valid and not close to expiry.
    Valid(AccessClaims),
    /// Signature valid but expiring within the refresh margin.
    NearExpiry(AccessClaims),
    /// Signature valid but already expired.
    Expired,
    /// Malformed, wrongly signed, or for another audience.
    Invalid { reason: String },
}

/// Verifies access tokens signed with the provider's shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
    refresh_margin: Duration,
}

impl TokenVerifier {
    /// Audience the hosted provider stamps on user tokens.
    pub const DEFAULT_AUDIENCE: &'static str = "authenticated";

    #[must_use]
    pub fn new(secret: &str, audience: &str, refresh_margin: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.leeway = 0;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            refresh_margin,
        }
    }

    /// Inspects a token against the current time.
    #[must_use]
    pub fn inspect(&self, token: &str) -> TokenState {
        match decode::<AccessClaims>(token, &self.key, &self.validation) {
            Ok(data) => {
                let remaining = data.claims.exp - Utc::now().timestamp();
                if remaining <= self.refresh_margin.num_seconds() {
                    TokenState::NearExpiry(data.claims)
                } else {
                    TokenState::Valid(data.claims)
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => TokenState::Expired,
            Err(e) => TokenState::Invalid {
                reason: format!("{:?}", e.kind()),
            },
        }
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("audience", &self.validation.aud)
            .field("refresh_margin", &self.refresh_margin)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mint_access_token;

    const SECRET: &str = "test-secret-with-enough-bytes-for-hs256";

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(SECRET, TokenVerifier::DEFAULT_AUDIENCE, Duration::seconds(60))
    }

    #[test]
    fn from_parts_drops_empty_strings() {
        let tokens = SessionTokens::from_parts(Some(String::new()), Some("r".to_string()));
        assert!(tokens.access_token().is_none());
        assert_eq!(tokens.refresh_token(), Some("r"));
        assert!(!tokens.is_empty());
        assert!(SessionTokens::from_parts(None, Some(String::new())).is_empty());
    }

    #[test]
    fn fresh_token_is_valid() {
        let user = User::new(UserId::new()).with_email("a@example.com");
        let token = mint_access_token(SECRET, &user, 3600);

        match verifier().inspect(&token) {
            TokenState::Valid(claims) => {
                let resolved = claims.to_user().expect("user");
                assert_eq!(resolved.id(), user.id());
                assert_eq!(resolved.email(), Some("a@example.com"));
            }
            other => panic!("expected valid, got {other:?}"),
        }
    }

    #[test]
    fn token_inside_margin_is_near_expiry() {
        let user = User::new(UserId::new());
        let token = mint_access_token(SECRET, &user, 30);
        assert!(matches!(verifier().inspect(&token), TokenState::NearExpiry(_)));
    }

    #[test]
    fn past_token_is_expired() {
        let user = User::new(UserId::new());
        let token = mint_access_token(SECRET, &user, -120);
        assert_eq!(verifier().inspect(&token), TokenState::Expired);
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let user = User::new(UserId::new());
        let token = mint_access_token("some-other-secret", &user, 3600);
        assert!(matches!(verifier().inspect(&token), TokenState::Invalid { .. }));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(
            verifier().inspect("not-a-jwt"),
            TokenState::Invalid { .. }
        ));
    }

    #[test]
    fn non_uuid_subject_is_missing_claim() {
        let claims = AccessClaims {
            sub: "anonymous".to_string(),
            exp: 0,
            aud: None,
            email: None,
            user_metadata: UserMetadata::default(),
        };
        assert!(matches!(
            claims.to_user(),
            Err(AuthenticationError::MissingClaim { .. })
        ));
    }

    #[test]
    fn metadata_falls_back_to_provider_keys() {
        let json = r#"{"name":"Budi","picture":"https://img.example.com/b.png"}"#;
        let meta: UserMetadata = serde_json::from_str(json).expect("parse");
        assert_eq!(meta.preferred_name(), Some("Budi"));
        assert_eq!(meta.preferred_avatar(), Some("https://img.example.com/b.png"));
    }

    const GOOGLE_METADATA: &str = r#"{
        "avatar_url": "https://lh3.example.com/a.png",
        "email": "budi@example.com",
        "email_verified": true,
        "full_name": "Budi Santoso",
        "iss": "https://accounts.google.com",
        "name": "Budi",
        "picture": "https://lh3.example.com/p.png",
        "provider_id": "1234567890",
        "sub": "1234567890"
    }"#;

    #[test]
    fn google_metadata_with_both_key_sets_parses() {
        let meta: UserMetadata = serde_json::from_str(GOOGLE_METADATA).expect("parse");
        assert_eq!(meta.preferred_name(), Some("Budi Santoso"));
        assert_eq!(meta.preferred_avatar(), Some("https://lh3.example.com/a.png"));
    }

    #[test]
    fn google_signed_in_token_is_valid() {
        let id = UserId::new();
        let claims = serde_json::json!({
            "sub": id.to_string(),
            "exp": Utc::now().timestamp() + 3600,
            "aud": "authenticated",
            "email": "budi@example.com",
            "role": "authenticated",
            "user_metadata": serde_json::from_str::<serde_json::Value>(GOOGLE_METADATA)
                .expect("metadata"),
        });
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("encode");

        match verifier().inspect(&token) {
            TokenState::Valid(claims) => {
                let user = claims.to_user().expect("user");
                assert_eq!(user.id(), id);
                assert_eq!(user.full_name(), Some("Budi Santoso"));
                assert_eq!(user.avatar_url(), Some("https://lh3.example.com/a.png"));
            }
            other => panic!("expected valid, got {other:?}"),
        }
    }
}
