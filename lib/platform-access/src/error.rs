//! Error types for the platform-access crate.
//!
//! `AuthenticationError` covers every way resolving or establishing a
//! session can fail. Callers mostly care about its [`ErrorClass`]: the gate
//! treats a missing session as ordinary, an unusable session as a reason to
//! clear cookies, and everything else as something to log.

use std::fmt;

/// How the gate should react to an authentication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// No session present. Not an error from the visitor's point of view.
    Benign,
    /// Session tokens exist but can no longer be used.
    SessionInvalid,
    /// Provider outage, malformed response, misconfiguration.
    Other,
}

/// Errors from authentication operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// No session tokens were supplied.
    SessionMissing,
    /// An access token needs refreshing but no refresh token was supplied.
    RefreshTokenNotFound,
    /// The provider rejected the refresh token.
    InvalidRefreshToken { reason: String },
    /// Access token has expired.
    TokenExpired,
    /// Access token failed validation.
    InvalidToken { reason: String },
    /// Email/password pair was rejected.
    InvalidCredentials { reason: String },
    /// The requested sign-in provider is not enabled on the identity service.
    ProviderDisabled { reason: String },
    /// Identity provider answered with an unexpected error.
    ProviderError { status: u16, reason: String },
    /// Identity provider could not be reached.
    Transport { reason: String },
    /// Missing required claim in token.
    MissingClaim { claim: String },
}

impl AuthenticationError {
    /// Classifies an error for the gate.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::SessionMissing => ErrorClass::Benign,
            Self::RefreshTokenNotFound | Self::InvalidRefreshToken { .. } | Self::TokenExpired => {
                ErrorClass::SessionInvalid
            }
            Self::InvalidToken { .. }
            | Self::InvalidCredentials { .. }
            | Self::ProviderDisabled { .. }
            | Self::ProviderError { .. }
            | Self::Transport { .. }
            | Self::MissingClaim { .. } => ErrorClass::Other,
        }
    }

    /// Maps an error payload returned by the identity service to a variant.
    ///
    /// The hosted service reports failures as free text, so the mapping
    /// matches on the well-known fragments it emits.
    #[must_use]
    pub fn from_provider_response(status: u16, error_code: Option<&str>, message: &str) -> Self {
        let code = error_code.unwrap_or_default();
        let haystack = format!("{code} {message}");

        if haystack.contains("refresh_token_not_found") {
            return Self::RefreshTokenNotFound;
        }
        if haystack.contains("Invalid Refresh Token") || code == "refresh_token_already_used" {
            return Self::InvalidRefreshToken {
                reason: message.to_string(),
            };
        }
        if haystack.contains("JWT expired") || code == "session_expired" {
            return Self::TokenExpired;
        }
        if haystack.contains("Auth session missing") || code == "session_not_found" {
            return Self::SessionMissing;
        }
        if haystack.contains("provider is not enabled")
            || haystack.contains("Unsupported provider")
            || (code == "validation_failed" && message.contains("provider"))
        {
            return Self::ProviderDisabled {
                reason: message.to_string(),
            };
        }
        if code == "invalid_credentials" || haystack.contains("Invalid login credentials") {
            return Self::InvalidCredentials {
                reason: message.to_string(),
            };
        }

        Self::ProviderError {
            status,
            reason: message.to_string(),
        }
    }

    /// Returns true if the failure means a sign-in provider is switched off.
    #[must_use]
    pub fn is_provider_disabled(&self) -> bool {
        matches!(self, Self::ProviderDisabled { .. })
    }
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionMissing => write!(f, "auth session missing"),
            Self::RefreshTokenNotFound => write!(f, "refresh token not found"),
            Self::InvalidRefreshToken { reason } => {
                write!(f, "invalid refresh token: {reason}")
            }
            Self::TokenExpired => write!(f, "token has expired"),
            Self::InvalidToken { reason } => write!(f, "invalid token: {reason}"),
            Self::InvalidCredentials { reason } => {
                write!(f, "invalid credentials: {reason}")
            }
            Self::ProviderDisabled { reason } => {
                write!(f, "sign-in provider is not enabled: {reason}")
            }
            Self::ProviderError { status, reason } => {
                write!(f, "identity provider error ({status}): {reason}")
            }
            Self::Transport { reason } => {
                write!(f, "identity provider unreachable: {reason}")
            }
            Self::MissingClaim { claim } => {
                write!(f, "missing required claim: {claim}")
            }
        }
    }
}

impl std::error::Error for AuthenticationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_missing_is_benign() {
        assert_eq!(AuthenticationError::SessionMissing.class(), ErrorClass::Benign);
    }

    #[test]
    fn unusable_sessions_are_session_invalid() {
        let errors = [
            AuthenticationError::RefreshTokenNotFound,
            AuthenticationError::InvalidRefreshToken {
                reason: "revoked".to_string(),
            },
            AuthenticationError::TokenExpired,
        ];
        for err in errors {
            assert_eq!(err.class(), ErrorClass::SessionInvalid, "{err}");
        }
    }

    #[test]
    fn outages_are_other() {
        let err = AuthenticationError::Transport {
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.class(), ErrorClass::Other);
        let err = AuthenticationError::InvalidToken {
            reason: "InvalidSignature".to_string(),
        };
        assert_eq!(err.class(), ErrorClass::Other);
    }

    #[test]
    fn maps_refresh_token_not_found() {
        let err = AuthenticationError::from_provider_response(
            400,
            Some("refresh_token_not_found"),
            "Invalid Refresh Token: Refresh Token Not Found",
        );
        assert_eq!(err, AuthenticationError::RefreshTokenNotFound);
    }

    #[test]
    fn maps_invalid_refresh_token_from_message() {
        let err = AuthenticationError::from_provider_response(
            400,
            None,
            "Invalid Refresh Token: Already Used",
        );
        assert_eq!(err.class(), ErrorClass::SessionInvalid);
    }

    #[test]
    fn maps_jwt_expired() {
        let err = AuthenticationError::from_provider_response(401, None, "JWT expired");
        assert_eq!(err, AuthenticationError::TokenExpired);
    }

    #[test]
    fn maps_session_missing() {
        let err = AuthenticationError::from_provider_response(401, None, "Auth session missing!");
        assert_eq!(err, AuthenticationError::SessionMissing);
    }

    #[test]
    fn maps_disabled_provider() {
        let err = AuthenticationError::from_provider_response(
            400,
            Some("validation_failed"),
            "Unsupported provider: provider is not enabled",
        );
        assert!(err.is_provider_disabled());
    }

    #[test]
    fn maps_invalid_credentials() {
        let err = AuthenticationError::from_provider_response(
            400,
            Some("invalid_credentials"),
            "Invalid login credentials",
        );
        assert!(matches!(err, AuthenticationError::InvalidCredentials { .. }));
    }

    #[test]
    fn unknown_payload_is_provider_error() {
        let err = AuthenticationError::from_provider_response(500, None, "upstream timeout");
        assert_eq!(
            err,
            AuthenticationError::ProviderError {
                status: 500,
                reason: "upstream timeout".to_string()
            }
        );
        assert!(err.to_string().contains("500"));
    }
}
