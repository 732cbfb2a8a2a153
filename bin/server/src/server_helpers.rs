//! Helper functions shared by page and auth handlers.
//!
//! Form handlers report their result by redirecting to a page with the
//! outcome encoded in the query string, which the page then displays.

use axum::response::Redirect;
use ebookdes_catalog::ActionOutcome;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Outcome of a form post, as shown on the page it redirects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
}

impl Status {
    fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Builds `path?status=..&message=..` with the message percent-encoded.
pub fn status_location(path: &str, status: Status, message: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("status", status.as_str())
        .append_pair("message", message)
        .finish();
    format!("{path}?{query}")
}

pub fn status_redirect(path: &str, status: Status, message: &str) -> Redirect {
    Redirect::to(&status_location(path, status, message))
}

/// Redirect carrying an `error` query parameter, used by the OAuth flow.
pub fn error_redirect(path: &str, message: &str) -> Redirect {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("error", message)
        .finish();
    Redirect::to(&format!("{path}?{query}"))
}

/// Redirects to `path` with the action's message.
pub fn outcome_redirect(path: &str, outcome: &ActionOutcome) -> Redirect {
    match outcome {
        Ok(success) => status_redirect(path, Status::Success, &success.message),
        Err(failure) => status_redirect(path, Status::Error, &failure.message),
    }
}

/// The `status`, `message` and `error` query parameters a form page echoes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlashQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Accepts only same-site absolute paths as a post-login destination.
pub fn safe_next(next: Option<&str>, fallback: &str) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.contains("://")
                && !path.chars().any(|c| c.is_control() || c.is_whitespace()) =>
        {
            path.to_string()
        }
        _ => fallback.to_string(),
    }
}
