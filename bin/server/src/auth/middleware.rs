//! The request gate as axum middleware.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use ebookdes_platform_access::{CookieUpdate, GateDecision, SessionTokens};

use super::{AppState, cookies};

/// Runs the gate for every request outside the static bypass list.
///
/// Handlers downstream find an [`ebookdes_catalog::ActionContext`] in the
/// request extensions, built from the gate's resolved identity and the
/// (possibly refreshed) token pair. Any cookie change the gate asks for is
/// applied to the request header seen by handlers and to the response.
pub async fn gate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if state.gate.policy().bypasses(&path) {
        return next.run(request).await;
    }

    let config = &state.session_config;
    let tokens = cookies::read_tokens(&jar, config);
    let outcome = state.gate.evaluate(&tokens, &path).await;

    let effective = match &outcome.cookies {
        CookieUpdate::Unchanged => tokens,
        CookieUpdate::Replace(fresh) => {
            cookies::rewrite_request_cookies(request.headers_mut(), &jar, Some(fresh), config);
            fresh.clone()
        }
        CookieUpdate::Clear => {
            cookies::rewrite_request_cookies(request.headers_mut(), &jar, None, config);
            SessionTokens::none()
        }
    };

    let mut response = match outcome.decision {
        GateDecision::RedirectToSignIn => {
            tracing::debug!(path = %path, "Redirecting to sign-in");
            Redirect::to(state.gate.policy().sign_in_path()).into_response()
        }
        GateDecision::Proceed => {
            let context = state.action_context(effective, outcome.user);
            request.extensions_mut().insert(context);
            next.run(request).await
        }
    };

    cookies::append_set_cookies(
        response.headers_mut(),
        cookies::cookies_for(&outcome.cookies, config),
    );
    response
}
