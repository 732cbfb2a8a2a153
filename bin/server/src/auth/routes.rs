//! Authentication routes: password sign-in and sign-up, sign-out, password
//! reset, and Google sign-in through the provider's PKCE flow.

use std::sync::Arc;

use axum::{
    Extension, Form, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use ebookdes_catalog::ActionContext;
use ebookdes_platform_access::{AuthSession, Credentials, OAuthRequest};
use oauth2::PkceCodeChallenge;
use serde::{Deserialize, Serialize};
use time::Duration as TimeDuration;

use super::{AppState, cookies};
use crate::server_helpers::{FlashQuery, Status, error_redirect, safe_next, status_redirect};

/// PKCE verifier cookie name (kept between OAuth start and callback).
const PKCE_VERIFIER_COOKIE: &str = "ebookdes-pkce-verifier";

/// Post-login destination cookie name.
const NEXT_COOKIE: &str = "ebookdes-auth-next";

const DEFAULT_NEXT: &str = "/dashboard";

const SIGN_IN_FAILED: &str = "Gagal masuk. Cek email/password.";
const SIGN_UP_FAILED: &str = "Gagal daftar. Coba email lain.";
const OAUTH_DENIED: &str = "Akses ditolak. Silakan coba lagi.";
const OAUTH_NOT_CONFIGURED: &str =
    "Google Sign-In belum dikonfigurasi. Silakan gunakan email dan password.";
const OAUTH_FAILED: &str = "Terjadi kesalahan saat masuk dengan Google.";

/// What a form page needs to render: which page, plus any flash message.
#[derive(Debug, Serialize)]
pub struct FormPage {
    page: &'static str,
    #[serde(flatten)]
    flash: FlashQuery,
}

fn form_page(page: &'static str, flash: FlashQuery) -> Json<FormPage> {
    Json(FormPage { page, flash })
}

pub async fn sign_in_page(Query(flash): Query<FlashQuery>) -> Json<FormPage> {
    form_page("sign-in", flash)
}

pub async fn sign_up_page(Query(flash): Query<FlashQuery>) -> Json<FormPage> {
    form_page("sign-up", flash)
}

pub async fn forgot_password_page(Query(flash): Query<FlashQuery>) -> Json<FormPage> {
    form_page("forgot-password", flash)
}

pub async fn reset_password_page(Query(flash): Query<FlashQuery>) -> Json<FormPage> {
    form_page("reset-password", flash)
}

/// Stores the session cookies, mirrors the profile, and sends the browser on.
async fn establish_session(
    state: &AppState,
    jar: CookieJar,
    session: &AuthSession,
    destination: &str,
) -> Response {
    state.mirror_profile(&session.user).await;
    tracing::info!(user_id = %session.user.id(), "Session established");
    (
        cookies::store(jar, &session.tokens, &state.session_config),
        Redirect::to(destination),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<SignInForm>,
) -> Response {
    let credentials = Credentials {
        email: form.email.trim().to_string(),
        password: form.password,
        full_name: None,
    };
    if credentials.email.is_empty() || credentials.password.is_empty() {
        return status_redirect("/sign-in", Status::Error, SIGN_IN_FAILED).into_response();
    }

    match state.provider.sign_in_with_password(&credentials).await {
        Ok(session) => establish_session(&state, jar, &session, DEFAULT_NEXT).await,
        Err(e) => {
            tracing::info!(error = %e, "Password sign-in failed");
            status_redirect("/sign-in", Status::Error, SIGN_IN_FAILED).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default, alias = "fullName")]
    full_name: Option<String>,
}

pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<SignUpForm>,
) -> Response {
    let credentials = Credentials {
        email: form.email.trim().to_string(),
        password: form.password,
        full_name: form
            .full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
    };
    if credentials.email.is_empty() || credentials.password.is_empty() {
        return status_redirect("/sign-up", Status::Error, SIGN_UP_FAILED).into_response();
    }

    let email_redirect_to = state.auth_config.site_path("/auth/callback");
    match state.provider.sign_up(&credentials, &email_redirect_to).await {
        Ok(Some(session)) => establish_session(&state, jar, &session, DEFAULT_NEXT).await,
        Ok(None) => status_redirect(
            "/sign-in",
            Status::Success,
            "Pendaftaran berhasil. Cek email Anda untuk konfirmasi.",
        )
        .into_response(),
        Err(e) => {
            tracing::info!(error = %e, "Sign-up failed");
            status_redirect("/sign-up", Status::Error, SIGN_UP_FAILED).into_response()
        }
    }
}

/// Ends the session at the provider and clears the cookies either way.
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<ActionContext>,
    jar: CookieJar,
) -> Response {
    if let Some(access_token) = context.tokens().access_token() {
        if let Err(e) = state.provider.sign_out(access_token).await {
            tracing::warn!(error = %e, "Provider sign-out failed");
        }
    }
    if let Some(user) = context.user() {
        tracing::info!(user_id = %user.id(), "Signed out");
    }

    (
        cookies::clear(jar, &state.session_config),
        Redirect::to("/sign-in"),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default)]
    email: String,
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ForgotPasswordForm>,
) -> Redirect {
    let email = form.email.trim();
    if email.is_empty() {
        return status_redirect("/forgot-password", Status::Error, "Email wajib diisi.");
    }

    let redirect_to = state
        .auth_config
        .site_path("/auth/callback?next=/dashboard/reset-password");
    match state.provider.send_password_reset(email, &redirect_to).await {
        Ok(()) => status_redirect(
            "/forgot-password",
            Status::Success,
            "Cek email Anda untuk link reset password.",
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Password reset request failed");
            status_redirect(
                "/forgot-password",
                Status::Error,
                "Gagal mengirim email reset password.",
            )
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    #[serde(default)]
    password: String,
    #[serde(default, rename = "confirmPassword", alias = "confirm_password")]
    confirm_password: String,
}

const RESET_PASSWORD_PATH: &str = "/dashboard/reset-password";

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<ActionContext>,
    Form(form): Form<ResetPasswordForm>,
) -> Redirect {
    if form.password.is_empty() || form.confirm_password.is_empty() {
        return status_redirect(RESET_PASSWORD_PATH, Status::Error, "Password wajib diisi.");
    }
    if form.password != form.confirm_password {
        return status_redirect(RESET_PASSWORD_PATH, Status::Error, "Password tidak cocok.");
    }
    let Some(access_token) = context.tokens().access_token() else {
        return Redirect::to("/sign-in");
    };

    match state
        .provider
        .update_password(access_token, &form.password)
        .await
    {
        Ok(()) => {
            if let Some(user) = context.user() {
                tracing::info!(user_id = %user.id(), "Password changed");
            }
            status_redirect(
                RESET_PASSWORD_PATH,
                Status::Success,
                "Password berhasil diubah.",
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Password change failed");
            status_redirect(
                RESET_PASSWORD_PATH,
                Status::Error,
                "Gagal mengubah password.",
            )
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OAuthStartQuery {
    next: Option<String>,
}

fn short_lived_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(10))
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .max_age(TimeDuration::ZERO)
        .build()
}

/// Starts Google sign-in by redirecting to the provider's authorize URL.
pub async fn google_start(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OAuthStartQuery>,
    jar: CookieJar,
) -> Response {
    let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
    let request = OAuthRequest {
        redirect_to: state.auth_config.site_path("/auth/callback"),
        code_challenge: challenge.as_str().to_string(),
    };

    let url = match state.provider.authorize_url(&request) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, "Could not build OAuth authorize URL");
            return error_redirect("/sign-in", OAUTH_NOT_CONFIGURED).into_response();
        }
    };

    let secure = state.session_config.secure_cookies;
    let next = safe_next(query.next.as_deref(), DEFAULT_NEXT);
    let jar = jar
        .add(short_lived_cookie(
            PKCE_VERIFIER_COOKIE,
            verifier.secret().clone(),
            secure,
        ))
        .add(short_lived_cookie(NEXT_COOKIE, next, secure));

    (jar, Redirect::to(&url)).into_response()
}

/// Query parameters for the OAuth callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    next: Option<String>,
}

/// Message shown for an error code the provider sent back.
fn provider_error_message(code: &str) -> &'static str {
    match code {
        "access_denied" => OAUTH_DENIED,
        _ => OAUTH_NOT_CONFIGURED,
    }
}

/// Completes Google sign-in (also used for email confirmation and
/// password-recovery links).
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Response {
    let next = safe_next(
        query
            .next
            .as_deref()
            .or_else(|| jar.get(NEXT_COOKIE).map(|c| c.value())),
        DEFAULT_NEXT,
    );
    let verifier = jar.get(PKCE_VERIFIER_COOKIE).map(|c| c.value().to_string());
    let jar = jar
        .add(removal_cookie(PKCE_VERIFIER_COOKIE))
        .add(removal_cookie(NEXT_COOKIE));

    if let Some(code) = query.error.as_deref() {
        tracing::warn!(
            error = code,
            description = query.error_description.as_deref().unwrap_or_default(),
            "OAuth provider returned an error"
        );
        return (jar, error_redirect("/sign-in", provider_error_message(code))).into_response();
    }

    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        return (jar, error_redirect("/sign-in", OAUTH_FAILED)).into_response();
    };
    let Some(verifier) = verifier else {
        tracing::warn!("OAuth callback without a PKCE verifier cookie");
        return (jar, error_redirect("/sign-in", OAUTH_FAILED)).into_response();
    };

    match state.provider.exchange_code_for_session(code, &verifier).await {
        Ok(session) => establish_session(&state, jar, &session, &next).await,
        Err(e) => {
            tracing::error!(error = %e, "OAuth code exchange failed");
            let message = if e.is_provider_disabled() {
                OAUTH_NOT_CONFIGURED
            } else {
                OAUTH_FAILED
            };
            (jar, error_redirect("/sign-in", message)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_map_to_messages() {
        assert_eq!(provider_error_message("access_denied"), OAUTH_DENIED);
        assert_eq!(provider_error_message("server_error"), OAUTH_NOT_CONFIGURED);
        assert_eq!(provider_error_message("anything"), OAUTH_NOT_CONFIGURED);
    }

    #[test]
    fn reset_form_reads_camel_case_confirmation() {
        let form: ResetPasswordForm =
            serde_json::from_value(serde_json::json!({"password": "a", "confirmPassword": "b"}))
                .expect("parse");
        assert_eq!(form.confirm_password, "b");
    }
}
