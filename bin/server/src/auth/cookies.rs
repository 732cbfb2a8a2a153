//! Session cookie reading and writing.

use axum::http::{HeaderMap, HeaderValue, header};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use ebookdes_platform_access::{CookieUpdate, SessionTokens};
use time::Duration as TimeDuration;

use crate::config::SessionConfig;

/// Reads the token pair from the request cookies.
pub fn read_tokens(jar: &CookieJar, config: &SessionConfig) -> SessionTokens {
    let value = |name: &str| jar.get(name).map(|c| c.value().to_string());
    SessionTokens::from_parts(value(&config.access_cookie), value(&config.refresh_cookie))
}

fn session_cookie(name: &str, value: &str, config: &SessionConfig) -> Cookie<'static> {
    Cookie::build((name.to_string(), value.to_string()))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::days(config.cookie_max_age_days))
        .build()
}

fn removal_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/")
        .max_age(TimeDuration::ZERO)
        .build()
}

/// Cookies that store `tokens`. Missing halves are left alone.
pub fn store_cookies(tokens: &SessionTokens, config: &SessionConfig) -> Vec<Cookie<'static>> {
    [
        (config.access_cookie.as_str(), tokens.access_token()),
        (config.refresh_cookie.as_str(), tokens.refresh_token()),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|v| session_cookie(name, v, config)))
    .collect()
}

/// Cookies that delete every session cookie name, legacy names included.
pub fn clear_cookies(config: &SessionConfig) -> Vec<Cookie<'static>> {
    config.all_cookie_names().map(removal_cookie).collect()
}

/// Adds cookies storing `tokens` to the jar.
pub fn store(jar: CookieJar, tokens: &SessionTokens, config: &SessionConfig) -> CookieJar {
    store_cookies(tokens, config)
        .into_iter()
        .fold(jar, CookieJar::add)
}

/// Adds cookies deleting the session to the jar.
pub fn clear(jar: CookieJar, config: &SessionConfig) -> CookieJar {
    clear_cookies(config).into_iter().fold(jar, CookieJar::add)
}

/// The cookies a gate verdict asks the response to set.
pub fn cookies_for(update: &CookieUpdate, config: &SessionConfig) -> Vec<Cookie<'static>> {
    match update {
        CookieUpdate::Unchanged => Vec::new(),
        CookieUpdate::Replace(tokens) => store_cookies(tokens, config),
        CookieUpdate::Clear => clear_cookies(config),
    }
}

/// Rebuilds the request `Cookie` header so handlers see the gate's view of
/// the session: session cookies are dropped and, when `tokens` is given,
/// replaced by the fresh pair.
pub fn rewrite_request_cookies(
    headers: &mut HeaderMap,
    jar: &CookieJar,
    tokens: Option<&SessionTokens>,
    config: &SessionConfig,
) {
    let session_names: Vec<&str> = config.all_cookie_names().collect();
    let mut pairs: Vec<String> = jar
        .iter()
        .filter(|c| !session_names.contains(&c.name()))
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect();
    if let Some(tokens) = tokens {
        if let Some(access) = tokens.access_token() {
            pairs.push(format!("{}={access}", config.access_cookie));
        }
        if let Some(refresh) = tokens.refresh_token() {
            pairs.push(format!("{}={refresh}", config.refresh_cookie));
        }
    }

    headers.remove(header::COOKIE);
    if pairs.is_empty() {
        return;
    }
    match HeaderValue::from_str(&pairs.join("; ")) {
        Ok(value) => {
            headers.insert(header::COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "Could not rebuild request cookie header"),
    }
}

/// Appends `cookies` as `Set-Cookie` headers, skipping any name the
/// response already sets.
pub fn append_set_cookies(headers: &mut HeaderMap, cookies: Vec<Cookie<'static>>) {
    let already_set: Vec<String> = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| Cookie::parse(v.to_string()).ok())
        .map(|c| c.name().to_string())
        .collect();

    for cookie in cookies {
        if already_set.iter().any(|name| name == cookie.name()) {
            continue;
        }
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, cookie = cookie.name(), "Invalid cookie value"),
        }
    }
}
