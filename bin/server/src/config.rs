//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables
//! (`DATABASE_URL`, `AUTH__BASE_URL`, `SESSION__SECURE_COOKIES`, ...).
//!
//! See [`IdentityProviderConfig`] for identity provider settings.

use ebookdes_platform_access::IdentityProviderConfig;
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL. Connects with elevated access.
    pub database_url: String,

    /// Address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Directory served under `/public`.
    #[serde(default = "default_public_dir")]
    pub public_dir: String,

    /// Hosted identity provider.
    pub auth: IdentityProviderConfig,

    /// Session cookie configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Connection pool and access-mode configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_public_dir() -> String {
    "public".to_string()
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Cookie holding the access token.
    #[serde(default = "default_access_cookie")]
    pub access_cookie: String,

    /// Cookie holding the refresh token.
    #[serde(default = "default_refresh_cookie")]
    pub refresh_cookie: String,

    /// Older cookie names to delete whenever the session is cleared.
    #[serde(default = "default_legacy_cookies")]
    pub legacy_cookies: Vec<String>,

    /// Refresh access tokens this many seconds before they expire.
    #[serde(default = "default_refresh_margin_seconds")]
    pub refresh_margin_seconds: i64,

    /// Lifetime of the session cookies.
    #[serde(default = "default_cookie_max_age_days")]
    pub cookie_max_age_days: i64,
}

fn default_secure_cookies() -> bool {
    true
}

fn default_access_cookie() -> String {
    "sb-access-token".to_string()
}

fn default_refresh_cookie() -> String {
    "sb-refresh-token".to_string()
}

fn default_legacy_cookies() -> Vec<String> {
    vec!["supabase-auth-token".to_string()]
}

fn default_refresh_margin_seconds() -> i64 {
    60
}

fn default_cookie_max_age_days() -> i64 {
    7
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secure_cookies: default_secure_cookies(),
            access_cookie: default_access_cookie(),
            refresh_cookie: default_refresh_cookie(),
            legacy_cookies: default_legacy_cookies(),
            refresh_margin_seconds: default_refresh_margin_seconds(),
            cookie_max_age_days: default_cookie_max_age_days(),
        }
    }
}

impl SessionConfig {
    /// Every cookie name that can carry session state.
    pub fn all_cookie_names(&self) -> impl Iterator<Item = &str> {
        [self.access_cookie.as_str(), self.refresh_cookie.as_str()]
            .into_iter()
            .chain(self.legacy_cookies.iter().map(String::as_str))
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Database role assumed for scoped access, so row-level policies apply.
    #[serde(default = "default_authenticated_role")]
    pub authenticated_role: String,
}

fn default_max_connections() -> u32 {
    5
}

fn default_authenticated_role() -> String {
    "authenticated".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            authenticated_role: default_authenticated_role(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
