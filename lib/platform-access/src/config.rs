//! Configuration for the hosted identity provider.
//!
//! The provider issues sessions for email/password and Google sign-in and
//! signs access tokens with a shared HS256 secret.

use serde::{Deserialize, Serialize};

/// Configuration for the hosted identity provider.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProviderConfig {
    /// Base URL of the identity project (e.g., "https://abc.supabase.co").
    base_url: String,
    /// Public API key sent with every request to the provider.
    anon_key: String,
    /// Secret used to verify access-token signatures.
    jwt_secret: String,
    /// Public URL of this site, used to build redirect targets
    /// (e.g., "https://ebookdes.example.com").
    site_url: String,
    /// Expected `aud` claim on access tokens.
    /// Default: "authenticated"
    #[serde(default = "default_audience")]
    audience: String,
    /// Name of the external OAuth provider offered on the sign-in page.
    /// Default: "google"
    #[serde(default = "default_oauth_provider")]
    oauth_provider: String,
}

fn default_audience() -> String {
    "authenticated".to_string()
}

fn default_oauth_provider() -> String {
    "google".to_string()
}

impl IdentityProviderConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(base_url: String, anon_key: String, jwt_secret: String, site_url: String) -> Self {
        Self::builder(base_url, anon_key, jwt_secret, site_url).build()
    }

    #[must_use]
    pub fn builder(
        base_url: String,
        anon_key: String,
        jwt_secret: String,
        site_url: String,
    ) -> IdentityProviderConfigBuilder {
        IdentityProviderConfigBuilder::new(base_url, anon_key, jwt_secret, site_url)
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    #[must_use]
    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    #[must_use]
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Site URL without a trailing slash.
    #[must_use]
    pub fn site_url(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }

    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    #[must_use]
    pub fn oauth_provider(&self) -> &str {
        &self.oauth_provider
    }

    /// Absolute URL of a path on this site.
    #[must_use]
    pub fn site_path(&self, path: &str) -> String {
        format!("{}/{}", self.site_url(), path.trim_start_matches('/'))
    }
}

/// Builder for `IdentityProviderConfig`.
#[derive(Debug)]
pub struct IdentityProviderConfigBuilder {
    base_url: String,
    anon_key: String,
    jwt_secret: String,
    site_url: String,
    audience: String,
    oauth_provider: String,
}

impl IdentityProviderConfigBuilder {
    #[must_use]
    pub fn new(base_url: String, anon_key: String, jwt_secret: String, site_url: String) -> Self {
        Self {
            base_url,
            anon_key,
            jwt_secret,
            site_url,
            audience: default_audience(),
            oauth_provider: default_oauth_provider(),
        }
    }

    #[must_use]
    pub fn audience(mut self, audience: String) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub fn oauth_provider(mut self, provider: String) -> Self {
        self.oauth_provider = provider;
        self
    }

    #[must_use]
    pub fn build(self) -> IdentityProviderConfig {
        IdentityProviderConfig {
            base_url: self.base_url,
            anon_key: self.anon_key,
            jwt_secret: self.jwt_secret,
            site_url: self.site_url,
            audience: self.audience,
            oauth_provider: self.oauth_provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> IdentityProviderConfig {
        IdentityProviderConfig::new(
            "https://abc.supabase.co/".to_string(),
            "anon".to_string(),
            "secret".to_string(),
            "http://localhost:3000/".to_string(),
        )
    }

    #[test]
    fn new_config_has_defaults() {
        let config = config();
        assert_eq!(config.audience(), "authenticated");
        assert_eq!(config.oauth_provider(), "google");
    }

    #[test]
    fn urls_are_normalised() {
        let config = config();
        assert_eq!(config.base_url(), "https://abc.supabase.co");
        assert_eq!(config.site_url(), "http://localhost:3000");
        assert_eq!(
            config.site_path("/api/auth/callback"),
            "http://localhost:3000/api/auth/callback"
        );
    }

    #[test]
    fn builder_allows_customization() {
        let config = IdentityProviderConfig::builder(
            "https://id.example.com".to_string(),
            "anon".to_string(),
            "secret".to_string(),
            "https://books.example.com".to_string(),
        )
        .audience("readers".to_string())
        .oauth_provider("github".to_string())
        .build();

        assert_eq!(config.audience(), "readers");
        assert_eq!(config.oauth_provider(), "github");
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{
            "base_url": "https://abc.supabase.co",
            "anon_key": "anon",
            "jwt_secret": "secret",
            "site_url": "http://localhost:3000"
        }"#;
        let config: IdentityProviderConfig = serde_json::from_str(json).expect("deserialize");
        assert_eq!(config.audience(), "authenticated");
        assert_eq!(config.oauth_provider(), "google");
    }
}
