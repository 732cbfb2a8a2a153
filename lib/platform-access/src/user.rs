//! User domain type.
//!
//! A `User` is the identity the hosted identity provider vouches for. The
//! ID is the provider's subject and is shared with the profile, role and
//! reading-progress tables.

use ebookdes_core::UserId;
use serde::{Deserialize, Serialize};

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    email: Option<String>,
    full_name: Option<String>,
    avatar_url: Option<String>,
}

impl User {
    /// Creates a user with only an ID.
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            email: None,
            full_name: None,
            avatar_url: None,
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_full_name(mut self, full_name: Option<String>) -> Self {
        self.full_name = full_name;
        self
    }

    /// Sets the avatar URL.
    #[must_use]
    pub fn with_avatar_url(mut self, avatar_url: Option<String>) -> Self {
        self.avatar_url = avatar_url;
        self
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }

    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    /// Name to greet the user with: full name, else email, else "Pengguna".
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or("Pengguna")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_has_no_optional_fields() {
        let user = User::new(UserId::new());
        assert!(user.email().is_none());
        assert!(user.full_name().is_none());
        assert!(user.avatar_url().is_none());
    }

    #[test]
    fn display_name_prefers_full_name() {
        let user = User::new(UserId::new())
            .with_email("reader@example.com")
            .with_full_name(Some("Siti Reader".to_string()));
        assert_eq!(user.display_name(), "Siti Reader");
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let user = User::new(UserId::new())
            .with_email("reader@example.com")
            .with_full_name(Some("  ".to_string()));
        assert_eq!(user.display_name(), "reader@example.com");
    }

    #[test]
    fn display_name_default() {
        assert_eq!(User::new(UserId::new()).display_name(), "Pengguna");
    }
}
