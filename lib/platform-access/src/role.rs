//! Platform roles.
//!
//! Every user has exactly one role, stored in the role table keyed by user
//! ID. A missing row or an unrecognised value means an ordinary user.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform access role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Reader with access to the catalog and their own progress.
    #[default]
    User,
    /// Administrator allowed to mutate the catalog and page content.
    Admin,
}

impl Role {
    /// Interprets the value read from the role table.
    ///
    /// Absent rows and unknown values both fall back to `User`, so nothing
    /// but an exact `"admin"` can grant elevated access.
    #[must_use]
    pub fn from_row(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("admin") => Self::Admin,
            _ => Self::User,
        }
    }

    /// Returns true if this role has admin privileges.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Returns true if holding this role meets the `required` role.
    #[must_use]
    pub fn satisfies(&self, required: Role) -> bool {
        match required {
            Self::User => true,
            Self::Admin => self.is_admin(),
        }
    }

    /// Returns the stored representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
