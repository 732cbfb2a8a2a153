//! In-memory role store for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use ebookdes_core::UserId;

use crate::error::RoleStoreError;
use crate::store::RoleStore;

/// Role store backed by a map, with a lookup counter and failure switch.
#[derive(Debug, Default)]
pub struct StaticRoleStore {
    roles: Mutex<HashMap<UserId, String>>,
    lookups: AtomicUsize,
    failing: AtomicBool,
}

impl StaticRoleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, user_id: UserId, role: &str) {
        self.roles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(user_id, role.to_string());
    }

    /// Makes every subsequent lookup fail.
    pub fn fail_lookups(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoleStore for StaticRoleStore {
    async fn find_role(&self, user_id: UserId) -> Result<Option<String>, RoleStoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RoleStoreError::QueryFailed {
                details: "connection reset".to_string(),
            });
        }
        Ok(self
            .roles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&user_id)
            .cloned())
    }
}
