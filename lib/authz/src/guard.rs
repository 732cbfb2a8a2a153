//! The mutation guard.

use std::sync::Arc;

use ebookdes_platform_access::{Role, SessionResolver, SessionTokens, User};
use tracing::instrument;

use crate::error::GuardFailure;
use crate::store::RoleStore;

/// Checks identity and role before a state-changing operation.
///
/// The guard never refreshes the session: by the time a mutation runs the
/// request gate has already refreshed it if needed, so a stale token here
/// means the caller is not authenticated.
#[derive(Clone)]
pub struct MutationGuard {
    resolver: SessionResolver,
    roles: Arc<dyn RoleStore>,
}

impl MutationGuard {
    #[must_use]
    pub fn new(resolver: SessionResolver, roles: Arc<dyn RoleStore>) -> Self {
        Self { resolver, roles }
    }

    /// Returns the caller if they hold `required`.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when the tokens do not identify anyone, `AccessDenied`
    /// when the role row is missing, lower than required, or unreadable.
    #[instrument(skip(self, tokens), fields(required = %required))]
    pub async fn require(
        &self,
        tokens: &SessionTokens,
        required: Role,
    ) -> Result<User, GuardFailure> {
        let user = match self.resolver.current_user(tokens) {
            Ok(Some(user)) => user,
            Ok(None) => return Err(GuardFailure::Unauthorized),
            Err(e) => {
                tracing::debug!(error = %e, "Rejecting mutation with unusable session");
                return Err(GuardFailure::Unauthorized);
            }
        };

        if required == Role::User {
            return Ok(user);
        }

        let role = match self.roles.find_role(user.id()).await {
            Ok(value) => Role::from_row(value.as_deref()),
            Err(e) => {
                tracing::error!(user_id = %user.id(), error = %e, "Role lookup failed");
                return Err(GuardFailure::AccessDenied);
            }
        };

        if !role.satisfies(required) {
            tracing::warn!(
                user_id = %user.id(),
                role = %role,
                "Non-admin user attempted admin operation"
            );
            return Err(GuardFailure::AccessDenied);
        }

        Ok(user)
    }

    /// Looks up the caller's role without failing the request.
    ///
    /// Used for display purposes; lookup errors read as `Role::User`.
    pub async fn role_of(&self, user: &User) -> Role {
        match self.roles.find_role(user.id()).await {
            Ok(value) => Role::from_row(value.as_deref()),
            Err(e) => {
                tracing::error!(user_id = %user.id(), error = %e, "Role lookup failed");
                Role::User
            }
        }
    }
}

impl std::fmt::Debug for MutationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticRoleStore;
    use ebookdes_core::UserId;
    use ebookdes_platform_access::testing::{
        FakeIdentityProvider, TEST_SECRET, mint_access_token, test_resolver,
    };

    fn guard(roles: Arc<StaticRoleStore>) -> MutationGuard {
        let resolver = test_resolver(Arc::new(FakeIdentityProvider::new()));
        MutationGuard::new(resolver, roles)
    }

    fn tokens_for(user: &User) -> SessionTokens {
        SessionTokens::issued(mint_access_token(TEST_SECRET, user, 3600), "r")
    }

    #[tokio::test]
    async fn no_session_is_unauthorized() {
        let roles = Arc::new(StaticRoleStore::new());
        let result = guard(roles.clone())
            .require(&SessionTokens::none(), Role::Admin)
            .await;
        assert_eq!(result, Err(GuardFailure::Unauthorized));
        assert_eq!(roles.lookups(), 0);
    }

    #[tokio::test]
    async fn expired_session_is_unauthorized() {
        let user = User::new(UserId::new());
        let tokens = SessionTokens::issued(mint_access_token(TEST_SECRET, &user, -30), "r");
        let result = guard(Arc::new(StaticRoleStore::new()))
            .require(&tokens, Role::Admin)
            .await;
        assert_eq!(result, Err(GuardFailure::Unauthorized));
    }

    #[tokio::test]
    async fn missing_role_row_is_denied() {
        let user = User::new(UserId::new());
        let result = guard(Arc::new(StaticRoleStore::new()))
            .require(&tokens_for(&user), Role::Admin)
            .await;
        assert_eq!(result, Err(GuardFailure::AccessDenied));
    }

    #[tokio::test]
    async fn plain_user_is_denied() {
        let user = User::new(UserId::new());
        let roles = Arc::new(StaticRoleStore::new());
        roles.set(user.id(), "user");
        let result = guard(roles).require(&tokens_for(&user), Role::Admin).await;
        assert_eq!(result, Err(GuardFailure::AccessDenied));
    }

    #[tokio::test]
    async fn unknown_role_value_is_denied() {
        let user = User::new(UserId::new());
        let roles = Arc::new(StaticRoleStore::new());
        roles.set(user.id(), "owner");
        let result = guard(roles).require(&tokens_for(&user), Role::Admin).await;
        assert_eq!(result, Err(GuardFailure::AccessDenied));
    }

    #[tokio::test]
    async fn store_failure_fails_closed() {
        let user = User::new(UserId::new());
        let roles = Arc::new(StaticRoleStore::new());
        roles.set(user.id(), "admin");
        roles.fail_lookups();
        let result = guard(roles).require(&tokens_for(&user), Role::Admin).await;
        assert_eq!(result, Err(GuardFailure::AccessDenied));
    }

    #[tokio::test]
    async fn admin_passes() {
        let user = User::new(UserId::new());
        let roles = Arc::new(StaticRoleStore::new());
        roles.set(user.id(), "admin");
        let passed = guard(roles)
            .require(&tokens_for(&user), Role::Admin)
            .await
            .expect("admin passes");
        assert_eq!(passed.id(), user.id());
    }

    #[tokio::test]
    async fn user_requirement_skips_role_lookup() {
        let user = User::new(UserId::new());
        let roles = Arc::new(StaticRoleStore::new());
        let passed = guard(roles.clone())
            .require(&tokens_for(&user), Role::User)
            .await
            .expect("signed-in user passes");
        assert_eq!(passed.id(), user.id());
        assert_eq!(roles.lookups(), 0);
    }

    #[tokio::test]
    async fn role_of_reads_errors_as_user() {
        let user = User::new(UserId::new());
        let roles = Arc::new(StaticRoleStore::new());
        roles.set(user.id(), "admin");
        let guard = guard(roles.clone());
        assert_eq!(guard.role_of(&user).await, Role::Admin);
        roles.fail_lookups();
        assert_eq!(guard.role_of(&user).await, Role::User);
    }
}
