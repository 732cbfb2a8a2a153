//! Current-user lookup for handlers.

use ebookdes_catalog::ActionContext;

use crate::types::UserInfo;

/// Display info for the gate-resolved user, with the role read fresh from
/// the role table. `None` when signed out.
pub async fn current_user_info(context: &ActionContext) -> Option<UserInfo> {
    let user = context.user()?;
    let role = context.role().await.unwrap_or_default();
    Some(UserInfo {
        id: user.id(),
        display_name: user.display_name().to_string(),
        email: user.email().map(str::to_string),
        full_name: user.full_name().map(str::to_string),
        avatar_url: user.avatar_url().map(str::to_string),
        role,
        is_admin: role.is_admin(),
    })
}
