//! Catalog management form actions.
//!
//! Each action delegates to a guarded entry point on [`ActionContext`] and
//! redirects back to the dashboard with the outcome's message.

use axum::{Extension, Form, response::Redirect};
use ebookdes_catalog::{ActionContext, DeleteForm, EbookForm, PageContentForm};

use crate::server_helpers::outcome_redirect;

const DASHBOARD: &str = "/dashboard";

pub async fn create_ebook(
    Extension(context): Extension<ActionContext>,
    Form(form): Form<EbookForm>,
) -> Redirect {
    outcome_redirect(DASHBOARD, &context.create_ebook(&form).await)
}

pub async fn update_ebook(
    Extension(context): Extension<ActionContext>,
    Form(form): Form<EbookForm>,
) -> Redirect {
    outcome_redirect(DASHBOARD, &context.update_ebook(&form).await)
}

pub async fn delete_ebook(
    Extension(context): Extension<ActionContext>,
    Form(form): Form<DeleteForm>,
) -> Redirect {
    outcome_redirect(DASHBOARD, &context.delete_ebook(&form).await)
}

pub async fn update_page_content(
    Extension(context): Extension<ActionContext>,
    Form(form): Form<PageContentForm>,
) -> Redirect {
    outcome_redirect(DASHBOARD, &context.update_page_content(&form).await)
}

/// Always refused.
pub async fn promote_self(Extension(context): Extension<ActionContext>) -> Redirect {
    outcome_redirect(DASHBOARD, &context.promote_self_to_admin().await)
}
