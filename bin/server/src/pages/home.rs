//! Public pages: home, about, featured books, and the current-user probe.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ebookdes_catalog::{ActionContext, PageContent, PageType};

use crate::auth::AppState;
use crate::error::AppError;
use crate::types::{FeaturedBooks, SitePage, UserInfo};
use crate::user::current_user_info;

/// Number of books on the featured page.
const FEATURED_LIMIT: i64 = 6;

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded").into_response()
        }
    }
}

/// Stored page content over the defaults. A failed read still renders the
/// page with default text.
async fn site_page(context: &ActionContext, page_type: PageType) -> SitePage {
    let stored = match context.store().get_page_content(page_type).await {
        Ok(stored) => stored,
        Err(e) => {
            tracing::error!(page_type = %page_type, error = %e, "Failed to load page content");
            None
        }
    };
    SitePage {
        page: PageContent::with_defaults(stored, page_type),
        user: current_user_info(context).await,
    }
}

pub async fn home(Extension(context): Extension<ActionContext>) -> Json<SitePage> {
    Json(site_page(&context, PageType::Homepage).await)
}

pub async fn about(Extension(context): Extension<ActionContext>) -> Json<SitePage> {
    Json(site_page(&context, PageType::About).await)
}

pub async fn featured_books(
    Extension(context): Extension<ActionContext>,
) -> Result<Json<FeaturedBooks>, AppError> {
    let ebooks = context
        .store()
        .list_ebooks(Some(FEATURED_LIMIT))
        .await
        .map_err(AppError::store("list_featured_ebooks"))?;
    Ok(Json(FeaturedBooks { ebooks }))
}

pub async fn me(Extension(context): Extension<ActionContext>) -> Json<Option<UserInfo>> {
    Json(current_user_info(&context).await)
}
