//! Signed-in pages: the library dashboard and the reader.

use axum::{
    Extension, Json,
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use ebookdes_catalog::{ActionContext, Failure, FailureKind, ProgressForm, parse_ebook_id};

use crate::error::AppError;
use crate::server_helpers::FlashQuery;
use crate::types::{ActionReply, Library, Reader};
use crate::user::current_user_info;

/// The user's library: every book, their progress, and whether they may
/// manage the catalog.
pub async fn dashboard(
    Extension(context): Extension<ActionContext>,
    Query(flash): Query<FlashQuery>,
) -> Result<Response, AppError> {
    let Some(user) = current_user_info(&context).await else {
        return Ok(Redirect::to("/sign-in").into_response());
    };

    let store = context.store();
    let ebooks = store
        .list_ebooks(None)
        .await
        .map_err(AppError::store("list_ebooks"))?;
    let progress = store
        .progress_for_user(user.id)
        .await
        .map_err(AppError::store("progress_for_user"))?;

    Ok(Json(Library {
        is_admin: user.is_admin,
        user,
        ebooks,
        progress,
        flash,
    })
    .into_response())
}

/// One book with the reader's saved position. Unknown books send the
/// reader back to the library.
pub async fn read(
    Extension(context): Extension<ActionContext>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Some(user) = context.user() else {
        return Ok(Redirect::to("/sign-in").into_response());
    };
    let Ok(ebook_id) = parse_ebook_id(Some(&id)) else {
        return Ok(Redirect::to("/dashboard").into_response());
    };

    let store = context.store();
    let Some(ebook) = store
        .get_ebook(ebook_id)
        .await
        .map_err(AppError::store("get_ebook"))?
    else {
        return Ok(Redirect::to("/dashboard").into_response());
    };

    let progress = match store.get_progress(user.id(), ebook_id).await {
        Ok(progress) => progress,
        Err(e) => {
            tracing::warn!(
                user_id = %user.id(),
                ebook_id = %ebook_id,
                error = %e,
                "Failed to load reading progress"
            );
            None
        }
    };
    let percent = progress.as_ref().map_or(0, |p| p.percent());

    Ok(Json(Reader {
        ebook,
        progress,
        percent,
    })
    .into_response())
}

fn failure_status(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::Unauthorized => StatusCode::UNAUTHORIZED,
        FailureKind::AccessDenied => StatusCode::FORBIDDEN,
        FailureKind::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::OperationFailed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reply(failure: Failure) -> Response {
    (
        failure_status(failure.kind),
        Json(ActionReply::Error {
            kind: failure.kind,
            message: failure.message,
        }),
    )
        .into_response()
}

/// Saves the reader's position. Called by the reader on page turns.
pub async fn save_progress(
    Extension(context): Extension<ActionContext>,
    Path(id): Path<String>,
    Json(form): Json<ProgressForm>,
) -> Response {
    let ebook_id = match parse_ebook_id(Some(&id)) {
        Ok(ebook_id) => ebook_id,
        Err(e) => return reply(e.into()),
    };
    match context.update_reading_progress(ebook_id, &form).await {
        Ok(success) => Json(ActionReply::Success {
            message: success.message,
        })
        .into_response(),
        Err(failure) => reply(failure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kinds_map_to_statuses() {
        assert_eq!(
            failure_status(FailureKind::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            failure_status(FailureKind::ValidationError),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(failure_status(FailureKind::NotFound), StatusCode::NOT_FOUND);
    }
}
