//! Comment threads.
//!
//! The comment's book, creator and parent are always taken from the URL path and the
//! session. The form contributes only `text`, so extra submitted fields have no effect.

use axum::extract::State;

use super::{AppPath, FormBody, SubmittedForm, book_url, not_found};
use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    flow::{Notice, Redirected, Submission},
    models::{COMMENT_FORM, CommentForm, NewComment},
    policy,
};

async fn post(
    actor: AuthUser,
    state: AppState,
    book_id: i64,
    parent_comment_id: Option<i64>,
    form: FormBody<CommentForm>,
) -> AppResult<Redirected> {
    policy::post_comment(&actor).or_forbid()?;

    if state.repo.get_book(book_id).await?.is_none() {
        return Err(not_found("book", book_id));
    }
    if let Some(parent_id) = parent_comment_id {
        // A reply must hang off an existing comment on the same book.
        match state.repo.get_comment(parent_id).await? {
            Some(parent) if parent.book_id == book_id => {}
            _ => return Err(not_found("comment", parent_id)),
        }
    }

    let SubmittedForm(form) = form?;
    let form = form.validated(COMMENT_FORM)?;
    let comment = state
        .repo
        .create_comment(NewComment {
            book_id,
            creator_id: actor.id,
            parent_comment_id,
            text: form.text,
        })
        .await?;
    tracing::info!(
        comment_id = comment.id,
        book_id,
        parent_comment_id = ?comment.parent_comment_id,
        actor_id = actor.id,
        "comment posted"
    );

    Ok(Redirected::to(book_url(book_id)).with_notice(Notice::CommentPosted))
}

/// create_comment
///
/// [Authenticated Route] Posts a top-level comment on a book.
#[utoipa::path(
    post,
    path = "/book/{id}/comment",
    params(("id" = i64, Path, description = "Book ID")),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Posted, redirect to the book"),
        (status = 404, description = "Unknown book", body = crate::error::ErrorPage),
        (status = 422, description = "Field errors", body = crate::error::FormErrorsPage)
    )
)]
pub async fn create_comment(
    actor: AuthUser,
    State(state): State<AppState>,
    AppPath(book_id): AppPath<i64>,
    form: FormBody<CommentForm>,
) -> AppResult<Redirected> {
    post(actor, state, book_id, None, form).await
}

/// reply_to_comment
///
/// [Authenticated Route] Posts a reply under `parent_id`. The parent must belong to the
/// same book, otherwise the request is a 404.
#[utoipa::path(
    post,
    path = "/book/{id}/comment/{parent_id}",
    params(
        ("id" = i64, Path, description = "Book ID"),
        ("parent_id" = i64, Path, description = "Parent comment ID")
    ),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Posted, redirect to the book"),
        (status = 404, description = "Unknown book or parent", body = crate::error::ErrorPage),
        (status = 422, description = "Field errors", body = crate::error::FormErrorsPage)
    )
)]
pub async fn reply_to_comment(
    actor: AuthUser,
    State(state): State<AppState>,
    AppPath((book_id, parent_id)): AppPath<(i64, i64)>,
    form: FormBody<CommentForm>,
) -> AppResult<Redirected> {
    post(actor, state, book_id, Some(parent_id), form).await
}

/// update_comment
///
/// [Authenticated Route] Edits the text of the actor's own comment. Anyone else gets the
/// 403 page.
#[utoipa::path(
    post,
    path = "/comment/{id}/update",
    params(("id" = i64, Path, description = "Comment ID")),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated, redirect to the book"),
        (status = 403, description = "Not the creator", body = crate::error::ErrorPage),
        (status = 404, description = "Not Found", body = crate::error::ErrorPage),
        (status = 422, description = "Field errors", body = crate::error::FormErrorsPage)
    )
)]
pub async fn update_comment(
    actor: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    form: FormBody<CommentForm>,
) -> AppResult<Redirected> {
    let comment = state
        .repo
        .get_comment(id)
        .await?
        .ok_or_else(|| not_found("comment", id))?;
    policy::modify_comment(&actor, &comment).or_forbid()?;
    let SubmittedForm(form) = form?;
    let form = form.validated(COMMENT_FORM)?;

    let updated = state
        .repo
        .update_comment_text(id, form.text)
        .await?
        .ok_or_else(|| not_found("comment", id))?;
    tracing::info!(comment_id = id, actor_id = actor.id, "comment updated");

    Ok(Redirected::to(book_url(updated.book_id)).with_notice(Notice::CommentUpdated))
}

/// remove_comment
///
/// [Authenticated Route] Deletes the actor's own comment together with every reply below
/// it. A non-creator is sent back to the book with an error notice and nothing changes.
#[utoipa::path(
    post,
    path = "/comment/{id}/remove",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 303, description = "Redirect to the book with a success or denial notice"),
        (status = 404, description = "Not Found", body = crate::error::ErrorPage)
    )
)]
pub async fn remove_comment(
    actor: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> AppResult<Redirected> {
    let comment = state
        .repo
        .get_comment(id)
        .await?
        .ok_or_else(|| not_found("comment", id))?;
    let back_to_book = book_url(comment.book_id);
    policy::modify_comment(&actor, &comment).or_redirect(back_to_book.clone())?;

    state.repo.delete_comment(id).await?;
    tracing::info!(comment_id = id, actor_id = actor.id, "comment deleted");

    Ok(Redirected::to(back_to_book).with_notice(Notice::CommentDeleted))
}
