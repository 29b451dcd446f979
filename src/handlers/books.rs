use axum::{
    Json,
    extract::State,
};
use axum_extra::extract::cookie::CookieJar;

use super::{AppPath, AppQuery, FormBody, PageQuery, SubmittedForm, book_url, not_found};
use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    flow::{Notice, Redirected, Submission, reject_field, take_notice},
    models::{
        BOOK_FORM, Book, BookDetailPage, BookForm, BookListPage, CommentListPage, PageRequest,
    },
    policy,
};

/// Rejects a form whose `author` names no existing author.
async fn check_author_choice(state: &AppState, form: &BookForm) -> AppResult<()> {
    if let Some(author_id) = form.author {
        if state.repo.get_author(author_id).await?.is_none() {
            return Err(reject_field(
                BOOK_FORM,
                "author",
                "Select a valid choice. That choice is not one of the available choices.",
            ));
        }
    }
    Ok(())
}

/// list_books
///
/// [Public Route] One page of the catalog, newest releases first.
#[utoipa::path(
    get,
    path = "/books",
    params(PageQuery),
    responses((status = 200, description = "Book list page", body = BookListPage))
)]
pub async fn list_books(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<BookListPage>)> {
    let request = PageRequest::new(query.page, state.config.page_size);
    let page = state.repo.list_books(request).await?;
    let (jar, notice) = take_notice(jar);

    Ok((
        jar,
        Json(BookListPage {
            pagination: page.info(),
            books: page.items,
            notice,
        }),
    ))
}

/// get_book
///
/// [Public Route] Book detail with its author, the flat comment list and the number of
/// readers who keep it on their reading list.
#[utoipa::path(
    get,
    path = "/book/{id}",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Found", body = BookDetailPage),
        (status = 404, description = "Not Found", body = crate::error::ErrorPage)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<BookDetailPage>)> {
    let book = state
        .repo
        .get_book(id)
        .await?
        .ok_or_else(|| not_found("book", id))?;

    let author = match book.author_id {
        Some(author_id) => state.repo.get_author(author_id).await?,
        None => None,
    };
    let comments = state.repo.comments_for_book(id).await?;
    let reader_count = state.repo.reader_count(id).await?;
    let (jar, notice) = take_notice(jar);

    Ok((
        jar,
        Json(BookDetailPage {
            book,
            author,
            comments,
            reader_count,
            notice,
        }),
    ))
}

/// get_book_comments
///
/// [Public Route] All comments on a book, flat and newest first. Replies reference their
/// parent through `parent_comment_id`.
#[utoipa::path(
    get,
    path = "/book/{id}/comments",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Comments", body = CommentListPage),
        (status = 404, description = "Not Found", body = crate::error::ErrorPage)
    )
)]
pub async fn get_book_comments(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<CommentListPage>> {
    if state.repo.get_book(id).await?.is_none() {
        return Err(not_found("book", id));
    }
    let comments = state.repo.comments_for_book(id).await?;
    Ok(Json(CommentListPage {
        book_id: id,
        comments,
    }))
}

/// create_book
///
/// [Authenticated Route] Adds a book to the catalog and redirects to its detail page.
#[utoipa::path(
    post,
    path = "/book/new",
    request_body(content = BookForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created, redirect to the book"),
        (status = 422, description = "Field errors", body = crate::error::FormErrorsPage)
    )
)]
pub async fn create_book(
    actor: AuthUser,
    State(state): State<AppState>,
    form: FormBody<BookForm>,
) -> AppResult<Redirected> {
    policy::edit_catalog(&actor).or_forbid()?;
    let SubmittedForm(form) = form?;
    let form = form.validated(BOOK_FORM)?;
    check_author_choice(&state, &form).await?;

    let book: Book = state.repo.create_book(form).await?;
    tracing::info!(book_id = book.id, actor_id = actor.id, "book created");

    Ok(Redirected::to(book_url(book.id)))
}

/// update_book
///
/// [Authenticated Route] Replaces a book's editable fields.
#[utoipa::path(
    post,
    path = "/book/{id}/update",
    params(("id" = i64, Path, description = "Book ID")),
    request_body(content = BookForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated, redirect to the book"),
        (status = 404, description = "Not Found", body = crate::error::ErrorPage),
        (status = 422, description = "Field errors", body = crate::error::FormErrorsPage)
    )
)]
pub async fn update_book(
    actor: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    form: FormBody<BookForm>,
) -> AppResult<Redirected> {
    policy::edit_catalog(&actor).or_forbid()?;
    if state.repo.get_book(id).await?.is_none() {
        return Err(not_found("book", id));
    }
    let SubmittedForm(form) = form?;
    let form = form.validated(BOOK_FORM)?;
    check_author_choice(&state, &form).await?;

    let book = state
        .repo
        .update_book(id, form)
        .await?
        .ok_or_else(|| not_found("book", id))?;
    tracing::info!(book_id = book.id, actor_id = actor.id, "book updated");

    Ok(Redirected::to(book_url(book.id)))
}

/// add_to_reading_list
///
/// [Authenticated Route] Puts the book on the actor's reading list. Adding twice is a no-op.
#[utoipa::path(
    post,
    path = "/book/{id}/reading-list/add",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 303, description = "Redirect to the book with a notice"),
        (status = 404, description = "Not Found", body = crate::error::ErrorPage)
    )
)]
pub async fn add_to_reading_list(
    actor: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> AppResult<Redirected> {
    policy::manage_reading_list(&actor).or_forbid()?;
    if state.repo.get_book(id).await?.is_none() {
        return Err(not_found("book", id));
    }

    let inserted = state.repo.add_to_reading_list(actor.id, id).await?;
    tracing::info!(book_id = id, actor_id = actor.id, inserted, "reading list add");

    Ok(Redirected::to(book_url(id)).with_notice(Notice::AddedToReadingList))
}

/// remove_from_reading_list
///
/// [Authenticated Route] Takes the book off the actor's reading list, if it was there.
#[utoipa::path(
    post,
    path = "/book/{id}/reading-list/remove",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 303, description = "Redirect to the book with a notice"),
        (status = 404, description = "Not Found", body = crate::error::ErrorPage)
    )
)]
pub async fn remove_from_reading_list(
    actor: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> AppResult<Redirected> {
    policy::manage_reading_list(&actor).or_forbid()?;
    if state.repo.get_book(id).await?.is_none() {
        return Err(not_found("book", id));
    }

    let removed = state.repo.remove_from_reading_list(actor.id, id).await?;
    tracing::info!(book_id = id, actor_id = actor.id, removed, "reading list remove");

    Ok(Redirected::to(book_url(id)).with_notice(Notice::RemovedFromReadingList))
}
