use axum::{
    Json,
    extract::State,
};
use axum_extra::extract::cookie::CookieJar;

use super::{AppPath, AppQuery, FormBody, PageQuery, SubmittedForm, author_url, not_found};
use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    flow::{Redirected, Submission, take_notice},
    models::{AUTHOR_FORM, AuthorDetailPage, AuthorForm, AuthorListPage, PageRequest},
    policy,
};

/// list_authors
///
/// [Public Route] One page of authors, alphabetical by last then first name.
#[utoipa::path(
    get,
    path = "/authors",
    params(PageQuery),
    responses((status = 200, description = "Author list page", body = AuthorListPage))
)]
pub async fn list_authors(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<AuthorListPage>)> {
    let request = PageRequest::new(query.page, state.config.page_size);
    let page = state.repo.list_authors(request).await?;
    let (jar, notice) = take_notice(jar);

    Ok((
        jar,
        Json(AuthorListPage {
            pagination: page.info(),
            authors: page.items,
            notice,
        }),
    ))
}

/// get_author
///
/// [Public Route] Author detail with the books credited to them.
#[utoipa::path(
    get,
    path = "/author/{id}",
    params(("id" = i64, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Found", body = AuthorDetailPage),
        (status = 404, description = "Not Found", body = crate::error::ErrorPage)
    )
)]
pub async fn get_author(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<AuthorDetailPage>)> {
    let author = state
        .repo
        .get_author(id)
        .await?
        .ok_or_else(|| not_found("author", id))?;
    let books = state.repo.books_by_author(id).await?;
    let (jar, notice) = take_notice(jar);

    Ok((
        jar,
        Json(AuthorDetailPage {
            author,
            books,
            notice,
        }),
    ))
}

/// create_author
///
/// [Authenticated Route] Adds an author. A death date before the birth date is rejected.
#[utoipa::path(
    post,
    path = "/author/new",
    request_body(content = AuthorForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created, redirect to the author"),
        (status = 422, description = "Field errors", body = crate::error::FormErrorsPage)
    )
)]
pub async fn create_author(
    actor: AuthUser,
    State(state): State<AppState>,
    form: FormBody<AuthorForm>,
) -> AppResult<Redirected> {
    policy::edit_catalog(&actor).or_forbid()?;
    let SubmittedForm(form) = form?;
    let form = form.validated(AUTHOR_FORM)?;

    let author = state.repo.create_author(form).await?;
    tracing::info!(author_id = author.id, actor_id = actor.id, "author created");

    Ok(Redirected::to(author_url(author.id)))
}

/// update_author
#[utoipa::path(
    post,
    path = "/author/{id}/update",
    params(("id" = i64, Path, description = "Author ID")),
    request_body(content = AuthorForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated, redirect to the author"),
        (status = 404, description = "Not Found", body = crate::error::ErrorPage),
        (status = 422, description = "Field errors", body = crate::error::FormErrorsPage)
    )
)]
pub async fn update_author(
    actor: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    form: FormBody<AuthorForm>,
) -> AppResult<Redirected> {
    policy::edit_catalog(&actor).or_forbid()?;
    if state.repo.get_author(id).await?.is_none() {
        return Err(not_found("author", id));
    }
    let SubmittedForm(form) = form?;
    let form = form.validated(AUTHOR_FORM)?;

    let author = state
        .repo
        .update_author(id, form)
        .await?
        .ok_or_else(|| not_found("author", id))?;
    tracing::info!(author_id = author.id, actor_id = actor.id, "author updated");

    Ok(Redirected::to(author_url(author.id)))
}
