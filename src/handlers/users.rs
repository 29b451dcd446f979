use axum::{
    Json,
    extract::State,
};
use axum_extra::extract::cookie::CookieJar;

use super::{AppPath, FormBody, SubmittedForm, not_found, user_url};
use crate::{
    AppState,
    auth::{self, AuthUser, MaybeUser},
    error::{AppError, AppResult},
    flow::{Notice, Redirected, Submission, reject_field, take_notice},
    models::{
        ACCOUNT_FORM, AccountForm, NewUser, SIGNUP_FORM, SignupForm, UserDetailPage, UserProfile,
    },
    policy,
};

const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// signup
///
/// [Public Route] Creates an account and signs the new user in.
///
/// Only anonymous visitors may sign up: a signed-in actor is redirected to their own
/// account page with a notice.
#[utoipa::path(
    post,
    path = "/signup",
    request_body(content = SignupForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created and signed in, redirect to the account page"),
        (status = 422, description = "Field errors", body = crate::error::FormErrorsPage)
    )
)]
pub async fn signup(
    MaybeUser(actor): MaybeUser,
    State(state): State<AppState>,
    jar: CookieJar,
    form: FormBody<SignupForm>,
) -> AppResult<(CookieJar, Redirected)> {
    if let Some(actor) = &actor {
        policy::signup(Some(actor)).or_redirect(user_url(actor.id))?;
    }
    let SubmittedForm(form) = form?;
    let form = form.validated(SIGNUP_FORM)?;

    let password_hash = auth::hash_password(&form.password1)?;
    let user = state
        .repo
        .create_user(NewUser {
            username: form.username,
            email: form.email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => reject_field(SIGNUP_FORM, "username", USERNAME_TAKEN),
            other => other,
        })?;
    tracing::info!(user_id = user.id, "account created");

    let token = auth::issue_session_token(&state.config, user.id)?;
    Ok((
        jar.add(auth::session_cookie(token)),
        Redirected::to(user_url(user.id)).with_notice(Notice::AccountCreated),
    ))
}

/// get_user
///
/// [Public Route] A user's profile and reading list. The e-mail address is only included
/// when the viewer is the account owner.
#[utoipa::path(
    get,
    path = "/user/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserDetailPage),
        (status = 404, description = "Not Found", body = crate::error::ErrorPage)
    )
)]
pub async fn get_user(
    MaybeUser(viewer): MaybeUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<UserDetailPage>)> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| not_found("user", id))?;
    let reading_list = state.repo.reading_list(id).await?;
    let is_owner = viewer.is_some_and(|viewer| viewer.id == id);
    let (jar, notice) = take_notice(jar);

    Ok((
        jar,
        Json(UserDetailPage {
            user: UserProfile::from_user(user, is_owner),
            reading_list,
            notice,
        }),
    ))
}

/// update_user
///
/// [Authenticated Route] Updates the actor's own profile. Password fields are not part of
/// this form; see `password_change`.
#[utoipa::path(
    post,
    path = "/user/{id}/update",
    params(("id" = i64, Path, description = "User ID")),
    request_body(content = AccountForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated, redirect to the account page"),
        (status = 403, description = "Not the account owner", body = crate::error::ErrorPage),
        (status = 422, description = "Field errors", body = crate::error::FormErrorsPage)
    )
)]
pub async fn update_user(
    actor: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    form: FormBody<AccountForm>,
) -> AppResult<Redirected> {
    policy::modify_account(&actor, id).or_forbid()?;
    let SubmittedForm(form) = form?;
    let form = form.validated(ACCOUNT_FORM)?;

    let user = state
        .repo
        .update_user(id, form)
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => reject_field(ACCOUNT_FORM, "username", USERNAME_TAKEN),
            other => other,
        })?
        .ok_or_else(|| not_found("user", id))?;
    tracing::info!(user_id = user.id, "account updated");

    Ok(Redirected::to(user_url(user.id)).with_notice(Notice::AccountUpdated))
}

/// delete_user
///
/// [Authenticated Route] Deletes the actor's own account, its comments (with their
/// replies) and its reading list, then signs the actor out. Deleting someone else's
/// account redirects back to that profile with an error notice and removes nothing.
#[utoipa::path(
    post,
    path = "/user/{id}/delete",
    params(("id" = i64, Path, description = "User ID")),
    responses((status = 303, description = "Redirect with a success or denial notice"))
)]
pub async fn delete_user(
    actor: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Redirected)> {
    policy::modify_account(&actor, id).or_redirect(user_url(id))?;

    if !state.repo.delete_user(id).await? {
        return Err(not_found("user", id));
    }
    tracing::info!(user_id = id, "account deleted");

    Ok((
        auth::clear_session(jar),
        Redirected::to("/books").with_notice(Notice::AccountDeleted),
    ))
}
