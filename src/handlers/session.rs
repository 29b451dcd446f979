//! Login, logout and password change.

use axum::{
    Json,
    extract::State,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::{AppQuery, SubmittedForm, user_url};
use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{AppError, AppResult},
    flow::{FieldErrors, Notice, Redirected, Submission, reject_field},
    models::{LOGIN_FORM, LoginForm, LoginPage, PASSWORD_CHANGE_FORM, PasswordChangeForm},
    policy,
};

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Where to go after a successful login.
    pub next: Option<String>,
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|path| {
        path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
    })
}

/// login_page
///
/// [Public Route] The login form view-model, carrying the `next` target through.
#[utoipa::path(
    get,
    path = "/login",
    params(LoginQuery),
    responses((status = 200, description = "Login form", body = LoginPage))
)]
pub async fn login_page(AppQuery(query): AppQuery<LoginQuery>) -> Json<LoginPage> {
    Json(LoginPage {
        form: LOGIN_FORM.to_string(),
        next: safe_next(query.next.as_deref()).map(str::to_string),
    })
}

/// login
///
/// [Public Route] Verifies credentials, sets the session cookie and sends the user to
/// `next` (or their account page).
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Signed in"),
        (status = 422, description = "Bad credentials", body = crate::error::FormErrorsPage)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    SubmittedForm(form): SubmittedForm<LoginForm>,
) -> AppResult<(CookieJar, Redirected)> {
    let form = form.validated(LOGIN_FORM)?;

    let user = state
        .repo
        .get_user_by_username(&form.username)
        .await?
        .filter(|user| auth::verify_password(&form.password, &user.password_hash));
    let Some(user) = user else {
        tracing::warn!(username = %form.username, "failed login");
        let mut errors = FieldErrors::new();
        errors.insert(
            "__all__".to_string(),
            vec!["Please enter a correct username and password.".to_string()],
        );
        return Err(AppError::FormRejected {
            form: LOGIN_FORM,
            errors,
        });
    };

    let token = auth::issue_session_token(&state.config, user.id)?;
    let location = safe_next(form.next.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| user_url(user.id));
    tracing::info!(user_id = user.id, "signed in");

    Ok((
        jar.add(auth::session_cookie(token)),
        Redirected::to(location).with_notice(Notice::LoggedIn),
    ))
}

/// logout
///
/// [Public Route] Clears the session cookie. Harmless when nobody is signed in.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 303, description = "Signed out, redirect to the book list"))
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Redirected) {
    (
        auth::clear_session(jar),
        Redirected::to("/books").with_notice(Notice::LoggedOut),
    )
}

/// password_change
///
/// [Authenticated Route] Replaces the actor's password after checking the current one.
#[utoipa::path(
    post,
    path = "/password_change",
    request_body(content = PasswordChangeForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Changed, redirect to the account page"),
        (status = 422, description = "Field errors", body = crate::error::FormErrorsPage)
    )
)]
pub async fn password_change(
    actor: AuthUser,
    State(state): State<AppState>,
    SubmittedForm(form): SubmittedForm<PasswordChangeForm>,
) -> AppResult<Redirected> {
    policy::modify_account(&actor, actor.id).or_forbid()?;
    let form = form.validated(PASSWORD_CHANGE_FORM)?;

    let user = state
        .repo
        .get_user(actor.id)
        .await?
        .ok_or_else(|| AppError::AuthenticationRequired {
            next: "/password_change".to_string(),
        })?;
    if !auth::verify_password(&form.old_password, &user.password_hash) {
        return Err(reject_field(
            PASSWORD_CHANGE_FORM,
            "old_password",
            "Your old password was entered incorrectly. Please enter it again.",
        ));
    }

    let password_hash = auth::hash_password(&form.new_password1)?;
    state.repo.set_password_hash(user.id, password_hash).await?;
    tracing::info!(user_id = user.id, "password changed");

    Ok(Redirected::to(user_url(user.id)).with_notice(Notice::PasswordChanged))
}
