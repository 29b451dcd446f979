//! Mutation flow shared by every create/update/delete handler.
//!
//! A handler moves through `Idle -> Validating -> (Committing | Rejected) -> Terminal`.
//! The access policy is evaluated before `Validating`; a denial leaves the flow through
//! an [`AppError`]. `Validating` is [`Submission::validated`]: a rejected payload becomes
//! `AppError::FormRejected`, which re-renders the form with field errors. `Committing`
//! is a single repository call, each of which runs in one transaction. A successful
//! commit ends in [`Redirected`], optionally carrying a one-shot [`Notice`].

use std::collections::BTreeMap;

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::AppError;

/// Cookie that carries a notice across a redirect.
pub const NOTICE_COOKIE: &str = "notice";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Notice
///
/// User-visible outcome messages. Only the stable code travels in the cookie; the
/// level and text are looked up when the notice is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    CommentPosted,
    CommentUpdated,
    CommentDeleted,
    NotCommentCreator,
    AccountCreated,
    AccountUpdated,
    AccountDeleted,
    NotAccountOwner,
    AlreadySignedIn,
    PasswordChanged,
    LoggedIn,
    LoggedOut,
    AddedToReadingList,
    RemovedFromReadingList,
}

impl Notice {
    const ALL: [Notice; 14] = [
        Notice::CommentPosted,
        Notice::CommentUpdated,
        Notice::CommentDeleted,
        Notice::NotCommentCreator,
        Notice::AccountCreated,
        Notice::AccountUpdated,
        Notice::AccountDeleted,
        Notice::NotAccountOwner,
        Notice::AlreadySignedIn,
        Notice::PasswordChanged,
        Notice::LoggedIn,
        Notice::LoggedOut,
        Notice::AddedToReadingList,
        Notice::RemovedFromReadingList,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Notice::CommentPosted => "comment-posted",
            Notice::CommentUpdated => "comment-updated",
            Notice::CommentDeleted => "comment-deleted",
            Notice::NotCommentCreator => "not-comment-creator",
            Notice::AccountCreated => "account-created",
            Notice::AccountUpdated => "account-updated",
            Notice::AccountDeleted => "account-deleted",
            Notice::NotAccountOwner => "not-account-owner",
            Notice::AlreadySignedIn => "already-signed-in",
            Notice::PasswordChanged => "password-changed",
            Notice::LoggedIn => "logged-in",
            Notice::LoggedOut => "logged-out",
            Notice::AddedToReadingList => "added-to-reading-list",
            Notice::RemovedFromReadingList => "removed-from-reading-list",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|notice| notice.code() == code)
    }

    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::NotCommentCreator | Notice::NotAccountOwner | Notice::AlreadySignedIn => {
                NoticeLevel::Error
            }
            _ => NoticeLevel::Success,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Notice::CommentPosted => "Your comment has been posted.",
            Notice::CommentUpdated => "Your comment has been updated.",
            Notice::CommentDeleted => "The comment has been deleted.",
            Notice::NotCommentCreator => "You can only change or delete your own comments.",
            Notice::AccountCreated => "Your account has been created.",
            Notice::AccountUpdated => "Your account has been updated.",
            Notice::AccountDeleted => "Your account has been deleted.",
            Notice::NotAccountOwner => "You can only change or delete your own account.",
            Notice::AlreadySignedIn => "You are already signed in.",
            Notice::PasswordChanged => "Your password has been changed.",
            Notice::LoggedIn => "You are now signed in.",
            Notice::LoggedOut => "You have been signed out.",
            Notice::AddedToReadingList => "The book was added to your reading list.",
            Notice::RemovedFromReadingList => "The book was removed from your reading list.",
        }
    }

    pub fn view(&self) -> NoticeView {
        NoticeView {
            level: self.level(),
            code: self.code().to_string(),
            message: self.message().to_string(),
        }
    }

    fn cookie(&self) -> Cookie<'static> {
        Cookie::build((NOTICE_COOKIE, self.code()))
            .path("/")
            .http_only(true)
            .build()
    }
}

/// NoticeView
///
/// A notice as page view-models expose it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NoticeView {
    pub level: NoticeLevel,
    pub code: String,
    pub message: String,
}

/// take_notice
///
/// Consumes the pending notice, if any: returns it and a jar that clears the cookie.
pub fn take_notice(jar: CookieJar) -> (CookieJar, Option<NoticeView>) {
    let notice = jar
        .get(NOTICE_COOKIE)
        .and_then(|cookie| Notice::from_code(cookie.value()));
    match notice {
        Some(notice) => {
            let jar = jar.remove(Cookie::build(NOTICE_COOKIE).path("/"));
            (jar, Some(notice.view()))
        }
        None => (jar, None),
    }
}

/// Redirected
///
/// Terminal state of a successful mutation: `303 See Other` to `location`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirected {
    pub location: String,
    pub notice: Option<Notice>,
}

impl Redirected {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            notice: None,
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }
}

impl IntoResponse for Redirected {
    fn into_response(self) -> Response {
        let redirect = Redirect::to(&self.location);
        match self.notice {
            Some(notice) => (CookieJar::new().add(notice.cookie()), redirect).into_response(),
            None => redirect.into_response(),
        }
    }
}

/// Field name to error messages, in a stable order.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Flattens validator output into `field -> messages`. Schema-level errors land under `__all__`.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut out = FieldErrors::new();
    for (field, kind) in errors.errors() {
        if let ValidationErrorsKind::Field(list) = kind {
            let messages = list
                .iter()
                .map(|err| {
                    err.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string())
                })
                .collect();
            out.insert(field.to_string(), messages);
        }
    }
    out
}

/// Builds a single-field rejection, for checks that need the store (unique names, foreign keys).
pub fn reject_field(form: &'static str, field: &str, message: &str) -> AppError {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), vec![message.to_string()]);
    AppError::FormRejected { form, errors }
}

/// Submission
///
/// The `Validating` step for any form schema.
pub trait Submission: Validate + Sized {
    fn validated(self, form: &'static str) -> Result<Self, AppError> {
        match self.validate() {
            Ok(()) => Ok(self),
            Err(errors) => {
                tracing::debug!(form, "form rejected");
                Err(AppError::FormRejected {
                    form,
                    errors: field_errors(&errors),
                })
            }
        }
    }
}

impl<T: Validate> Submission for T {}
