//! Request handlers, one module per entity.
//!
//! Read handlers load and return a page view-model. Mutation handlers follow the flow in
//! [`crate::flow`]: policy check, existence check, body decoding and validation, one
//! repository call, redirect.

use axum::{
    Form, Json,
    extract::{FromRequest, FromRequestParts, Path, Query},
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};

pub mod authors;
pub mod books;
pub mod comments;
pub mod session;
pub mod uploads;
pub mod users;

/// SubmittedForm
///
/// `application/x-www-form-urlencoded` body extractor whose malformed-body rejection is
/// the 400 error page instead of axum's plain-text default.
#[derive(Debug, FromRequest)]
#[from_request(via(Form), rejection(AppError))]
pub struct SubmittedForm<T>(pub T);

/// A form body whose decoding error is raised by the handler only after its policy and
/// existence checks.
pub type FormBody<T> = AppResult<SubmittedForm<T>>;

/// Path parameters. A segment that does not parse as the expected id is a 404 page.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Query string, rejected as the 400 page.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// JSON body, rejected as the 400 page.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// PageQuery
///
/// `?page=N` on list endpoints. Missing or zero means the first page.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<u32>,
}

pub(crate) fn book_url(id: i64) -> String {
    format!("/book/{}", id)
}

pub(crate) fn author_url(id: i64) -> String {
    format!("/author/{}", id)
}

pub(crate) fn user_url(id: i64) -> String {
    format!("/user/{}", id)
}

pub(crate) fn not_found(kind: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{} {} does not exist", kind, id))
}
