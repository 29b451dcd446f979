//! Error taxonomy and error page rendering.

use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::flow::{FieldErrors, Notice, Redirected};

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Anonymous actor on a gated route. `next` is the path to come back to.
    #[error("authentication required")]
    AuthenticationRequired { next: String },

    /// Authenticated actor refused on a delete; answered with a redirect and an error notice.
    #[error("authorization denied: {}", .notice.code())]
    AuthorizationDenied { redirect_to: String, notice: Notice },

    /// Authenticated actor refused on an update; answered with the 403 page.
    #[error("forbidden: {}", .0.code())]
    Forbidden(Notice),

    #[error("validation failed for {form}")]
    FormRejected {
        form: &'static str,
        errors: FieldErrors,
    },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Unique constraint hit; carries the offending field name.
    #[error("conflict on {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal server error: {0}")]
    Internal(String),
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// An id segment that is not a number names no resource, so it is a 404 like any other
/// unknown id. A route declared without the parameters it extracts is a server fault.
impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(e) => AppError::NotFound(e.body_text()),
            other => AppError::Internal(other.body_text()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// ErrorPage
///
/// Context handed to one of the four error templates. The response status line is
/// always built from `status_code`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ErrorPage {
    pub status_code: u16,
    pub template: String,
    pub message: String,
}

impl ErrorPage {
    /// Maps any status onto the closest of the 400/403/404/500 templates.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let status = match status.as_u16() {
            400 | 403 | 404 | 500 => status,
            code if code >= 500 => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status_code: status.as_u16(),
            template: format!("errors/{}.html", status.as_u16()),
            message: message.into(),
        }
    }
}

impl IntoResponse for ErrorPage {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// FormErrorsPage
///
/// Re-rendered form: the schema name and its field errors. No write has happened.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FormErrorsPage {
    pub form: String,
    pub errors: FieldErrors,
}

/// Builds the login redirect, preserving the original destination.
pub fn login_redirect(next: &str) -> Redirect {
    Redirect::to(&format!("/login?next={}", urlencoding::encode(next)))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::AuthenticationRequired { next } => login_redirect(&next).into_response(),
            AppError::AuthorizationDenied {
                redirect_to,
                notice,
            } => {
                tracing::warn!(notice = notice.code(), "authorization denied");
                Redirected::to(redirect_to)
                    .with_notice(notice)
                    .into_response()
            }
            AppError::Forbidden(notice) => {
                tracing::warn!(notice = notice.code(), "forbidden");
                ErrorPage::new(StatusCode::FORBIDDEN, notice.message()).into_response()
            }
            AppError::FormRejected { form, errors } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(FormErrorsPage {
                    form: form.to_string(),
                    errors,
                }),
            )
                .into_response(),
            AppError::BadRequest(msg) => ErrorPage::new(StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::NotFound(msg) => ErrorPage::new(StatusCode::NOT_FOUND, msg).into_response(),
            AppError::Conflict(field) => {
                ErrorPage::new(StatusCode::BAD_REQUEST, format!("{} is already taken", field))
                    .into_response()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ErrorPage::new(StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorPage::new(StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
            }
        }
    }
}
