use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{NoneAsEmptyString, serde_as};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::flow::NoticeView;

// --- Core Entities (Mapped to Database) ---

/// User
///
/// An account record from the `users` table. The password hash is loaded for login
/// verification but never leaves the process: it is skipped by serde, ts-rs and utoipa.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: i64,
    // Unique login name.
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    // Short free-text status line shown on the profile.
    pub status: Option<String>,
    pub description: Option<String>,
    // Object-storage key of the profile photo.
    pub photo: Option<String>,
    // argon2 PHC string.
    #[serde(skip)]
    pub password_hash: String,
    #[ts(type = "string")]
    pub date_joined: DateTime<Utc>,
}

/// Author
///
/// A row of the `authors` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Author {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub biography: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub death_place: Option<String>,
    pub photo: Option<String>,
}

impl Author {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Book
///
/// A row of the `books` table. `author_id` is cleared (not cascaded) when the author is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub release_date: Option<NaiveDate>,
    // Object-storage key of the cover image.
    pub cover: Option<String>,
    pub author_id: Option<i64>,
}

/// Comment
///
/// A row of the `comments` table. `book_id`, `creator_id` and `created_at` are set once
/// at insertion; only `text` is ever updated. `parent_comment_id` points at the
/// immediate ancestor in the reply tree.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub book_id: i64,
    pub creator_id: i64,
    pub parent_comment_id: Option<i64>,
}

// --- Store Inputs (Server-side bound values) ---

/// NewUser
///
/// Insert payload for an account. Built by the signup handler after hashing.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// NewComment
///
/// Insert payload for a comment. Every id here comes from the session or the URL path,
/// never from the submitted form.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub book_id: i64,
    pub creator_id: i64,
    pub parent_comment_id: Option<i64>,
    pub text: String,
}

// --- Form Schemas (Validated Input) ---

pub const BOOK_FORM: &str = "book_form";
pub const AUTHOR_FORM: &str = "author_form";
pub const COMMENT_FORM: &str = "comment_form";
pub const SIGNUP_FORM: &str = "signup_form";
pub const ACCOUNT_FORM: &str = "account_form";
pub const PASSWORD_CHANGE_FORM: &str = "password_change_form";
pub const LOGIN_FORM: &str = "login_form";

fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("This field is required.".into());
        return Err(err);
    }
    Ok(())
}

fn valid_username(value: &str) -> Result<(), ValidationError> {
    required(value)?;
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !value.chars().all(allowed) {
        let mut err = ValidationError::new("invalid_username");
        err.message =
            Some("Enter a valid username: letters, digits and @/./+/-/_ only.".into());
        return Err(err);
    }
    Ok(())
}

fn lifespan_in_order(form: &AuthorForm) -> Result<(), ValidationError> {
    if let (Some(born), Some(died)) = (form.birth_date, form.death_date) {
        if died < born {
            let mut err = ValidationError::new("lifespan");
            err.message = Some("Death date cannot precede birth date.".into());
            return Err(err);
        }
    }
    Ok(())
}

/// BookForm
///
/// Accepted fields for book create and update. `author` carries an author id.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, Default)]
pub struct BookForm {
    #[serde(default)]
    #[validate(
        custom(function = "required"),
        length(max = 256, message = "Ensure this value has at most 256 characters.")
    )]
    pub title: String,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub author: Option<i64>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub description: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub cover: Option<String>,
}

/// AuthorForm
///
/// Accepted fields for author create and update.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, Default)]
#[validate(schema(function = "lifespan_in_order", skip_on_field_errors = false))]
pub struct AuthorForm {
    #[serde(default)]
    #[validate(
        custom(function = "required"),
        length(max = 256, message = "Ensure this value has at most 256 characters.")
    )]
    pub first_name: String,
    #[serde(default)]
    #[validate(
        custom(function = "required"),
        length(max = 256, message = "Ensure this value has at most 256 characters.")
    )]
    pub last_name: String,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub biography: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub death_date: Option<NaiveDate>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 256, message = "Ensure this value has at most 256 characters."))]
    pub birth_place: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 256, message = "Ensure this value has at most 256 characters."))]
    pub death_place: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub photo: Option<String>,
}

/// CommentForm
///
/// The only client-controlled comment field. Book, creator and parent are bound server-side.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, Default)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(custom(function = "required"))]
    pub text: String,
}

/// SignupForm
///
/// Account creation: username and email plus the credential confirmation pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, Default)]
pub struct SignupForm {
    #[serde(default)]
    #[validate(
        custom(function = "valid_username"),
        length(max = 150, message = "Ensure this value has at most 150 characters.")
    )]
    pub username: String,
    #[serde(default)]
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this value has at most 254 characters.")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password1: String,
    #[serde(default)]
    #[validate(must_match(other = "password1", message = "The two password fields didn't match."))]
    pub password2: String,
}

/// AccountForm
///
/// Profile update. Deliberately carries no password fields.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, Default)]
pub struct AccountForm {
    #[serde(default)]
    #[validate(
        custom(function = "valid_username"),
        length(max = 150, message = "Ensure this value has at most 150 characters.")
    )]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub last_name: String,
    #[serde(default)]
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this value has at most 254 characters.")
    )]
    pub email: String,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 256, message = "Ensure this value has at most 256 characters."))]
    pub status: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub description: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub photo: Option<String>,
}

/// PasswordChangeForm
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, Default)]
pub struct PasswordChangeForm {
    #[serde(default)]
    #[validate(custom(function = "required"))]
    pub old_password: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub new_password1: String,
    #[serde(default)]
    #[validate(must_match(other = "new_password1", message = "The two password fields didn't match."))]
    pub new_password2: String,
}

/// LoginForm
///
/// `next` is the preserved destination from the login redirect.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, Default)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(custom(function = "required"))]
    pub username: String,
    #[serde(default)]
    #[validate(custom(function = "required"))]
    pub password: String,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub next: Option<String>,
}

// --- Pagination ---

/// PageRequest
///
/// One-based page number and page size, resolved from the query string and configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// Page
///
/// A slice of an ordered collection plus the total row count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub request: PageRequest,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn info(&self) -> PageInfo {
        PageInfo {
            page: self.request.page,
            per_page: self.request.per_page,
            total: self.total,
            has_next: self.request.offset() + (self.items.len() as i64) < self.total,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct PageInfo {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub has_next: bool,
}

// --- Page View-Models (Output) ---

/// UserProfile
///
/// Public view of an account. `email` is only filled in when the viewer owns the account.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub status: Option<String>,
    pub description: Option<String>,
    pub photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[ts(type = "string")]
    pub date_joined: DateTime<Utc>,
}

impl UserProfile {
    pub fn from_user(user: User, show_email: bool) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            status: user.status,
            description: user.description,
            photo: user.photo,
            email: show_email.then_some(user.email),
            date_joined: user.date_joined,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookListPage {
    pub books: Vec<Book>,
    pub pagination: PageInfo,
    pub notice: Option<NoticeView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetailPage {
    pub book: Book,
    pub author: Option<Author>,
    // Flat, newest first. Tree assembly is left to the presentation layer.
    pub comments: Vec<Comment>,
    pub reader_count: i64,
    pub notice: Option<NoticeView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentListPage {
    pub book_id: i64,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorListPage {
    pub authors: Vec<Author>,
    pub pagination: PageInfo,
    pub notice: Option<NoticeView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorDetailPage {
    pub author: Author,
    pub books: Vec<Book>,
    pub notice: Option<NoticeView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDetailPage {
    pub user: UserProfile,
    pub reading_list: Vec<Book>,
    pub notice: Option<NoticeView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginPage {
    pub form: String,
    pub next: Option<String>,
}

// --- Media Uploads ---

/// UploadKind
///
/// Which image field an upload is destined for. Determines the key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum UploadKind {
    BookCover,
    AuthorPhoto,
    UserPhoto,
}

impl UploadKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            UploadKind::BookCover => "books",
            UploadKind::AuthorPhoto => "authors",
            UploadKind::UserPhoto => "users",
        }
    }
}

/// PresignedUploadRequest
///
/// Input payload for requesting a short-lived upload URL for a cover or photo.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS)]
#[ts(export)]
pub struct PresignedUploadRequest {
    pub kind: UploadKind,
    /// The original filename, used to derive the file extension.
    #[schema(example = "cover.jpg")]
    pub filename: String,
    /// Must be an `image/*` MIME type.
    #[schema(example = "image/jpeg")]
    pub content_type: String,
}

/// PresignedUploadResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUploadResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// Object key to submit as `cover` or `photo` afterwards.
    pub resource_key: String,
}
