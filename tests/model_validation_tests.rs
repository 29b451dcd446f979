use axum::{
    Form,
    body::Body,
    extract::FromRequest,
    http::{Request, header},
};
use chrono::NaiveDate;
use library_catalog::{
    flow::Submission,
    error::AppError,
    models::{
        AUTHOR_FORM, AccountForm, AuthorForm, BOOK_FORM, BookForm, CommentForm, PageRequest,
        SIGNUP_FORM, SignupForm, User, UserProfile,
    },
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Decodes a urlencoded body the way the form handlers receive it.
async fn parse_form<T: DeserializeOwned + Send>(body: &str) -> T {
    let request = Request::builder()
        .method("POST")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    let Form(form) = Form::<T>::from_request(request, &()).await.unwrap();
    form
}

fn rejected_fields(err: AppError) -> Vec<String> {
    match err {
        AppError::FormRejected { errors, .. } => errors.into_keys().collect(),
        other => panic!("expected a form rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_book_form_requires_title() {
    let form: BookForm = parse_form("title=&release_date=&author=").await;
    assert_eq!(form.release_date, None);
    assert_eq!(form.author, None);

    let err = form.validated(BOOK_FORM).unwrap_err();
    assert_eq!(rejected_fields(err), vec!["title".to_string()]);
}

#[test]
fn test_book_form_whitespace_title_is_missing() {
    let form = BookForm {
        title: "   ".to_string(),
        ..BookForm::default()
    };
    assert!(form.validate().is_err());
}

#[tokio::test]
async fn test_book_form_parses_optional_fields() {
    let form: BookForm = parse_form(
        "title=Dune&release_date=1965-08-01&author=3&description=Spice&cover=books%2Fa.jpg",
    )
    .await;

    assert_eq!(form.release_date, NaiveDate::from_ymd_opt(1965, 8, 1));
    assert_eq!(form.author, Some(3));
    assert_eq!(form.cover.as_deref(), Some("books/a.jpg"));
    assert!(form.validated(BOOK_FORM).is_ok());
}

#[test]
fn test_author_form_rejects_death_before_birth() {
    let form = AuthorForm {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1900, 1, 1),
        death_date: NaiveDate::from_ymd_opt(1850, 1, 1),
        ..AuthorForm::default()
    };

    let err = form.validated(AUTHOR_FORM).unwrap_err();
    assert_eq!(rejected_fields(err), vec!["__all__".to_string()]);
}

#[test]
fn test_author_form_requires_both_names() {
    let err = AuthorForm::default().validated(AUTHOR_FORM).unwrap_err();
    let fields = rejected_fields(err);
    assert!(fields.contains(&"first_name".to_string()));
    assert!(fields.contains(&"last_name".to_string()));
}

#[tokio::test]
async fn test_comment_form_ignores_server_bound_fields() {
    // Only `text` is a form field; ids posted alongside it are dropped.
    let form: CommentForm =
        parse_form("text=great+book&book=99&creator=42&parent_comment=5").await;
    assert_eq!(form.text, "great book");
    assert!(form.validate().is_ok());
}

#[test]
fn test_comment_form_requires_text() {
    assert!(CommentForm::default().validate().is_err());
}

#[test]
fn test_signup_form_password_rules() {
    let mismatch = SignupForm {
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        password1: "correct horse".to_string(),
        password2: "battery staple".to_string(),
    };
    let fields = rejected_fields(mismatch.validated(SIGNUP_FORM).unwrap_err());
    assert_eq!(fields, vec!["password2".to_string()]);

    let short = SignupForm {
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        password1: "short".to_string(),
        password2: "short".to_string(),
    };
    let fields = rejected_fields(short.validated(SIGNUP_FORM).unwrap_err());
    assert_eq!(fields, vec!["password1".to_string()]);
}

#[test]
fn test_signup_form_username_charset() {
    let form = SignupForm {
        username: "alice smith".to_string(),
        email: "alice@example.com".to_string(),
        password1: "correct horse".to_string(),
        password2: "correct horse".to_string(),
    };
    assert!(form.validate().is_err());

    let form = SignupForm {
        username: "alice.smith+books@home".to_string(),
        ..form
    };
    assert!(form.validate().is_ok());
}

#[test]
fn test_account_form_rejects_bad_email() {
    let form = AccountForm {
        username: "alice".to_string(),
        email: "not-an-email".to_string(),
        ..AccountForm::default()
    };
    let errors = form.validate().unwrap_err();
    assert!(errors.field_errors().contains_key("email"));
}

#[test]
fn test_page_request_bounds() {
    let first = PageRequest::new(None, 15);
    assert_eq!((first.page, first.offset(), first.limit()), (1, 0, 15));

    let zero = PageRequest::new(Some(0), 15);
    assert_eq!(zero.page, 1);

    let third = PageRequest::new(Some(3), 10);
    assert_eq!(third.offset(), 20);
}

#[test]
fn test_user_serialization_hides_password_hash() {
    let user = User {
        id: 1,
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        password_hash: "$argon2id$secret".to_string(),
        ..User::default()
    };
    let json = serde_json::to_string(&user).unwrap();
    assert!(!json.contains("argon2"));
    assert!(!json.contains("password_hash"));
}

#[test]
fn test_user_profile_email_visibility() {
    let user = User {
        id: 1,
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        ..User::default()
    };

    let public = serde_json::to_value(UserProfile::from_user(user.clone(), false)).unwrap();
    assert!(public.get("email").is_none());

    let own = serde_json::to_value(UserProfile::from_user(user, true)).unwrap();
    assert_eq!(own["email"], "alice@example.com");
}

#[test]
fn test_email_longer_than_column_is_rejected() {
    // Well-formed address: 64-char local part and 63-char labels, 260 chars overall.
    let label = "b".repeat(63);
    let email = format!("{}@{}.{}.{}.com", "a".repeat(64), label, label, label);
    assert_eq!(email.len(), 260);

    let signup = SignupForm {
        username: "alice".to_string(),
        email: email.clone(),
        password1: "correct horse".to_string(),
        password2: "correct horse".to_string(),
    };
    let fields = rejected_fields(signup.validated(SIGNUP_FORM).unwrap_err());
    assert_eq!(fields, vec!["email".to_string()]);

    let account = AccountForm {
        username: "alice".to_string(),
        email,
        ..AccountForm::default()
    };
    let errors = account.validate().unwrap_err();
    assert!(errors.field_errors().contains_key("email"));
}
