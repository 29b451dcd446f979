use crate::{
    AppState,
    handlers::{authors, books, session, users},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Handlers that adapt to the viewer (the user
/// profile, signup) resolve the optional identity themselves through `MaybeUser`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Catalog ---
        .route("/books", get(books::list_books))
        .route("/book/{id}", get(books::get_book))
        .route("/book/{id}/comments", get(books::get_book_comments))
        .route("/authors", get(authors::list_authors))
        .route("/author/{id}", get(authors::get_author))
        // --- Accounts ---
        // GET /user/{id}
        // The e-mail address is only shown to the account owner.
        .route("/user/{id}", get(users::get_user))
        // POST /signup
        // Anonymous only; a signed-in visitor is bounced to their own account page.
        .route("/signup", post(users::signup))
        .route("/login", get(session::login_page).post(session::login))
        .route("/logout", post(session::logout))
}
