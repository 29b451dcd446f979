use crate::{
    AppState,
    handlers::{authors, books, comments, session, uploads, users},
};
use axum::{Router, routing::post};

/// Authenticated Router Module
///
/// Every route here sits behind the session middleware: anonymous requests are redirected
/// to `/login?next=<path>` before the handler runs. All mutations are form POSTs that
/// answer with a `303 See Other`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // --- Books ---
        .route("/book/new", post(books::create_book))
        .route("/book/{id}/update", post(books::update_book))
        .route(
            "/book/{id}/reading-list/add",
            post(books::add_to_reading_list),
        )
        .route(
            "/book/{id}/reading-list/remove",
            post(books::remove_from_reading_list),
        )
        // --- Comments ---
        // Book, creator and parent come from the path and the session, never the form.
        .route("/book/{id}/comment", post(comments::create_comment))
        .route(
            "/book/{id}/comment/{parent_id}",
            post(comments::reply_to_comment),
        )
        // Update/remove are restricted to the comment's creator.
        .route("/comment/{id}/update", post(comments::update_comment))
        .route("/comment/{id}/remove", post(comments::remove_comment))
        // --- Authors ---
        .route("/author/new", post(authors::create_author))
        .route("/author/{id}/update", post(authors::update_author))
        // --- Accounts ---
        // Restricted to the account owner.
        .route("/user/{id}/update", post(users::update_user))
        .route("/user/{id}/delete", post(users::delete_user))
        .route("/password_change", post(session::password_change))
        // --- Media ---
        .route("/uploads/presigned", post(uploads::get_presigned_url))
}
