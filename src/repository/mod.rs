use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{
        AccountForm, Author, AuthorForm, Book, BookForm, Comment, NewComment, NewUser, Page,
        PageRequest, User,
    },
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// The persistence contract the handlers are written against. Every mutating method runs
/// as one atomic unit: either the whole write (including cascades) is visible or none of it.
///
/// Conventions:
/// - `Option` results mean "no such row"; handlers turn that into a 404.
/// - `bool` results on deletes report whether a row was removed.
/// - A duplicate username surfaces as `AppError::Conflict("username")`.
/// - A dangling reference (book, author, parent comment, user) surfaces as `AppError::NotFound`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: i64) -> AppResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn create_user(&self, new_user: NewUser) -> AppResult<User>;
    async fn update_user(&self, id: i64, form: AccountForm) -> AppResult<Option<User>>;
    async fn set_password_hash(&self, id: i64, password_hash: String) -> AppResult<bool>;
    // Cascades to the user's comments (and their replies) and reading-list entries.
    async fn delete_user(&self, id: i64) -> AppResult<bool>;

    // --- Reading list ---
    // Idempotent: returns true only when a new entry was inserted.
    async fn add_to_reading_list(&self, user_id: i64, book_id: i64) -> AppResult<bool>;
    async fn remove_from_reading_list(&self, user_id: i64, book_id: i64) -> AppResult<bool>;
    async fn reading_list(&self, user_id: i64) -> AppResult<Vec<Book>>;
    async fn reader_count(&self, book_id: i64) -> AppResult<i64>;

    // --- Authors ---
    // Ordered by last name, first name, id.
    async fn list_authors(&self, page: PageRequest) -> AppResult<Page<Author>>;
    async fn get_author(&self, id: i64) -> AppResult<Option<Author>>;
    async fn create_author(&self, form: AuthorForm) -> AppResult<Author>;
    async fn update_author(&self, id: i64, form: AuthorForm) -> AppResult<Option<Author>>;
    // Clears `author_id` on the author's books; the books survive.
    async fn delete_author(&self, id: i64) -> AppResult<bool>;
    async fn books_by_author(&self, author_id: i64) -> AppResult<Vec<Book>>;

    // --- Books ---
    // Ordered by release date descending (undated last), then id.
    async fn list_books(&self, page: PageRequest) -> AppResult<Page<Book>>;
    async fn get_book(&self, id: i64) -> AppResult<Option<Book>>;
    async fn create_book(&self, form: BookForm) -> AppResult<Book>;
    async fn update_book(&self, id: i64, form: BookForm) -> AppResult<Option<Book>>;
    // Cascades to the book's comments and reading-list entries.
    async fn delete_book(&self, id: i64) -> AppResult<bool>;

    // --- Comments ---
    async fn get_comment(&self, id: i64) -> AppResult<Option<Comment>>;
    // Flat, newest first (ties by id descending).
    async fn comments_for_book(&self, book_id: i64) -> AppResult<Vec<Comment>>;
    async fn create_comment(&self, new_comment: NewComment) -> AppResult<Comment>;
    // Only the text changes; creator, book, parent and timestamp are fixed.
    async fn update_comment_text(&self, id: i64, text: String) -> AppResult<Option<Comment>>;
    // Cascades to every reply below the comment.
    async fn delete_comment(&self, id: i64) -> AppResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
