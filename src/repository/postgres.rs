use async_trait::async_trait;
use sqlx::PgPool;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        AccountForm, Author, AuthorForm, Book, BookForm, Comment, NewComment, NewUser, Page,
        PageRequest, User,
    },
};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, status, description, \
                            photo, password_hash, date_joined";
const AUTHOR_COLUMNS: &str = "id, first_name, last_name, biography, birth_date, death_date, \
                              birth_place, death_place, photo";
const BOOK_COLUMNS: &str = "id, title, description, release_date, cover, author_id";
const COMMENT_COLUMNS: &str = "id, text, created_at, book_id, creator_id, parent_comment_id";

/// Turns constraint violations into domain errors. Everything else stays a database fault.
fn classify(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AppError::Conflict("username".to_string());
        }
        if db.is_foreign_key_violation() {
            let constraint = db.constraint().unwrap_or("reference").to_string();
            return AppError::NotFound(format!("referenced row ({})", constraint));
        }
    }
    AppError::Database(e)
}

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Cascades are declared on the
/// foreign keys (see `migrations/`); every write runs in an explicit transaction.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// create_user
    ///
    /// Inserts the account; the `UNIQUE` constraint on `username` reports duplicates.
    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;
        tx.commit().await?;
        Ok(user)
    }

    async fn update_user(&self, id: i64, form: AccountForm) -> AppResult<Option<User>> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "UPDATE users SET username = $2, first_name = $3, last_name = $4, email = $5, \
             status = $6, description = $7, photo = $8 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&form.username)
            .bind(&form.first_name)
            .bind(&form.last_name)
            .bind(&form.email)
            .bind(&form.status)
            .bind(&form.description)
            .bind(&form.photo)
            .fetch_optional(&mut *tx)
            .await
            .map_err(classify)?;
        tx.commit().await?;
        Ok(user)
    }

    async fn set_password_hash(&self, id: i64, password_hash: String) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    // --- READING LIST ---

    /// add_to_reading_list
    ///
    /// `ON CONFLICT DO NOTHING` on the composite key makes this idempotent.
    async fn add_to_reading_list(&self, user_id: i64, book_id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query(
            "INSERT INTO reading_list (user_id, book_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(book_id)
        .execute(&mut *tx)
        .await
        .map_err(classify)?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    async fn remove_from_reading_list(&self, user_id: i64, book_id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query("DELETE FROM reading_list WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    async fn reading_list(&self, user_id: i64) -> AppResult<Vec<Book>> {
        let sql = "SELECT b.id, b.title, b.description, b.release_date, b.cover, b.author_id \
                   FROM books b JOIN reading_list r ON r.book_id = b.id \
                   WHERE r.user_id = $1 ORDER BY r.added_at DESC, b.id";
        Ok(sqlx::query_as::<_, Book>(sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn reader_count(&self, book_id: i64) -> AppResult<i64> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reading_list WHERE book_id = $1")
                .bind(book_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    // --- AUTHORS ---

    async fn list_authors(&self, page: PageRequest) -> AppResult<Page<Author>> {
        let sql = format!(
            "SELECT {AUTHOR_COLUMNS} FROM authors ORDER BY last_name, first_name, id \
             LIMIT $1 OFFSET $2"
        );
        let items = sqlx::query_as::<_, Author>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM authors")
            .fetch_one(&self.pool)
            .await?;
        Ok(Page {
            items,
            request: page,
            total,
        })
    }

    async fn get_author(&self, id: i64) -> AppResult<Option<Author>> {
        let sql = format!("SELECT {AUTHOR_COLUMNS} FROM authors WHERE id = $1");
        Ok(sqlx::query_as::<_, Author>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_author(&self, form: AuthorForm) -> AppResult<Author> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "INSERT INTO authors (first_name, last_name, biography, birth_date, death_date, \
             birth_place, death_place, photo) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {AUTHOR_COLUMNS}"
        );
        let author = sqlx::query_as::<_, Author>(&sql)
            .bind(&form.first_name)
            .bind(&form.last_name)
            .bind(&form.biography)
            .bind(form.birth_date)
            .bind(form.death_date)
            .bind(&form.birth_place)
            .bind(&form.death_place)
            .bind(&form.photo)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(author)
    }

    async fn update_author(&self, id: i64, form: AuthorForm) -> AppResult<Option<Author>> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "UPDATE authors SET first_name = $2, last_name = $3, biography = $4, \
             birth_date = $5, death_date = $6, birth_place = $7, death_place = $8, photo = $9 \
             WHERE id = $1 RETURNING {AUTHOR_COLUMNS}"
        );
        let author = sqlx::query_as::<_, Author>(&sql)
            .bind(id)
            .bind(&form.first_name)
            .bind(&form.last_name)
            .bind(&form.biography)
            .bind(form.birth_date)
            .bind(form.death_date)
            .bind(&form.birth_place)
            .bind(&form.death_place)
            .bind(&form.photo)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(author)
    }

    /// delete_author
    ///
    /// `books.author_id` is `ON DELETE SET NULL`, so books outlive their author.
    async fn delete_author(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    async fn books_by_author(&self, author_id: i64) -> AppResult<Vec<Book>> {
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE author_id = $1 \
             ORDER BY release_date DESC NULLS LAST, id"
        );
        Ok(sqlx::query_as::<_, Book>(&sql)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?)
    }

    // --- BOOKS ---

    async fn list_books(&self, page: PageRequest) -> AppResult<Page<Book>> {
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY release_date DESC NULLS LAST, id \
             LIMIT $1 OFFSET $2"
        );
        let items = sqlx::query_as::<_, Book>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(Page {
            items,
            request: page,
            total,
        })
    }

    async fn get_book(&self, id: i64) -> AppResult<Option<Book>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1");
        Ok(sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_book(&self, form: BookForm) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "INSERT INTO books (title, description, release_date, cover, author_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {BOOK_COLUMNS}"
        );
        let book = sqlx::query_as::<_, Book>(&sql)
            .bind(&form.title)
            .bind(&form.description)
            .bind(form.release_date)
            .bind(&form.cover)
            .bind(form.author)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;
        tx.commit().await?;
        Ok(book)
    }

    async fn update_book(&self, id: i64, form: BookForm) -> AppResult<Option<Book>> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "UPDATE books SET title = $2, description = $3, release_date = $4, cover = $5, \
             author_id = $6 WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        );
        let book = sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .bind(&form.title)
            .bind(&form.description)
            .bind(form.release_date)
            .bind(&form.cover)
            .bind(form.author)
            .fetch_optional(&mut *tx)
            .await
            .map_err(classify)?;
        tx.commit().await?;
        Ok(book)
    }

    async fn delete_book(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    // --- COMMENTS ---

    async fn get_comment(&self, id: i64) -> AppResult<Option<Comment>> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn comments_for_book(&self, book_id: i64) -> AppResult<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE book_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// create_comment
    ///
    /// A reply's parent must already exist under the same book. The parent is locked for
    /// the duration of the transaction so it cannot vanish between the check and the insert.
    async fn create_comment(&self, new_comment: NewComment) -> AppResult<Comment> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = new_comment.parent_comment_id {
            let parent_book = sqlx::query_scalar::<_, i64>(
                "SELECT book_id FROM comments WHERE id = $1 FOR SHARE",
            )
            .bind(parent_id)
            .fetch_optional(&mut *tx)
            .await?;
            if parent_book != Some(new_comment.book_id) {
                return Err(AppError::NotFound(format!("comment {}", parent_id)));
            }
        }

        let sql = format!(
            "INSERT INTO comments (text, book_id, creator_id, parent_comment_id) \
             VALUES ($1, $2, $3, $4) RETURNING {COMMENT_COLUMNS}"
        );
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(&new_comment.text)
            .bind(new_comment.book_id)
            .bind(new_comment.creator_id)
            .bind(new_comment.parent_comment_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;
        tx.commit().await?;
        Ok(comment)
    }

    async fn update_comment_text(&self, id: i64, text: String) -> AppResult<Option<Comment>> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("UPDATE comments SET text = $2 WHERE id = $1 RETURNING {COMMENT_COLUMNS}");
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(text)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(comment)
    }

    async fn delete_comment(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }
}
