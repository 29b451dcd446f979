use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        AccountForm, Author, AuthorForm, Book, BookForm, Comment, NewComment, NewUser, Page,
        PageRequest, User,
    },
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    authors: BTreeMap<i64, Author>,
    books: BTreeMap<i64, Book>,
    comments: BTreeMap<i64, Comment>,
    // (user_id, book_id) -> insertion sequence, newest highest.
    reading_list: BTreeMap<(i64, i64), u64>,
    last_user_id: i64,
    last_author_id: i64,
    last_book_id: i64,
    last_comment_id: i64,
    last_reading_seq: u64,
}

impl Tables {
    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn check_author(&self, author_id: Option<i64>) -> AppResult<()> {
        match author_id {
            Some(id) if !self.authors.contains_key(&id) => {
                Err(AppError::NotFound(format!("author {}", id)))
            }
            _ => Ok(()),
        }
    }

    /// Removes every comment matching `roots` together with all replies beneath them.
    fn remove_comment_trees(&mut self, roots: impl Fn(&Comment) -> bool) -> usize {
        let mut doomed: BTreeSet<i64> = self
            .comments
            .values()
            .filter(|c| roots(c))
            .map(|c| c.id)
            .collect();
        loop {
            let replies: Vec<i64> = self
                .comments
                .values()
                .filter(|c| !doomed.contains(&c.id))
                .filter(|c| c.parent_comment_id.is_some_and(|p| doomed.contains(&p)))
                .map(|c| c.id)
                .collect();
            if replies.is_empty() {
                break;
            }
            doomed.extend(replies);
        }
        for id in &doomed {
            self.comments.remove(id);
        }
        doomed.len()
    }
}

fn book_order(a: &Book, b: &Book) -> Ordering {
    let by_date = match (a.release_date, b.release_date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then(a.id.cmp(&b.id))
}

fn paginate<T>(mut rows: Vec<T>, request: PageRequest) -> Page<T> {
    let total = rows.len() as i64;
    let start = (request.offset() as usize).min(rows.len());
    let end = (start + request.limit() as usize).min(rows.len());
    let items = rows.drain(start..end).collect();
    Page {
        items,
        request,
        total,
    }
}

/// InMemoryRepository
///
/// Arena-style store: one id-keyed map per table behind a single lock. Each mutating
/// call holds the write lock for its whole body, which makes it atomic with respect to
/// every other request. Cascades mirror the foreign keys of the PostgreSQL schema.
/// Used when no database is configured locally, and by the test suite.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- USERS ---

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.username_taken(&new_user.username, None) {
            return Err(AppError::Conflict("username".to_string()));
        }
        tables.last_user_id += 1;
        let user = User {
            id: tables.last_user_id,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            date_joined: Utc::now(),
            ..User::default()
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: i64, form: AccountForm) -> AppResult<Option<User>> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Ok(None);
        }
        if tables.username_taken(&form.username, Some(id)) {
            return Err(AppError::Conflict("username".to_string()));
        }
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        user.username = form.username;
        user.first_name = form.first_name;
        user.last_name = form.last_name;
        user.email = form.email;
        user.status = form.status;
        user.description = form.description;
        user.photo = form.photo;
        Ok(Some(user.clone()))
    }

    async fn set_password_hash(&self, id: i64, password_hash: String) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.remove_comment_trees(|c| c.creator_id == id);
        tables.reading_list.retain(|(user_id, _), _| *user_id != id);
        Ok(true)
    }

    // --- READING LIST ---

    async fn add_to_reading_list(&self, user_id: i64, book_id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }
        if !tables.books.contains_key(&book_id) {
            return Err(AppError::NotFound(format!("book {}", book_id)));
        }
        if tables.reading_list.contains_key(&(user_id, book_id)) {
            return Ok(false);
        }
        tables.last_reading_seq += 1;
        let seq = tables.last_reading_seq;
        tables.reading_list.insert((user_id, book_id), seq);
        Ok(true)
    }

    async fn remove_from_reading_list(&self, user_id: i64, book_id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.reading_list.remove(&(user_id, book_id)).is_some())
    }

    async fn reading_list(&self, user_id: i64) -> AppResult<Vec<Book>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<(u64, i64)> = tables
            .reading_list
            .iter()
            .filter(|((uid, _), _)| *uid == user_id)
            .map(|((_, book_id), seq)| (*seq, *book_id))
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries
            .into_iter()
            .filter_map(|(_, book_id)| tables.books.get(&book_id).cloned())
            .collect())
    }

    async fn reader_count(&self, book_id: i64) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .reading_list
            .keys()
            .filter(|(_, bid)| *bid == book_id)
            .count() as i64)
    }

    // --- AUTHORS ---

    async fn list_authors(&self, page: PageRequest) -> AppResult<Page<Author>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Author> = tables.authors.values().cloned().collect();
        rows.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
                .then(a.id.cmp(&b.id))
        });
        Ok(paginate(rows, page))
    }

    async fn get_author(&self, id: i64) -> AppResult<Option<Author>> {
        Ok(self.tables.read().await.authors.get(&id).cloned())
    }

    async fn create_author(&self, form: AuthorForm) -> AppResult<Author> {
        let mut tables = self.tables.write().await;
        tables.last_author_id += 1;
        let author = Author {
            id: tables.last_author_id,
            first_name: form.first_name,
            last_name: form.last_name,
            biography: form.biography,
            birth_date: form.birth_date,
            death_date: form.death_date,
            birth_place: form.birth_place,
            death_place: form.death_place,
            photo: form.photo,
        };
        tables.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn update_author(&self, id: i64, form: AuthorForm) -> AppResult<Option<Author>> {
        let mut tables = self.tables.write().await;
        let Some(author) = tables.authors.get_mut(&id) else {
            return Ok(None);
        };
        *author = Author {
            id,
            first_name: form.first_name,
            last_name: form.last_name,
            biography: form.biography,
            birth_date: form.birth_date,
            death_date: form.death_date,
            birth_place: form.birth_place,
            death_place: form.death_place,
            photo: form.photo,
        };
        Ok(Some(author.clone()))
    }

    async fn delete_author(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.authors.remove(&id).is_none() {
            return Ok(false);
        }
        for book in tables.books.values_mut() {
            if book.author_id == Some(id) {
                book.author_id = None;
            }
        }
        Ok(true)
    }

    async fn books_by_author(&self, author_id: i64) -> AppResult<Vec<Book>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Book> = tables
            .books
            .values()
            .filter(|b| b.author_id == Some(author_id))
            .cloned()
            .collect();
        rows.sort_by(book_order);
        Ok(rows)
    }

    // --- BOOKS ---

    async fn list_books(&self, page: PageRequest) -> AppResult<Page<Book>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Book> = tables.books.values().cloned().collect();
        rows.sort_by(book_order);
        Ok(paginate(rows, page))
    }

    async fn get_book(&self, id: i64) -> AppResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(&id).cloned())
    }

    async fn create_book(&self, form: BookForm) -> AppResult<Book> {
        let mut tables = self.tables.write().await;
        tables.check_author(form.author)?;
        tables.last_book_id += 1;
        let book = Book {
            id: tables.last_book_id,
            title: form.title,
            description: form.description,
            release_date: form.release_date,
            cover: form.cover,
            author_id: form.author,
        };
        tables.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update_book(&self, id: i64, form: BookForm) -> AppResult<Option<Book>> {
        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&id) {
            return Ok(None);
        }
        tables.check_author(form.author)?;
        let Some(book) = tables.books.get_mut(&id) else {
            return Ok(None);
        };
        *book = Book {
            id,
            title: form.title,
            description: form.description,
            release_date: form.release_date,
            cover: form.cover,
            author_id: form.author,
        };
        Ok(Some(book.clone()))
    }

    async fn delete_book(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.books.remove(&id).is_none() {
            return Ok(false);
        }
        tables.remove_comment_trees(|c| c.book_id == id);
        tables.reading_list.retain(|(_, book_id), _| *book_id != id);
        Ok(true)
    }

    // --- COMMENTS ---

    async fn get_comment(&self, id: i64) -> AppResult<Option<Comment>> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn comments_for_book(&self, book_id: i64) -> AppResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.book_id == book_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn create_comment(&self, new_comment: NewComment) -> AppResult<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&new_comment.book_id) {
            return Err(AppError::NotFound(format!("book {}", new_comment.book_id)));
        }
        if !tables.users.contains_key(&new_comment.creator_id) {
            return Err(AppError::NotFound(format!("user {}", new_comment.creator_id)));
        }
        if let Some(parent_id) = new_comment.parent_comment_id {
            let parent_book = tables.comments.get(&parent_id).map(|p| p.book_id);
            if parent_book != Some(new_comment.book_id) {
                return Err(AppError::NotFound(format!("comment {}", parent_id)));
            }
        }
        tables.last_comment_id += 1;
        let comment = Comment {
            id: tables.last_comment_id,
            text: new_comment.text,
            created_at: Utc::now(),
            book_id: new_comment.book_id,
            creator_id: new_comment.creator_id,
            parent_comment_id: new_comment.parent_comment_id,
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_comment_text(&self, id: i64, text: String) -> AppResult<Option<Comment>> {
        let mut tables = self.tables.write().await;
        Ok(tables.comments.get_mut(&id).map(|comment| {
            comment.text = text;
            comment.clone()
        }))
    }

    async fn delete_comment(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.comments.contains_key(&id) {
            return Ok(false);
        }
        tables.remove_comment_trees(|c| c.id == id);
        Ok(true)
    }
}
