use chrono::NaiveDate;
use library_catalog::{
    error::AppError,
    models::{AccountForm, AuthorForm, Book, BookForm, Comment, NewComment, NewUser, PageRequest, User},
    repository::{InMemoryRepository, PostgresRepository, Repository},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Connects to `DATABASE_URL` and applies the migrations.
async fn postgres_repository() -> PostgresRepository {
    dotenv::dotenv().ok();

    let db_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set to run integration tests");

    let pool = PgPool::connect(&db_url)
        .await
        .expect("Failed to connect to database for integration tests.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations.");

    PostgresRepository::new(pool)
}

// --- Test Data Helpers ---

/// Usernames carry a random suffix so the Postgres runs can share one database.
async fn create_test_user(repo: &dyn Repository, name: &str) -> User {
    repo.create_user(NewUser {
        username: format!("{}-{}", name, Uuid::new_v4().simple()),
        email: format!("{}@example.com", name),
        password_hash: "not-a-real-hash".to_string(),
    })
    .await
    .unwrap()
}

async fn create_test_author(repo: &dyn Repository, first: &str, last: &str) -> i64 {
    repo.create_author(AuthorForm {
        first_name: first.to_string(),
        last_name: last.to_string(),
        ..AuthorForm::default()
    })
    .await
    .unwrap()
    .id
}

async fn create_test_book(repo: &dyn Repository, title: &str, author: Option<i64>) -> Book {
    repo.create_book(BookForm {
        title: title.to_string(),
        author,
        ..BookForm::default()
    })
    .await
    .unwrap()
}

async fn comment(
    repo: &dyn Repository,
    book_id: i64,
    creator_id: i64,
    parent_comment_id: Option<i64>,
    text: &str,
) -> Comment {
    repo.create_comment(NewComment {
        book_id,
        creator_id,
        parent_comment_id,
        text: text.to_string(),
    })
    .await
    .unwrap()
}

// --- Store Contract ---
// Each check runs against the in-memory store and, when a database is available, Postgres.

async fn check_deleting_author_keeps_books(repo: &dyn Repository) {
    let author_id = create_test_author(repo, "J.", "Doe").await;
    let book = create_test_book(repo, "Title X", Some(author_id)).await;

    assert!(repo.delete_author(author_id).await.unwrap());

    let survivor = repo.get_book(book.id).await.unwrap().expect("book survives");
    assert_eq!(survivor.title, "Title X");
    assert_eq!(survivor.author_id, None);
    assert!(repo.get_author(author_id).await.unwrap().is_none());
}

async fn check_deleting_book_removes_comments(repo: &dyn Repository) {
    let user = create_test_user(repo, "reader").await;
    let book = create_test_book(repo, "Doomed", None).await;
    let root = comment(repo, book.id, user.id, None, "first").await;
    let reply = comment(repo, book.id, user.id, Some(root.id), "reply").await;
    repo.add_to_reading_list(user.id, book.id).await.unwrap();

    assert!(repo.delete_book(book.id).await.unwrap());

    assert!(repo.get_comment(root.id).await.unwrap().is_none());
    assert!(repo.get_comment(reply.id).await.unwrap().is_none());
    assert!(repo.reading_list(user.id).await.unwrap().is_empty());
    assert!(!repo.delete_book(book.id).await.unwrap());
}

async fn check_deleting_comment_removes_reply_tree(repo: &dyn Repository) {
    let alice = create_test_user(repo, "alice").await;
    let bob = create_test_user(repo, "bob").await;
    let book = create_test_book(repo, "Threads", None).await;

    let root = comment(repo, book.id, alice.id, None, "root").await;
    let child = comment(repo, book.id, bob.id, Some(root.id), "child").await;
    let grandchild = comment(repo, book.id, alice.id, Some(child.id), "grandchild").await;
    let sibling = comment(repo, book.id, bob.id, None, "sibling").await;

    assert!(repo.delete_comment(root.id).await.unwrap());

    for id in [root.id, child.id, grandchild.id] {
        assert!(repo.get_comment(id).await.unwrap().is_none());
    }
    assert_eq!(repo.get_comment(sibling.id).await.unwrap(), Some(sibling));
}

async fn check_deleting_user_cascades(repo: &dyn Repository) {
    let alice = create_test_user(repo, "alice").await;
    let bob = create_test_user(repo, "bob").await;
    let book = create_test_book(repo, "Shared", None).await;

    let alice_root = comment(repo, book.id, alice.id, None, "alice says").await;
    let bob_reply = comment(repo, book.id, bob.id, Some(alice_root.id), "bob replies").await;
    let bob_root = comment(repo, book.id, bob.id, None, "bob says").await;
    repo.add_to_reading_list(alice.id, book.id).await.unwrap();

    assert!(repo.delete_user(alice.id).await.unwrap());

    assert!(repo.get_user(alice.id).await.unwrap().is_none());
    assert!(repo.get_comment(alice_root.id).await.unwrap().is_none());
    // Replies go with the comment they answer, whoever wrote them.
    assert!(repo.get_comment(bob_reply.id).await.unwrap().is_none());
    assert!(repo.get_comment(bob_root.id).await.unwrap().is_some());
    assert_eq!(repo.reader_count(book.id).await.unwrap(), 0);
}

async fn check_reply_parent_must_share_book(repo: &dyn Repository) {
    let user = create_test_user(repo, "replier").await;
    let first = create_test_book(repo, "First", None).await;
    let second = create_test_book(repo, "Second", None).await;
    let parent = comment(repo, first.id, user.id, None, "on first").await;

    let result = repo
        .create_comment(NewComment {
            book_id: second.id,
            creator_id: user.id,
            parent_comment_id: Some(parent.id),
            text: "misplaced".to_string(),
        })
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(repo.comments_for_book(second.id).await.unwrap().is_empty());
}

async fn check_comment_update_only_changes_text(repo: &dyn Repository) {
    let user = create_test_user(repo, "editor").await;
    let book = create_test_book(repo, "Edited", None).await;
    let original = comment(repo, book.id, user.id, None, "typo").await;

    let updated = repo
        .update_comment_text(original.id, "fixed".to_string())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.text, "fixed");
    assert_eq!(updated.book_id, original.book_id);
    assert_eq!(updated.creator_id, original.creator_id);
    assert_eq!(updated.parent_comment_id, original.parent_comment_id);
    assert_eq!(updated.created_at, original.created_at);
}

async fn check_username_is_unique(repo: &dyn Repository) {
    let alice = create_test_user(repo, "alice").await;

    let duplicate = repo
        .create_user(NewUser {
            username: alice.username.clone(),
            email: "other@example.com".to_string(),
            password_hash: String::new(),
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(field)) if field == "username"));

    let bob = create_test_user(repo, "bob").await;
    let rename = repo
        .update_user(
            bob.id,
            AccountForm {
                username: alice.username.clone(),
                email: "bob@example.com".to_string(),
                ..AccountForm::default()
            },
        )
        .await;
    assert!(matches!(rename, Err(AppError::Conflict(_))));
}

async fn check_reading_list_is_idempotent(repo: &dyn Repository) {
    let user = create_test_user(repo, "collector").await;
    let book = create_test_book(repo, "Keeper", None).await;

    assert!(repo.add_to_reading_list(user.id, book.id).await.unwrap());
    assert!(!repo.add_to_reading_list(user.id, book.id).await.unwrap());
    assert_eq!(repo.reader_count(book.id).await.unwrap(), 1);
    assert_eq!(repo.reading_list(user.id).await.unwrap(), vec![book.clone()]);

    assert!(repo.remove_from_reading_list(user.id, book.id).await.unwrap());
    assert!(!repo.remove_from_reading_list(user.id, book.id).await.unwrap());
    assert_eq!(repo.reader_count(book.id).await.unwrap(), 0);
}

async fn check_book_requires_existing_author(repo: &dyn Repository) {
    let result = repo
        .create_book(BookForm {
            title: "Orphan".to_string(),
            author: Some(i64::MAX),
            ..BookForm::default()
        })
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

// --- In-memory store ---

#[tokio::test]
async fn test_memory_deleting_author_keeps_books() {
    check_deleting_author_keeps_books(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_deleting_book_removes_comments() {
    check_deleting_book_removes_comments(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_deleting_comment_removes_reply_tree() {
    check_deleting_comment_removes_reply_tree(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_deleting_user_cascades() {
    check_deleting_user_cascades(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_reply_parent_must_share_book() {
    check_reply_parent_must_share_book(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_comment_update_only_changes_text() {
    check_comment_update_only_changes_text(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_username_is_unique() {
    check_username_is_unique(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_reading_list_is_idempotent() {
    check_reading_list_is_idempotent(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_book_requires_existing_author() {
    check_book_requires_existing_author(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_book_list_order_and_pages() {
    let repo = InMemoryRepository::new();
    let undated = create_test_book(&repo, "Undated", None).await;
    let old = repo
        .create_book(BookForm {
            title: "Old".to_string(),
            release_date: NaiveDate::from_ymd_opt(1950, 1, 1),
            ..BookForm::default()
        })
        .await
        .unwrap();
    let new = repo
        .create_book(BookForm {
            title: "New".to_string(),
            release_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            ..BookForm::default()
        })
        .await
        .unwrap();

    let first = repo.list_books(PageRequest::new(Some(1), 2)).await.unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.items, vec![new, old]);
    assert!(first.info().has_next);

    let second = repo.list_books(PageRequest::new(Some(2), 2)).await.unwrap();
    assert_eq!(second.items, vec![undated]);
    assert!(!second.info().has_next);
}

#[tokio::test]
async fn test_memory_author_list_alphabetical() {
    let repo = InMemoryRepository::new();
    create_test_author(&repo, "Zadie", "Smith").await;
    create_test_author(&repo, "Chinua", "Achebe").await;
    create_test_author(&repo, "Ali", "Smith").await;

    let page = repo.list_authors(PageRequest::new(None, 15)).await.unwrap();
    let names: Vec<String> = page.items.iter().map(|a| a.full_name()).collect();
    assert_eq!(names, vec!["Chinua Achebe", "Ali Smith", "Zadie Smith"]);
}

#[tokio::test]
async fn test_memory_comments_newest_first() {
    let repo = InMemoryRepository::new();
    let user = create_test_user(&repo, "talker").await;
    let book = create_test_book(&repo, "Chatty", None).await;
    let first = comment(&repo, book.id, user.id, None, "one").await;
    let second = comment(&repo, book.id, user.id, None, "two").await;
    let reply = comment(&repo, book.id, user.id, Some(first.id), "three").await;

    let ids: Vec<i64> = repo
        .comments_for_book(book.id)
        .await
        .unwrap()
        .iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec![reply.id, second.id, first.id]);
}

// --- PostgreSQL (requires DATABASE_URL) ---

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_postgres_deleting_author_keeps_books() {
    check_deleting_author_keeps_books(&postgres_repository().await).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_postgres_deleting_book_removes_comments() {
    check_deleting_book_removes_comments(&postgres_repository().await).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_postgres_deleting_comment_removes_reply_tree() {
    check_deleting_comment_removes_reply_tree(&postgres_repository().await).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_postgres_deleting_user_cascades() {
    check_deleting_user_cascades(&postgres_repository().await).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_postgres_reply_parent_must_share_book() {
    check_reply_parent_must_share_book(&postgres_repository().await).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_postgres_comment_update_only_changes_text() {
    check_comment_update_only_changes_text(&postgres_repository().await).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_postgres_username_is_unique() {
    check_username_is_unique(&postgres_repository().await).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_postgres_reading_list_is_idempotent() {
    check_reading_list_is_idempotent(&postgres_repository().await).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_postgres_book_requires_existing_author() {
    check_book_requires_existing_author(&postgres_repository().await).await;
}
