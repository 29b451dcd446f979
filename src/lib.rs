use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, StatusCode},
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod flow;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;
pub mod storage;

// Routing split by access level (public, authenticated).
pub mod routes;
use auth::AuthUser;
use error::ErrorPage;
use handlers::{authors, books, comments, session, uploads, users};
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI description of every route and the form/page schemas, served at
/// `/api-docs/openapi.json` and browsable under `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        books::list_books, books::get_book, books::get_book_comments, books::create_book,
        books::update_book, books::add_to_reading_list, books::remove_from_reading_list,
        authors::list_authors, authors::get_author, authors::create_author, authors::update_author,
        comments::create_comment, comments::reply_to_comment, comments::update_comment,
        comments::remove_comment,
        users::signup, users::get_user, users::update_user, users::delete_user,
        session::login_page, session::login, session::logout, session::password_change,
        uploads::get_presigned_url
    ),
    components(
        schemas(
            models::User, models::Author, models::Book, models::Comment, models::UserProfile,
            models::BookForm, models::AuthorForm, models::CommentForm, models::SignupForm,
            models::AccountForm, models::PasswordChangeForm, models::LoginForm,
            models::PageInfo, models::BookListPage, models::BookDetailPage,
            models::CommentListPage, models::AuthorListPage, models::AuthorDetailPage,
            models::UserDetailPage, models::LoginPage,
            models::UploadKind, models::PresignedUploadRequest, models::PresignedUploadResponse,
            flow::NoticeView, flow::NoticeLevel, error::ErrorPage, error::FormErrorsPage,
        )
    ),
    tags(
        (name = "library-catalog", description = "Library catalog: books, authors, comments and accounts")
    )
)]
struct ApiDoc;

/// AppState
///
/// The shared, immutable application state. Handlers take the whole state; extractors
/// pull the piece they need through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in deployments, in-memory for local runs and tests.
    pub repo: RepositoryState,
    /// Object storage for presigned cover/photo uploads.
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Gate for the authenticated router. Extracting `AuthUser` either succeeds or rejects
/// with a redirect to `/login?next=<path>`, so the handler never runs for anonymous
/// requests.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// Router fallback: unknown paths get the 404 error page.
async fn page_not_found() -> ErrorPage {
    ErrorPage::new(StatusCode::NOT_FOUND, "Page not found")
}

/// create_router
///
/// Assembles the routing table, the scoped session middleware and the global
/// observability layers, and binds the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: anonymous requests never reach these handlers.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .fallback(page_not_found)
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the `TraceLayer` span: method, URI and the `x-request-id` set above, so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
