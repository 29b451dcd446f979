use std::env;

/// Fallback signing secret for local development sessions.
pub const LOCAL_SESSION_SECRET: &str = "library-catalog-local-session-secret";

/// AppConfig
///
/// Holds the application's configuration. Loaded once at startup and never mutated;
/// handlers and extractors pull it out of the shared state via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` is only accepted locally and selects the in-memory store.
    pub db_url: Option<String>,
    // Socket address the HTTP server binds to.
    pub bind_address: String,
    // S3-compatible storage endpoint for covers and photos (MinIO locally).
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_key: String,
    pub s3_secret: String,
    pub s3_bucket: String,
    // Runtime environment marker. Controls logging format and the development auth bypass.
    pub env: Env,
    // HS256 secret used to sign and verify session tokens.
    pub session_secret: String,
    // Session lifetime in seconds.
    pub session_ttl_secs: u64,
    // Number of rows per page on the book and author lists.
    pub page_size: u32,
}

/// Env
///
/// Runtime context: local development or hardened production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Non-panicking configuration used by tests: local env, in-memory store.
    fn default() -> Self {
        Self {
            db_url: None,
            bind_address: "127.0.0.1:3000".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_key: "admin".to_string(),
            s3_secret: "password".to_string(),
            s3_bucket: "library-test".to_string(),
            env: Env::Local,
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            session_ttl_secs: 14 * 24 * 60 * 60,
            page_size: 15,
        }
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, fallback: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "ignoring unparsable setting");
            fallback
        }),
        Err(_) => fallback,
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables (after `.env` has been applied).
    ///
    /// # Panics
    /// Panics in production when `DATABASE_URL`, `SESSION_SECRET` or the S3 credentials
    /// are missing, so the service never starts half-configured.
    pub fn load() -> Self {
        let env_kind = match env::var("APP_ENV").unwrap_or_else(|_| "local".to_string()).as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let defaults = Self::default();
        let bind_address =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let session_ttl_secs = parse_or("SESSION_TTL_SECS", defaults.session_ttl_secs);
        let page_size = parse_or("PAGE_SIZE", defaults.page_size).max(1);

        match env_kind {
            Env::Local => Self {
                env: Env::Local,
                db_url: env::var("DATABASE_URL").ok(),
                bind_address,
                s3_endpoint: env::var("S3_ENDPOINT").unwrap_or(defaults.s3_endpoint),
                s3_region: defaults.s3_region,
                s3_key: defaults.s3_key,
                s3_secret: defaults.s3_secret,
                s3_bucket: env::var("S3_BUCKET_NAME")
                    .unwrap_or_else(|_| "library-uploads".to_string()),
                session_secret: env::var("SESSION_SECRET")
                    .unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string()),
                session_ttl_secs,
                page_size,
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: Some(
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                ),
                bind_address,
                s3_endpoint: env::var("S3_ENDPOINT").expect("FATAL: S3_ENDPOINT required in prod"),
                s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                s3_key: env::var("S3_ACCESS_KEY").expect("FATAL: S3_ACCESS_KEY required in prod"),
                s3_secret: env::var("S3_SECRET_KEY")
                    .expect("FATAL: S3_SECRET_KEY required in prod"),
                s3_bucket: env::var("S3_BUCKET_NAME")
                    .unwrap_or_else(|_| "library-uploads".to_string()),
                session_secret: env::var("SESSION_SECRET")
                    .expect("FATAL: SESSION_SECRET must be set in production."),
                session_ttl_secs,
                page_size,
            },
        }
    }
}
