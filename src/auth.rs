use std::convert::Infallible;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::{
    extract::{FromRef, FromRequestParts, OriginalUri},
    http::{header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AppResult},
    models::User,
    repository::RepositoryState,
};

/// Name of the cookie holding the signed session token.
pub const SESSION_COOKIE: &str = "session";

/// Claims
///
/// Payload of the session token issued at login.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id.
    pub sub: i64,
    /// Expiration Time (exp).
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take it as an argument;
/// policies compare its `id` against resource owners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// issue_session_token
///
/// Signs an HS256 session token for `user_id` valid for the configured TTL.
pub fn issue_session_token(config: &AppConfig, user_id: i64) -> AppResult<String> {
    let now = Utc::now().timestamp().max(0) as usize;
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now.saturating_add(usize::try_from(config.session_ttl_secs).unwrap_or(usize::MAX)),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.session_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign session token: {}", e)))
}

/// Decodes and validates a session token, returning the user id it names.
pub fn verify_session_token(config: &AppConfig, token: &str) -> Option<i64> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.session_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims.sub)
    .map_err(|e| tracing::debug!(error = %e, "rejected session token"))
    .ok()
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a stored PHC string. A malformed hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// The path (and query) the client originally asked for, used as the login `next` target.
fn requested_path(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map(|original| &original.0)
        .unwrap_or(&parts.uri);
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

/// Resolves the user behind a request, or `None` for anonymous requests.
///
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing user.
/// 2. The `session` cookie.
/// 3. An `Authorization: Bearer` header.
///
/// The user is re-loaded from the store every time so deleted accounts lose access.
async fn resolve_user<S>(parts: &Parts, state: &S) -> AppResult<Option<AuthUser>>
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    let repo = RepositoryState::from_ref(state);
    let config = AppConfig::from_ref(state);

    if config.env == Env::Local {
        let bypass_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.parse::<i64>().ok());
        if let Some(user_id) = bypass_id {
            if let Some(user) = repo.get_user(user_id).await? {
                return Ok(Some(AuthUser::from(&user)));
            }
        }
    }

    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            parts
                .headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_string)
        });

    let Some(user_id) = token.and_then(|token| verify_session_token(&config, &token)) else {
        return Ok(None);
    };

    Ok(repo.get_user(user_id).await?.map(|user| AuthUser::from(&user)))
}

/// AuthUser Extractor Implementation
///
/// Rejection: `AppError::AuthenticationRequired`, which redirects to the login page with
/// the requested path preserved in `next`.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match resolve_user(parts, state).await? {
            Some(user) => Ok(user),
            None => Err(AppError::AuthenticationRequired {
                next: requested_path(parts),
            }),
        }
    }
}

/// MaybeUser
///
/// Optional identity, for public pages that adapt to the viewer and the signup gate.
/// Store failures during resolution are logged and treated as anonymous.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match resolve_user(parts, state).await {
            Ok(user) => Ok(MaybeUser(user)),
            Err(e) => {
                tracing::error!("session resolution failed: {}", e);
                Ok(MaybeUser(None))
            }
        }
    }
}
