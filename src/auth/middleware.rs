//! Authentication middleware
//!
//! Protects routes that require an authenticated user.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Query, State},
    http::{HeaderMap, Request, header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::session::{Session, verify_session_token};
use crate::AppState;
use crate::error::AppError;

/// Cookie carrying the session token
pub const TOKEN_COOKIE: &str = "token";

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(TOKEN_COOKIE).map(|cookie| cookie.value().to_owned())
        })
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|h| h.eq_ignore_ascii_case("websocket"))
}

/// Find the session token in a request
///
/// Browsers cannot set headers on a websocket handshake, so upgrade
/// requests may also pass it as `?token=`.
fn extract_token(parts: &Parts) -> Option<String> {
    extract_token_from_headers(&parts.headers).or_else(|| {
        if !is_websocket_upgrade(&parts.headers) {
            return None;
        }
        Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.token)
    })
}

fn authenticate_token(token: &str, state: &AppState) -> Result<Session, AppError> {
    verify_session_token(token, &state.config.auth.session_secret)
}

/// Middleware to require authentication
///
/// Extracts and verifies session from Authorization header or cookie.
/// Adds Session to request extensions if valid.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/metrics", ...)
///     .route_layer(middleware::from_fn_with_state(state, require_auth));
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token =
        extract_token_from_headers(request.headers()).ok_or(AppError::Unauthenticated)?;

    let session = authenticate_token(&token, &state)?;
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Extractor for current authenticated user
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(session): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", session.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(CurrentUser(session));
        }

        let state = AppState::from_ref(state);
        let token = extract_token(parts).ok_or(AppError::Unauthenticated)?;
        let session = authenticate_token(&token, &state)?;
        parts.extensions.insert(session.clone());

        Ok(CurrentUser(session))
    }
}
