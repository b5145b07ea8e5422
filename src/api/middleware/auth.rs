//! Session cookie authentication middleware.
//!
//! Reads the `prontuario_session` cookie, resolves it against the session
//! cache (refreshing the idle timer), and injects `StaffSession` and
//! `SessionToken` into request extensions for downstream handlers.

use axum::http::{header, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionToken};
use crate::session_cache::token_from_cookie_header;

/// Require a live staff session.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
/// On success: injects `StaffSession`, adds `Cache-Control: no-store`.
pub async fn require_session(
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match require_session_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_session_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(token_from_cookie_header)
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    let session = ctx
        .core
        .write_sessions()?
        .touch(&token)
        .ok_or(ApiError::Unauthorized)?; // RwLockWriteGuard dropped here, before any .await

    req.extensions_mut().insert(session);
    req.extensions_mut().insert(SessionToken(token));

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok(response)
}
