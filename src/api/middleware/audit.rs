//! Audit logging middleware.
//!
//! Logs every API request with the username, method, path, and
//! response status. Runs innermost (after auth has injected StaffSession).

use axum::extract::OriginalUri;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::ApiContext;
use crate::session_cache::StaffSession;

/// Log API access for audit trail.
/// Accesses `ApiContext` from request extensions.
pub async fn log_access(
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    // Nested routers strip the `/api` prefix from `req.uri()`
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let ctx = req.extensions().get::<ApiContext>().cloned();

    let actor = req
        .extensions()
        .get::<StaffSession>()
        .map(|s| s.username.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let response = next.run(req).await;

    if let Some(ctx) = ctx {
        let status = response.status().as_u16();
        ctx.core
            .log_access(&actor, &format!("{method} {path}"), &format!("status:{status}"));
    }

    response
}
