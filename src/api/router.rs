//! Ward API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Rate limiter → 2. Session auth → 3. Audit logger

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    // Protected routes — require a session + full middleware stack
    //
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Rate limit → Session → Audit (innermost) → Handler
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/logout", post(endpoints::auth::logout))
        .route("/me", get(endpoints::auth::me))
        .route("/dashboard", get(endpoints::dashboard::overview))
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::admit),
        )
        .route("/patients/form", get(endpoints::patients::form))
        .route("/patients/:id", get(endpoints::patients::detail))
        .route(
            "/patients/:id/discharge",
            post(endpoints::patients::discharge),
        )
        .route(
            "/patients/:id/medications",
            post(endpoints::patients::administer),
        )
        .route("/archive", get(endpoints::patients::archive))
        .route(
            "/vitals",
            get(endpoints::vitals::list).post(endpoints::vitals::record),
        )
        .route(
            "/stock",
            get(endpoints::stock::list).post(endpoints::stock::restock),
        )
        .route(
            "/users",
            get(endpoints::users::list).post(endpoints::users::create),
        )
        .route("/users/:id", delete(endpoints::users::delete))
        .route("/converter", get(endpoints::converter::convert))
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_session))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes (rate-limited and audited, no session required)
    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/login", post(endpoints::auth::login))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
}
