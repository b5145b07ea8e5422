//! Login, logout and current-user endpoints.
//!
//! `POST /api/login` — Unprotected: checks credentials, sets the session cookie
//! `POST /api/logout` — Protected: closes the session, clears the cookie
//! `GET /api/me` — Protected: who is logged in and what they may do

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::accounts::{self, AccountError};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionToken};
use crate::authorization;
use crate::models::{Role, User};
use crate::session_cache::{expired_session_cookie, session_cookie, StaffSession};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: User,
}

#[derive(Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub session: StaffSession,
    pub can_manage: bool,
    pub creatable_roles: &'static [Role],
}

/// `POST /api/login` — start a session.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = request.username.trim().to_string();
    if username.is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest("Username and password are required".into()));
    }

    // MutexGuard is !Send, keep it inside the block
    {
        let mut lockout = ctx
            .lockout
            .lock()
            .map_err(|_| ApiError::Internal("lockout lock".into()))?;
        lockout
            .check(&username)
            .map_err(|retry_after| ApiError::LockedOut { retry_after })?;
    }

    // PBKDF2 verification is CPU-bound, keep it off the runtime workers
    let core = ctx.core.clone();
    let name = username.clone();
    let password = request.password;
    let outcome = tokio::task::spawn_blocking(move || -> Result<Result<User, AccountError>, ApiError> {
        let conn = core.open_db()?;
        Ok(accounts::login(&conn, &name, &password))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Login task failed: {e}")))??;

    let user = match outcome {
        Ok(user) => user,
        Err(AccountError::InvalidCredentials) => {
            if let Ok(mut lockout) = ctx.lockout.lock() {
                lockout.record_failure(&username);
            }
            return Err(ApiError::InvalidCredentials);
        }
        Err(e) => return Err(e.into()),
    };

    if let Ok(mut lockout) = ctx.lockout.lock() {
        lockout.record_success(&username);
    }

    let token = ctx.core.write_sessions()?.open(&user);
    Ok((
        [(header::SET_COOKIE, session_cookie(&token))],
        Json(LoginResponse { user }),
    ))
}

/// `POST /api/logout` — end the current session.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<StaffSession>,
    Extension(token): Extension<SessionToken>,
) -> Result<impl IntoResponse, ApiError> {
    ctx.core.write_sessions()?.close(&token.0);
    tracing::info!(username = %session.username, "Session closed");
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_session_cookie())],
    ))
}

/// `GET /api/me` — the logged-in user.
pub async fn me(Extension(session): Extension<StaffSession>) -> Json<MeResponse> {
    Json(MeResponse {
        can_manage: authorization::is_manager(session.role),
        creatable_roles: authorization::creatable_roles(session.role),
        session,
    })
}
