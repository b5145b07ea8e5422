//! User management endpoints (admin and technician only).
//!
//! - `GET /api/users` — accounts the caller may see, and roles they may create
//! - `POST /api/users` — create an account
//! - `DELETE /api/users/:id` — delete an account and end its sessions

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::accounts::{self, NewAccount};
use crate::api::endpoints::require_manager;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::authorization;
use crate::models::{Role, User};
use crate::session_cache::StaffSession;

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
    pub creatable_roles: &'static [Role],
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted: User,
    pub sessions_closed: usize,
}

/// `GET /api/users`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<StaffSession>,
) -> Result<Json<UsersResponse>, ApiError> {
    require_manager(&session)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(UsersResponse {
        users: accounts::list_users(&conn, session.role)?,
        creatable_roles: authorization::creatable_roles(session.role),
    }))
}

/// `POST /api/users`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<StaffSession>,
    Json(account): Json<NewAccount>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    require_manager(&session)?;
    // Hashing the new password is CPU-bound, run it on a blocking thread
    let core = ctx.core.clone();
    let actor = session.role;
    let user = tokio::task::spawn_blocking(move || -> Result<User, ApiError> {
        let conn = core.open_db()?;
        let config = &core.config;
        Ok(accounts::add_user(
            &conn,
            actor,
            &account,
            config.max_technicians,
            config.password_iterations,
        )?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Create-user task failed: {e}")))??;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `DELETE /api/users/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<StaffSession>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    require_manager(&session)?;
    let conn = ctx.core.open_db()?;
    let deleted = accounts::delete_user(&conn, session.role, id)?;
    let sessions_closed = ctx.core.write_sessions()?.close_user(deleted.id);
    Ok(Json(DeletedResponse {
        deleted,
        sessions_closed,
    }))
}
