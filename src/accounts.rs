//! Staff accounts: login and role-gated user management.

use std::sync::LazyLock;

use regex::Regex;
use rusqlite::Connection;
use serde::Deserialize;

use crate::authorization::{self, Denial};
use crate::crypto::{hash_password, verify_password};
use crate::db::{self, DatabaseError};
use crate::models::{Role, User};

pub const MIN_PASSWORD_LENGTH: usize = 6;

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{3,50}$").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Denied(Denial),
    #[error("Username already taken: {0}")]
    DuplicateUsername(String),
    #[error("User not found: {0}")]
    NotFound(i64),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<Denial> for AccountError {
    fn from(d: Denial) -> Self {
        Self::Denied(d)
    }
}

/// Body of a create-user request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Check a username/password pair. Unknown users and wrong passwords
/// are indistinguishable to the caller.
pub fn login(conn: &Connection, username: &str, password: &str) -> Result<User, AccountError> {
    let username = username.trim();
    let Some(creds) = db::find_credentials(conn, username)? else {
        tracing::info!(username, "Login failed: unknown user");
        return Err(AccountError::InvalidCredentials);
    };

    if !verify_password(password, &creds.password_hash) {
        tracing::info!(username, "Login failed: wrong password");
        return Err(AccountError::InvalidCredentials);
    }

    tracing::info!(username, role = %creds.user.role, "Login succeeded");
    Ok(creds.user)
}

/// Users the actor is allowed to see.
pub fn list_users(conn: &Connection, actor: Role) -> Result<Vec<User>, AccountError> {
    let users = match authorization::visible_roles(actor)? {
        None => db::list_users(conn)?,
        Some(role) => db::list_users_with_role(conn, role)?,
    };
    Ok(users)
}

/// Create an account. Returns the stored user.
pub fn add_user(
    conn: &Connection,
    actor: Role,
    account: &NewAccount,
    max_technicians: i64,
    iterations: u32,
) -> Result<User, AccountError> {
    let username = account.username.trim();
    validate_username(username)?;
    if account.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AccountError::Validation(format!(
            "Password must have at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let technicians = if account.role == Role::Technician {
        db::count_users_with_role(conn, Role::Technician)?
    } else {
        0
    };
    authorization::check_create(actor, account.role, technicians, max_technicians)?;

    let hash = hash_password(&account.password, iterations);
    let id = match db::insert_user(conn, username, &hash, account.role) {
        Ok(id) => id,
        Err(DatabaseError::ConstraintViolation(_)) => {
            return Err(AccountError::DuplicateUsername(username.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(username, role = %account.role, by = %actor, "User created");
    Ok(User {
        id,
        username: username.to_string(),
        role: account.role,
    })
}

/// Delete an account. Returns the removed user so the caller can drop
/// any sessions it still holds.
pub fn delete_user(conn: &Connection, actor: Role, user_id: i64) -> Result<User, AccountError> {
    authorization::require_manager(actor)?;
    let target = db::get_user(conn, user_id)?.ok_or(AccountError::NotFound(user_id))?;
    authorization::check_delete(actor, target.role)?;

    db::delete_user(conn, user_id)?;
    tracing::info!(username = %target.username, role = %target.role, by = %actor, "User deleted");
    Ok(target)
}

fn validate_username(username: &str) -> Result<(), AccountError> {
    if USERNAME_PATTERN.is_match(username) {
        Ok(())
    } else {
        Err(AccountError::Validation(
            "Username must be 3-50 characters of letters, digits, '.', '_' or '-'".into(),
        ))
    }
}
