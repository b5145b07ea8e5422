//! First-run seeding.
//!
//! Guarantees an administrator account exists so a fresh install can be
//! logged into. The seeded password is stored hashed like any other.

use rusqlite::Connection;

use super::repository::{find_credentials, insert_user};
use super::DatabaseError;
use crate::crypto::hash_password;
use crate::models::Role;

/// Create the administrator account if no user with that name exists.
/// Returns `true` when the account was created.
pub fn ensure_admin(
    conn: &Connection,
    username: &str,
    password: &str,
    iterations: u32,
) -> Result<bool, DatabaseError> {
    if find_credentials(conn, username)?.is_some() {
        tracing::info!(username, "Administrator account already present");
        return Ok(false);
    }

    let hash = hash_password(password, iterations);
    insert_user(conn, username, &hash, Role::Admin)?;
    tracing::info!(username, "Administrator account created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::verify_password;
    use crate::db::open_memory_database;

    #[test]
    fn seeds_hashed_admin_once() {
        let conn = open_memory_database().unwrap();
        assert!(ensure_admin(&conn, "admin", "123456789", 1_000).unwrap());
        assert!(!ensure_admin(&conn, "admin", "other", 1_000).unwrap());

        let creds = find_credentials(&conn, "admin").unwrap().unwrap();
        assert_eq!(creds.user.role, Role::Admin);
        assert_ne!(creds.password_hash, "123456789");
        assert!(verify_password("123456789", &creds.password_hash));
    }
}
