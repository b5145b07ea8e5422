use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{enum_column, DatabaseError};
use crate::models::{Role, User, UserCredentials};

/// Insert a user row. Returns the new id.
pub fn insert_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    role: Role,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO users (username, password_hash, role) VALUES (?1, ?2, ?3)",
        params![username, password_hash, role.as_str()],
    )
    .map_err(|e| DatabaseError::from_write(e, "users.username"))?;
    Ok(conn.last_insert_rowid())
}

/// Look up a user and their stored hash by username (login path).
pub fn find_credentials(
    conn: &Connection,
    username: &str,
) -> Result<Option<UserCredentials>, DatabaseError> {
    conn.query_row(
        "SELECT id, username, role, password_hash FROM users WHERE username = ?1",
        params![username],
        |row| {
            Ok(UserCredentials {
                user: row_to_user(row)?,
                password_hash: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, DatabaseError> {
    conn.query_row(
        "SELECT id, username, role FROM users WHERE id = ?1",
        params![id],
        row_to_user,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// All users, admins first, then technicians, then nurses; by username within a role.
pub fn list_users(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, role FROM users
         ORDER BY CASE role WHEN 'admin' THEN 0 WHEN 'technician' THEN 1 ELSE 2 END, username",
    )?;
    let rows = stmt.query_map([], row_to_user)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn list_users_with_role(conn: &Connection, role: Role) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, role FROM users WHERE role = ?1 ORDER BY username",
    )?;
    let rows = stmt.query_map(params![role.as_str()], row_to_user)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn count_users_with_role(conn: &Connection, role: Role) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = ?1",
        params![role.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Delete a user by ID.
pub fn delete_user(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "user".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn row_to_user(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    let role_str: String = row.get(2)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        role: enum_column(2, &role_str)?,
    })
}
