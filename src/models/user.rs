use serde::{Deserialize, Serialize};

use super::enums::Role;

/// A staff account. The password hash stays in the database layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

/// A staff account together with its stored password hash (login path only).
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}
