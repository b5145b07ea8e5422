//! Logged-in staff sessions.
//!
//! Sessions live only in memory. The cookie carries a random token; the
//! cache is keyed by the token's SHA-256 hash so a memory dump does not
//! leak usable cookies.
//!
//! Key properties:
//! - Sessions expire after a period of inactivity
//! - Every successful lookup refreshes the inactivity timer
//! - Deleting a user drops all of their sessions
//! - Process restart logs everyone out

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::crypto::{generate_token, hash_token};
use crate::models::{Role, User};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "prontuario_session";

// ═══════════════════════════════════════════════════════════
// StaffSession — one logged-in user
// ═══════════════════════════════════════════════════════════

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffSession {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl From<&User> for StaffSession {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

struct SessionEntry {
    session: StaffSession,
    last_seen: Instant,
}

// ═══════════════════════════════════════════════════════════
// SessionCache
// ═══════════════════════════════════════════════════════════

pub struct SessionCache {
    sessions: HashMap<[u8; 32], SessionEntry>,
    idle_timeout: Duration,
}

impl SessionCache {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_timeout,
        }
    }

    /// Open a session for `user`. Returns the plaintext token for the cookie.
    pub fn open(&mut self, user: &User) -> String {
        if self.sessions.len() > 1000 {
            self.purge_expired();
        }

        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            SessionEntry {
                session: StaffSession::from(user),
                last_seen: Instant::now(),
            },
        );
        tracing::info!(username = %user.username, role = %user.role, "Session opened");
        token
    }

    /// Resolve a token to its session, refreshing the inactivity timer.
    /// Expired sessions are dropped and yield `None`.
    pub fn touch(&mut self, token: &str) -> Option<StaffSession> {
        let key = hash_token(token);
        let now = Instant::now();

        let expired = match self.sessions.get_mut(&key) {
            None => return None,
            Some(entry) if now.duration_since(entry.last_seen) >= self.idle_timeout => true,
            Some(entry) => {
                entry.last_seen = now;
                return Some(entry.session.clone());
            }
        };

        if expired {
            if let Some(entry) = self.sessions.remove(&key) {
                tracing::info!(username = %entry.session.username, "Session expired");
            }
        }
        None
    }

    /// Close the session for `token`. Returns `true` if it existed.
    pub fn close(&mut self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    /// Drop every session belonging to `user_id`. Returns how many were dropped.
    pub fn close_user(&mut self, user_id: i64) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.session.user_id != user_id);
        before - self.sessions.len()
    }

    /// Remove sessions idle past the timeout. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        let timeout = self.idle_timeout;
        self.sessions
            .retain(|_, entry| now.duration_since(entry.last_seen) < timeout);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Extract the session token from a `Cookie` header value.
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value that installs the session token.
pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

/// `Set-Cookie` value that clears the session token.
pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
