//! Shared application state.
//!
//! `CoreState` is wrapped in `Arc` at startup and handed to every request
//! through the API context. Each request opens its own SQLite connection;
//! only the session cache and the audit buffer live in memory.

use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};

use crate::config::AppConfig;
use crate::db::{self, DATETIME_FORMAT};
use crate::session_cache::SessionCache;

/// Maximum audit buffer size before flush.
const AUDIT_BUFFER_CAPACITY: usize = 100;

/// Audit rows older than this are pruned on flush.
const AUDIT_RETENTION_DAYS: i64 = 90;

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    pub config: AppConfig,
    /// Logged-in staff, keyed by token hash.
    sessions: RwLock<SessionCache>,
    /// Audit log for every API request.
    audit: AuditLogger,
}

impl CoreState {
    pub fn new(config: AppConfig) -> Self {
        let idle = Duration::from_secs(config.session_idle_secs);
        Self {
            config,
            sessions: RwLock::new(SessionCache::new(idle)),
            audit: AuditLogger::new(),
        }
    }

    // ── Database ────────────────────────────────────────────

    /// Open a connection to the configured database (migrations applied).
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        Ok(db::open_database(&self.config.db_path)?)
    }

    /// Create the data directory, migrate, and seed the administrator.
    pub fn bootstrap(&self) -> Result<(), CoreError> {
        if let Some(parent) = self.config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = self.open_db()?;
        db::bootstrap::ensure_admin(
            &conn,
            &self.config.admin_username,
            &self.config.admin_password,
            self.config.password_iterations,
        )?;
        Ok(())
    }

    // ── Sessions ────────────────────────────────────────────

    pub fn read_sessions(&self) -> Result<RwLockReadGuard<'_, SessionCache>, CoreError> {
        self.sessions.read().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn write_sessions(&self) -> Result<RwLockWriteGuard<'_, SessionCache>, CoreError> {
        self.sessions.write().map_err(|_| CoreError::LockPoisoned)
    }

    // ── Audit ───────────────────────────────────────────────

    /// Log an access event. Auto-flushes to DB when buffer is full.
    pub fn log_access(&self, actor: &str, action: &str, outcome: &str) {
        let needs_flush = self.audit.log(actor, action, outcome);
        if needs_flush {
            if let Err(e) = self.flush_and_prune_audit() {
                tracing::warn!("Auto-flush audit failed: {e}");
            }
        }
    }

    /// Get the current audit buffer contents.
    #[cfg(test)]
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }

    /// Flush audit buffer to DB and prune entries older than the retention window.
    pub fn flush_and_prune_audit(&self) -> Result<(), CoreError> {
        let conn = self.open_db()?;
        self.audit.flush_to_db(&conn)?;
        let cutoff = Local::now().naive_local() - chrono::Duration::days(AUDIT_RETENTION_DAYS);
        if let Err(e) = db::prune_audit_log(&conn, &cutoff) {
            tracing::warn!("Failed to prune audit log: {e}");
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Error types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ═══════════════════════════════════════════════════════════
// Audit logger
// ═══════════════════════════════════════════════════════════

/// In-memory audit log buffer. Entries are flushed to SQLite
/// when the buffer reaches capacity or on explicit flush.
pub struct AuditLogger {
    buffer: Mutex<Vec<AuditEntry>>,
}

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: NaiveDateTime,
    /// Username, or `anonymous` for unauthenticated requests.
    pub actor: String,
    pub action: String,
    pub outcome: String,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(Vec::with_capacity(AUDIT_BUFFER_CAPACITY)),
        }
    }

    /// Log an event to the in-memory buffer.
    /// Returns `true` if the buffer has reached flush threshold.
    pub fn log(&self, actor: &str, action: &str, outcome: &str) -> bool {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.push(AuditEntry {
                timestamp: Local::now().naive_local(),
                actor: actor.to_string(),
                action: action.to_string(),
                outcome: outcome.to_string(),
            });
            buf.len() >= AUDIT_BUFFER_CAPACITY
        } else {
            false
        }
    }

    #[cfg(test)]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.buffer
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default()
    }

    pub fn drain(&self) -> Vec<AuditEntry> {
        self.buffer
            .lock()
            .map(|mut buf| buf.drain(..).collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn buffer_len(&self) -> usize {
        self.buffer.lock().map(|buf| buf.len()).unwrap_or(0)
    }

    /// Flush buffered entries to SQLite.
    pub fn flush_to_db(&self, conn: &rusqlite::Connection) -> Result<usize, CoreError> {
        let entries = self.drain();
        if entries.is_empty() {
            return Ok(0);
        }

        let tuples: Vec<(String, String, String, String)> = entries
            .iter()
            .map(|e| {
                (
                    e.timestamp.format(DATETIME_FORMAT).to_string(),
                    e.actor.clone(),
                    e.action.clone(),
                    e.outcome.clone(),
                )
            })
            .collect();

        let count = tuples.len();
        db::insert_audit_entries(conn, &tuples)?;

        tracing::debug!(count, "Flushed audit entries to database");
        Ok(count)
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{find_credentials, open_memory_database, query_audit_by_actor};
    use crate::models::{Role, User};

    fn test_state(dir: &tempfile::TempDir) -> CoreState {
        CoreState::new(AppConfig {
            db_path: dir.path().join("nested").join("test.db"),
            password_iterations: 1_000,
            ..AppConfig::default()
        })
    }

    #[test]
    fn bootstrap_creates_directory_and_admin() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        state.bootstrap().unwrap();

        let conn = state.open_db().unwrap();
        let admin = find_credentials(&conn, "admin").unwrap().unwrap();
        assert_eq!(admin.user.role, Role::Admin);

        // Second bootstrap is a no-op
        state.bootstrap().unwrap();
    }

    #[test]
    fn sessions_are_shared_through_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let user = User {
            id: 7,
            username: "maria".into(),
            role: Role::Nurse,
        };
        let token = state.write_sessions().unwrap().open(&user);
        let session = state.write_sessions().unwrap().touch(&token).unwrap();
        assert_eq!(session.user_id, 7);
        assert_eq!(state.read_sessions().unwrap().len(), 1);
    }

    #[test]
    fn audit_logger_records_entries() {
        let logger = AuditLogger::new();
        logger.log("maria", "GET /api/stock", "status:200");
        logger.log("anonymous", "POST /api/login", "status:401");

        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].actor, "maria");
        assert_eq!(entries[1].outcome, "status:401");
    }

    #[test]
    fn audit_logger_drain_clears_buffer() {
        let logger = AuditLogger::new();
        logger.log("maria", "GET /api/me", "status:200");
        assert_eq!(logger.drain().len(), 1);
        assert_eq!(logger.buffer_len(), 0);
    }

    #[test]
    fn audit_log_returns_true_at_capacity() {
        let logger = AuditLogger::new();
        for i in 0..AUDIT_BUFFER_CAPACITY - 1 {
            assert!(!logger.log("maria", &format!("GET /api/patients/{i}"), "status:200"));
        }
        assert!(logger.log("maria", "GET /api/me", "status:200"));
    }

    #[test]
    fn audit_flush_to_db_persists_entries() {
        let conn = open_memory_database().unwrap();
        let logger = AuditLogger::new();
        logger.log("maria", "GET /api/stock", "status:403");
        logger.log("joao", "GET /api/stock", "status:200");

        assert_eq!(logger.flush_to_db(&conn).unwrap(), 2);
        assert_eq!(logger.buffer_len(), 0);

        let maria = query_audit_by_actor(&conn, "maria").unwrap();
        assert_eq!(maria.len(), 1);
        assert_eq!(maria[0].2, "status:403");
    }

    #[test]
    fn audit_flush_empty_buffer_is_noop() {
        let conn = open_memory_database().unwrap();
        let logger = AuditLogger::new();
        assert_eq!(logger.flush_to_db(&conn).unwrap(), 0);
    }

    #[test]
    fn core_state_flush_and_prune() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        state.bootstrap().unwrap();

        let conn = state.open_db().unwrap();
        conn.execute(
            "INSERT INTO audit_log (timestamp, actor, action, outcome)
             VALUES ('2000-01-01 00:00:00', 'maria', 'GET /api/me', 'status:200')",
            [],
        )
        .unwrap();

        state.log_access("maria", "GET /api/dashboard", "status:200");
        assert_eq!(state.audit_entries().len(), 1);
        state.flush_and_prune_audit().unwrap();
        assert!(state.audit_entries().is_empty());

        let rows = query_audit_by_actor(&conn, "maria").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, "GET /api/dashboard");
    }

    #[test]
    fn core_error_display() {
        assert_eq!(CoreError::LockPoisoned.to_string(), "Internal lock error");
    }
}
