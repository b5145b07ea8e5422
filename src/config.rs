use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Prontuario";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_ADMIN_USER: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "123456789";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;
pub const DEFAULT_MAX_TECHNICIANS: i64 = 5;

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "prontuario_lib=info,prontuario=info,tower_http=warn"
}

/// Get the application data directory (~/Prontuario/)
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Get the default database file path
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("prontuario.db")
}

/// Runtime configuration. Every field can be overridden with a
/// `PRONTUARIO_*` environment variable.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub admin_username: String,
    pub admin_password: String,
    pub session_idle_secs: u64,
    pub password_iterations: u32,
    pub low_stock_threshold: i64,
    pub max_technicians: i64,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary lookup; unset or unparsable values fall back
    /// to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            db_path: lookup("PRONTUARIO_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            bind_addr: parsed(&lookup, "PRONTUARIO_BIND", defaults.bind_addr),
            admin_username: lookup("PRONTUARIO_ADMIN_USER")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.admin_username),
            admin_password: lookup("PRONTUARIO_ADMIN_PASSWORD")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.admin_password),
            session_idle_secs: parsed(
                &lookup,
                "PRONTUARIO_SESSION_IDLE_SECS",
                defaults.session_idle_secs,
            ),
            password_iterations: parsed(
                &lookup,
                "PRONTUARIO_PASSWORD_ITERATIONS",
                defaults.password_iterations,
            ),
            low_stock_threshold: parsed(
                &lookup,
                "PRONTUARIO_LOW_STOCK_THRESHOLD",
                defaults.low_stock_threshold,
            ),
            max_technicians: parsed(
                &lookup,
                "PRONTUARIO_MAX_TECHNICIANS",
                defaults.max_technicians,
            ),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            admin_username: DEFAULT_ADMIN_USER.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
            password_iterations: crate::crypto::PBKDF2_ITERATIONS,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            max_technicians: DEFAULT_MAX_TECHNICIANS,
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "Ignoring invalid configuration value");
            default
        }),
    }
}
