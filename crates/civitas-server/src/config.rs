//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use civitas_engine::EngineSettings;
use civitas_shared::constants::{DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_HTTP_PORT};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `civitas.db` under the platform data directory.
    pub database_path: Option<PathBuf>,

    /// How long a connection waits for the write lock.
    /// Env: `DB_BUSY_TIMEOUT_MS`
    /// Default: `5000`
    pub busy_timeout: Duration,

    /// Email of the admin account reconciled at startup.
    /// Env: `ADMIN_EMAIL`
    /// Default: unset (no reconciliation).
    pub admin_email: Option<String>,

    /// Display name for a freshly created admin.
    /// Env: `ADMIN_NAME`
    /// Default: `"Administrator"`
    pub admin_name: String,

    // -- Engine tunables --
    // Env: `FREE_ISSUE_QUOTA`, `DEFAULT_BOOST_AMOUNT`,
    // `DEFAULT_PREMIUM_AMOUNT`, `MAX_PAGE_LIMIT`
    pub engine: EngineSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            admin_email: None,
            admin_name: "Administrator".to_string(),
            engine: EngineSettings::default(),
        }
    }
}

/// Overwrite `slot` with the parsed value of `name`, if present and valid.
fn parse_into<T>(vars: &impl Fn(&str) -> Option<String>, name: &str, slot: &mut T)
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = vars(name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(e) => {
            tracing::warn!(value = %raw, error = %e, "Invalid {name}, using default");
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an arbitrary variable source.
    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        parse_into(&vars, "HTTP_ADDR", &mut config.http_addr);

        if let Some(path) = vars("DATABASE_PATH").filter(|p| !p.trim().is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        let mut busy_ms = DEFAULT_BUSY_TIMEOUT_MS;
        parse_into(&vars, "DB_BUSY_TIMEOUT_MS", &mut busy_ms);
        config.busy_timeout = Duration::from_millis(busy_ms);

        if let Some(email) = vars("ADMIN_EMAIL") {
            if !email.trim().is_empty() {
                config.admin_email = Some(email.trim().to_string());
            }
        }
        if let Some(name) = vars("ADMIN_NAME") {
            if !name.trim().is_empty() {
                config.admin_name = name.trim().to_string();
            }
        }

        // -- Engine tunables --

        let engine = &mut config.engine;
        parse_into(&vars, "FREE_ISSUE_QUOTA", &mut engine.free_issue_quota);
        parse_into(&vars, "DEFAULT_BOOST_AMOUNT", &mut engine.default_boost_amount);
        parse_into(&vars, "DEFAULT_PREMIUM_AMOUNT", &mut engine.default_premium_amount);
        parse_into(&vars, "MAX_PAGE_LIMIT", &mut engine.max_page_limit);

        if engine.max_page_limit == 0 {
            tracing::warn!("MAX_PAGE_LIMIT must be positive, using default");
            engine.max_page_limit = EngineSettings::default().max_page_limit;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
