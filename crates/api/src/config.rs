use eyelabel_core::progress::DEFAULT_COMPLETION_HIDE_THRESHOLD;

use crate::auth::jwt::JwtConfig;
use crate::bootstrap::BootstrapAdmin;

/// Default upload limit: 20 MiB.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Default lifetime of a labeling-row assignment.
const DEFAULT_ASSIGNMENT_TIMEOUT_MINS: i64 = 15;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for background tasks on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Largest accepted CSV upload in bytes.
    pub max_upload_bytes: usize,
    /// Datasets completed by this many users disappear from labelers' lists.
    pub completion_hide_threshold: usize,
    /// Minutes before an unsubmitted labeling assignment lapses.
    pub assignment_timeout_mins: i64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Admin account to create or promote on startup.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `HOST`                      | `0.0.0.0`               |
    /// | `PORT`                      | `3000`                  |
    /// | `CORS_ORIGINS`              | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `30`                    |
    /// | `MAX_UPLOAD_BYTES`          | `20971520`              |
    /// | `COMPLETION_HIDE_THRESHOLD` | `5`                     |
    /// | `ASSIGNMENT_TIMEOUT_MINS`   | `15`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let completion_hide_threshold: usize = std::env::var("COMPLETION_HIDE_THRESHOLD")
            .unwrap_or_else(|_| DEFAULT_COMPLETION_HIDE_THRESHOLD.to_string())
            .parse()
            .expect("COMPLETION_HIDE_THRESHOLD must be a valid usize");

        let assignment_timeout_mins: i64 = std::env::var("ASSIGNMENT_TIMEOUT_MINS")
            .unwrap_or_else(|_| DEFAULT_ASSIGNMENT_TIMEOUT_MINS.to_string())
            .parse()
            .expect("ASSIGNMENT_TIMEOUT_MINS must be a valid i64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            max_upload_bytes,
            completion_hide_threshold,
            assignment_timeout_mins,
            jwt: JwtConfig::from_env(),
            bootstrap_admin: BootstrapAdmin::from_env(),
        }
    }
}
