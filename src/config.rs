use once_cell::sync::Lazy;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,

    // Database
    pub database_url: String,

    /// Branch assumed when a session token carries no branch claim.
    /// Explicit configuration, not a fallback literal at call sites.
    pub default_branch_id: i64,

    // Session tokens
    pub session_secret: String,
    pub session_secret_from_env: bool,

    // Build info
    pub commit_hash: String,
    pub build_time: String,
    pub version: String,

    // Logging
    pub log_level: String,
}

const DEV_SESSION_SECRET: &str = "repset-dev-secret-do-not-use-in-production";

impl Config {
    pub fn from_env() -> Self {
        let session_secret = env::var("REPSET_SESSION_SECRET").ok();

        Self {
            // Server
            host: env::var("REPSET_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("REPSET_API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            // Database
            database_url: env::var("REPSET_DATABASE_URL")
                .or_else(|_| env::var("DATABASE_URL"))
                .unwrap_or_else(|_| "sqlite://repset.db?mode=rwc".to_string()),

            default_branch_id: env::var("REPSET_DEFAULT_BRANCH_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),

            session_secret_from_env: session_secret.is_some(),
            session_secret: session_secret.unwrap_or_else(|| DEV_SESSION_SECRET.to_string()),

            // Build info
            commit_hash: env::var("COMMIT_HASH").unwrap_or_else(|_| "unknown".to_string()),
            build_time: env::var("BUILD_TIME").unwrap_or_else(|_| "unknown".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),

            // Logging
            log_level: env::var("REPSET_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
