use std::path::PathBuf;

use chrono::{Duration, TimeDelta};
use tracing::warn;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

/// Runtime settings for the API server.
#[derive(Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub static_dir: Option<PathBuf>,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn new(db_path: PathBuf, jwt_secret: Option<String>) -> Self {
        Config {
            db_path,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            jwt_secret: resolve_secret(jwt_secret),
            token_ttl: Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
            static_dir: None,
            cors_origin: None,
        }
    }
}

/// Token lifetime from a number of hours, between one hour and ten years.
pub fn token_ttl_from_hours(hours: i64) -> Result<Duration, String> {
    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        return Err(format!(
            "token lifetime must be between 1 and {MAX_TOKEN_TTL_HOURS} hours, got {hours}"
        ));
    }
    TimeDelta::try_hours(hours).ok_or_else(|| format!("token lifetime out of range: {hours} hours"))
}

/// `.taskdeck/taskdeck.db` under the current directory.
pub fn default_db_path() -> Result<PathBuf, String> {
    let mut p = std::env::current_dir()
        .map_err(|e| format!("cannot determine current directory: {e}"))?;
    p.push(".taskdeck");
    p.push("taskdeck.db");
    Ok(p)
}

/// Use the configured secret, or generate a per-process one.
fn resolve_secret(secret: Option<String>) -> String {
    match secret.filter(|s| !s.trim().is_empty()) {
        Some(s) => s,
        None => {
            warn!("no JWT secret configured; tokens will not survive a restart");
            format!(
                "{}{}",
                uuid::Uuid::new_v4().simple(),
                uuid::Uuid::new_v4().simple()
            )
        }
    }
}
