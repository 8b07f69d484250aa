use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

pub const DEFAULT_API_BASE: &str = "https://twinsync.vercel.app/api";

/// Agent configuration loaded from environment variables (and `.env` if present).
/// Every setting has a default; only malformed values are errors.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub state_path: PathBuf,
    pub sync_interval: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub location_max_age: Duration,
    pub location_timeout: Duration,
    pub location_permission: bool,
    pub location_file: Option<PathBuf>,
    pub step_source: Option<PathBuf>,
    pub retry_max_attempts: u32,
    pub retry_initial_delay: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config {
            api_base: lookup("TWINSYNC_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            state_path: lookup("TWINSYNC_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("twinsync_prefs.json")),
            sync_interval: secs(&lookup, "TWINSYNC_SYNC_INTERVAL_SECS", 15 * 60)?,
            connect_timeout: secs(&lookup, "TWINSYNC_CONNECT_TIMEOUT_SECS", 10)?,
            request_timeout: secs(&lookup, "TWINSYNC_REQUEST_TIMEOUT_SECS", 15)?,
            location_max_age: secs(&lookup, "TWINSYNC_LOCATION_MAX_AGE_SECS", 5 * 60)?,
            location_timeout: secs(&lookup, "TWINSYNC_LOCATION_TIMEOUT_SECS", 15)?,
            location_permission: parse_or(&lookup, "TWINSYNC_LOCATION_PERMISSION", true)?,
            location_file: lookup("TWINSYNC_LOCATION_FILE").map(PathBuf::from),
            step_source: lookup("TWINSYNC_STEP_SOURCE").map(PathBuf::from),
            retry_max_attempts: parse_or(&lookup, "TWINSYNC_RETRY_MAX_ATTEMPTS", 5)?,
            retry_initial_delay: secs(&lookup, "TWINSYNC_RETRY_INITIAL_SECS", 30)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };

        if config.sync_interval.is_zero() {
            bail!("TWINSYNC_SYNC_INTERVAL_SECS must be greater than zero");
        }
        if config.retry_max_attempts == 0 {
            bail!("TWINSYNC_RETRY_MAX_ATTEMPTS must be at least 1");
        }
        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default).map(Duration::from_secs)
}
