//! Service and client configuration from environment variables.

use std::{env, path::PathBuf, time::Duration};

use crate::history::{HistoryLimits, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};

/// Server configuration.
///
/// Environment variables:
/// - `WHEEL_BIND_ADDR` (default: 0.0.0.0:8080)
/// - `WHEEL_DB_PATH` (default: data/decision-wheel.sqlite3)
/// - `WHEEL_ENTRY_POOL_URL` (default: unset, read entries from the database)
/// - `WHEEL_HISTORY_DEFAULT_LIMIT` (default: 50)
/// - `WHEEL_HISTORY_MAX_LIMIT` (default: 100, never above 100)
/// - `WHEEL_HTTP_TIMEOUT_MS` (default: 5000)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub entry_pool_url: Option<String>,
    pub history_limits: HistoryLimits,
    pub http_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_limit =
            parse_or(&lookup, "WHEEL_HISTORY_DEFAULT_LIMIT", DEFAULT_HISTORY_LIMIT);
        let max_limit = parse_or(&lookup, "WHEEL_HISTORY_MAX_LIMIT", MAX_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);

        Self {
            bind_addr: non_empty(&lookup, "WHEEL_BIND_ADDR")
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            db_path: non_empty(&lookup, "WHEEL_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/decision-wheel.sqlite3")),
            entry_pool_url: non_empty(&lookup, "WHEEL_ENTRY_POOL_URL"),
            history_limits: HistoryLimits {
                default_limit: default_limit.clamp(1, max_limit),
                max_limit,
            },
            http_timeout: Duration::from_millis(parse_or(&lookup, "WHEEL_HTTP_TIMEOUT_MS", 5_000)),
        }
    }
}

/// Client configuration.
///
/// Environment variables:
/// - `WHEEL_SERVICE_URL` (default: http://127.0.0.1:8080)
/// - `WHEEL_ENTRY_POOL_URL` (default: same as the service URL)
/// - `WHEEL_SESSION_FILE` (default: .decision-wheel/session.json)
/// - `WHEEL_ANIMATION_MS` (default: 4000)
/// - `WHEEL_POOL_REFRESH_MS` (default: 30000)
/// - `WHEEL_HTTP_TIMEOUT_MS` (default: 5000)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub service_url: String,
    pub entry_pool_url: String,
    pub session_file: PathBuf,
    pub animation: Duration,
    pub pool_refresh_interval: Duration,
    pub http_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let service_url = non_empty(&lookup, "WHEEL_SERVICE_URL")
            .unwrap_or_else(|| "http://127.0.0.1:8080".to_string());

        Self {
            entry_pool_url: non_empty(&lookup, "WHEEL_ENTRY_POOL_URL")
                .unwrap_or_else(|| service_url.clone()),
            service_url,
            session_file: non_empty(&lookup, "WHEEL_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".decision-wheel/session.json")),
            animation: Duration::from_millis(parse_or(&lookup, "WHEEL_ANIMATION_MS", 4_000)),
            pool_refresh_interval: Duration::from_millis(
                parse_or(&lookup, "WHEEL_POOL_REFRESH_MS", 30_000).max(1),
            ),
            http_timeout: Duration::from_millis(parse_or(&lookup, "WHEEL_HTTP_TIMEOUT_MS", 5_000)),
        }
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    non_empty(lookup, key)
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
