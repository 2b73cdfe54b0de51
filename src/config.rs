use std::time::Duration;
use thiserror::Error;

use crate::application::lending::{DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS, RetryPolicy};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

/// 設定値の読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// データベース接続設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

/// アプリケーション設定
///
/// 環境変数から読み込む。DATABASE_URLが未設定の場合はインメモリストアで動作する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database: Option<DatabaseConfig>,
    pub port: u16,
    pub cors_allowed_origin: String,
    pub retry_policy: RetryPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から読み込む（空文字列は未設定扱い）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database = match get("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(
                    "DATABASE_MAX_CONNECTIONS",
                    get("DATABASE_MAX_CONNECTIONS"),
                    DEFAULT_MAX_CONNECTIONS,
                )?,
                acquire_timeout: Duration::from_secs(parse_or(
                    "DATABASE_ACQUIRE_TIMEOUT_SECS",
                    get("DATABASE_ACQUIRE_TIMEOUT_SECS"),
                    DEFAULT_ACQUIRE_TIMEOUT.as_secs(),
                )?),
            }),
            None => None,
        };

        let max_attempts: u32 = parse_or(
            "LENDING_MAX_ATTEMPTS",
            get("LENDING_MAX_ATTEMPTS"),
            DEFAULT_MAX_ATTEMPTS,
        )?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "LENDING_MAX_ATTEMPTS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let backoff_ms: u64 = parse_or(
            "LENDING_RETRY_BACKOFF_MS",
            get("LENDING_RETRY_BACKOFF_MS"),
            DEFAULT_BACKOFF.as_millis() as u64,
        )?;

        Ok(Self {
            database,
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            cors_allowed_origin: get("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            retry_policy: RetryPolicy::new(max_attempts, Duration::from_millis(backoff_ms)),
        })
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name,
                reason: e.to_string(),
                value,
            }),
    }
}
