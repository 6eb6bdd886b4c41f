use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use iboard_api::Environment;
use iboard_api::rate_limit::{Quota, RateLimitConfig};

/// Process configuration, read from the environment (and `.env`).
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub environment: Environment,
    pub cors_origins: Vec<String>,
    pub rate_limits: RateLimitConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = var_or("IBOARD_HOST", "0.0.0.0");
        let port: u16 = parse_var("IBOARD_PORT", "3001")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;

        let cors_origins = var_or("CORS_ORIGIN", "http://localhost:3000")
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let window_ms: u64 = parse_var("RATE_LIMIT_WINDOW_MS", "900000")?;
        let max_requests: u32 = parse_var("RATE_LIMIT_MAX_REQUESTS", "100")?;
        let rate_limits = RateLimitConfig {
            general: (max_requests > 0)
                .then(|| Quota::new(max_requests, Duration::from_millis(window_ms))),
            ..RateLimitConfig::default()
        };

        Ok(Self {
            addr,
            db_path: var_or("IBOARD_DB_PATH", "iboard.db").into(),
            environment: Environment::from_name(&var_or("IBOARD_ENV", "development")),
            cors_origins,
            rate_limits,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn parse_var<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var_or(key, default)
        .parse()
        .with_context(|| format!("{} is not a valid value", key))
}
