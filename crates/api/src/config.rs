use std::str::FromStr;
use std::time::Duration;

use relay_boards::BoardTimings;
use relay_serial::SerialConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    ///
    /// Covers the time to the response head, so long-lived live streams and
    /// serial sockets are not cut off by it.
    pub request_timeout_secs: u64,
    /// Period of the background board reconciliation sweep.
    pub board_sync_interval: Duration,
    /// Keep-alive comment period on the live update stream.
    pub live_keepalive: Duration,
    /// Baud rate used when a serial viewer does not ask for one.
    pub serial_default_baud: u32,
    /// Board coordinator timeouts and cache lifetime.
    pub board_timings: BoardTimings,
    /// Serial session grace period and replay budget.
    pub serial: SerialConfig,
    /// JWT token configuration.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default                 |
    /// |---------------------------------|-------------------------|
    /// | `HOST`                          | `0.0.0.0`               |
    /// | `PORT`                          | `3000`                  |
    /// | `CORS_ORIGINS`                  | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`          | `30`                    |
    /// | `BOARD_SYNC_INTERVAL_SECS`      | `5`                     |
    /// | `BOARD_CACHE_TTL_MS`            | `2000`                  |
    /// | `BOARD_COMMAND_TIMEOUT_SECS`    | `10`                    |
    /// | `BOARD_BACKGROUND_TIMEOUT_SECS` | `5`                     |
    /// | `BOARD_PING_TIMEOUT_SECS`       | `3`                     |
    /// | `LIVE_KEEPALIVE_SECS`           | `30`                    |
    /// | `SERIAL_GRACE_SECS`             | `5`                     |
    /// | `SERIAL_REPLAY_BYTES`           | `50000`                 |
    /// | `SERIAL_DEFAULT_BAUD`           | `115200`                |
    ///
    /// # Panics
    ///
    /// Panics on a value that does not parse, and when `JWT_SECRET` is missing.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 30);

        let defaults = BoardTimings::default();
        let board_timings = BoardTimings {
            command_timeout: Duration::from_secs(env_or(
                "BOARD_COMMAND_TIMEOUT_SECS",
                defaults.command_timeout.as_secs(),
            )),
            background_timeout: Duration::from_secs(env_or(
                "BOARD_BACKGROUND_TIMEOUT_SECS",
                defaults.background_timeout.as_secs(),
            )),
            ping_timeout: Duration::from_secs(env_or(
                "BOARD_PING_TIMEOUT_SECS",
                defaults.ping_timeout.as_secs(),
            )),
            cache_ttl: Duration::from_millis(env_or(
                "BOARD_CACHE_TTL_MS",
                defaults.cache_ttl.as_millis() as u64,
            )),
            resync_delay: defaults.resync_delay,
        };

        let serial_defaults = SerialConfig::default();
        let serial = SerialConfig {
            grace_period: Duration::from_secs(env_or(
                "SERIAL_GRACE_SECS",
                serial_defaults.grace_period.as_secs(),
            )),
            replay_bytes: env_or("SERIAL_REPLAY_BYTES", serial_defaults.replay_bytes),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            board_sync_interval: Duration::from_secs(env_or("BOARD_SYNC_INTERVAL_SECS", 5)),
            live_keepalive: Duration::from_secs(env_or("LIVE_KEEPALIVE_SECS", 30)),
            serial_default_baud: env_or("SERIAL_DEFAULT_BAUD", 115_200),
            board_timings,
            serial,
            jwt: JwtConfig::from_env(),
        }
    }
}

/// Read and parse `name`, falling back to `default` when it is unset.
fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} is not valid ({raw:?}): {e}")),
        Err(_) => default,
    }
}
