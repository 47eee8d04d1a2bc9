//! Server configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).
//!
//! | Variable | Default |
//! |---|---|
//! | `LISTEN_ADDR` | `127.0.0.1:8888` |
//! | `HEARTBEAT_INTERVAL_SECS` | `5` |
//! | `READ_BUFFER_SIZE` | `65536` |
//! | `LOG_FORMAT` | `text` (`json` also accepted) |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::ws::heartbeat::DEFAULT_HEARTBEAT_INTERVAL;

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8888";
const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `LISTEN_ADDR` is set but is not a socket address.
    #[error("invalid LISTEN_ADDR {value:?}: {source}")]
    InvalidListenAddr {
        /// The rejected value.
        value: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Top-level server configuration.
///
/// Loaded once at startup via [`ServerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on (e.g. `127.0.0.1:8888`).
    pub listen_addr: SocketAddr,

    /// Time between two heartbeat frames on an open connection.
    pub heartbeat_interval: Duration,

    /// Size of the per-connection read buffer. A frame must arrive within a
    /// single read, so this also bounds the largest accepted frame.
    pub read_buffer_size: usize,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8888)),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            log_format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when an optional variable is missing, invalid
    /// or zero. Calls `dotenvy::dotenv().ok()` to optionally load a `.env`
    /// file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidListenAddr`] if `LISTEN_ADDR` is set
    /// but cannot be parsed as a [`SocketAddr`].
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let raw_addr =
            std::env::var("LISTEN_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr: SocketAddr = raw_addr
            .parse()
            .map_err(|source| ConfigError::InvalidListenAddr {
                value: raw_addr.clone(),
                source,
            })?;

        let heartbeat_secs = parse_env("HEARTBEAT_INTERVAL_SECS", 0_u64);
        let heartbeat_interval = if heartbeat_secs == 0 {
            DEFAULT_HEARTBEAT_INTERVAL
        } else {
            Duration::from_secs(heartbeat_secs)
        };

        let read_buffer_size = match parse_env("READ_BUFFER_SIZE", DEFAULT_READ_BUFFER_SIZE) {
            0 => DEFAULT_READ_BUFFER_SIZE,
            n => n,
        };

        let log_format = parse_env("LOG_FORMAT", LogFormat::Text);

        Ok(Self {
            listen_addr,
            heartbeat_interval,
            read_buffer_size,
            log_format,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
