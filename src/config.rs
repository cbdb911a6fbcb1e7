//! # Configuration Management
//!
//! Centralized configuration for the Hexabus transport, listener server and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()` / `from_toml()`
//! - Environment variables (`HEXABUS_*`) via `from_env()`
//! - Direct instantiation with defaults
//!
//! ## Example
//! ```toml
//! [transport]
//! bind_address = "0.0.0.0:0"
//! response_timeout = 10000
//!
//! [server]
//! bind_address = "0.0.0.0:61616"
//! overflow_policy = "drop_oldest"
//!
//! [logging]
//! log_level = "debug"
//! ```

use crate::error::{HexabusError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Packet header, "HX0B"
pub const HEADER: u32 = 0x4858_3042;

/// Well-known UDP port devices broadcast to
pub const HEXABUS_PORT: u16 = 61616;

/// Largest valid datagram; sized for an `EndpointInfo` or a `STRING` value
pub const MAX_PACKET_SIZE: usize = 138;

/// How long a query waits for its reply unless told otherwise
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Pending replies kept per peer before the receiver blocks
pub const PEER_QUEUE_CAPACITY: usize = 32;

/// Pending replies kept across all peers before the receiver blocks
pub const QUEUE_CAPACITY: usize = 128;

/// Socket read timeout used to notice close and shutdown
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct HexabusConfig {
    /// Correlating transport configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Listener server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HexabusConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| HexabusError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| HexabusError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| HexabusError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HEXABUS_BIND_ADDRESS") {
            config.transport.bind_address = addr;
        }

        if let Ok(addr) = std::env::var("HEXABUS_SERVER_ADDRESS") {
            config.server.bind_address = addr;
        }

        if let Ok(timeout) = std::env::var("HEXABUS_RESPONSE_TIMEOUT_MS") {
            let val = timeout.parse::<u64>().map_err(|e| {
                HexabusError::ConfigError(format!("Invalid HEXABUS_RESPONSE_TIMEOUT_MS: {e}"))
            })?;
            config.transport.response_timeout = Duration::from_millis(val);
        }

        if let Ok(interval) = std::env::var("HEXABUS_POLL_INTERVAL_MS") {
            let val = interval.parse::<u64>().map_err(|e| {
                HexabusError::ConfigError(format!("Invalid HEXABUS_POLL_INTERVAL_MS: {e}"))
            })?;
            config.transport.poll_interval = Duration::from_millis(val);
            config.server.poll_interval = Duration::from_millis(val);
        }

        if let Ok(level) = std::env::var("HEXABUS_LOG_LEVEL") {
            config.logging.log_level = level.parse::<Level>().map_err(|_| {
                HexabusError::ConfigError(format!("Invalid HEXABUS_LOG_LEVEL: {level}"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HexabusError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| HexabusError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.transport.validate());
        errors.extend(self.server.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(HexabusError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn validate_address(what: &str, address: &str, errors: &mut Vec<String>) {
    if address.is_empty() {
        errors.push(format!("{what} address cannot be empty"));
    } else if address.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "Invalid {what} address format: '{address}' (expected format: '0.0.0.0:61616')"
        ));
    }
}

fn validate_poll_interval(what: &str, interval: Duration, errors: &mut Vec<String>) {
    // A zero read timeout is rejected by the socket
    if interval.is_zero() {
        errors.push(format!("{what} poll interval must be greater than 0"));
    } else if interval > Duration::from_secs(10) {
        errors.push(format!("{what} poll interval too long (maximum: 10s)"));
    }
}

/// Correlating transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Local address to bind; port 0 picks an ephemeral port
    pub bind_address: String,

    /// Default wait for a correlated reply
    #[serde(with = "duration_serde")]
    pub response_timeout: Duration,

    /// Pending packets kept per peer
    pub peer_queue_capacity: usize,

    /// Pending packets kept in total
    pub queue_capacity: usize,

    /// Socket read timeout of the receive loop
    #[serde(with = "duration_serde")]
    pub poll_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0:0"),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            peer_queue_capacity: PEER_QUEUE_CAPACITY,
            queue_capacity: QUEUE_CAPACITY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        validate_address("Transport", &self.bind_address, &mut errors);

        if self.response_timeout.is_zero() {
            errors.push("Response timeout must be greater than 0".to_string());
        } else if self.response_timeout.as_secs() > 300 {
            errors.push("Response timeout too long (maximum: 300s)".to_string());
        }

        if self.peer_queue_capacity == 0 {
            errors.push("Peer queue capacity must be greater than 0".to_string());
        }
        if self.queue_capacity == 0 {
            errors.push("Queue capacity must be greater than 0".to_string());
        } else if self.peer_queue_capacity > self.queue_capacity {
            errors.push(format!(
                "Peer queue capacity ({}) cannot exceed queue capacity ({})",
                self.peer_queue_capacity, self.queue_capacity
            ));
        }

        validate_poll_interval("Transport", self.poll_interval, &mut errors);

        errors
    }
}

/// What the listener server does when a listener's queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the oldest queued packet to make room
    #[default]
    DropOldest,
    /// Unregister the listener, discarding whatever is still queued for it.
    ///
    /// A burst larger than the queue capacity disconnects even a healthy
    /// listener, so size `listener_queue_capacity` for the expected burst.
    Disconnect,
}

/// Listener server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server listen address
    pub bind_address: String,

    /// Datagrams waiting for the decode stage
    pub decode_queue_capacity: usize,

    /// Packets waiting for each listener
    pub listener_queue_capacity: usize,

    /// Behavior when a listener falls behind
    pub overflow_policy: OverflowPolicy,

    /// Socket read timeout of the receive loop
    #[serde(with = "duration_serde")]
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{HEXABUS_PORT}"),
            decode_queue_capacity: 256,
            listener_queue_capacity: 64,
            overflow_policy: OverflowPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        validate_address("Server", &self.bind_address, &mut errors);

        if self.decode_queue_capacity == 0 {
            errors.push("Decode queue capacity must be greater than 0".to_string());
        } else if self.decode_queue_capacity > 1_000_000 {
            errors.push(format!(
                "Decode queue capacity too large: {} (max recommended: 1,000,000)",
                self.decode_queue_capacity
            ));
        }

        if self.listener_queue_capacity == 0 {
            errors.push("Listener queue capacity must be greater than 0".to_string());
        }

        validate_poll_interval("Server", self.poll_interval, &mut errors);

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("hexabus"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Durations are stored as whole milliseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Levels are stored as lowercase names
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
