//! Configuration loading and validation.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use crate::state::mailbox::OverflowPolicy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity.
    #[serde(default)]
    pub server: ServerConfig,
    /// Network listen configuration.
    #[serde(default)]
    pub listen: ListenConfig,
    /// Framing and queue limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Session lifecycle policy.
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults
    /// so the daemon runs without a config file.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            listen: ListenConfig::default(),
            limits: LimitsConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Room name used in the connection greeting.
    #[serde(default = "default_room")]
    pub room: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            room: default_room(),
        }
    }
}

/// Network listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to listen on.
    #[serde(default = "default_listen_address")]
    pub address: SocketAddr,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_listen_address(),
        }
    }
}

/// Framing and queue limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum accepted line length in bytes, terminator included.
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,

    /// Outbound mailbox capacity per session, in lines.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_line_len: default_max_line_len(),
            mailbox_capacity: default_mailbox_capacity(),
        }
    }
}

/// Session lifecycle policy.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Seconds allowed for the username handshake before disconnect.
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,

    /// What to do with a recipient whose mailbox is full.
    #[serde(default = "default_slow_consumer")]
    pub slow_consumer: OverflowPolicy,

    /// Optional line written before closing a connection that proposed an
    /// invalid username. Absent means close silently.
    #[serde(default)]
    pub rejection_notice: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_secs: default_handshake_timeout(),
            slow_consumer: default_slow_consumer(),
            rejection_notice: None,
        }
    }
}

fn default_room() -> String {
    "fubChat".to_string()
}

fn default_listen_address() -> SocketAddr {
    "0.0.0.0:25565".parse().expect("static address parses")
}

fn default_max_line_len() -> usize {
    4096
}

fn default_mailbox_capacity() -> usize {
    64
}

fn default_handshake_timeout() -> u64 {
    60
}

fn default_slow_consumer() -> OverflowPolicy {
    OverflowPolicy::Disconnect
}

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.room must not be empty")]
    EmptyRoomName,
    #[error("limits.max_line_len must be at least 2, got {0}")]
    MaxLineLenTooSmall(usize),
    #[error("limits.mailbox_capacity must be at least 1")]
    ZeroMailboxCapacity,
    #[error("session.handshake_timeout_secs must be at least 1")]
    ZeroHandshakeTimeout,
    #[error("session.rejection_notice must not contain a newline")]
    NoticeContainsNewline,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.room.is_empty() {
        errors.push(ValidationError::EmptyRoomName);
    }
    if config.limits.max_line_len < 2 {
        errors.push(ValidationError::MaxLineLenTooSmall(
            config.limits.max_line_len,
        ));
    }
    if config.limits.mailbox_capacity == 0 {
        errors.push(ValidationError::ZeroMailboxCapacity);
    }
    if config.session.handshake_timeout_secs == 0 {
        errors.push(ValidationError::ZeroHandshakeTimeout);
    }
    if let Some(notice) = &config.session.rejection_notice
        && notice.contains('\n')
    {
        errors.push(ValidationError::NoticeContainsNewline);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
