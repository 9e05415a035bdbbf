//! Server configuration.
//!
//! Defaults match the values the chat protocol was designed around. The
//! listen address can be overridden through `NANOCHAT_LISTEN`; everything
//! else is set by the binary from command-line flags.

use std::env;
use std::time::Duration;

use nanochat_protocol::MAX_LINE_LENGTH;
use thiserror::Error;

/// Default interface and port to listen at.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:999";

/// Environment variable that overrides the listen address.
pub const LISTEN_ENV_VAR: &str = "NANOCHAT_LISTEN";

/// Time a new connection has to send its username.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle time after which a logged-in connection is dropped.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Time a single broadcast write may take.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Capacity of the coordinator's event queue.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Configuration for the chat server.
///
/// # Example
///
/// ```rust
/// use nanochatd::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig {
///     listen_addr: "127.0.0.1:0".to_string(),
///     inactivity_timeout: Duration::from_secs(60),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `host:port` to bind.
    pub listen_addr: String,

    /// Deadline for the username line.
    pub login_timeout: Duration,

    /// Deadline for each line after login, reset on every read.
    pub inactivity_timeout: Duration,

    /// Deadline for each per-recipient write.
    pub write_timeout: Duration,

    /// Longest accepted line in bytes.
    pub max_line_length: usize,

    /// Capacity of the coordinator event queue.
    pub event_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            max_line_length: MAX_LINE_LENGTH,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl ServerConfig {
    /// Default configuration with `NANOCHAT_LISTEN` applied, if set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = env::var(LISTEN_ENV_VAR) {
            if !addr.trim().is_empty() {
                config.listen_addr = addr.trim().to_string();
            }
        }
        config
    }

    /// Replaces the listen address.
    #[must_use]
    pub fn with_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    /// Limits handed to every session reader.
    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            login_timeout: self.login_timeout,
            inactivity_timeout: self.inactivity_timeout,
            max_line_length: self.max_line_length,
        }
    }

    /// Checks that the configuration can run a server.
    ///
    /// # Errors
    ///
    /// - `ConfigError::EmptyListenAddr` if no address is set
    /// - `ConfigError::ZeroValue` if a timeout, the line limit or the
    ///   queue capacity is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.trim().is_empty() {
            return Err(ConfigError::EmptyListenAddr);
        }

        let timeouts = [
            ("login timeout", self.login_timeout),
            ("inactivity timeout", self.inactivity_timeout),
            ("write timeout", self.write_timeout),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(ConfigError::ZeroValue { name });
            }
        }

        if self.max_line_length == 0 {
            return Err(ConfigError::ZeroValue {
                name: "max line length",
            });
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::ZeroValue {
                name: "event buffer",
            });
        }

        Ok(())
    }
}

/// Per-connection read limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Deadline for the username line
    pub login_timeout: Duration,
    /// Deadline for each line after login
    pub inactivity_timeout: Duration,
    /// Longest accepted line in bytes
    pub max_line_length: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        ServerConfig::default().session_limits()
    }
}

/// Invalid configuration values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("listen address must not be empty")]
    EmptyListenAddr,

    #[error("{name} must be greater than zero")]
    ZeroValue { name: &'static str },
}
