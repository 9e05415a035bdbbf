//! Error types for the nanochat client.
//!
//! This module defines client errors that can occur during terminal
//! setup, connecting and talking to the server.
//!
//! **Panic-Free Policy:** No `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()`, or `todo!()`.

use std::io;
use std::time::Duration;

use nanochat_protocol::ProtocolError;
use thiserror::Error;

// ============================================================================
// TUI Error Type
// ============================================================================

/// Client errors.
#[derive(Error, Debug)]
pub enum TuiError {
    /// Failed to initialize the terminal.
    ///
    /// Common causes include running in a non-TTY environment (pipes,
    /// scripts) or an unsupported terminal emulator.
    #[error("Failed to initialize terminal: {0}")]
    TerminalInit(String),

    /// Failed to cleanup/restore the terminal.
    ///
    /// The terminal may be left in an inconsistent state; running `reset`
    /// can help recover.
    #[error("Failed to restore terminal: {0}")]
    TerminalCleanup(String),

    /// The TCP connection could not be established.
    #[error("Failed to connect to {server}: {source}")]
    Connect {
        server: String,
        #[source]
        source: io::Error,
    },

    /// The server did not accept the connection in time.
    #[error("Timed out connecting to {server} after {timeout:?}")]
    ConnectTimeout { server: String, timeout: Duration },

    /// A line could not be written in time.
    #[error("Write to server timed out")]
    WriteTimeout,

    /// The server closed the connection.
    ///
    /// Also how a rejected (duplicate) username shows up.
    #[error("Connection closed by server")]
    ServerClosed,

    /// No line arrived within the inactivity timeout.
    #[error("No data from server for {0:?}")]
    Inactive(Duration),

    /// A line from the server could not be read.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error passthrough.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Convenience Result type alias for client operations.
pub type Result<T> = std::result::Result<T, TuiError>;
