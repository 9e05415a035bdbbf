//! Coordinator commands, errors, and statistics.
//!
//! This module defines the message types for communicating with the
//! `Coordinator` actor:
//! - `CoordinatorCommand`: Events and queries sent to the actor
//! - `CoordinatorError`: Errors talking to the actor
//! - `DisconnectReason`: Why a session left
//! - `CoordinatorStats`: Counters kept by the actor

use std::fmt;
use std::sync::Arc;

use nanochat_protocol::Username;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::session::{Session, SessionError};

// ============================================================================
// Coordinator Commands
// ============================================================================

/// Commands sent to the coordinator actor.
///
/// Session events are fire-and-forget: the sender never learns what the
/// coordinator decided. Queries carry a oneshot channel for the answer.
#[derive(Debug)]
pub enum CoordinatorCommand {
    /// A connection completed the login handshake.
    ///
    /// Inserted into the registry unless the username is taken, in which
    /// case the new session is closed.
    Login {
        /// The freshly authenticated session
        session: Arc<Session>,
    },

    /// A chat message to relay to every other registered session.
    Message {
        /// The sending session
        session: Arc<Session>,
        /// Message body, without the `*` prefix
        text: String,
    },

    /// A session is leaving.
    ///
    /// Idempotent: the registry entry is removed only if it still belongs
    /// to this connection, and the session is closed at most once.
    Quit {
        /// The leaving session
        session: Arc<Session>,
        /// Why the reader stopped
        reason: DisconnectReason,
    },

    /// A delivery task failed to write to `session`.
    ///
    /// Handled exactly like `Quit`.
    WriteFailed {
        /// The unreachable recipient
        session: Arc<Session>,
        /// The write error
        error: SessionError,
    },

    /// List registered usernames, sorted.
    Users {
        /// Channel to send the result
        respond_to: oneshot::Sender<Vec<Username>>,
    },

    /// Snapshot of the coordinator counters.
    Stats {
        /// Channel to send the result
        respond_to: oneshot::Sender<CoordinatorStats>,
    },
}

// ============================================================================
// Coordinator Errors
// ============================================================================

/// Errors that can occur talking to the coordinator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    /// The command channel was closed.
    ///
    /// This typically indicates the actor was shut down.
    #[error("coordinator channel closed")]
    ChannelClosed,
}

// ============================================================================
// Disconnect Reasons
// ============================================================================

/// Why a session left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Client sent `QUIT`.
    Quit,

    /// Client closed the connection.
    Eof,

    /// Reading from the client failed.
    ReadError,

    /// No line arrived within the inactivity timeout.
    InactivityTimeout,

    /// A delivery to the client failed or timed out.
    WriteFailed,

    /// The session was closed server-side (duplicate login or shutdown).
    Closed,

    /// The reader task ended without reporting a reason.
    Aborted,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quit => write!(f, "client quit"),
            Self::Eof => write!(f, "connection closed by client"),
            Self::ReadError => write!(f, "read error"),
            Self::InactivityTimeout => write!(f, "inactivity timeout"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::Closed => write!(f, "closed by server"),
            Self::Aborted => write!(f, "reader aborted"),
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Counters kept by the coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Sessions currently registered
    pub active_sessions: usize,
    /// Logins inserted into the registry
    pub logins_accepted: u64,
    /// Logins rejected because the username was taken
    pub logins_rejected: u64,
    /// Messages fanned out
    pub messages_relayed: u64,
    /// Delivery tasks spawned
    pub deliveries_spawned: u64,
    /// Delivery tasks that reported a failure
    pub delivery_failures: u64,
    /// Connections closed by the coordinator
    pub sessions_closed: u64,
}
