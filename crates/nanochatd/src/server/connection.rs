//! Session reader for individual client connections.
//!
//! Each accepted connection gets its own `ConnectionHandler` that:
//! - Reads the username line under the login timeout
//! - Reports the login to the coordinator
//! - Parses chat lines and forwards them until the client leaves
//! - Guarantees exactly one quit report on every exit path
//!
//! The per-connection lifecycle is an explicit state machine. `ReaderPhase::step`
//! is a pure function from (phase, read outcome) to (next phase, action), so
//! the timeout and error rules can be tested without any I/O.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Read errors end the session, never the server

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use nanochat_protocol::{ClientLine, LineReader, ProtocolError, Username};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SessionLimits;
use crate::coordinator::{CoordinatorHandle, DisconnectReason};
use crate::session::{Session, SessionId};

// ============================================================================
// Reader State Machine
// ============================================================================

/// Lifecycle phase of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderPhase {
    /// Waiting for the username line.
    LoggingIn,
    /// Logged in, relaying chat lines.
    Active,
    /// Terminal. The reader has nothing left to do.
    Closing,
}

/// Result of one attempt to read a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, terminator stripped.
    Line(String),
    /// The client closed the stream.
    Eof,
    /// No line arrived before the phase deadline.
    TimedOut,
    /// The read failed (transport error, oversized or non-UTF-8 line).
    Failed(String),
    /// The connection was closed server-side while waiting.
    Cancelled,
}

/// What the reader does after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Report a login for this username.
    Login(Username),
    /// Give up before login. No registry interaction.
    Abort(LoginFailure),
    /// Forward a chat message.
    Relay(String),
    /// Log an unrecognized line and keep reading.
    Ignore(String),
    /// Report the session as gone.
    Quit(DisconnectReason),
    /// Nothing more to do.
    Halt,
}

/// Why a connection never logged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginFailure {
    Timeout,
    Eof,
    ReadError(String),
    Cancelled,
}

impl fmt::Display for LoginFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "login timed out"),
            Self::Eof => write!(f, "disconnected before login"),
            Self::ReadError(e) => write!(f, "read error: {e}"),
            Self::Cancelled => write!(f, "server closing"),
        }
    }
}

impl ReaderPhase {
    /// Deadline for the next read, or `None` if the reader is done.
    pub fn read_timeout(&self, limits: &SessionLimits) -> Option<Duration> {
        match self {
            Self::LoggingIn => Some(limits.login_timeout),
            Self::Active => Some(limits.inactivity_timeout),
            Self::Closing => None,
        }
    }

    /// Applies one read outcome.
    pub fn step(self, outcome: ReadOutcome) -> (ReaderPhase, Transition) {
        match self {
            Self::LoggingIn => match outcome {
                ReadOutcome::Line(line) => {
                    (Self::Active, Transition::Login(Username::from_line(line)))
                }
                ReadOutcome::Eof => (Self::Closing, Transition::Abort(LoginFailure::Eof)),
                ReadOutcome::TimedOut => (Self::Closing, Transition::Abort(LoginFailure::Timeout)),
                ReadOutcome::Failed(e) => {
                    (Self::Closing, Transition::Abort(LoginFailure::ReadError(e)))
                }
                ReadOutcome::Cancelled => {
                    (Self::Closing, Transition::Abort(LoginFailure::Cancelled))
                }
            },
            Self::Active => match outcome {
                ReadOutcome::Line(line) => match ClientLine::parse(&line) {
                    ClientLine::Message(text) => (Self::Active, Transition::Relay(text)),
                    ClientLine::Quit => (Self::Closing, Transition::Quit(DisconnectReason::Quit)),
                    ClientLine::Unknown(line) => (Self::Active, Transition::Ignore(line)),
                },
                ReadOutcome::Eof => (Self::Closing, Transition::Quit(DisconnectReason::Eof)),
                ReadOutcome::TimedOut => (
                    Self::Closing,
                    Transition::Quit(DisconnectReason::InactivityTimeout),
                ),
                ReadOutcome::Failed(_) => {
                    (Self::Closing, Transition::Quit(DisconnectReason::ReadError))
                }
                ReadOutcome::Cancelled => {
                    (Self::Closing, Transition::Quit(DisconnectReason::Closed))
                }
            },
            Self::Closing => (Self::Closing, Transition::Halt),
        }
    }
}

// ============================================================================
// Quit Guard
// ============================================================================

/// Owns the obligation to report a session's quit exactly once.
///
/// `emit` consumes the guard. If the guard is dropped without emitting
/// (early return, panic unwinding, task abort) the quit is sent from `Drop`.
pub struct QuitGuard {
    coordinator: CoordinatorHandle,
    session: Option<Arc<Session>>,
}

impl QuitGuard {
    pub fn new(coordinator: CoordinatorHandle, session: Arc<Session>) -> Self {
        Self {
            coordinator,
            session: Some(session),
        }
    }

    /// The guarded session, until the quit is emitted.
    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    /// Reports the quit and disarms the guard.
    pub async fn emit(mut self, reason: DisconnectReason) {
        let Some(session) = self.session.take() else {
            return;
        };

        if self
            .coordinator
            .quit(Arc::clone(&session), reason)
            .await
            .is_err()
        {
            debug!(
                username = %session.username(),
                "Coordinator gone, closing session directly"
            );
            session.close();
        }
    }
}

impl Drop for QuitGuard {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.coordinator
                .quit_detached(session, DisconnectReason::Aborted);
        }
    }
}

// ============================================================================
// Connection Handler
// ============================================================================

/// Session reader for a single client connection.
pub struct ConnectionHandler<R, W> {
    /// Connection id, unique for the server's lifetime
    id: SessionId,

    /// Remote address, if known
    peer: Option<SocketAddr>,

    /// Line reader over the read half
    reader: LineReader<R>,

    /// Write half, moved into the `Session` at login
    writer: Option<W>,

    /// Handle to the coordinator
    coordinator: CoordinatorHandle,

    /// Read deadlines and line limit
    limits: SessionLimits,

    /// Cancelled on server shutdown or when the session closes
    shutdown: CancellationToken,
}

impl<R, W> ConnectionHandler<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `id` - Unique id for this connection
    /// * `reader` - Read half of the stream
    /// * `writer` - Write half of the stream
    /// * `peer` - Remote address for logging
    /// * `coordinator` - Handle to the coordinator
    /// * `limits` - Read deadlines and line limit
    /// * `shutdown` - Token for this connection (a child of the server token)
    pub fn new(
        id: SessionId,
        reader: R,
        writer: W,
        peer: Option<SocketAddr>,
        coordinator: CoordinatorHandle,
        limits: SessionLimits,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id,
            peer,
            reader: LineReader::with_max_length(reader, limits.max_line_length),
            writer: Some(writer),
            coordinator,
            limits,
            shutdown,
        }
    }

    /// Runs the connection until the client leaves or the server closes it.
    pub async fn run(mut self) {
        debug!(connection = %self.id, peer = ?self.peer, "New connection");

        let mut phase = ReaderPhase::LoggingIn;
        let mut guard: Option<QuitGuard> = None;

        while let Some(limit) = phase.read_timeout(&self.limits) {
            let outcome = self.read_next(limit).await;
            let (next, transition) = phase.step(outcome);
            phase = next;

            match transition {
                Transition::Login(username) => match self.login(username).await {
                    Some(g) => guard = Some(g),
                    None => return,
                },
                Transition::Abort(failure) => {
                    info!(
                        connection = %self.id,
                        peer = ?self.peer,
                        reason = %failure,
                        "Login failed"
                    );
                    return;
                }
                Transition::Relay(text) => {
                    let Some(session) = guard.as_ref().and_then(QuitGuard::session) else {
                        break;
                    };
                    if self
                        .coordinator
                        .message(Arc::clone(session), text)
                        .await
                        .is_err()
                    {
                        warn!(connection = %self.id, "Coordinator gone, dropping connection");
                        break;
                    }
                }
                Transition::Ignore(line) => {
                    warn!(
                        connection = %self.id,
                        command = %line,
                        "Ignoring unrecognized command"
                    );
                }
                Transition::Quit(reason) => {
                    if let Some(guard) = guard.take() {
                        guard.emit(reason).await;
                    }
                    debug!(connection = %self.id, reason = %reason, "Reader finished");
                    return;
                }
                Transition::Halt => break,
            }
        }

        // Any remaining guard reports `Aborted` as it drops here.
    }

    /// Builds the session and reports the login.
    ///
    /// Returns the guard for the new session, or `None` if the coordinator
    /// is gone.
    async fn login(&mut self, username: Username) -> Option<QuitGuard> {
        let writer = self.writer.take()?;
        let session = Arc::new(Session::new(
            self.id,
            username,
            self.peer,
            writer,
            self.shutdown.clone(),
        ));

        debug!(
            connection = %self.id,
            username = %session.username(),
            "Login line received"
        );

        let guard = QuitGuard::new(self.coordinator.clone(), Arc::clone(&session));
        if self.coordinator.login(session).await.is_err() {
            warn!(connection = %self.id, "Coordinator gone, rejecting login");
            guard.emit(DisconnectReason::Closed).await;
            return None;
        }
        Some(guard)
    }

    /// Reads one line under `limit`, or stops early if the connection is
    /// cancelled.
    async fn read_next(&mut self, limit: Duration) -> ReadOutcome {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => ReadOutcome::Cancelled,
            result = timeout(limit, self.reader.read_line()) => match result {
                Err(_) => ReadOutcome::TimedOut,
                Ok(Ok(Some(line))) => ReadOutcome::Line(line),
                Ok(Ok(None)) => ReadOutcome::Eof,
                Ok(Err(ProtocolError::UnterminatedLine { partial })) => {
                    debug!(connection = %self.id, partial, "Stream ended mid-line");
                    ReadOutcome::Eof
                }
                Ok(Err(e)) => {
                    debug!(connection = %self.id, error = %e, "Read failed");
                    ReadOutcome::Failed(e.to_string())
                }
            },
        }
    }
}
