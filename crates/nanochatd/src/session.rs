//! Shared handle to one logged-in connection.
//!
//! A `Session` is owned jointly by its reader task, the coordinator's
//! registry and any in-flight delivery tasks. Writes are serialized by an
//! async mutex so concurrent broadcasts never interleave bytes on the
//! stream. Closing is idempotent and cancels the connection's token, which
//! stops the reader and fails pending writes fast.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use nanochat_protocol::{write_line, Username};
use thiserror::Error;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Connection identifier, unique for the lifetime of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Errors writing to a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,

    #[error("write timed out")]
    WriteTimeout,

    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

/// A logged-in connection.
pub struct Session {
    id: SessionId,
    username: Username,
    peer: Option<SocketAddr>,
    writer: Mutex<Option<BoxedWriter>>,
    shutdown: CancellationToken,
    closed: AtomicBool,
}

impl Session {
    /// Creates a session around the write half of a connection.
    ///
    /// `shutdown` is cancelled when the session closes; the connection's
    /// reader watches the same token.
    pub fn new<W>(
        id: SessionId,
        username: Username,
        peer: Option<SocketAddr>,
        writer: W,
        shutdown: CancellationToken,
    ) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            id,
            username,
            peer,
            writer: Mutex::new(Some(Box::new(writer))),
            shutdown,
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Returns `true` once `close` has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Token cancelled when the session closes.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Writes one line to the client.
    ///
    /// Writes are serialized per session. A write waiting for the lock, or
    /// blocked on a full socket, returns `SessionError::Closed` as soon as
    /// the session closes.
    ///
    /// # Errors
    ///
    /// - `SessionError::Closed` if the session is or becomes closed
    /// - `SessionError::Io` if the transport fails
    pub async fn write_line(&self, line: &str) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }

        let mut guard = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(SessionError::Closed),
            guard = self.writer.lock() => guard,
        };
        let Some(writer) = guard.as_mut() else {
            return Err(SessionError::Closed);
        };

        let result = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(SessionError::Closed),
            result = write_line(writer, line) => result.map_err(SessionError::from),
        };

        // `close` could not take the half while we held the lock.
        if self.shutdown.is_cancelled() {
            guard.take();
        }
        result
    }

    /// Closes the session.
    ///
    /// Cancels the session token and drops the write half. If a write holds
    /// the half, that write is cancelled and drops it before releasing the
    /// lock. Returns `true` only for the call that actually closed the
    /// session.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }

        self.shutdown.cancel();
        if let Ok(mut guard) = self.writer.try_lock() {
            guard.take();
        }
        true
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

    fn session_over<W>(writer: W) -> Session
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Session::new(
            SessionId(1),
            Username::from_line("alice"),
            None,
            writer,
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_write_line_reaches_peer() {
        let (ours, theirs) = tokio::io::duplex(256);
        let session = session_over(ours);

        session.write_line("[bob]: hi").await.unwrap();

        let mut lines = BufReader::new(theirs).lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("[bob]: hi"));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (ours, _theirs) = tokio::io::duplex(64);
        let session = session_over(ours);

        assert!(session.close());
        assert!(!session.close());
        assert!(session.is_closed());
        assert!(session.shutdown_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_write_after_close_fails_fast() {
        let (ours, _theirs) = tokio::io::duplex(64);
        let session = session_over(ours);
        session.close();

        let err = session.write_line("late").await.unwrap_err();
        assert!(matches!(err, SessionError::Closed));
    }

    #[tokio::test]
    async fn test_close_releases_blocked_write() {
        // Nobody reads the other end, so a write larger than the buffer blocks.
        let (ours, _theirs) = tokio::io::duplex(8);
        let session = std::sync::Arc::new(session_over(ours));

        let writer = {
            let session = session.clone();
            tokio::spawn(async move { session.write_line(&"x".repeat(64)).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        session.close();

        let result = writer.await.unwrap();
        assert!(matches!(result, Err(SessionError::Closed)));
    }

    #[tokio::test]
    async fn test_close_during_blocked_write_drops_write_half() {
        let (ours, mut theirs) = tokio::io::duplex(8);
        let session = std::sync::Arc::new(session_over(ours));

        let writer = {
            let session = session.clone();
            tokio::spawn(async move { session.write_line(&"x".repeat(64)).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        session.close();
        assert!(matches!(writer.await.unwrap(), Err(SessionError::Closed)));

        // The peer sees EOF while the session itself is still alive.
        let mut received = Vec::new();
        let eof = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            theirs.read_to_end(&mut received),
        )
        .await;
        assert!(eof.is_ok(), "write half should be dropped on close");
        assert_eq!(received.len(), 8);
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_write_to_dropped_peer_is_io_error() {
        let (ours, theirs) = tokio::io::duplex(64);
        drop(theirs);
        let session = session_over(ours);

        let err = session.write_line("hello").await.unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId(42).to_string(), "conn-42");
    }
}
