//! TCP server for the chat daemon.
//!
//! The server:
//! - Binds the configured listen address
//! - Spawns a ConnectionHandler for each accepted client
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   ChatServer    │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌───────────────────┐
//! │ConnectionHandler│────▶│ CoordinatorHandle │
//! │   (per client)  │     │                   │
//! └─────────────────┘     └───────────────────┘
//! ```
//!
//! An accept error is fatal: `run` returns it and the process exits.

mod connection;

pub use connection::{
    ConnectionHandler, LoginFailure, QuitGuard, ReadOutcome, ReaderPhase, Transition,
};

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::{ServerConfig, SessionLimits};
use crate::coordinator::CoordinatorHandle;
use crate::session::SessionId;

/// TCP chat server.
///
/// Accepts connections and hands each one to its own session reader.
pub struct ChatServer {
    /// Bound listener
    listener: TcpListener,

    /// Address actually bound (resolves port 0)
    local_addr: SocketAddr,

    /// Handle to the coordinator
    coordinator: CoordinatorHandle,

    /// Per-connection read limits
    limits: SessionLimits,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,

    /// Connection counter for generating connection ids
    connection_counter: AtomicU64,
}

impl ChatServer {
    /// Binds the listen address from `config`.
    ///
    /// # Errors
    ///
    /// - `ServerError::Bind` if the address cannot be bound
    /// - `ServerError::LocalAddr` if the bound address cannot be read
    pub async fn bind(
        config: &ServerConfig,
        coordinator: CoordinatorHandle,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener =
            TcpListener::bind(&config.listen_addr)
                .await
                .map_err(|source| ServerError::Bind {
                    addr: config.listen_addr.clone(),
                    source,
                })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        Ok(Self {
            listener,
            local_addr,
            coordinator,
            limits: config.session_limits(),
            cancel_token,
            connection_counter: AtomicU64::new(0),
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the accept loop.
    ///
    /// Returns `Ok(())` once the cancellation token fires. Cancelling the
    /// token also cancels every connection, since each one runs under a
    /// child token.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Accept` if accepting fails; the listener is
    /// considered broken.
    pub async fn run(self) -> Result<(), ServerError> {
        info!(addr = %self.local_addr, "Chat server listening");

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    return Ok(());
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let id = self.connection_counter.fetch_add(1, Ordering::Relaxed);
                            self.handle_connection(stream, peer, SessionId(id));
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            return Err(ServerError::Accept(e));
                        }
                    }
                }
            }
        }
    }

    /// Spawns a handler task for an accepted connection.
    fn handle_connection(&self, stream: TcpStream, peer: SocketAddr, id: SessionId) {
        debug!(connection = %id, peer = %peer, "Accepted connection");

        let (reader, writer) = stream.into_split();
        let handler = ConnectionHandler::new(
            id,
            reader,
            writer,
            Some(peer),
            self.coordinator.clone(),
            self.limits,
            self.cancel_token.child_token(),
        );
        tokio::spawn(handler.run());
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read bound address: {0}")]
    LocalAddr(#[source] io::Error),

    #[error("Failed to accept connection: {0}")]
    Accept(#[source] io::Error),
}
