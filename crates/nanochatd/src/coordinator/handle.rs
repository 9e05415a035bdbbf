//! Client interface for the Coordinator.
//!
//! The `CoordinatorHandle` is a cheap-to-clone sender shared by the
//! acceptor and every connection handler.

use std::sync::Arc;

use nanochat_protocol::Username;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use super::commands::{CoordinatorCommand, CoordinatorError, CoordinatorStats, DisconnectReason};
use crate::session::Session;

// ============================================================================
// Coordinator Handle
// ============================================================================

/// Handle for interacting with the coordinator actor.
///
/// The actor runs until every clone of this handle is dropped.
///
/// # Usage
///
/// ```ignore
/// let coordinator = spawn_coordinator(&config);
/// coordinator.login(session.clone()).await?;
/// coordinator.message(session.clone(), "hello".to_string()).await?;
/// coordinator.quit(session, DisconnectReason::Quit).await?;
/// ```
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<CoordinatorCommand>,
}

impl CoordinatorHandle {
    /// Create a new coordinator handle.
    pub fn new(sender: mpsc::Sender<CoordinatorCommand>) -> Self {
        Self { sender }
    }

    /// Reports a completed login.
    ///
    /// Does not wait for the registry decision; a rejected session is
    /// closed by the coordinator.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::ChannelClosed` if the actor has shut down.
    pub async fn login(&self, session: Arc<Session>) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::Login { session }).await
    }

    /// Submits a chat message for fan-out.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::ChannelClosed` if the actor has shut down.
    pub async fn message(
        &self,
        session: Arc<Session>,
        text: String,
    ) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::Message { session, text }).await
    }

    /// Reports that a session is leaving.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::ChannelClosed` if the actor has shut down.
    pub async fn quit(
        &self,
        session: Arc<Session>,
        reason: DisconnectReason,
    ) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::Quit { session, reason }).await
    }

    /// Reports a quit from a synchronous context such as `Drop`.
    ///
    /// Tries to enqueue immediately; if the queue is full, finishes the send
    /// on a spawned task. When neither is possible (actor gone, or no
    /// runtime) the session is closed directly so the connection is not
    /// leaked.
    pub fn quit_detached(&self, session: Arc<Session>, reason: DisconnectReason) {
        match self.sender.try_send(CoordinatorCommand::Quit { session, reason }) {
            Ok(()) => {}
            Err(TrySendError::Full(cmd)) => {
                let sender = self.sender.clone();
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        runtime.spawn(async move {
                            let _ = sender.send(cmd).await;
                        });
                    }
                    Err(_) => close_orphan(cmd),
                }
            }
            Err(TrySendError::Closed(cmd)) => close_orphan(cmd),
        }
    }

    /// Lists registered usernames in sorted order.
    ///
    /// Returns an empty list if the actor has shut down.
    pub async fn users(&self) -> Vec<Username> {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(CoordinatorCommand::Users { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Snapshot of the coordinator counters.
    ///
    /// Returns `None` if the actor has shut down.
    pub async fn stats(&self) -> Option<CoordinatorStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorCommand::Stats { respond_to: tx })
            .await
            .ok()?;
        rx.await.ok()
    }

    /// Returns `true` while the actor is running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }

    async fn send(&self, cmd: CoordinatorCommand) -> Result<(), CoordinatorError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| CoordinatorError::ChannelClosed)
    }
}

fn close_orphan(cmd: CoordinatorCommand) {
    if let CoordinatorCommand::Quit { session, reason } = cmd {
        warn!(
            username = %session.username(),
            connection = %session.id(),
            reason = %reason,
            "Coordinator unavailable, closing session directly"
        );
        session.close();
    }
}
