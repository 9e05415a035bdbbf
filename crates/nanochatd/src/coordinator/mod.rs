//! Session registry using the Actor pattern.
//!
//! The coordinator is the single serialization point of the server. Every
//! registry change and every fan-out decision happens inside one task that
//! consumes a queue of typed commands.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐ login/message/quit ┌─────────────────┐  spawn   ┌────────────────┐
//! │ Session Readers │───────────────────▶│   Coordinator   │─────────▶│ Delivery tasks │
//! └─────────────────┘  (mpsc channel)    └─────────────────┘          └────────────────┘
//!                                          ▲    │                            │
//!                                          │    ▼                            │
//!                                          │  HashMap<Username,              │
//!                                          │          Arc<Session>>          │
//!                                          └─────────────────────────────────┘
//!                                                write-failed (weak sender)
//! ```

use tokio::sync::mpsc;

use crate::config::ServerConfig;

mod actor;
mod commands;
mod handle;

pub use actor::Coordinator;
pub use commands::{CoordinatorCommand, CoordinatorError, CoordinatorStats, DisconnectReason};
pub use handle::CoordinatorHandle;

/// Spawn the coordinator actor and return a handle for interaction.
///
/// The actor stops, closing any sessions still registered, once every
/// clone of the returned handle has been dropped.
///
/// # Example
///
/// ```no_run
/// use nanochatd::{spawn_coordinator, ServerConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let coordinator = spawn_coordinator(&ServerConfig::default());
///     let users = coordinator.users().await;
///     assert!(users.is_empty());
/// }
/// ```
pub fn spawn_coordinator(config: &ServerConfig) -> CoordinatorHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(config.event_buffer.max(1));

    let actor = Coordinator::new(cmd_rx, cmd_tx.downgrade(), config.write_timeout);
    tokio::spawn(actor.run());

    CoordinatorHandle::new(cmd_tx)
}
