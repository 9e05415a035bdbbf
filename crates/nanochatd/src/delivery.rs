//! Per-recipient fan-out.
//!
//! The coordinator spawns one delivery task per (message, recipient) pair.
//! Each task writes a single line under the write timeout and reports a
//! failure back to the coordinator, then ends. Tasks never wait on each
//! other, so one stalled recipient cannot hold up the rest.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::coordinator::CoordinatorCommand;
use crate::session::{Session, SessionError};

/// Writes `line` to `session`, giving up after `write_timeout`.
///
/// # Errors
///
/// - `SessionError::WriteTimeout` if the write does not finish in time
/// - any error from `Session::write_line`
pub async fn deliver(
    session: &Session,
    line: &str,
    write_timeout: Duration,
) -> Result<(), SessionError> {
    match tokio::time::timeout(write_timeout, session.write_line(line)).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::WriteTimeout),
    }
}

/// Spawns a task delivering `line` to `session`.
///
/// On failure the task sends `CoordinatorCommand::WriteFailed` through
/// `feedback`. The sender is weak so pending deliveries do not keep the
/// coordinator alive; if it is already gone the failure is dropped.
pub fn spawn_delivery(
    session: Arc<Session>,
    line: Arc<str>,
    write_timeout: Duration,
    feedback: mpsc::WeakSender<CoordinatorCommand>,
) {
    tokio::spawn(async move {
        let Err(error) = deliver(&session, &line, write_timeout).await else {
            return;
        };

        debug!(
            username = %session.username(),
            connection = %session.id(),
            error = %error,
            "Delivery failed"
        );

        if let Some(sender) = feedback.upgrade() {
            let _ = sender
                .send(CoordinatorCommand::WriteFailed { session, error })
                .await;
        }
    });
}
