//! Coordinator actor - owns the session registry and drives fan-out.
//!
//! The Coordinator is the single owner of the registry. It receives events
//! from session readers and delivery tasks over one mpsc channel and
//! processes them strictly one at a time.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Query responses to dropped receivers are ignored

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use nanochat_protocol::{ChatLine, Username};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::commands::{CoordinatorCommand, CoordinatorStats, DisconnectReason};
use crate::delivery::spawn_delivery;
use crate::session::Session;

// ============================================================================
// Coordinator Actor
// ============================================================================

/// The coordinator actor - owns all registry state.
///
/// # Ownership
///
/// The actor owns `sessions`, a map from username to the registered
/// session. Nothing else holds a reference to the map, so no lock guards
/// it. Delivery tasks and readers hold `Arc<Session>` handles but never
/// touch the registry.
///
/// # Connection Identity
///
/// Entries are matched by connection id as well as username. A quit from a
/// rejected duplicate `alice` therefore cannot evict the original `alice`.
pub struct Coordinator {
    /// Command receiver
    receiver: mpsc::Receiver<CoordinatorCommand>,

    /// Handed to delivery tasks for failure reports. Weak, so the actor
    /// stops once every external handle is dropped.
    feedback: mpsc::WeakSender<CoordinatorCommand>,

    /// Registered sessions by username
    sessions: HashMap<Username, Arc<Session>>,

    /// Deadline for each delivery
    write_timeout: Duration,

    stats: CoordinatorStats,
}

impl Coordinator {
    /// Creates a new coordinator.
    ///
    /// # Arguments
    ///
    /// * `receiver` - Channel for receiving commands
    /// * `feedback` - Weak sender into the same channel, for delivery failures
    /// * `write_timeout` - Deadline for each delivery
    pub fn new(
        receiver: mpsc::Receiver<CoordinatorCommand>,
        feedback: mpsc::WeakSender<CoordinatorCommand>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            receiver,
            feedback,
            sessions: HashMap::new(),
            write_timeout,
            stats: CoordinatorStats::default(),
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until every handle is dropped, then closes the
    /// sessions still registered.
    pub async fn run(mut self) {
        info!("Coordinator starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        self.close_all();
        info!(
            sessions_closed = self.stats.sessions_closed,
            messages_relayed = self.stats.messages_relayed,
            "Coordinator stopped"
        );
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: CoordinatorCommand) {
        match cmd {
            CoordinatorCommand::Login { session } => self.handle_login(session),
            CoordinatorCommand::Message { session, text } => {
                self.handle_message(&session, &text);
            }
            CoordinatorCommand::Quit { session, reason } => {
                self.handle_quit(&session, reason);
            }
            CoordinatorCommand::WriteFailed { session, error } => {
                self.stats.delivery_failures += 1;
                debug!(
                    username = %session.username(),
                    connection = %session.id(),
                    error = %error,
                    "Delivery failure reported"
                );
                self.handle_quit(&session, DisconnectReason::WriteFailed);
            }
            CoordinatorCommand::Users { respond_to } => {
                let _ = respond_to.send(self.usernames());
            }
            CoordinatorCommand::Stats { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    fn handle_login(&mut self, session: Arc<Session>) {
        if session.is_closed() {
            debug!(
                username = %session.username(),
                connection = %session.id(),
                "Ignoring login from closed session"
            );
            return;
        }

        if let Some(existing) = self.sessions.get(session.username()) {
            warn!(
                username = %session.username(),
                connection = %session.id(),
                existing = %existing.id(),
                peer = ?session.peer(),
                "Username already in use, rejecting login"
            );
            self.stats.logins_rejected += 1;
            self.close_session(&session);
            return;
        }

        info!(
            username = %session.username(),
            connection = %session.id(),
            peer = ?session.peer(),
            "User logged in"
        );
        self.stats.logins_accepted += 1;
        self.sessions.insert(session.username().clone(), session);
    }

    fn handle_message(&mut self, sender: &Arc<Session>, text: &str) {
        if !self.is_registered(sender) {
            debug!(
                username = %sender.username(),
                connection = %sender.id(),
                "Dropping message from unregistered connection"
            );
            return;
        }

        let line: Arc<str> = ChatLine::new(sender.username().as_str(), text)
            .to_string()
            .into();
        info!("{line}");

        self.stats.messages_relayed += 1;
        for (username, recipient) in &self.sessions {
            if username == sender.username() {
                continue;
            }
            self.stats.deliveries_spawned += 1;
            spawn_delivery(
                Arc::clone(recipient),
                Arc::clone(&line),
                self.write_timeout,
                self.feedback.clone(),
            );
        }
    }

    fn handle_quit(&mut self, session: &Arc<Session>, reason: DisconnectReason) {
        if self.is_registered(session) {
            self.sessions.remove(session.username());
            info!(
                username = %session.username(),
                connection = %session.id(),
                reason = %reason,
                remaining = self.sessions.len(),
                "User left"
            );
        } else {
            debug!(
                username = %session.username(),
                connection = %session.id(),
                reason = %reason,
                "Quit for unregistered connection"
            );
        }

        self.close_session(session);
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// True if `session` is the entry registered under its username.
    fn is_registered(&self, session: &Session) -> bool {
        self.sessions
            .get(session.username())
            .is_some_and(|registered| registered.id() == session.id())
    }

    /// Closes a session, counting it only the first time.
    fn close_session(&mut self, session: &Session) {
        if session.close() {
            self.stats.sessions_closed += 1;
        }
    }

    fn close_all(&mut self) {
        let sessions: Vec<_> = self.sessions.drain().map(|(_, s)| s).collect();
        for session in sessions {
            debug!(username = %session.username(), "Closing session on shutdown");
            self.close_session(&session);
        }
    }

    fn usernames(&self) -> Vec<Username> {
        let mut names: Vec<_> = self.sessions.keys().cloned().collect();
        names.sort();
        names
    }

    fn snapshot(&self) -> CoordinatorStats {
        CoordinatorStats {
            active_sessions: self.sessions.len(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionId;
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream, Lines};
    use tokio::sync::oneshot;
    use tokio_util::sync::CancellationToken;

    // ========================================================================
    // Test Helpers
    // ========================================================================

    fn test_coordinator() -> (Coordinator, mpsc::Sender<CoordinatorCommand>) {
        let (tx, rx) = mpsc::channel(16);
        let coordinator = Coordinator::new(rx, tx.downgrade(), Duration::from_secs(1));
        (coordinator, tx)
    }

    fn test_session(id: u64, name: &str) -> (Arc<Session>, Lines<BufReader<DuplexStream>>) {
        let (ours, theirs) = tokio::io::duplex(1024);
        let session = Session::new(
            SessionId(id),
            Username::parse(name).unwrap(),
            None,
            ours,
            CancellationToken::new(),
        );
        (Arc::new(session), BufReader::new(theirs).lines())
    }

    async fn next_line(lines: &mut Lines<BufReader<DuplexStream>>) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(1), lines.next_line())
            .await
            .ok()
            .and_then(|r| r.ok())
            .flatten()
    }

    // ========================================================================
    // Login
    // ========================================================================

    #[tokio::test]
    async fn test_login_registers_session() {
        let (mut coordinator, _tx) = test_coordinator();
        let (alice, _out) = test_session(1, "alice");

        coordinator.handle_login(alice);

        assert_eq!(coordinator.usernames(), vec![Username::parse("alice").unwrap()]);
        assert_eq!(coordinator.snapshot().logins_accepted, 1);
    }

    #[tokio::test]
    async fn test_duplicate_login_closes_new_session() {
        let (mut coordinator, _tx) = test_coordinator();
        let (first, _out1) = test_session(1, "alice");
        let (second, _out2) = test_session(2, "alice");

        coordinator.handle_login(first.clone());
        coordinator.handle_login(second.clone());

        assert!(!first.is_closed());
        assert!(second.is_closed());
        assert!(coordinator.is_registered(&first));

        let stats = coordinator.snapshot();
        assert_eq!(stats.active_sessions, 1);
        assert_eq!(stats.logins_rejected, 1);
        assert_eq!(stats.sessions_closed, 1);
    }

    #[tokio::test]
    async fn test_login_of_closed_session_ignored() {
        let (mut coordinator, _tx) = test_coordinator();
        let (alice, _out) = test_session(1, "alice");
        alice.close();

        coordinator.handle_login(alice);

        assert!(coordinator.usernames().is_empty());
        assert_eq!(coordinator.snapshot().logins_accepted, 0);
    }

    // ========================================================================
    // Quit
    // ========================================================================

    #[tokio::test]
    async fn test_quit_removes_and_closes_once() {
        let (mut coordinator, _tx) = test_coordinator();
        let (alice, _out) = test_session(1, "alice");
        coordinator.handle_login(alice.clone());

        coordinator.handle_quit(&alice, DisconnectReason::Quit);
        coordinator.handle_quit(&alice, DisconnectReason::ReadError);

        assert!(alice.is_closed());
        let stats = coordinator.snapshot();
        assert_eq!(stats.active_sessions, 0);
        assert_eq!(stats.sessions_closed, 1);
    }

    #[tokio::test]
    async fn test_quit_from_rejected_duplicate_keeps_original() {
        let (mut coordinator, _tx) = test_coordinator();
        let (original, _out1) = test_session(1, "alice");
        let (duplicate, _out2) = test_session(2, "alice");

        coordinator.handle_login(original.clone());
        coordinator.handle_login(duplicate.clone());
        coordinator.handle_quit(&duplicate, DisconnectReason::Closed);

        assert!(coordinator.is_registered(&original));
        assert!(!original.is_closed());
    }

    // ========================================================================
    // Message fan-out
    // ========================================================================

    #[tokio::test]
    async fn test_message_reaches_others_not_sender() {
        let (mut coordinator, _tx) = test_coordinator();
        let (alice, mut alice_out) = test_session(1, "alice");
        let (bob, mut bob_out) = test_session(2, "bob");
        coordinator.handle_login(alice.clone());
        coordinator.handle_login(bob);

        coordinator.handle_message(&alice, "hello");

        assert_eq!(next_line(&mut bob_out).await.as_deref(), Some("[alice]: hello"));

        let own = tokio::time::timeout(Duration::from_millis(50), alice_out.next_line()).await;
        assert!(own.is_err(), "sender must not receive its own message");

        let stats = coordinator.snapshot();
        assert_eq!(stats.messages_relayed, 1);
        assert_eq!(stats.deliveries_spawned, 1);
    }

    #[tokio::test]
    async fn test_message_from_unregistered_is_dropped() {
        let (mut coordinator, _tx) = test_coordinator();
        let (bob, mut bob_out) = test_session(1, "bob");
        let (stranger, _out) = test_session(2, "carol");
        coordinator.handle_login(bob);

        coordinator.handle_message(&stranger, "sneaky");

        let got = tokio::time::timeout(Duration::from_millis(50), bob_out.next_line()).await;
        assert!(got.is_err());
        assert_eq!(coordinator.snapshot().messages_relayed, 0);
    }

    #[tokio::test]
    async fn test_write_failed_treated_as_quit() {
        let (mut coordinator, _tx) = test_coordinator();
        let (bob, _out) = test_session(1, "bob");
        coordinator.handle_login(bob.clone());

        coordinator.handle_command(CoordinatorCommand::WriteFailed {
            session: bob.clone(),
            error: crate::session::SessionError::WriteTimeout,
        });

        assert!(bob.is_closed());
        let stats = coordinator.snapshot();
        assert_eq!(stats.active_sessions, 0);
        assert_eq!(stats.delivery_failures, 1);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    #[tokio::test]
    async fn test_run_closes_sessions_when_handles_drop() {
        let (coordinator, tx) = test_coordinator();
        let (alice, _out) = test_session(1, "alice");
        let task = tokio::spawn(coordinator.run());

        tx.send(CoordinatorCommand::Login {
            session: alice.clone(),
        })
        .await
        .unwrap();

        let (resp_tx, resp_rx) = oneshot::channel();
        tx.send(CoordinatorCommand::Users { respond_to: resp_tx })
            .await
            .unwrap();
        assert_eq!(resp_rx.await.unwrap().len(), 1);

        drop(tx);
        task.await.unwrap();
        assert!(alice.is_closed());
    }
}
