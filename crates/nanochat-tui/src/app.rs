//! Application state for the nanochat client.
//!
//! This module defines the client's state model: connection state, the
//! chat log and the line being typed.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use nanochat_protocol::ChatLine;

/// Maximum number of chat log entries kept in memory.
pub const SCROLLBACK: usize = 500;

/// Prefix shown in front of the user's own messages.
pub const OWN_PREFIX: &str = "<Me:>";

// ============================================================================
// Application State
// ============================================================================

/// Connection state of the client.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AppState {
    /// Connected and logged in.
    Connected,

    /// Connection lost. The client does not reconnect.
    Disconnected {
        /// When the connection was lost.
        since: DateTime<Local>,
        /// Why it was lost.
        reason: String,
    },

    /// Initial connection in progress.
    #[default]
    Connecting,
}

// ============================================================================
// Chat Log
// ============================================================================

/// Who a chat log entry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A message relayed by the server.
    Chat {
        /// Author's username.
        sender: String,
    },
    /// Something the user typed.
    Own,
    /// A client notice or an unparseable server line.
    System,
}

/// One line of the chat log.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    /// When the entry was added.
    pub time: DateTime<Local>,
    /// Where it came from.
    pub kind: EntryKind,
    /// Message body.
    pub text: String,
}

impl ChatEntry {
    fn now(kind: EntryKind, text: impl Into<String>) -> Self {
        Self {
            time: Local::now(),
            kind,
            text: text.into(),
        }
    }

    /// Plain-text rendering, as shown in the log.
    pub fn display_text(&self) -> String {
        match &self.kind {
            EntryKind::Chat { sender } => ChatLine::new(sender.as_str(), self.text.as_str()).to_string(),
            EntryKind::Own => format!("{OWN_PREFIX} {}", self.text),
            EntryKind::System => format!("*** {}", self.text),
        }
    }
}

// ============================================================================
// Application
// ============================================================================

/// Core application state for the chat client.
#[derive(Debug, Clone)]
pub struct App {
    /// Current connection state.
    pub state: AppState,

    /// Server address, as given on the command line.
    pub server: String,

    /// Our username.
    pub username: String,

    /// Chat log, oldest first.
    pub entries: VecDeque<ChatEntry>,

    /// Line being typed.
    pub input: String,

    /// Flag indicating the application should quit.
    pub should_quit: bool,
}

impl App {
    /// Creates a new App in the Connecting state.
    pub fn new(server: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            state: AppState::Connecting,
            server: server.into(),
            username: username.into(),
            entries: VecDeque::new(),
            input: String::new(),
            should_quit: false,
        }
    }

    /// Marks the connection as established.
    pub fn mark_connected(&mut self) {
        self.state = AppState::Connected;
        let notice = format!("Connected to {} as {}", self.server, self.username);
        self.push_system(notice);
    }

    /// Marks the connection as lost.
    pub fn mark_disconnected(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.push_system(format!("Disconnected: {reason}"));
        self.state = AppState::Disconnected {
            since: Local::now(),
            reason,
        };
    }

    pub fn is_connected(&self) -> bool {
        self.state == AppState::Connected
    }

    /// Adds a line received from the server.
    ///
    /// Lines that are not `[sender]: text` are kept verbatim as notices.
    pub fn push_received(&mut self, line: &str) {
        let entry = match ChatLine::parse(line) {
            Some(chat) => ChatEntry::now(EntryKind::Chat { sender: chat.sender }, chat.text),
            None => ChatEntry::now(EntryKind::System, line),
        };
        self.push(entry);
    }

    /// Echoes a message the user sent.
    pub fn push_own(&mut self, text: impl Into<String>) {
        self.push(ChatEntry::now(EntryKind::Own, text));
    }

    /// Adds a client notice.
    pub fn push_system(&mut self, text: impl Into<String>) {
        self.push(ChatEntry::now(EntryKind::System, text));
    }

    fn push(&mut self, entry: ChatEntry) {
        if self.entries.len() >= SCROLLBACK {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    // ========================================================================
    // Input editing
    // ========================================================================

    pub fn insert_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    /// Takes the typed line, leaving the input empty.
    ///
    /// Returns `None` for an empty line.
    pub fn take_input(&mut self) -> Option<String> {
        if self.input.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.input))
    }

    /// Signals that the application should quit.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}
