//! Message types carried by protocol lines.

use std::fmt;

/// Prefix marking a client line as a chat message.
pub const MESSAGE_PREFIX: char = '*';

/// Command a client sends to leave gracefully.
pub const QUIT_COMMAND: &str = "QUIT";

/// A line sent by a logged-in client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientLine {
    /// `*<text>`: a chat message for everybody else.
    Message(String),

    /// `QUIT`: graceful disconnect request.
    Quit,

    /// Anything else. The server logs and ignores these.
    Unknown(String),
}

impl ClientLine {
    /// Classifies a received line (already stripped of its terminator).
    pub fn parse(line: &str) -> Self {
        if let Some(text) = line.strip_prefix(MESSAGE_PREFIX) {
            Self::Message(text.to_string())
        } else if line == QUIT_COMMAND {
            Self::Quit
        } else {
            Self::Unknown(line.to_string())
        }
    }

    /// Creates a chat message line.
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }
}

impl fmt::Display for ClientLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(text) => write!(f, "{MESSAGE_PREFIX}{text}"),
            Self::Quit => f.write_str(QUIT_COMMAND),
            Self::Unknown(line) => f.write_str(line),
        }
    }
}

/// A chat message as relayed by the server: `[sender]: text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    /// Username of the author
    pub sender: String,
    /// Message body
    pub text: String,
}

impl ChatLine {
    /// Creates a chat line.
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
        }
    }

    /// Parses a server line.
    ///
    /// Returns `None` if the line does not have the `[sender]: text` shape.
    /// The sender ends at the first `]: `.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('[')?;
        let (sender, text) = rest.split_once("]: ")?;
        Some(Self::new(sender, text))
    }
}

impl fmt::Display for ChatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.sender, self.text)
    }
}
