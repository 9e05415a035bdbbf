//! nanochat Protocol - Wire protocol for chat connections
//!
//! This crate provides the line framing and message types shared by the
//! chat server (nanochatd) and the terminal client (nanochat).
//!
//! Every frame is a single UTF-8 line terminated by `\n`:
//!
//! ```text
//! client -> server   alice            first line: the username
//! client -> server   *hello there     chat message
//! client -> server   QUIT             graceful disconnect
//! server -> client   [bob]: hi alice  message relayed from another user
//! ```

pub mod error;
pub mod line;
pub mod message;
pub mod username;

pub use error::ProtocolError;
pub use line::{write_line, ChatLineCodec, LineReader, MAX_LINE_LENGTH};
pub use message::{ChatLine, ClientLine, MESSAGE_PREFIX, QUIT_COMMAND};
pub use username::Username;
