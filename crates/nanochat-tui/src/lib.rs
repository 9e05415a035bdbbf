//! nanochat TUI - Library modules
//!
//! This library provides the terminal chat client.
//!
//! # Architecture
//!
//! The client uses an event-driven architecture with three main components:
//!
//! 1. **Keyboard Task**: Polls for keyboard input and sends events to the main loop
//! 2. **Chat Client Task**: Owns the server connection, sends typed lines and
//!    forwards received ones
//! 3. **Main Event Loop**: Processes events, updates state, and renders the UI
//!
//! All tasks respect a shared `CancellationToken` for graceful shutdown.

pub mod app;
pub mod client;
pub mod error;
pub mod input;
pub mod ui;

// Re-export commonly used types
pub use app::App;
pub use client::{connect, ChatClient, ClientConfig};
pub use error::{Result, TuiError};
