//! nanochat Daemon - Session registry and broadcast server
//!
//! This crate provides the core infrastructure for the chat server:
//! - `coordinator` - Actor that owns the registry of logged-in sessions
//! - `server` - TCP acceptor and per-connection session readers
//! - `delivery` - Per-recipient fan-out tasks
//! - `session` - Shared handle to one logged-in connection
//! - `config` - Timeouts, limits and listen address
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       nanochatd                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐ login/msg/quit ┌──────────────────┐    │
//! │  │ConnectionHandler│───────────────▶│   Coordinator    │    │
//! │  │  (per client)   │   (mpsc)       │ (registry owner) │    │
//! │  └────────▲────────┘                └────────┬─────────┘    │
//! │           │ spawn                            │ spawn        │
//! │  ┌────────┴────────┐                ┌────────▼─────────┐    │
//! │  │   ChatServer    │                │  delivery task   │    │
//! │  │  (TcpListener)  │                │ (per recipient)  │────┼─▶ write-failed
//! │  └─────────────────┘                └──────────────────┘    │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows a panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod coordinator;
pub mod delivery;
pub mod server;
pub mod session;

pub use config::{ConfigError, ServerConfig, SessionLimits};
pub use coordinator::{spawn_coordinator, CoordinatorHandle};
pub use server::{ChatServer, ServerError};
pub use session::{Session, SessionError, SessionId};
