//! Keyboard input handling for the nanochat client.
//!
//! This module provides event types and handlers for keyboard input,
//! terminal resizing, and events coming from the server connection.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use crate::app::App;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

// ============================================================================
// Event Types
// ============================================================================

/// Events that drive the main loop.
#[derive(Debug, Clone)]
pub enum Event {
    /// Keyboard input from the user.
    Key(KeyEvent),

    /// Terminal window resize event.
    Resize(u16, u16),

    /// A line received from the server.
    Received(String),

    /// The connection to the server was lost.
    Disconnected(String),
}

// ============================================================================
// Client Commands
// ============================================================================

/// Commands sent from the main loop to the chat client task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Send a chat message (without the `*` prefix).
    Send(String),

    /// Send `QUIT` and close the connection.
    Quit,
}

// ============================================================================
// Action Types
// ============================================================================

/// Actions that can result from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action required.
    None,

    /// Quit the application.
    Quit,

    /// Send the typed line.
    Send(String),
}

// ============================================================================
// Input Handler
// ============================================================================

/// Handles a keyboard event and updates application state accordingly.
///
/// # Key Bindings
///
/// | Key          | Action                              |
/// |--------------|-------------------------------------|
/// | `Esc`        | Quit the application                |
/// | `Ctrl+C`     | Quit the application                |
/// | `Enter`      | Send the typed line                 |
/// | `Backspace`  | Delete the last character           |
/// | `Ctrl+U`     | Clear the input line                |
/// | any char     | Append to the input line            |
#[must_use]
pub fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    if key.kind == KeyEventKind::Release {
        return Action::None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => {
                app.quit();
                Action::Quit
            }
            KeyCode::Char('u') => {
                app.clear_input();
                Action::None
            }
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::Esc => {
            app.quit();
            Action::Quit
        }

        KeyCode::Enter => {
            if !app.is_connected() {
                return Action::None;
            }
            match app.take_input() {
                Some(text) => Action::Send(text),
                None => Action::None,
            }
        }

        KeyCode::Backspace => {
            app.backspace();
            Action::None
        }

        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::ALT) => {
            app.insert_char(c);
            Action::None
        }

        _ => Action::None,
    }
}
