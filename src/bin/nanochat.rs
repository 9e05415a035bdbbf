//! nanochat - terminal chat client
//!
//! Connects to a nanochat server, logs in with the given username and shows
//! the conversation in a full-screen terminal UI.
//!
//! # Usage
//!
//! ```text
//! nanochat 127.0.0.1:999 alice
//! ```
//!
//! Type a line and press Enter to send it. Esc or Ctrl+C quits.

use std::fs::{self, OpenOptions};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event as CrosstermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use nanochat_tui::app::{App, AppState};
use nanochat_tui::client::{connect, ChatClient, ClientConfig};
use nanochat_tui::error::{Result as TuiResult, TuiError};
use nanochat_tui::input::{handle_key_event, Action, ClientCommand, Event};
use nanochat_tui::ui;

// ============================================================================
// CLI Arguments
// ============================================================================

/// nanochat - terminal chat client
#[derive(Parser, Debug)]
#[command(name = "nanochat")]
#[command(about = "Chat with other users on a nanochat server")]
#[command(version)]
struct Args {
    /// Server address (host:port)
    server: String,

    /// Username to log in with
    username: String,
}

// ============================================================================
// Terminal Setup / Cleanup
// ============================================================================

/// Initializes the terminal for TUI rendering.
///
/// Sets up raw mode and the alternate screen buffer.
fn setup_terminal() -> TuiResult<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| TuiError::TerminalInit(e.to_string()))
}

/// Restores the terminal to its original state.
///
/// This should always be called before exiting, even on error.
fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> TuiResult<()> {
    disable_raw_mode().map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    terminal
        .show_cursor()
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    Ok(())
}

// ============================================================================
// Keyboard Input Task
// ============================================================================

/// Spawns a task that polls for keyboard input and sends events to the channel.
///
/// crossterm's polling is synchronous, so each poll runs under
/// `spawn_blocking` with a short timeout to allow cancellation checks.
fn spawn_keyboard_task(
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if cancel_token.is_cancelled() {
                debug!("Keyboard task shutting down");
                break;
            }

            let poll_result = tokio::task::spawn_blocking(|| {
                if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            })
            .await;

            match poll_result {
                Ok(Some(CrosstermEvent::Key(key))) => {
                    if event_tx.send(Event::Key(key)).is_err() {
                        debug!("Event channel closed, keyboard task exiting");
                        break;
                    }
                }
                Ok(Some(CrosstermEvent::Resize(width, height))) => {
                    if event_tx.send(Event::Resize(width, height)).is_err() {
                        break;
                    }
                }
                Ok(Some(_)) | Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Keyboard polling task panicked");
                    break;
                }
            }
        }
    })
}

// ============================================================================
// Main Event Loop
// ============================================================================

/// Runs the main TUI event loop until the user quits.
///
/// A lost connection does not end the loop: the app shows the disconnected
/// state and waits for the user to quit.
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
    command_tx: &mpsc::UnboundedSender<ClientCommand>,
) -> Result<()> {
    // Redraw at least this often so timestamps stay fresh.
    let tick_rate = Duration::from_millis(250);

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        match tokio::time::timeout(tick_rate, event_rx.recv()).await {
            Ok(Some(Event::Key(key))) => match handle_key_event(key, app) {
                Action::Quit => {
                    info!("User requested quit");
                    break;
                }
                Action::Send(text) => {
                    if command_tx.send(ClientCommand::Send(text.clone())).is_err() {
                        warn!("Failed to send message - client task has stopped");
                    } else {
                        app.push_own(text);
                    }
                }
                Action::None => {}
            },
            Ok(Some(Event::Resize(_, _))) => {
                debug!("Terminal resized");
            }
            Ok(Some(Event::Received(line))) => {
                app.push_received(&line);
            }
            Ok(Some(Event::Disconnected(reason))) => {
                warn!(reason = %reason, "Disconnected from server");
                app.mark_disconnected(reason);
            }
            Ok(None) => {
                warn!("Event channel closed");
                break;
            }
            Err(_) => {}
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

// ============================================================================
// Logging Setup
// ============================================================================

/// Returns the log file path under the user's state directory.
fn log_file_path() -> Option<PathBuf> {
    dirs::state_dir().map(|dir| dir.join("nanochat").join("nanochat.log"))
}

/// Opens the log file in append mode, creating its directory.
///
/// Returns `None` if any step fails (logging will be disabled). Warnings go
/// to stderr before the TUI takes over the terminal.
fn create_log_file() -> Option<std::fs::File> {
    let log_path = log_file_path()?;

    if let Some(dir) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("Warning: Failed to create log directory {dir:?}: {e}");
            return None;
        }
    }

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Warning: Failed to open log file {log_path:?}: {e}");
            None
        }
    }
}

fn init_logging() {
    match create_log_file() {
        Some(file) => {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nanochat=info,nanochat_tui=info"));

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("off"))
                .init();
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    info!(server = %args.server, username = %args.username, "nanochat starting");

    // Connect before touching the terminal so failures print normally.
    let config = ClientConfig::new(args.server, args.username);
    let stream = connect(&config)
        .await
        .with_context(|| format!("Could not log in to {}", config.server))?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let (command_tx, command_rx) = mpsc::unbounded_channel::<ClientCommand>();
    let cancel_token = CancellationToken::new();

    let mut terminal = match setup_terminal() {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to initialize terminal");
            return Err(e.into());
        }
    };

    let mut app = App::new(config.server.clone(), config.username.clone());
    app.mark_connected();

    let chat_client = ChatClient::from_stream(
        stream,
        &config,
        event_tx.clone(),
        command_rx,
        cancel_token.clone(),
    );
    let client_handle = tokio::spawn(chat_client.run());

    let keyboard_handle = spawn_keyboard_task(event_tx, cancel_token.clone());

    let result = run_event_loop(&mut terminal, &mut app, &mut event_rx, &command_tx).await;

    // Say goodbye while the connection is still up.
    if app.is_connected() && command_tx.send(ClientCommand::Quit).is_ok() {
        let _ = tokio::time::timeout(config.write_timeout, client_handle).await;
    } else {
        client_handle.abort();
    }

    cancel_token.cancel();
    let _ = tokio::time::timeout(Duration::from_millis(100), keyboard_handle).await;

    if let Err(e) = cleanup_terminal(&mut terminal) {
        error!(error = %e, "Failed to cleanup terminal");
    }

    info!("nanochat stopped");

    result?;
    if let AppState::Disconnected { reason, .. } = &app.state {
        bail!("Connection lost: {reason}");
    }
    Ok(())
}
