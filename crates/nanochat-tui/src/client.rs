//! Server connection for the nanochat client.
//!
//! This module provides:
//! - `connect`, which dials the server and sends the username line
//! - `ChatClient`, which owns the connection afterwards: it writes the
//!   user's lines and forwards the server's lines to the event loop
//!
//! There is no reconnection. A lost connection ends the client.
//!
//! **Panic-Free Policy:** No `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()`, or `todo!()`.

use std::time::Duration;

use nanochat_protocol::{write_line, ClientLine, LineReader, ProtocolError, Username};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, TuiError};
use crate::input::{ClientCommand, Event};

/// Time allowed to establish the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for each line written to the server.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(15);

/// Time without any line from the server after which the client gives up.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(5 * 60);

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the chat client.
///
/// # Example
///
/// ```rust
/// use nanochat_tui::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig {
///     connect_timeout: Duration::from_secs(5),
///     ..ClientConfig::new("127.0.0.1:999", "alice")
/// };
/// assert_eq!(config.username, "alice");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server `host:port`.
    pub server: String,

    /// Username sent as the first line.
    pub username: String,

    /// Deadline for the TCP connect.
    pub connect_timeout: Duration,

    /// Deadline for each write.
    pub write_timeout: Duration,

    /// Deadline between two received lines.
    pub inactivity_timeout: Duration,
}

impl ClientConfig {
    /// Configuration with the default timeouts.
    pub fn new(server: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            username: username.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
        }
    }
}

// ============================================================================
// Connect
// ============================================================================

/// Connects to the server and logs in.
///
/// The server gives no login acknowledgement; a rejected username shows up
/// later as the server closing the connection.
///
/// # Errors
///
/// - `TuiError::Protocol` if the username is not valid
/// - `TuiError::ConnectTimeout` / `TuiError::Connect` if dialing fails
/// - `TuiError::WriteTimeout` / `TuiError::Io` if the username cannot be sent
pub async fn connect(config: &ClientConfig) -> Result<TcpStream> {
    let username = Username::parse(&config.username)?;

    let mut stream = match timeout(config.connect_timeout, TcpStream::connect(&config.server)).await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => {
            return Err(TuiError::Connect {
                server: config.server.clone(),
                source,
            })
        }
        Err(_) => {
            return Err(TuiError::ConnectTimeout {
                server: config.server.clone(),
                timeout: config.connect_timeout,
            })
        }
    };

    timeout(config.write_timeout, write_line(&mut stream, username.as_str()))
        .await
        .map_err(|_| TuiError::WriteTimeout)??;

    info!(server = %config.server, username = %username, "Connected");
    Ok(stream)
}

// ============================================================================
// Chat Client
// ============================================================================

/// Owns the server connection once logged in.
///
/// # Example
///
/// ```rust,ignore
/// let stream = connect(&config).await?;
/// let client = ChatClient::from_stream(stream, &config, event_tx, command_rx, cancel_token);
/// tokio::spawn(client.run());
/// ```
pub struct ChatClient<R, W> {
    /// Line reader over the read half.
    reader: LineReader<R>,

    /// Write half.
    writer: W,

    /// Deadline for each write.
    write_timeout: Duration,

    /// Deadline between two received lines.
    inactivity_timeout: Duration,

    /// Channel to send events to the main loop.
    event_tx: mpsc::UnboundedSender<Event>,

    /// Channel to receive commands from the main loop.
    command_rx: mpsc::UnboundedReceiver<ClientCommand>,

    /// Cancellation token for graceful shutdown.
    cancel_token: CancellationToken,
}

impl ChatClient<OwnedReadHalf, OwnedWriteHalf> {
    /// Wraps a connected TCP stream.
    #[must_use]
    pub fn from_stream(
        stream: TcpStream,
        config: &ClientConfig,
        event_tx: mpsc::UnboundedSender<Event>,
        command_rx: mpsc::UnboundedReceiver<ClientCommand>,
        cancel_token: CancellationToken,
    ) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer, config, event_tx, command_rx, cancel_token)
    }
}

impl<R, W> ChatClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a client over an already logged-in stream.
    #[must_use]
    pub fn new(
        reader: R,
        writer: W,
        config: &ClientConfig,
        event_tx: mpsc::UnboundedSender<Event>,
        command_rx: mpsc::UnboundedReceiver<ClientCommand>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            reader: LineReader::new(reader),
            writer,
            write_timeout: config.write_timeout,
            inactivity_timeout: config.inactivity_timeout,
            event_tx,
            command_rx,
            cancel_token,
        }
    }

    /// Runs until the user quits, the token is cancelled or the connection
    /// is lost.
    ///
    /// A lost connection is reported to the main loop as
    /// `Event::Disconnected` before returning.
    ///
    /// # Errors
    ///
    /// Returns why the connection was lost.
    pub async fn run(mut self) -> Result<()> {
        let result = self.process().await;
        if let Err(e) = &result {
            warn!(error = %e, "Connection lost");
            let _ = self.event_tx.send(Event::Disconnected(e.to_string()));
        }
        result
    }

    async fn process(&mut self) -> Result<()> {
        let mut deadline = Instant::now() + self.inactivity_timeout;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    debug!("Chat client shutting down (cancelled)");
                    return Ok(());
                }

                command = self.command_rx.recv() => match command {
                    Some(ClientCommand::Send(text)) => {
                        self.send(&ClientLine::message(text)).await?;
                    }
                    Some(ClientCommand::Quit) => {
                        self.send(&ClientLine::Quit).await?;
                        info!("Sent QUIT");
                        return Ok(());
                    }
                    None => {
                        debug!("Command channel closed");
                        return Ok(());
                    }
                },

                read = timeout_at(deadline, self.reader.read_line()) => {
                    let line = match read {
                        Err(_) => return Err(TuiError::Inactive(self.inactivity_timeout)),
                        Ok(Ok(Some(line))) => line,
                        Ok(Ok(None)) | Ok(Err(ProtocolError::UnterminatedLine { .. })) => {
                            return Err(TuiError::ServerClosed);
                        }
                        Ok(Err(e)) => return Err(e.into()),
                    };

                    deadline = Instant::now() + self.inactivity_timeout;
                    if self.event_tx.send(Event::Received(line)).is_err() {
                        debug!("Event channel closed");
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn send(&mut self, line: &ClientLine) -> Result<()> {
        timeout(self.write_timeout, write_line(&mut self.writer, &line.to_string()))
            .await
            .map_err(|_| TuiError::WriteTimeout)??;
        Ok(())
    }
}
