//! Shared helpers for the TCP integration suites.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use nanochatd::{spawn_coordinator, ChatServer, CoordinatorHandle, ServerConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Constants
// ============================================================================

/// How long to wait for a line that should arrive
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to wait before concluding a line will not arrive
pub const SILENCE_WINDOW: Duration = Duration::from_millis(150);

/// Interval between registry polls
const POLL_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Test Server
// ============================================================================

/// Server bound to an ephemeral localhost port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub coordinator: CoordinatorHandle,
    pub cancel_token: CancellationToken,
    pub task: JoinHandle<Result<(), nanochatd::ServerError>>,
}

impl TestServer {
    /// Spawns a server with default timeouts.
    pub async fn spawn() -> Self {
        Self::spawn_with(ServerConfig::default()).await
    }

    /// Spawns a server with `config`, overriding the listen address.
    pub async fn spawn_with(config: ServerConfig) -> Self {
        let config = config.with_listen_addr("127.0.0.1:0");
        let coordinator = spawn_coordinator(&config);
        let cancel_token = CancellationToken::new();

        let server = ChatServer::bind(&config, coordinator.clone(), cancel_token.clone())
            .await
            .expect("bind test server");
        let addr = server.local_addr();
        let task = tokio::spawn(server.run());

        Self {
            addr,
            coordinator,
            cancel_token,
            task,
        }
    }

    /// Opens a raw connection without logging in.
    pub async fn connect(&self) -> TestClient {
        let stream = TcpStream::connect(self.addr).await.expect("connect");
        TestClient::new(stream)
    }

    /// Connects and logs in, waiting until the registry lists `name`.
    pub async fn login(&self, name: &str) -> TestClient {
        let mut client = self.connect().await;
        client.send_line(name).await;
        self.wait_for_user(name).await;
        client
    }

    /// Registered usernames as plain strings.
    pub async fn users(&self) -> Vec<String> {
        self.coordinator
            .users()
            .await
            .into_iter()
            .map(|u| u.as_str().to_string())
            .collect()
    }

    /// Waits until `name` is registered.
    pub async fn wait_for_user(&self, name: &str) {
        self.wait_until(|users| users.iter().any(|u| u == name))
            .await
            .unwrap_or_else(|| panic!("{name} never logged in"));
    }

    /// Waits until `name` is no longer registered.
    pub async fn wait_for_departure(&self, name: &str) {
        self.wait_until(|users| users.iter().all(|u| u != name))
            .await
            .unwrap_or_else(|| panic!("{name} never left"));
    }

    async fn wait_until<F>(&self, predicate: F) -> Option<()>
    where
        F: Fn(&[String]) -> bool,
    {
        timeout(RECV_TIMEOUT, async {
            loop {
                if predicate(&self.users().await) {
                    return;
                }
                sleep(POLL_INTERVAL).await;
            }
        })
        .await
        .ok()
    }

    /// Cancels the server and waits for the accept loop to finish.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        let result = self.task.await.expect("server task");
        assert!(result.is_ok(), "server returned {result:?}");
    }
}

// ============================================================================
// Test Client
// ============================================================================

/// Line-oriented client connection.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Sends `line` plus a newline.
    pub async fn send_line(&mut self, line: &str) {
        self.send_raw(format!("{line}\n").as_bytes()).await;
    }

    /// Sends raw bytes. Errors are ignored, since the server may already
    /// have closed the connection.
    pub async fn send_raw(&mut self, data: &[u8]) {
        let _ = self.writer.write_all(data).await;
        let _ = self.writer.flush().await;
    }

    /// Receives one line, or `None` on EOF, error or timeout.
    pub async fn recv_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match timeout(RECV_TIMEOUT, self.reader.read_line(&mut line)).await {
            Ok(Ok(n)) if n > 0 => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            _ => None,
        }
    }

    /// Asserts that nothing arrives within the silence window.
    pub async fn assert_silent(&mut self) {
        let mut line = String::new();
        let got = timeout(SILENCE_WINDOW, self.reader.read_line(&mut line)).await;
        assert!(got.is_err(), "expected silence, got {got:?} / {line:?}");
    }

    /// Returns `true` if the server closed the connection in time.
    pub async fn is_closed_by_server(&mut self) -> bool {
        let mut buf = String::new();
        loop {
            buf.clear();
            match timeout(RECV_TIMEOUT, self.reader.read_line(&mut buf)).await {
                Ok(Ok(0)) | Ok(Err(_)) => return true,
                Ok(Ok(_)) => continue,
                Err(_) => return false,
            }
        }
    }

    /// Drops the write half, sending FIN, while keeping the read half.
    pub fn into_reader(self) -> BufReader<OwnedReadHalf> {
        self.reader
    }
}
