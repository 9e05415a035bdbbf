//! nanochatd - line-based chat server
//!
//! Accepts TCP clients, reads a username from each, and relays every chat
//! line to all other logged-in users.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address (0.0.0.0:999, or $NANOCHAT_LISTEN)
//! nanochatd
//!
//! # Listen somewhere else with a shorter idle timeout
//! nanochatd -l 127.0.0.1:4000 --inactivity-timeout 60
//! ```

use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nanochatd::{spawn_coordinator, ChatServer, ServerConfig};

/// nanochat server - relays chat lines between connected users
#[derive(Parser, Debug)]
#[command(name = "nanochatd", version, about)]
struct Args {
    /// Address to listen on (host:port)
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Seconds a new connection has to send its username
    #[arg(long, value_name = "SECS")]
    login_timeout: Option<u64>,

    /// Seconds of silence after which a user is disconnected
    #[arg(long, value_name = "SECS")]
    inactivity_timeout: Option<u64>,

    /// Seconds allowed for delivering one line to a user
    #[arg(long, value_name = "SECS")]
    write_timeout: Option<u64>,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let mut config = ServerConfig::from_env();
        if let Some(addr) = self.listen {
            config = config.with_listen_addr(addr);
        }
        if let Some(secs) = self.login_timeout {
            config.login_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.inactivity_timeout {
            config.inactivity_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.write_timeout {
            config.write_timeout = Duration::from_secs(secs);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(std::env::var("RUST_LOG").ok()))
        .init();

    let config = Args::parse().into_config();
    config.validate().context("Invalid server configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "nanochatd starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let coordinator = spawn_coordinator(&config);
    info!("Coordinator started");

    let server = ChatServer::bind(&config, coordinator.clone(), cancel_token.clone())
        .await
        .with_context(|| format!("Failed to start server on {}", config.listen_addr))?;

    let result = server.run().await;
    cancel_token.cancel();

    if let Some(stats) = coordinator.stats().await {
        info!(
            active = stats.active_sessions,
            logins = stats.logins_accepted,
            rejected = stats.logins_rejected,
            messages = stats.messages_relayed,
            delivery_failures = stats.delivery_failures,
            closed = stats.sessions_closed,
            "Final stats"
        );
    }

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e).context("Server stopped unexpectedly");
    }

    info!("nanochatd stopped");
    Ok(())
}

/// Default log directives when `RUST_LOG` is unset or unparsable.
const DEFAULT_LOG_FILTER: &str = "nanochatd=info,nanochat_protocol=info";

/// `RUST_LOG` wins when it parses; otherwise the crate defaults apply.
fn build_filter(rust_log: Option<String>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
