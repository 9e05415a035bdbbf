//! Robustness tests for the chat server.
//!
//! These tests verify the server handles misbehaving clients without
//! affecting anybody else:
//! - Silent clients and login stalls (timeouts)
//! - Oversized and malformed lines
//! - Unrecognized commands
//! - Rapid connect/disconnect cycles
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

mod common;

use std::time::Duration;

use common::TestServer;
use nanochatd::ServerConfig;
use tokio::time::sleep;

fn short_timeouts() -> ServerConfig {
    ServerConfig {
        login_timeout: Duration::from_millis(300),
        inactivity_timeout: Duration::from_millis(400),
        ..ServerConfig::default()
    }
}

// ============================================================================
// Timeouts
// ============================================================================

#[tokio::test]
async fn test_silent_client_removed_after_inactivity() {
    let server = TestServer::spawn_with(short_timeouts()).await;
    let mut alice = server.login("alice").await;
    let mut bob = server.login("bob").await;

    // Keep alice active while bob stays silent past the deadline.
    for _ in 0..4 {
        sleep(Duration::from_millis(150)).await;
        alice.send_line("KEEPALIVE").await;
    }
    server.wait_for_departure("bob").await;
    assert!(bob.is_closed_by_server().await);

    let mut carol = server.login("carol").await;
    alice.send_line("*after bob").await;
    assert_eq!(carol.recv_line().await.as_deref(), Some("[alice]: after bob"));
    assert_eq!(server.users().await, vec!["alice", "carol"]);

    server.shutdown().await;
}

#[tokio::test]
async fn test_activity_resets_inactivity_timer() {
    let server = TestServer::spawn_with(short_timeouts()).await;
    let mut alice = server.login("alice").await;
    let mut bob = server.login("bob").await;

    for i in 0..5 {
        sleep(Duration::from_millis(200)).await;
        alice.send_line(&format!("*tick {i}")).await;
        bob.send_line("NOOP").await;
        assert_eq!(bob.recv_line().await, Some(format!("[alice]: tick {i}")));
    }

    assert_eq!(server.users().await, vec!["alice", "bob"]);
    server.shutdown().await;
}

#[tokio::test]
async fn test_login_timeout_closes_connection() {
    let server = TestServer::spawn_with(short_timeouts()).await;
    let mut idle = server.connect().await;

    assert!(idle.is_closed_by_server().await);
    assert!(server.users().await.is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_before_username_has_no_effect() {
    let server = TestServer::spawn().await;
    let mut partial = server.connect().await;
    partial.send_raw(b"ali").await;
    drop(partial);

    sleep(Duration::from_millis(100)).await;
    assert!(server.users().await.is_empty());
    let stats = server.coordinator.stats().await.unwrap();
    assert_eq!(stats.logins_accepted, 0);

    server.shutdown().await;
}

// ============================================================================
// Malformed Input
// ============================================================================

#[tokio::test]
async fn test_any_login_line_is_a_username() {
    let server = TestServer::spawn().await;

    let long = "a".repeat(40);
    let mut long_client = server.login(&long).await;
    let mut empty_client = server.login("").await;
    let mut tab_client = server.login("tab\there").await;
    let mut alice = server.login("alice").await;

    let mut users = server.users().await;
    users.sort();
    let mut expected = vec![String::new(), long.clone(), "alice".to_string(), "tab\there".to_string()];
    expected.sort();
    assert_eq!(users, expected);

    empty_client.send_line("*hi").await;
    assert_eq!(alice.recv_line().await.as_deref(), Some("[]: hi"));
    assert_eq!(long_client.recv_line().await.as_deref(), Some("[]: hi"));
    assert_eq!(tab_client.recv_line().await.as_deref(), Some("[]: hi"));

    long_client.send_line("*long").await;
    let expected_line = format!("[{long}]: long");
    assert_eq!(alice.recv_line().await.as_deref(), Some(expected_line.as_str()));

    server.shutdown().await;
}

#[tokio::test]
async fn test_oversized_line_drops_only_that_client() {
    let config = ServerConfig {
        max_line_length: 1024,
        ..ServerConfig::default()
    };
    let server = TestServer::spawn_with(config).await;
    let mut alice = server.login("alice").await;
    let mut bob = server.login("bob").await;

    let mut huge = String::from("*");
    huge.push_str(&"a".repeat(4096));
    bob.send_line(&huge).await;

    assert!(bob.is_closed_by_server().await);
    server.wait_for_departure("bob").await;
    alice.assert_silent().await;

    let mut carol = server.login("carol").await;
    alice.send_line("*fine").await;
    assert_eq!(carol.recv_line().await.as_deref(), Some("[alice]: fine"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_invalid_utf8_drops_client() {
    let server = TestServer::spawn().await;
    let mut mallory = server.login("mallory").await;

    mallory.send_raw(b"*\xff\xfe\n").await;

    assert!(mallory.is_closed_by_server().await);
    server.wait_for_departure("mallory").await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_unknown_commands_ignored() {
    let server = TestServer::spawn().await;
    let mut alice = server.login("alice").await;
    let mut bob = server.login("bob").await;

    for line in ["HELLO", "quit", "QUIT now", "", " *space"] {
        alice.send_line(line).await;
    }
    bob.assert_silent().await;

    alice.send_line("*still connected").await;
    assert_eq!(
        bob.recv_line().await.as_deref(),
        Some("[alice]: still connected")
    );
    assert_eq!(server.users().await, vec!["alice", "bob"]);

    server.shutdown().await;
}

// ============================================================================
// Connection Churn
// ============================================================================

#[tokio::test]
async fn test_rapid_connect_disconnect() {
    let server = TestServer::spawn().await;

    for i in 0..50 {
        let mut client = server.connect().await;
        if i % 2 == 0 {
            client.send_line(&format!("user{i}")).await;
        }
        drop(client);
    }

    let mut alice = server.login("alice").await;
    let mut bob = server.login("bob").await;
    alice.send_line("*survived").await;
    assert_eq!(bob.recv_line().await.as_deref(), Some("[alice]: survived"));

    // Every churned login eventually leaves.
    for i in (0..50).step_by(2) {
        server.wait_for_departure(&format!("user{i}")).await;
    }
    assert_eq!(server.users().await, vec!["alice", "bob"]);

    server.shutdown().await;
}

#[tokio::test]
async fn test_many_concurrent_clients() {
    let server = TestServer::spawn().await;

    let mut clients = Vec::new();
    for i in 0..20 {
        clients.push(server.login(&format!("user{i:02}")).await);
    }

    clients[0].send_line("*broadcast").await;
    for client in clients.iter_mut().skip(1) {
        assert_eq!(
            client.recv_line().await.as_deref(),
            Some("[user00]: broadcast")
        );
    }
    clients[0].assert_silent().await;

    let stats = server.coordinator.stats().await.unwrap();
    assert_eq!(stats.active_sessions, 20);
    assert_eq!(stats.deliveries_spawned, 19);

    server.shutdown().await;
}

#[tokio::test]
async fn test_every_connection_closed_exactly_once() {
    let server = TestServer::spawn_with(short_timeouts()).await;

    let mut quitter = server.login("quitter").await;
    let dropper = server.login("dropper").await;
    let _idler = server.login("idler").await;
    let mut dup = server.connect().await;
    dup.send_line("quitter").await;
    assert!(dup.is_closed_by_server().await);

    quitter.send_line("QUIT").await;
    drop(dropper);

    // The idler times out; everybody else left on their own.
    for name in ["quitter", "dropper", "idler"] {
        server.wait_for_departure(name).await;
    }

    let stats = server.coordinator.stats().await.unwrap();
    assert_eq!(stats.logins_accepted, 3);
    assert_eq!(stats.logins_rejected, 1);
    assert_eq!(stats.sessions_closed, 4);

    server.shutdown().await;
}
