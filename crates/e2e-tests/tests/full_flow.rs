//! Scenario A (spec.md §8) and a pair of its close neighbors, driven end
//! to end: a real rendezvous router (in-process, via salvo's `TestClient`),
//! a real `RelayServer` bound to an ephemeral loopback port, two real
//! `TcpStream`s standing in for the two peers, and a real `Bridge` on one
//! side forwarding to a real local echo listener.

use std::time::Duration;

use burrow_bridge::Bridge;
use burrow_relay::{RelayConfig, RelayServer};
use burrow_rendezvous::{RendezvousConfig, RendezvousState, router};
use burrow_token::TokenSigner;
use salvo::prelude::*;
use salvo::test::TestClient;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const MAC_SECRET: &str = "end-to-end-test-secret-do-not-use-in-prod";

async fn spawn_relay() -> (std::net::SocketAddr, tokio_util::sync::CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = RelayConfig {
        bind_addr: addr.to_string(),
        handshake_timeout_secs: 10,
        pair_timeout_secs: 30,
        janitor_sweep_interval_secs: 1,
        max_session_duration_secs: 4 * 60 * 60,
        tls_cert_path: None,
        tls_key_path: None,
    };
    let server = RelayServer::new(config, TokenSigner::new(MAC_SECRET));
    let cancel = server.cancellation_token();
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });

    (addr, cancel)
}

async fn spawn_relay_with_timeouts(
    handshake_timeout_secs: u64,
    pair_timeout_secs: u64,
    janitor_sweep_interval_secs: u64,
) -> (std::net::SocketAddr, tokio_util::sync::CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = RelayConfig {
        bind_addr: addr.to_string(),
        handshake_timeout_secs,
        pair_timeout_secs,
        janitor_sweep_interval_secs,
        max_session_duration_secs: 4 * 60 * 60,
        tls_cert_path: None,
        tls_key_path: None,
    };
    let server = RelayServer::new(config, TokenSigner::new(MAC_SECRET));
    let cancel = server.cancellation_token();
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });

    (addr, cancel)
}

fn rendezvous_router() -> Router {
    let config = RendezvousConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        mac_secret: MAC_SECRET.to_string(),
        session_ttl_secs: 900,
        rate_limit_idle_horizon_secs: 180,
        rate_limit_sweep_interval_secs: 3600,
        session_janitor_sweep_secs: 3600,
    };
    router(RendezvousState::new(config))
}

async fn dial_and_authenticate(relay_addr: std::net::SocketAddr, session_id: &str, token: &str, role: &str) -> TcpStream {
    let mut socket = TcpStream::connect(relay_addr).await.unwrap();
    let frame = format!("{{\"sessionId\":\"{session_id}\",\"relayToken\":\"{token}\",\"role\":\"{role}\"}}\n");
    socket.write_all(frame.as_bytes()).await.unwrap();

    let mut reply = vec![0u8; 256];
    let n = socket.read(&mut reply).await.unwrap();
    let reply: Value = serde_json::from_slice(&reply[..n]).unwrap();
    assert_eq!(reply["success"], true, "handshake reply: {reply:?}");
    socket
}

#[tokio::test]
async fn happy_path_host_and_joiner_exchange_bytes_through_the_relay() {
    let rendezvous = rendezvous_router();
    let (relay_addr, _cancel) = spawn_relay().await;

    let mut created = TestClient::post("http://127.0.0.1/session/create")
        .send(&rendezvous)
        .await;
    let created: Value = created.take_json().await.unwrap();
    let session_id = created["sessionId"].as_str().unwrap().to_string();
    let code = created["code"].as_str().unwrap().to_string();
    let host_token = created["hostToken"].as_str().unwrap().to_string();

    let mut joined = TestClient::post("http://127.0.0.1/session/join")
        .json(&json!({ "code": code }))
        .send(&rendezvous)
        .await;
    let joined: Value = joined.take_json().await.unwrap();
    let joiner_token = joined["joinToken"].as_str().unwrap().to_string();

    let mut host_socket = dial_and_authenticate(relay_addr, &session_id, &host_token, "host").await;
    let mut joiner_socket = dial_and_authenticate(relay_addr, &session_id, &joiner_token, "joiner").await;

    host_socket.write_all(b"hello").await.unwrap();
    let mut buf = [0u8; 5];
    joiner_socket.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello");

    joiner_socket.write_all(b"world").await.unwrap();
    let mut buf = [0u8; 5];
    host_socket.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"world");

    drop(host_socket);
    drop(joiner_socket);
}

#[tokio::test]
async fn a_forged_relay_token_is_rejected() {
    let rendezvous = rendezvous_router();
    let (relay_addr, _cancel) = spawn_relay().await;

    let mut created = TestClient::post("http://127.0.0.1/session/create")
        .send(&rendezvous)
        .await;
    let created: Value = created.take_json().await.unwrap();
    let session_id = created["sessionId"].as_str().unwrap().to_string();

    let mut socket = TcpStream::connect(relay_addr).await.unwrap();
    let frame = format!("{{\"sessionId\":\"{session_id}\",\"relayToken\":\"forged.token\",\"role\":\"joiner\"}}\n");
    socket.write_all(frame.as_bytes()).await.unwrap();

    let mut reply = vec![0u8; 256];
    let n = socket.read(&mut reply).await.unwrap();
    let reply: Value = serde_json::from_slice(&reply[..n]).unwrap();
    assert_eq!(reply["success"], false);

    // The relay closes the socket right after the failure envelope.
    let mut trailing = [0u8; 1];
    let read_after_close = socket.read(&mut trailing).await.unwrap();
    assert_eq!(read_after_close, 0);
}

/// Drives the peer-side [`Bridge`] against a real local echo listener and a
/// real relay-authenticated socket, exercising spec.md §8 scenario G and
/// property 8 (bridge byte counters).
#[tokio::test]
async fn bridge_forwards_relay_traffic_to_a_local_listener_once_it_appears() {
    let rendezvous = rendezvous_router();
    let (relay_addr, _cancel) = spawn_relay().await;

    let mut created = TestClient::post("http://127.0.0.1/session/create")
        .send(&rendezvous)
        .await;
    let created: Value = created.take_json().await.unwrap();
    let session_id = created["sessionId"].as_str().unwrap().to_string();
    let code = created["code"].as_str().unwrap().to_string();
    let host_token = created["hostToken"].as_str().unwrap().to_string();

    let mut joined = TestClient::post("http://127.0.0.1/session/join")
        .json(&json!({ "code": code }))
        .send(&rendezvous)
        .await;
    let joined: Value = joined.take_json().await.unwrap();
    let joiner_token = joined["joinToken"].as_str().unwrap().to_string();

    // The bridge's own local application, standing in for a real service:
    // a bare echo listener the bridge discovers only after polling starts.
    let local = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let local_port = local.local_addr().unwrap().port();
    tokio::spawn(async move {
        let Ok((mut socket, _)) = local.accept().await else { return };
        let mut buf = vec![0u8; 64];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => {
                    if socket.write_all(&buf[..n]).await.is_err() {
                        return;
                    }
                }
            }
        }
    });

    let bridge = Bridge::new();
    let target: burrow_bridge::LocalTarget = local_port.to_string().parse().unwrap();
    bridge
        .wait_for_local_listener(&target, Duration::from_millis(100), Duration::from_millis(20), Duration::from_secs(2))
        .await
        .unwrap();

    let host_relay_socket = dial_and_authenticate(relay_addr, &session_id, &host_token, "host").await;
    let bridge_for_forward = bridge.clone();
    let forward = tokio::spawn(async move { bridge_for_forward.forward(host_relay_socket, Duration::from_secs(1)).await });

    let mut joiner_socket = dial_and_authenticate(relay_addr, &session_id, &joiner_token, "joiner").await;
    joiner_socket.write_all(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    joiner_socket.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");

    drop(joiner_socket);
    forward.await.unwrap().unwrap();

    assert!(bridge.bytes_in() > 0);
    assert!(bridge.bytes_out() > 0);
}

/// Spec.md §8 scenario E: a peer opens the relay socket and writes nothing.
/// The relay must not wait forever — it closes the connection once
/// `handshake_timeout_secs` elapses, after writing a failure envelope.
#[tokio::test]
async fn handshake_stall_is_closed_within_the_handshake_deadline() {
    let (relay_addr, _cancel) = spawn_relay_with_timeouts(1, 30, 1).await;

    let mut socket = TcpStream::connect(relay_addr).await.unwrap();
    let started = std::time::Instant::now();

    let mut reply = vec![0u8; 256];
    let n = tokio::time::timeout(Duration::from_secs(5), socket.read(&mut reply))
        .await
        .expect("relay should close the stalled handshake well within the outer test timeout")
        .unwrap();
    assert!(
        started.elapsed() >= Duration::from_secs(1),
        "relay closed the connection before its own handshake_timeout_secs elapsed"
    );
    let reply: Value = serde_json::from_slice(&reply[..n]).unwrap();
    assert_eq!(reply["success"], false);

    let mut trailing = [0u8; 1];
    let read_after_close = socket.read(&mut trailing).await.unwrap();
    assert_eq!(read_after_close, 0);
}

/// Spec.md §8 scenario F: the host parks waiting for a peer that never
/// arrives. The janitor must reap its pending connection once
/// `pair_timeout_secs` elapses, closing the socket from the relay side.
#[tokio::test]
async fn an_unpaired_pending_connection_is_reaped_after_the_pair_timeout() {
    let rendezvous = rendezvous_router();
    let (relay_addr, _cancel) = spawn_relay_with_timeouts(10, 1, 1).await;

    let mut created = TestClient::post("http://127.0.0.1/session/create")
        .send(&rendezvous)
        .await;
    let created: Value = created.take_json().await.unwrap();
    let session_id = created["sessionId"].as_str().unwrap().to_string();
    let host_token = created["hostToken"].as_str().unwrap().to_string();

    let mut host_socket = dial_and_authenticate(relay_addr, &session_id, &host_token, "host").await;

    // No joiner ever arrives; the janitor reaps the parked host connection
    // once pair_timeout_secs elapses.
    let mut trailing = [0u8; 1];
    let read_after_reap = tokio::time::timeout(Duration::from_secs(5), host_socket.read(&mut trailing))
        .await
        .expect("janitor should reap the pending connection well within the outer test timeout")
        .unwrap();
    assert_eq!(read_after_reap, 0);
}
