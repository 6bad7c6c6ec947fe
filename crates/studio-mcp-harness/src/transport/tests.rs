// crates/studio-mcp-harness/src/transport/tests.rs
// ============================================================================
// Module: Stdio Transport Unit Tests
// Description: Unit tests for framing, id sequencing, and failure mapping.
// Purpose: Validate the transport against scripted in-memory peers.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! The child side of each exchange is scripted over `tokio::io::duplex` pipes
//! so every transport failure mode can be produced deterministically.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only framing assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::io::DuplexStream;
use tokio::io::duplex;

use super::StdioTransport;
use super::TransportError;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

type TestTransport = StdioTransport<DuplexStream, BufReader<DuplexStream>>;

/// Child-side halves of the scripted pipes.
struct Peer {
    reader: BufReader<DuplexStream>,
    writer: DuplexStream,
}

impl Peer {
    async fn read_request(&mut self) -> Value {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.expect("peer read");
        serde_json::from_str(&line).expect("request json")
    }

    async fn write_raw(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.expect("peer write");
        self.writer.flush().await.expect("peer flush");
    }
}

fn pipes() -> (TestTransport, Peer) {
    let (client_writer, peer_reader) = duplex(16 * 1024);
    let (peer_writer, client_reader) = duplex(16 * 1024);
    let transport = StdioTransport::new(client_writer, BufReader::new(client_reader));
    let peer = Peer {
        reader: BufReader::new(peer_reader),
        writer: peer_writer,
    };
    (transport, peer)
}

/// Spawns a peer that answers every request with its own id and returns the
/// ids it observed once the client hangs up.
fn spawn_echo_peer(mut peer: Peer) -> tokio::task::JoinHandle<Vec<u64>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        loop {
            let mut line = String::new();
            let bytes = peer.reader.read_line(&mut line).await.unwrap_or(0);
            if bytes == 0 {
                return seen;
            }
            let request: Value = serde_json::from_str(&line).expect("request json");
            let id = request["id"].as_u64().expect("request id");
            seen.push(id);
            let reply = json!({"jsonrpc": "2.0", "id": id, "result": {"echo": request["method"]}});
            peer.write_raw(&format!("{reply}\n")).await;
        }
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn ids_are_issued_sequentially_from_one() {
    let (mut transport, peer) = pipes();
    let echo = spawn_echo_peer(peer);
    for _ in 0 .. 5 {
        let response = transport.send("ping", None).await.expect("response");
        assert_eq!(response.result().unwrap()["echo"], "ping");
    }
    drop(transport);
    let seen = echo.await.expect("echo join");
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn request_is_a_single_json_line() {
    let (mut transport, mut peer) = pipes();
    let pending = tokio::spawn(async move {
        let request = peer.read_request().await;
        peer.write_raw("{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n").await;
        (request, peer)
    });
    transport
        .send("initialize", Some(json!({"protocolVersion": "2024-11-05"})))
        .await
        .expect("response");
    let (request, _peer) = pending.await.expect("peer join");
    assert_eq!(request["jsonrpc"], "2.0");
    assert_eq!(request["id"], 1);
    assert_eq!(request["method"], "initialize");
    assert_eq!(request["params"]["protocolVersion"], "2024-11-05");
}

#[tokio::test]
async fn closed_output_stream_is_a_transport_failure() {
    let (mut transport, peer) = pipes();
    let Peer {
        reader: _reader,
        writer,
    } = peer;
    drop(writer);
    let result = transport.send("tools/list", None).await;
    assert_eq!(result, Err(TransportError::Closed));
    assert_eq!(transport.next_id(), 2);
}

#[tokio::test]
async fn undecodable_line_carries_the_raw_text() {
    let (mut transport, mut peer) = pipes();
    peer.write_raw("this is not json\n").await;
    let result = transport.send("tools/list", None).await;
    match result {
        Err(TransportError::Decode {
            raw, ..
        }) => assert_eq!(raw, "this is not json"),
        other => panic!("expected decode failure, got {other:?}"),
    }
}

#[tokio::test]
async fn response_without_result_or_error_is_a_transport_failure() {
    let (mut transport, mut peer) = pipes();
    peer.write_raw("{\"jsonrpc\":\"2.0\",\"id\":1}\n").await;
    let result = transport.send("tools/list", None).await;
    assert!(matches!(result, Err(TransportError::Decode { .. })));
}

#[tokio::test]
async fn protocol_errors_are_returned_as_responses() {
    let (mut transport, mut peer) = pipes();
    peer.write_raw(
        "{\"jsonrpc\":\"2.0\",\"id\":1,\"error\":{\"code\":-32601,\"message\":\"method not found\"}}\n",
    )
    .await;
    let response = transport.send("bogus/method", None).await.expect("response");
    let error = response.error().expect("error payload");
    assert_eq!(error.code, -32601);
    assert_eq!(transport.transcript()[0].error.as_deref(), Some("json-rpc error -32601: method not found"));
}

#[tokio::test]
async fn notifications_and_stale_responses_are_skipped() {
    let (mut transport, mut peer) = pipes();
    peer.write_raw("{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n").await;
    transport.send("first", None).await.expect("first response");

    peer.write_raw("\n").await;
    peer.write_raw("{\"jsonrpc\":\"2.0\",\"method\":\"notifications/message\",\"params\":{}}\n").await;
    peer.write_raw("{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"late\":true}}\n").await;
    peer.write_raw("{\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"late\":false}}\n").await;
    let response = transport.send("second", None).await.expect("second response");
    assert_eq!(response.id, Some(2));
    assert_eq!(response.result().unwrap()["late"], false);
}

#[tokio::test]
async fn response_for_unsent_request_is_rejected() {
    let (mut transport, mut peer) = pipes();
    peer.write_raw("{\"jsonrpc\":\"2.0\",\"id\":9,\"result\":{}}\n").await;
    let result = transport.send("tools/list", None).await;
    assert_eq!(
        result,
        Err(TransportError::IdMismatch {
            expected: 1,
            actual: 9,
        })
    );
}

#[tokio::test]
async fn stalled_peer_hits_the_response_deadline() {
    let (transport, _peer) = pipes();
    let mut transport = transport.with_response_timeout(Duration::from_millis(50));
    let result = transport.send("tools/list", None).await;
    assert_eq!(
        result,
        Err(TransportError::Timeout {
            method: "tools/list".to_string(),
            after: Duration::from_millis(50),
        })
    );
    assert_eq!(transport.transcript().len(), 1);
    assert!(transport.transcript()[0].response.is_none());
}

#[tokio::test]
async fn partial_line_survives_a_response_deadline() {
    let (transport, mut peer) = pipes();
    let mut transport = transport.with_response_timeout(Duration::from_millis(100));
    peer.write_raw("{\"jsonrpc\":\"2.0\",\"id\":1,").await;
    let first = transport.send("tools/list", None).await;
    assert!(matches!(first, Err(TransportError::Timeout { .. })));

    peer.write_raw("\"result\":{\"late\":true}}\n").await;
    peer.write_raw("{\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"fresh\":true}}\n").await;
    let second = transport.send("tools/list", None).await.expect("second response");
    assert_eq!(second.id, Some(2));
    assert_eq!(second.result().unwrap()["fresh"], true);
}

#[tokio::test]
async fn notify_writes_an_id_less_message() {
    let (mut transport, mut peer) = pipes();
    transport.notify("notifications/initialized", None).await.expect("notify");
    let message = peer.read_request().await;
    assert_eq!(message["method"], "notifications/initialized");
    assert!(message.get("id").is_none());
    assert_eq!(transport.next_id(), 1);
}
