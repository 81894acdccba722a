use std::time::Duration;

use axum::{Router, error_handling::HandleError, http::StatusCode};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage,
};

use murmur_stream::ListenService;

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn spawn_server() -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let service = HandleError::new(ListenService::new(), |err: String| async move {
        (StatusCode::INTERNAL_SERVER_ERROR, err)
    });
    let app = Router::new().route_service("/v1/listen", service);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    (addr, shutdown_tx)
}

async fn connect(addr: std::net::SocketAddr) -> WsClient {
    let url = format!("ws://{addr}/v1/listen?drain_interval_ms=50&poll_interval_ms=5");
    let (ws, _) = connect_async(&url).await.expect("ws connect failed");
    ws
}

fn update_json(tokens: &[&str]) -> String {
    json!({
        "stamp": "2026-08-02T10:00:00Z",
        "token_texts": tokens,
        "token_probs": tokens.iter().map(|_| 0.9).collect::<Vec<f64>>(),
    })
    .to_string()
}

async fn send_text(ws: &mut WsClient, payload: String) {
    ws.send(WsMessage::Text(payload.into()))
        .await
        .expect("ws send failed");
}

/// Read frames until one parses as JSON with the wanted `type`, or time out.
async fn next_of_type(ws: &mut WsClient, wanted: &str) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {wanted}"))
            .expect("ws closed early")
            .expect("ws receive failed");

        if let WsMessage::Text(text) = msg
            && let Ok(v) = serde_json::from_str::<Value>(&text)
            && v.get("type").and_then(|t| t.as_str()) == Some(wanted)
        {
            return v;
        }
    }
}

fn snapshot_words(v: &Value) -> Vec<String> {
    v["transcript"]["words"]
        .as_array()
        .expect("snapshot must carry a word array")
        .iter()
        .map(|w| w.as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn overlapping_updates_merge_into_one_transcript() {
    let (addr, shutdown) = spawn_server().await;
    let mut ws = connect(addr).await;

    send_text(&mut ws, update_json(&[" hello", " world"])).await;
    let first = next_of_type(&mut ws, "Transcript").await;
    assert_eq!(snapshot_words(&first), [" hello", " world"]);

    // Overlaps on "world": nothing duplicates, the tail extends.
    send_text(&mut ws, update_json(&[" world", " again"])).await;
    loop {
        let v = next_of_type(&mut ws, "Transcript").await;
        let words = snapshot_words(&v);
        if words.len() == 3 {
            assert_eq!(words, [" hello", " world", " again"]);
            assert_eq!(v["transcript"]["occ"][1], 2);
            break;
        }
    }

    send_text(&mut ws, json!({"type": "CloseStream"}).to_string()).await;
    let _ = shutdown.send(());
}

#[tokio::test]
async fn malformed_update_is_skipped_and_session_continues() {
    let (addr, shutdown) = spawn_server().await;
    let mut ws = connect(addr).await;

    // Parses as a TokenUpdate but fails validation (probs missing).
    send_text(
        &mut ws,
        json!({
            "stamp": "2026-08-02T10:00:00Z",
            "token_texts": [" bad"],
            "token_probs": [],
        })
        .to_string(),
    )
    .await;

    send_text(&mut ws, update_json(&[" good"])).await;
    let v = next_of_type(&mut ws, "Transcript").await;
    assert_eq!(snapshot_words(&v), [" good"]);

    send_text(&mut ws, json!({"type": "CloseStream"}).to_string()).await;
    let _ = shutdown.send(());
}

#[tokio::test]
async fn listen_session_streams_feedback_and_cancels() {
    let (addr, shutdown) = spawn_server().await;
    let mut ws = connect(addr).await;

    send_text(
        &mut ws,
        json!({"type": "Listen", "max_duration_ms": 60_000}).to_string(),
    )
    .await;

    send_text(&mut ws, update_json(&[" hello", " world"])).await;
    let feedback = next_of_type(&mut ws, "Feedback").await;
    assert_eq!(feedback["transcription"], " hello world");
    assert_eq!(feedback["batch_idx"], 0);

    send_text(&mut ws, update_json(&[" world", " again"])).await;
    let feedback = next_of_type(&mut ws, "Feedback").await;
    // Running concatenation of everything received since the session began.
    assert_eq!(feedback["transcription"], " hello world world again");
    assert_eq!(feedback["batch_idx"], 1);

    send_text(&mut ws, json!({"type": "CancelListen"}).to_string()).await;
    let result = next_of_type(&mut ws, "Result").await;
    assert_eq!(result["cause"], "cancelled");
    assert_eq!(result["info"], "Inference cancelled.");
    let history = result["transcriptions"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1], " hello world world again");

    send_text(&mut ws, json!({"type": "CloseStream"}).to_string()).await;
    let _ = shutdown.send(());
}

#[tokio::test]
async fn listen_session_times_out() {
    let (addr, shutdown) = spawn_server().await;
    let mut ws = connect(addr).await;

    send_text(
        &mut ws,
        json!({"type": "Listen", "max_duration_ms": 150}).to_string(),
    )
    .await;

    let result = next_of_type(&mut ws, "Result").await;
    assert_eq!(result["cause"], "timed_out");
    assert_eq!(result["info"], "Inference timed out.");

    send_text(&mut ws, json!({"type": "CloseStream"}).to_string()).await;
    let _ = shutdown.send(());
}

#[tokio::test]
async fn second_listen_request_is_rejected() {
    let (addr, shutdown) = spawn_server().await;
    let mut ws = connect(addr).await;

    send_text(
        &mut ws,
        json!({"type": "Listen", "max_duration_ms": 60_000}).to_string(),
    )
    .await;
    send_text(
        &mut ws,
        json!({"type": "Listen", "max_duration_ms": 60_000}).to_string(),
    )
    .await;

    let err = next_of_type(&mut ws, "Error").await;
    assert_eq!(err["error_message"], "listen session already active");

    send_text(&mut ws, json!({"type": "CloseStream"}).to_string()).await;
    let _ = shutdown.send(());
}

#[tokio::test]
async fn closing_with_active_listen_yields_success_result() {
    let (addr, shutdown) = spawn_server().await;
    let mut ws = connect(addr).await;

    send_text(
        &mut ws,
        json!({"type": "Listen", "max_duration_ms": 60_000}).to_string(),
    )
    .await;
    send_text(&mut ws, update_json(&[" hello"])).await;
    let _ = next_of_type(&mut ws, "Feedback").await;

    send_text(&mut ws, json!({"type": "CloseStream"}).to_string()).await;
    let result = next_of_type(&mut ws, "Result").await;
    assert_eq!(result["cause"], "succeeded");
    assert_eq!(result["info"], "Inference succeeded.");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn non_websocket_request_is_rejected() {
    let (addr, shutdown) = spawn_server().await;

    let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let (mut read, mut write) = stream.into_split();

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    write
        .write_all(b"GET /v1/listen HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    read.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 400"));

    let _ = shutdown.send(());
}
