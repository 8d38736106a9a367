//! Talks raw HTTP to a webhook bound on a loopback port

use smol::Timer;
use smol::future;
use smol::io::{AsyncReadExt, AsyncWriteExt};
use smol::net::TcpStream;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use slidecastd::webhook::Webhook;
use slidecastd::{IndexPolicy, Playlist, Runner, RunnerState};

mod common;

const CONTINUE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

fn request(method: &str, path: &str, body: &str) -> String {
    format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
}

fn split(response: &str) -> (u16, String) {
    let status = response[9..12].parse().expect("no status code");
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

async fn send(addr: SocketAddr, raw: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    split(&response)
}

async fn bind(policy: IndexPolicy, max_body: usize) -> (Arc<Playlist>, Webhook) {
    let playlist = Arc::new(Playlist::new(policy));
    let webhook = Webhook::bind(
        "127.0.0.1:0".parse().unwrap(),
        playlist.clone(),
        Arc::default(),
        max_body,
    )
    .await
    .unwrap();
    (playlist, webhook)
}

/// Runs `client` against a listening webhook, the webhook goes away once the client is done.
async fn against<T>(webhook: &Webhook, client: impl Future<Output = T>) -> T {
    future::or(client, async {
        webhook.listen().await;
        unreachable!("webhook stopped listening")
    })
    .await
}

#[test]
fn managing_playlist() {
    common::setup();
    smol::block_on(async {
        let (playlist, webhook) = bind(IndexPolicy::Sparse, 1 << 20).await;
        let addr = webhook.local_addr().unwrap();
        let png = common::encoded_png();

        against(&webhook, async {
            let body = format!(r#"{{"image": "{png}", "index": 4, "transition_time": 3}}"#);
            assert_eq!(send(addr, &request("POST", "/webhook", &body)).await.0, 200);
            let body = format!(r#"{{"image": "{png}", "index": 9}}"#);
            assert_eq!(send(addr, &request("POST", "/webhook", &body)).await.0, 200);
            assert_eq!(playlist.count().await, 2);

            let (status, body) = send(addr, &request("GET", "/status", "")).await;
            assert_eq!(status, 200);
            let status: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(status["count"], 2);
            assert_eq!(status["policy"], "sparse");
            assert_eq!(status["state"], "waiting");

            assert_eq!(send(addr, &request("DELETE", "/playlist/4", "")).await.0, 200);
            assert_eq!(send(addr, &request("DELETE", "/playlist/4", "")).await.0, 404);
            assert_eq!(playlist.count().await, 1);

            let slide = format!(r#"{{"image": "{png}"}}"#);
            let body = format!("[{slide}, {slide}, {slide}]");
            assert_eq!(send(addr, &request("PUT", "/playlist", &body)).await.0, 200);
            assert_eq!(playlist.count().await, 3);

            assert_eq!(send(addr, &request("DELETE", "/playlist", "")).await.0, 200);
            assert!(playlist.is_empty().await);
        })
        .await;
    });
}

#[test]
fn rejecting_requests() {
    common::setup();
    smol::block_on(async {
        let (playlist, webhook) = bind(IndexPolicy::Dense, 4096).await;
        let addr = webhook.local_addr().unwrap();

        against(&webhook, async {
            assert_eq!(send(addr, &request("GET", "/webhook", "")).await.0, 405);
            assert_eq!(send(addr, &request("GET", "/nowhere", "")).await.0, 404);
            assert_eq!(send(addr, &request("POST", "/webhook", "{")).await.0, 400);
            let body = r#"{"image": "bm90IGFuIGltYWdl", "index": 0}"#;
            assert_eq!(send(addr, &request("POST", "/webhook", body)).await.0, 400);
            assert_eq!(send(addr, "garbage\r\n\r\n").await.0, 400);

            // Oversized bodies are refused before they are read
            let head = "POST /webhook HTTP/1.1\r\nContent-Length: 100000\r\n\r\n";
            assert_eq!(send(addr, head).await.0, 413);
            let head = "POST /webhook HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n";
            assert_eq!(send(addr, head).await.0, 411);
        })
        .await;
        assert!(playlist.is_empty().await);
    });
}

#[test]
fn continuing_expected_body() {
    common::setup();
    smol::block_on(async {
        let (playlist, webhook) = bind(IndexPolicy::Sparse, 1 << 20).await;
        let addr = webhook.local_addr().unwrap();
        let body = format!(r#"{{"image": "{}", "index": 0}}"#, common::encoded_png());

        against(&webhook, async {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let head = format!(
                "POST /webhook HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: {}\r\n\r\n",
                body.len()
            );
            stream.write_all(head.as_bytes()).await.unwrap();
            let mut interim = vec![0; CONTINUE.len()];
            stream.read_exact(&mut interim).await.unwrap();
            assert_eq!(interim, CONTINUE);

            stream.write_all(body.as_bytes()).await.unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            assert_eq!(split(&response).0, 200);
        })
        .await;
        assert_eq!(playlist.count().await, 1);
    });
}

#[test]
fn waking_runner_by_push() {
    common::setup();
    smol::block_on(async {
        let (playlist, webhook) = bind(IndexPolicy::Sparse, 1 << 20).await;
        let addr = webhook.local_addr().unwrap();
        let display = common::Recorder::default();
        let mut runner = Runner::new(playlist, display.clone(), Duration::from_secs(1));
        let state = runner.state();
        let body = format!(r#"{{"image": "{}", "index": 2}}"#, common::encoded_png());

        let client = async {
            Timer::after(Duration::from_millis(100)).await;
            assert_eq!(*state.lock().await, RunnerState::Waiting);
            assert_eq!(send(addr, &request("POST", "/webhook", &body)).await.0, 200);
            // Well within the idle poll, the push itself wakes the runner
            Timer::after(Duration::from_millis(300)).await;
        };
        future::or(against(&webhook, client), async {
            runner.run().await;
            unreachable!("runner stopped")
        })
        .await;

        assert_eq!(display.indices(), [2]);
        assert_eq!(*state.lock().await, RunnerState::Showing(2));
    });
}
