//! Shared setup for the integration tests: tracing and clients bound to a
//! mock server or a raw listener.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Once;
use std::time::Duration;

use fluent_client::{FluentClient, RequestDefaults};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::MockServer;

static TRACING: Once = Once::new();

/// Initialize tracing once per test binary.
///
/// The level comes from `FLUENT_CLIENT_LOG_LEVEL` and defaults to `error`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let log_level = std::env::var("FLUENT_CLIENT_LOG_LEVEL")
            .unwrap_or_else(|_| "error".to_string())
            .to_lowercase();

        let level = match log_level.as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "info" => tracing::Level::INFO,
            "warn" => tracing::Level::WARN,
            _ => tracing::Level::ERROR,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .try_init();
    });
}

/// Client whose base URL points at `server`, with fixed defaults so that
/// environment overrides cannot leak into assertions.
pub fn client_for(server: &MockServer) -> FluentClient {
    init_tracing();
    FluentClient::with_base_url(reqwest::Client::new(), &server.uri())
        .expect("mock server URI should parse")
        .with_defaults(RequestDefaults::default())
}

/// Serve one connection: send the response headers at once and the JSON
/// `body` only after `delay`.
pub async fn late_body_server(body: &'static str, delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };

        let mut request: Vec<u8> = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
            body.len()
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        let _ = socket.flush().await;

        tokio::time::sleep(delay).await;
        let _ = socket.write_all(body.as_bytes()).await;
    });

    addr
}

/// Client whose base URL points at a raw listener
pub fn client_at(addr: SocketAddr) -> FluentClient {
    init_tracing();
    FluentClient::with_base_url(reqwest::Client::new(), &format!("http://{addr}"))
        .expect("listener address should parse")
        .with_defaults(RequestDefaults::default())
}
