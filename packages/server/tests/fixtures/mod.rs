//! Test fixtures for integration tests.
//!
//! Starts the server in-process on an ephemeral port and provides WebSocket helpers.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use murmur_server::{
    Collaborators, ServerConfig,
    domain::{GroupId, UserId},
    infrastructure::{
        auth::JwtTokenVerifier,
        repository::{
            InMemoryGroupDirectory, InMemoryMessageStore, InMemoryPresenceRegistry,
            InMemoryProfileStore,
        },
    },
};
use serde_json::Value;
use tokio::{net::TcpListener, sync::oneshot};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub const TEST_SECRET: &str = "integration-test-secret";

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Test server running in the test's runtime
pub struct TestServer {
    addr: SocketAddr,
    pub groups: Arc<InMemoryGroupDirectory>,
    pub store: Arc<InMemoryMessageStore>,
    pub profiles: Arc<InMemoryProfileStore>,
    issuer: JwtTokenVerifier,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start with config overrides applied on top of the test defaults
    pub async fn start_with(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let mut config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: TEST_SECRET.to_string(),
            sweep_interval_secs: 60,
            stale_after_secs: 600,
            heartbeat_interval_secs: 30,
            auth_timeout_secs: 5,
            router_queue_capacity: 1024,
            log_level: "debug".to_string(),
        };
        configure(&mut config);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");

        let groups = Arc::new(InMemoryGroupDirectory::new());
        let store = Arc::new(InMemoryMessageStore::new());
        let profiles = Arc::new(InMemoryProfileStore::new());
        let collaborators = Collaborators {
            registry: Arc::new(InMemoryPresenceRegistry::new(profiles.clone())),
            groups: groups.clone(),
            store: store.clone(),
            verifier: Arc::new(JwtTokenVerifier::new(TEST_SECRET.as_bytes())),
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = murmur_server::serve(listener, &config, collaborators, shutdown).await {
                eprintln!("test server error: {e}");
            }
        });

        Self {
            addr,
            groups,
            store,
            profiles,
            issuer: JwtTokenVerifier::new(TEST_SECRET.as_bytes()),
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn token(&self, user_id: u64, username: &str) -> String {
        self.issuer
            .issue(user_id, username, chrono::Duration::hours(1))
            .expect("Failed to issue token")
    }

    pub fn expired_token(&self, user_id: u64, username: &str) -> String {
        self.issuer
            .issue(user_id, username, chrono::Duration::hours(-1))
            .expect("Failed to issue token")
    }

    pub async fn add_group_member(&self, group_id: u64, user_id: u64) {
        self.groups
            .add_member(
                GroupId::new(group_id).expect("group id"),
                UserId::new(user_id).expect("user id"),
            )
            .await;
    }

    /// Open a WebSocket without authenticating
    pub async fn connect(&self) -> WsStream {
        let (ws, _) = connect_async(self.ws_url())
            .await
            .expect("Failed to connect WebSocket");
        ws
    }

    /// Open a WebSocket, authenticate, and wait for this user's `user_joined`
    pub async fn join(&self, user_id: u64, username: &str) -> WsStream {
        let mut ws = self.connect_authenticated(user_id, username).await;
        let frame = next_frame_of_type(&mut ws, "user_joined").await;
        assert_eq!(frame["user_id"], user_id);
        ws
    }

    /// Open a WebSocket and send the auth frame
    pub async fn connect_authenticated(&self, user_id: u64, username: &str) -> WsStream {
        let mut ws = self.connect().await;
        let auth = serde_json::json!({"type": "auth", "token": self.token(user_id, username)});
        send_text(&mut ws, &auth.to_string()).await;
        ws
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn send_text(ws: &mut WsStream, text: &str) {
    ws.send(Message::text(text))
        .await
        .expect("Failed to send frame");
}

/// Next text frame as JSON, skipping control frames
pub async fn next_frame(ws: &mut WsStream) -> Value {
    let text = next_text(ws).await;
    serde_json::from_str(&text).expect("Frame is not JSON")
}

/// Next raw text frame, skipping control frames
pub async fn next_text(ws: &mut WsStream) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Stream ended")
            .expect("WebSocket error");
        match msg {
            Message::Text(text) => return text.as_str().to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Skip frames until one of the given type arrives
pub async fn next_frame_of_type(ws: &mut WsStream, kind: &str) -> Value {
    loop {
        let frame = next_frame(ws).await;
        if frame["type"] == kind {
            return frame;
        }
    }
}

/// Assert no text frame arrives within `wait`
pub async fn assert_silent(ws: &mut WsStream, wait: Duration) {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        match tokio::time::timeout_at(deadline, ws.next()).await {
            Err(_) => return,
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            Ok(other) => panic!("expected silence, got {other:?}"),
        }
    }
}

/// Wait for the close frame, returning its code
pub async fn expect_close(ws: &mut WsStream) -> Option<u16> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timed out waiting for close");
        match msg {
            Some(Ok(Message::Close(frame))) => return frame.map(|f| u16::from(f.code)),
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return None,
        }
    }
}
