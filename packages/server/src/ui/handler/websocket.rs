//! WebSocket connection handlers.
//!
//! Each connection moves through `Connecting -> AwaitingAuth -> Registered -> Closing -> Closed`.
//! Only `Registered` connections are in the presence registry.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::{sync::mpsc, time::MissedTickBehavior};

use crate::{
    domain::{AuthenticatedUser, ConnectionHandle, ConnectionId, ConnectionIdFactory, ProtocolError},
    infrastructure::dto::websocket::InboundPayload,
    ui::state::AppState,
    usecase::{
        AuthenticateUseCase, ConnectUserUseCase, DisconnectUserUseCase, HandshakeError,
        SendMessageUseCase,
    },
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = ConnectionIdFactory::generate();
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!(%connection_id, "Connection accepted, awaiting auth");

    let user = match await_auth(&mut receiver, &state).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!(%connection_id, "Connection closed before auth");
            return;
        }
        Err(e) => {
            reject(&mut sender, connection_id, &e).await;
            return;
        }
    };
    tracing::debug!(%connection_id, user_id = %user.user_id, "Handshake complete");

    // The handler owns `tx`; the registry only holds a clone, so eviction never closes the socket.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let connect_usecase = ConnectUserUseCase::new(state.registry.clone(), state.publisher.clone());
    connect_usecase
        .execute(&user, ConnectionHandle::new(connection_id, tx.clone()))
        .await;

    // Forward routed frames to this client and keep the connection alive with pings
    let heartbeat_interval = state.heartbeat_interval;
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat.tick().await;
        loop {
            tokio::select! {
                frame = rx.recv() => {
                    let Some(frame) = frame else { break };
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Receive frames from this client and hand them to the router
    let recv_state = state.clone();
    let recv_user = user.clone();
    let mut recv_task = tokio::spawn(async move {
        let send_usecase = SendMessageUseCase::new(recv_state.publisher.clone());
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(%connection_id, error = %e, "WebSocket read failed");
                    break;
                }
            };

            recv_state.registry.touch(recv_user.user_id).await;

            match msg {
                Message::Text(text) => {
                    let payload = InboundPayload::decode(text.as_str());
                    if let Err(e) = send_usecase.execute(&recv_user, payload) {
                        tracing::warn!(
                            %connection_id,
                            user_id = %recv_user.user_id,
                            error = %e,
                            "Dropped inbound message"
                        );
                    }
                }
                Message::Close(_) => {
                    tracing::info!(%connection_id, "Client requested close");
                    break;
                }
                Message::Binary(_) => {
                    tracing::debug!(%connection_id, "Ignoring binary frame");
                }
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    let disconnect_usecase =
        DisconnectUserUseCase::new(state.registry.clone(), state.publisher.clone());
    disconnect_usecase.execute(&user, connection_id).await;
    drop(tx);
    tracing::info!(%connection_id, user_id = %user.user_id, "Connection closed");
}

/// Wait for the auth frame. `Ok(None)` means the client went away first.
async fn await_auth(
    receiver: &mut SplitStream<WebSocket>,
    state: &AppState,
) -> Result<Option<AuthenticatedUser>, HandshakeError> {
    let first = tokio::time::timeout(state.auth_timeout, next_data_frame(receiver))
        .await
        .map_err(|_| ProtocolError::Timeout(state.auth_timeout.as_secs()))?;

    let usecase = AuthenticateUseCase::new(state.verifier.clone());
    match first {
        None => Ok(None),
        Some(Message::Text(text)) => usecase.execute(text.as_str()).map(Some),
        Some(_) => Err(ProtocolError::NotText.into()),
    }
}

/// Next text or binary frame, skipping transport-level ping/pong
async fn next_data_frame(receiver: &mut SplitStream<WebSocket>) -> Option<Message> {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(msg) => return Some(msg),
        }
    }
    None
}

async fn reject(
    sender: &mut SplitSink<WebSocket, Message>,
    connection_id: ConnectionId,
    error: &HandshakeError,
) {
    tracing::warn!(%connection_id, reason = %error, "Handshake rejected");
    let close = CloseFrame {
        code: close_code::POLICY,
        reason: "handshake rejected".into(),
    };
    if let Err(e) = sender.send(Message::Text(error.to_string().into())).await {
        tracing::debug!(%connection_id, error = %e, "Failed to send rejection reason");
        return;
    }
    if let Err(e) = sender.send(Message::Close(Some(close))).await {
        tracing::debug!(%connection_id, error = %e, "Failed to send close frame");
    }
}
