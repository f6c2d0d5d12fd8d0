use async_trait::async_trait;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::StreamExt;

use super::AppState;
use crate::dispatch::{Channel, WorkerSession};
use crate::error::ChannelError;

/// HTTP handler that upgrades the connection and runs a worker session on it.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let session = WorkerSession::new(WsChannel::new(socket), state.queue, state.lease);
        // Termination is logged by the session itself.
        let _ = session.run().await;
    })
}

/// A worker channel over an upgraded WebSocket.
///
/// Ping and pong frames are handled below the protocol; a close frame or
/// the end of the stream reads as [`ChannelError::Closed`].
pub struct WsChannel {
    socket: WebSocket,
}

impl WsChannel {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl Channel for WsChannel {
    async fn recv(&mut self) -> Result<String, ChannelError> {
        loop {
            match self.socket.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Message::Binary(bytes))) => {
                    return Ok(String::from_utf8_lossy(&bytes).into_owned());
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    tracing::trace!("control frame skipped");
                }
                Some(Ok(Message::Close(_))) | None => return Err(ChannelError::Closed),
                Some(Err(e)) => return Err(ChannelError::Transport(e.to_string())),
            }
        }
    }

    async fn send(&mut self, payload: &str) -> Result<(), ChannelError> {
        self.socket
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.socket.send(Message::Close(None)).await {
            tracing::debug!(error = %e, "close frame not delivered");
        }
    }
}
