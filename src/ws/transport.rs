//! [`Transport`] implementation over an axum WebSocket.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::SinkExt;
use futures_util::stream::SplitSink;
use tokio::sync::Mutex;

use crate::transport::{Transport, TransportError};

/// Write half of an axum WebSocket.
#[derive(Debug)]
pub struct WsTransport {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsTransport {
    /// Wraps the write half of a split socket.
    #[must_use]
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(Message::text(text.to_owned()))
            .await
            .map_err(|e| TransportError::Send(Box::new(e)))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::Close(Box::new(e)))
    }
}
