//! WebSocket read loop.
//!
//! Splits the socket, hands the write half to the hub as a
//! [`WsTransport`], and translates read-half frames into
//! [`LifecycleCallbacks`] on an [`Endpoint`].

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::StreamExt;

use super::transport::WsTransport;
use crate::endpoint::{Endpoint, LifecycleCallbacks};
use crate::hub::Hub;

/// Runs the lifecycle of a single WebSocket connection.
///
/// - Text frames become `on_message`.
/// - A read error becomes `on_error`, after which the stream is done.
/// - Close frames, a read error, or end of stream end with `on_close`.
pub async fn run_connection(socket: WebSocket, hub: Arc<Hub>) {
    let (ws_tx, mut ws_rx) = socket.split();
    let mut endpoint = Endpoint::new(hub);
    endpoint.on_open(Arc::new(WsTransport::new(ws_tx))).await;

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => endpoint.on_message(text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                endpoint.on_error(&err).await;
                break;
            }
        }
    }

    endpoint.on_close().await;
}
