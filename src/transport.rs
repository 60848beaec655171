//! Transport capability consumed by the hub.
//!
//! The hub never owns a socket. Whatever layer accepts the connection hands
//! the hub an `Arc<dyn Transport>` that can write one text frame and close
//! the session. [`crate::ws::WsTransport`] is the axum implementation.

use async_trait::async_trait;

/// Boxed error produced by a concrete transport.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures reported by a [`Transport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The session is already closed.
    #[error("transport closed")]
    Closed,

    /// Writing a frame failed (peer gone, network error).
    #[error("send failed: {0}")]
    Send(#[source] BoxError),

    /// Closing the session failed.
    #[error("close failed: {0}")]
    Close(#[source] BoxError),
}

/// Capability to talk to one live session.
///
/// `send_text` is the only suspension point of the send path: callers hold
/// the connection's send lock across it, so implementations never see two
/// overlapping `send_text` calls for the same connection from the hub.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Writes one text frame to the peer.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the frame could not be written.
    async fn send_text(&self, text: &str) -> Result<(), TransportError>;

    /// Closes the session. Callers treat this as best effort.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the close handshake could not be
    /// performed; the hub swallows it.
    async fn close(&self) -> Result<(), TransportError>;
}
