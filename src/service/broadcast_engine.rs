//! Send path with inline eviction of unreachable connections.

use std::error::Error;
use std::sync::Arc;

use crate::diagnostics::Diagnostics;
use crate::domain::{Connection, ConnectionRegistry, EventBus, RemovalEvent, RemovalReason};

/// Result of one serialized send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendOutcome {
    /// The frame was written.
    Sent,
    /// The connection was not live; the transport was not touched.
    NotLive,
    /// The send failed and this call evicted the connection.
    Evicted,
}

/// Single-target and all-target sends over the [`ConnectionRegistry`].
///
/// Every send follows the same pattern: enter the connection's send lock →
/// re-check membership → write → on failure deregister, close, and publish
/// one [`RemovalEvent`]. Transport failures never escape as errors; callers
/// only see `chat`'s boolean and `broadcast`'s eviction count.
///
/// Removal events are single-fire: only the caller whose registry removal
/// actually removed the entry publishes, so a failed send racing a close
/// callback (or two broadcasts failing on the same connection) yields
/// exactly one event.
#[derive(Debug, Clone)]
pub struct BroadcastEngine {
    registry: Arc<ConnectionRegistry>,
    removals: EventBus<RemovalEvent>,
    diagnostics: Diagnostics,
}

impl BroadcastEngine {
    /// Creates an engine over `registry`, publishing evictions on `removals`.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        removals: EventBus<RemovalEvent>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            registry,
            removals,
            diagnostics,
        }
    }

    /// Sends `message` to one connection.
    ///
    /// Returns `true` only if the frame was written. A connection that is no
    /// longer live yields `false` without touching its transport.
    pub async fn chat(&self, connection: &Arc<Connection>, message: &str) -> bool {
        self.diagnostics
            .debug(&format!("chat request to connection {}", connection.id()));
        let outcome = self.send_serialized(connection, message).await;
        outcome == SendOutcome::Sent
    }

    /// Sends `message` to every connection live at call start.
    ///
    /// Returns the number of connections this call evicted, not the number
    /// of successful sends. One failure never stops delivery to the rest.
    pub async fn broadcast(&self, message: &str) -> usize {
        let targets = self.registry.snapshot().await;
        let mut evicted = 0;
        let mut sent = 0;
        for connection in &targets {
            match self.send_serialized(connection, message).await {
                SendOutcome::Sent => sent += 1,
                SendOutcome::Evicted => evicted += 1,
                SendOutcome::NotLive => {}
            }
        }
        self.diagnostics.debug(&format!(
            "broadcast to {} connections: {sent} sent, {evicted} evicted",
            targets.len()
        ));
        evicted
    }

    /// Administrative disconnect.
    ///
    /// Deregisters the connection, closes its transport (failures are
    /// swallowed), and publishes a [`RemovalReason::Removed`] event if the
    /// connection was still live. Returns `true` if it was.
    pub async fn remove(&self, connection: &Arc<Connection>) -> bool {
        let removed = self.registry.remove(connection.id()).await.is_some();
        {
            // Wait out any send in flight so nothing reaches the peer after
            // this call returns.
            let _guard = connection.lock_sends().await;
            self.close_quietly(connection).await;
        }
        if removed {
            self.publish_removal(connection, RemovalReason::Removed);
        }
        removed
    }

    /// Deregisters a connection without closing its transport, for callers
    /// that already know the session is gone (close callback).
    ///
    /// Publishes a removal event with `reason` if the connection was live.
    pub async fn deregister(&self, connection: &Arc<Connection>, reason: RemovalReason) -> bool {
        let removed = self.registry.remove(connection.id()).await.is_some();
        if removed {
            self.publish_removal(connection, reason);
        }
        removed
    }

    async fn send_serialized(&self, connection: &Arc<Connection>, message: &str) -> SendOutcome {
        let guard = connection.lock_sends().await;
        if !self.registry.contains(connection.id()).await {
            return SendOutcome::NotLive;
        }

        let Err(err) = connection.send_text(message).await else {
            return SendOutcome::Sent;
        };

        let fault: &(dyn Error + 'static) = &err;
        self.diagnostics.error(
            &format!("failed to send message to connection {}", connection.id()),
            Some(fault),
        );
        let removed = self.registry.remove(connection.id()).await.is_some();
        self.close_quietly(connection).await;
        drop(guard);

        if removed {
            self.publish_removal(connection, RemovalReason::SendFailed);
            SendOutcome::Evicted
        } else {
            SendOutcome::NotLive
        }
    }

    async fn close_quietly(&self, connection: &Connection) {
        if let Some(err) = connection.close_quietly().await {
            self.diagnostics.trace(&format!(
                "ignoring close failure on connection {}: {err}",
                connection.id()
            ));
        }
    }

    fn publish_removal(&self, connection: &Arc<Connection>, reason: RemovalReason) {
        self.diagnostics.debug(&format!(
            "connection {} removed ({reason})",
            connection.id()
        ));
        let _ = self
            .removals
            .publish(RemovalEvent::new(Arc::clone(connection), reason));
    }
}
