//! The hub: one explicitly constructed owner of all shared state.
//!
//! Construct a [`Hub`] once at startup, wrap it in an `Arc`, and hand it to
//! every connection lifecycle entry point ([`crate::endpoint::Endpoint`])
//! and to application code that wants to push messages.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::HubConfig;
use crate::diagnostics::{DiagnosticSink, Diagnostics};
use crate::domain::{
    Connection, ConnectionId, ConnectionRegistry, EventBus, MessageEnvelope, RemovalEvent,
    RemovalReason, SubscriptionId,
};
use crate::service::BroadcastEngine;
use crate::transport::Transport;

/// Connection registry, message and removal buses, and the send path.
#[derive(Debug)]
pub struct Hub {
    registry: Arc<ConnectionRegistry>,
    messages: EventBus<MessageEnvelope>,
    removals: EventBus<RemovalEvent>,
    engine: BroadcastEngine,
    diagnostics: Diagnostics,
}

impl Hub {
    /// Creates a hub that drops its diagnostics.
    #[must_use]
    pub fn new(config: &HubConfig) -> Self {
        Self::with_diagnostics(config, Diagnostics::disabled())
    }

    /// Creates a hub reporting to `sink`.
    #[must_use]
    pub fn with_sink(config: &HubConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self::with_diagnostics(config, Diagnostics::new(sink))
    }

    /// Creates a hub with an explicit [`Diagnostics`] handle.
    #[must_use]
    pub fn with_diagnostics(config: &HubConfig, diagnostics: Diagnostics) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let messages = EventBus::new("messages", config.event_bus_capacity, diagnostics.clone());
        let removals = EventBus::new("removals", config.event_bus_capacity, diagnostics.clone());
        let engine = BroadcastEngine::new(
            Arc::clone(&registry),
            removals.clone(),
            diagnostics.clone(),
        );
        Self {
            registry,
            messages,
            removals,
            engine,
            diagnostics,
        }
    }

    /// Registers a freshly opened session and returns its connection.
    pub async fn open(&self, transport: Arc<dyn Transport>) -> Arc<Connection> {
        let connection = Arc::new(Connection::new(transport));
        let _ = self.registry.add(Arc::clone(&connection)).await;
        self.diagnostics
            .debug(&format!("connection {} started", connection.id()));
        connection
    }

    /// Publishes inbound `text` from `connection` to message subscribers.
    ///
    /// Returns the number of callbacks that handled it without fault.
    pub fn publish_message(&self, connection: &Arc<Connection>, text: &str) -> usize {
        self.diagnostics.trace(&format!(
            "message from connection {} ({} bytes)",
            connection.id(),
            text.len()
        ));
        self.messages
            .publish(MessageEnvelope::new(Arc::clone(connection), text))
    }

    /// Sends `message` to one connection. See [`BroadcastEngine::chat`].
    pub async fn chat(&self, connection: &Arc<Connection>, message: &str) -> bool {
        self.engine.chat(connection, message).await
    }

    /// Sends `message` to every live connection and returns how many were
    /// evicted. See [`BroadcastEngine::broadcast`].
    pub async fn broadcast(&self, message: &str) -> usize {
        self.engine.broadcast(message).await
    }

    /// Sends `text` back to the connection that produced `envelope`.
    ///
    /// Same contract as [`Self::chat`]: `false` if the sender is gone or the
    /// write failed.
    pub async fn reply(&self, envelope: &MessageEnvelope, text: &str) -> bool {
        self.engine.chat(envelope.connection(), text).await
    }

    /// Administrative disconnect. See [`BroadcastEngine::remove`].
    pub async fn remove(&self, connection: &Arc<Connection>) -> bool {
        self.engine.remove(connection).await
    }

    /// Close-callback path: deregisters without closing the transport.
    pub async fn deregister(&self, connection: &Arc<Connection>) -> bool {
        let removed = self
            .engine
            .deregister(connection, RemovalReason::Closed)
            .await;
        if removed {
            self.diagnostics
                .debug(&format!("connection {} ended", connection.id()));
        }
        removed
    }

    /// Registers a callback for inbound messages.
    pub fn subscribe_messages<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&MessageEnvelope) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.messages.subscribe(callback)
    }

    /// Registers a callback for removals.
    pub fn subscribe_removals<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&RemovalEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.removals.subscribe(callback)
    }

    /// Drops a message subscriber.
    pub fn unsubscribe_messages(&self, id: SubscriptionId) -> bool {
        self.messages.unsubscribe(id)
    }

    /// Drops a removal subscriber.
    pub fn unsubscribe_removals(&self, id: SubscriptionId) -> bool {
        self.removals.unsubscribe(id)
    }

    /// Channel tap on inbound messages.
    #[must_use]
    pub fn message_stream(&self) -> broadcast::Receiver<MessageEnvelope> {
        self.messages.stream()
    }

    /// Channel tap on removals.
    #[must_use]
    pub fn removal_stream(&self) -> broadcast::Receiver<RemovalEvent> {
        self.removals.stream()
    }

    /// Returns `true` while the connection is registered.
    pub async fn is_live(&self, connection: &Connection) -> bool {
        self.registry.contains(connection.id()).await
    }

    /// Looks up a live connection.
    pub async fn connection(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.registry.get(id).await
    }

    /// All live connections.
    pub async fn connections(&self) -> Vec<Arc<Connection>> {
        self.registry.snapshot().await
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.registry.count().await
    }

    /// The diagnostics handle shared by every component.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
