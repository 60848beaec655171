//! Per-connection lifecycle facade driven by the transport layer.
//!
//! The transport layer creates one [`Endpoint`] per accepted session and
//! calls the [`LifecycleCallbacks`] in order: `on_open`, then any number of
//! `on_message` / `on_error`, then `on_close`. Callbacks for one endpoint
//! are never concurrent; different endpoints run concurrently.

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::Connection;
use crate::hub::Hub;
use crate::transport::Transport;

/// Callback surface the transport layer is required to drive.
#[async_trait]
pub trait LifecycleCallbacks: Send {
    /// The transport finished its handshake.
    async fn on_open(&mut self, transport: Arc<dyn Transport>);

    /// A text frame arrived.
    async fn on_message(&mut self, text: &str);

    /// The session ended.
    async fn on_close(&mut self);

    /// The transport hit a protocol or I/O fault. Does not close anything;
    /// the transport is expected to follow up with `on_close`.
    async fn on_error(&mut self, fault: &(dyn Error + Send + Sync + 'static));
}

/// Lifecycle state of an [`Endpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// `on_open` has not happened yet.
    Unopened,
    /// Registered and believed reachable.
    Open,
    /// Closed by the transport or evicted by a failed send.
    Closed,
}

/// One live session's participation in the [`Hub`].
#[derive(Debug)]
pub struct Endpoint {
    hub: Arc<Hub>,
    connection: Option<Arc<Connection>>,
    closed: bool,
}

impl Endpoint {
    /// Creates an unopened endpoint bound to `hub`.
    #[must_use]
    pub fn new(hub: Arc<Hub>) -> Self {
        Self {
            hub,
            connection: None,
            closed: false,
        }
    }

    /// The connection, once opened.
    #[must_use]
    pub fn connection(&self) -> Option<&Arc<Connection>> {
        self.connection.as_ref()
    }

    /// Current state. An open endpoint whose connection was evicted by a
    /// failed send reports [`EndpointState::Closed`].
    pub async fn state(&self) -> EndpointState {
        match &self.connection {
            None if self.closed => EndpointState::Closed,
            None => EndpointState::Unopened,
            Some(_) if self.closed => EndpointState::Closed,
            Some(connection) => {
                if self.hub.is_live(connection).await {
                    EndpointState::Open
                } else {
                    EndpointState::Closed
                }
            }
        }
    }
}

#[async_trait]
impl LifecycleCallbacks for Endpoint {
    async fn on_open(&mut self, transport: Arc<dyn Transport>) {
        if self.connection.is_some() || self.closed {
            self.hub
                .diagnostics()
                .warn("open callback on an endpoint that was already opened", None);
            return;
        }
        self.connection = Some(self.hub.open(transport).await);
    }

    async fn on_message(&mut self, text: &str) {
        let Some(connection) = &self.connection else {
            self.hub
                .diagnostics()
                .warn("dropping message received before open", None);
            return;
        };
        let _ = self.hub.publish_message(connection, text);
    }

    async fn on_close(&mut self) {
        self.closed = true;
        if let Some(connection) = &self.connection {
            let _ = self.hub.deregister(connection).await;
        }
    }

    async fn on_error(&mut self, fault: &(dyn Error + Send + Sync + 'static)) {
        let fault: &(dyn Error + 'static) = fault;
        let id = self
            .connection
            .as_ref()
            .map_or_else(|| "unopened".to_string(), |c| c.id().to_string());
        self.hub
            .diagnostics()
            .error(&format!("transport error on connection {id}"), Some(fault));
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::diagnostics::{DiagnosticSink, Severity};
    use crate::domain::RemovalReason;
    use crate::testing::{MockTransport, RecordingSink};
    use parking_lot::Mutex;

    fn make_hub() -> (Arc<Hub>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let hub = Hub::with_sink(
            &HubConfig::default(),
            Arc::clone(&sink) as Arc<dyn DiagnosticSink>,
        );
        (Arc::new(hub), sink)
    }

    #[tokio::test]
    async fn open_then_close() {
        let (hub, _) = make_hub();
        let mut endpoint = Endpoint::new(Arc::clone(&hub));
        assert_eq!(endpoint.state().await, EndpointState::Unopened);

        endpoint.on_open(MockTransport::new()).await;
        assert_eq!(endpoint.state().await, EndpointState::Open);
        let Some(conn) = endpoint.connection().cloned() else {
            panic!("open endpoint has a connection");
        };
        assert!(hub.is_live(&conn).await);

        endpoint.on_close().await;
        assert_eq!(endpoint.state().await, EndpointState::Closed);
        assert!(!hub.is_live(&conn).await);
    }

    #[tokio::test]
    async fn messages_are_published_with_self() {
        let (hub, _) = make_hub();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let _ = hub.subscribe_messages(move |envelope| {
            log.lock()
                .push((envelope.connection().id(), envelope.message().to_string()));
            Ok(())
        });
        let mut endpoint = Endpoint::new(Arc::clone(&hub));
        endpoint.on_open(MockTransport::new()).await;
        endpoint.on_message("hello").await;

        let Some(conn) = endpoint.connection() else {
            panic!("open endpoint has a connection");
        };
        assert_eq!(*seen.lock(), vec![(conn.id(), "hello".to_string())]);
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_message() {
        let (hub, _) = make_hub();
        let mut endpoint = Endpoint::new(Arc::clone(&hub));
        endpoint.on_open(MockTransport::new()).await;
        endpoint.on_message("hello").await;

        let seen = Arc::new(Mutex::new(0_usize));
        let counter = Arc::clone(&seen);
        let _ = hub.subscribe_messages(move |_| {
            *counter.lock() += 1;
            Ok(())
        });
        assert_eq!(*seen.lock(), 0);
    }

    #[tokio::test]
    async fn error_is_reported_but_does_not_close() {
        let (hub, sink) = make_hub();
        let mut endpoint = Endpoint::new(Arc::clone(&hub));
        endpoint.on_open(MockTransport::new()).await;

        let fault = std::io::Error::other("malformed frame");
        endpoint.on_error(&fault).await;

        assert_eq!(endpoint.state().await, EndpointState::Open);
        assert_eq!(sink.count(Severity::Error), 1);
    }

    #[tokio::test]
    async fn send_failure_then_close_fires_one_removal() {
        let (hub, _) = make_hub();
        let removals = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&removals);
        let _ = hub.subscribe_removals(move |event| {
            log.lock().push(event.reason());
            Ok(())
        });

        let transport = MockTransport::new();
        transport.fail_sends();
        let mut endpoint = Endpoint::new(Arc::clone(&hub));
        endpoint
            .on_open(Arc::clone(&transport) as Arc<dyn Transport>)
            .await;
        let Some(conn) = endpoint.connection().cloned() else {
            panic!("open endpoint has a connection");
        };

        assert!(!hub.chat(&conn, "unreachable").await);
        assert_eq!(endpoint.state().await, EndpointState::Closed);
        endpoint.on_close().await;
        endpoint.on_close().await;

        assert_eq!(*removals.lock(), vec![RemovalReason::SendFailed]);
    }

    #[tokio::test]
    async fn message_before_open_is_dropped() {
        let (hub, sink) = make_hub();
        let hits = Arc::new(Mutex::new(0_usize));
        let counter = Arc::clone(&hits);
        let _ = hub.subscribe_messages(move |_| {
            *counter.lock() += 1;
            Ok(())
        });
        let mut endpoint = Endpoint::new(hub);
        endpoint.on_message("too early").await;

        assert_eq!(*hits.lock(), 0);
        assert_eq!(sink.count(Severity::Warn), 1);
    }
}
