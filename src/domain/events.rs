//! Payloads published on the hub's two event buses.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Connection, ConnectionId};

/// Inbound text paired with the connection it arrived on.
///
/// Built when the transport delivers a message and handed to every message
/// subscriber. Never stored by the hub.
#[derive(Debug, Clone)]
pub struct MessageEnvelope {
    connection: Arc<Connection>,
    message: Arc<str>,
    received_at: DateTime<Utc>,
}

impl MessageEnvelope {
    /// Pairs `message` with the connection that sent it.
    #[must_use]
    pub fn new(connection: Arc<Connection>, message: impl Into<Arc<str>>) -> Self {
        Self {
            connection,
            message: message.into(),
            received_at: Utc::now(),
        }
    }

    /// The sending connection.
    #[must_use]
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// The opaque message body.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// When the hub received the message.
    #[must_use]
    pub const fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

/// Why a connection left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// The transport reported the session closed.
    Closed,
    /// A send failed and the connection was evicted.
    SendFailed,
    /// Administrative disconnect.
    Removed,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Closed => "closed",
            Self::SendFailed => "send_failed",
            Self::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// Published once per connection when it leaves the registry.
#[derive(Debug, Clone)]
pub struct RemovalEvent {
    connection: Arc<Connection>,
    reason: RemovalReason,
    removed_at: DateTime<Utc>,
}

impl RemovalEvent {
    /// Builds the event for `connection`.
    #[must_use]
    pub fn new(connection: Arc<Connection>, reason: RemovalReason) -> Self {
        Self {
            connection,
            reason,
            removed_at: Utc::now(),
        }
    }

    /// The connection that was removed.
    #[must_use]
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Shorthand for `self.connection().id()`.
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// What triggered the removal.
    #[must_use]
    pub const fn reason(&self) -> RemovalReason {
        self.reason
    }

    /// When the removal happened.
    #[must_use]
    pub const fn removed_at(&self) -> DateTime<Utc> {
        self.removed_at
    }
}
