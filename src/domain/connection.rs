//! One live session as seen by the hub.

use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};

use super::ConnectionId;
use crate::error::HubError;
use crate::transport::{Transport, TransportError};

/// Lifecycle-scoped handle to one transport session.
///
/// A `Connection` may outlive its registry membership: application code can
/// hold an `Arc<Connection>` after it was evicted, and every operation on it
/// stays safe (sends are refused by the engine, the init data stays readable).
pub struct Connection {
    id: ConnectionId,
    transport: Arc<dyn Transport>,
    init_data: OnceLock<String>,
    send_lock: Mutex<()>,
    opened_at: DateTime<Utc>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("init_data", &self.init_data.get())
            .field("opened_at", &self.opened_at)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Wraps `transport` under a fresh identity.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            id: ConnectionId::new(),
            transport,
            init_data: OnceLock::new(),
            send_lock: Mutex::new(()),
            opened_at: Utc::now(),
        }
    }

    /// Identity used for registry membership.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// When the transport reported the session open.
    #[must_use]
    pub const fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Opaque initialization payload, if the application has set one.
    #[must_use]
    pub fn init_data(&self) -> Option<&str> {
        self.init_data.get().map(String::as_str)
    }

    /// Stores the initialization payload.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InitDataAlreadySet`] if a payload was stored
    /// before; the earlier value is kept.
    pub fn set_init_data(&self, value: impl Into<String>) -> Result<(), HubError> {
        self.init_data
            .set(value.into())
            .map_err(|_| HubError::InitDataAlreadySet(self.id))
    }

    /// Enters the per-connection send section.
    pub(crate) async fn lock_sends(&self) -> MutexGuard<'_, ()> {
        self.send_lock.lock().await
    }

    /// Writes one frame. Callers must hold the guard from [`Self::lock_sends`].
    pub(crate) async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.transport.send_text(text).await
    }

    /// Closes the transport, discarding any failure.
    ///
    /// Returns the swallowed error so callers can report it.
    pub(crate) async fn close_quietly(&self) -> Option<TransportError> {
        self.transport.close().await.err()
    }
}
