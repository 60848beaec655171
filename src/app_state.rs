//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::hub::Hub;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The hub every socket and REST call goes through.
    pub hub: Arc<Hub>,
}

impl AppState {
    /// Wraps a shared hub.
    #[must_use]
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }
}
