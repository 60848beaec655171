//! # fanout-hub
//!
//! Real-time fan-out hub: tracks live bidirectional connections, delivers
//! inbound messages to interested listeners, and pushes outbound messages
//! to one connection or to all of them, evicting any connection whose send
//! fails.
//!
//! ## Architecture
//!
//! ```text
//! Transport (axum WebSocket, ws/)
//!     │  on_open / on_message / on_close / on_error
//!     ├── Endpoint (endpoint)
//!     │
//!     ├── Hub (hub)
//!     │     ├── ConnectionRegistry (domain/)
//!     │     ├── EventBus<MessageEnvelope>, EventBus<RemovalEvent> (domain/)
//!     │     └── BroadcastEngine (service/)  chat / broadcast / remove
//!     │
//!     └── REST administration (api/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod endpoint;
pub mod error;
pub mod hub;
pub mod server;
pub mod service;
pub mod transport;
pub mod ws;

#[cfg(test)]
pub(crate) mod testing;
