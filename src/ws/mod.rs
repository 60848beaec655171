//! WebSocket layer: the axum adapter that feeds sessions into the hub.
//!
//! The hub itself is transport agnostic; this module is the one place that
//! knows about axum sockets.

pub mod connection;
pub mod handler;
pub mod transport;

pub use transport::WsTransport;
