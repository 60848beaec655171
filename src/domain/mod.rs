//! Domain layer: connection identity, the live registry, and event buses.
//!
//! Everything here is transport agnostic. The registry and the two buses
//! are the only shared mutable state of the hub.

pub mod connection;
pub mod connection_id;
pub mod event_bus;
pub mod events;
pub mod registry;

pub use connection::Connection;
pub use connection_id::ConnectionId;
pub use event_bus::{EventBus, SubscriptionId};
pub use events::{MessageEnvelope, RemovalEvent, RemovalReason};
pub use registry::ConnectionRegistry;
