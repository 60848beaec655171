//! Service layer: the send path.
//!
//! [`BroadcastEngine`] owns single-target and all-target sends, serializes
//! sends per connection, and turns failed sends into evictions published on
//! the removal [`super::domain::EventBus`].

pub mod broadcast_engine;

pub use broadcast_engine::BroadcastEngine;
