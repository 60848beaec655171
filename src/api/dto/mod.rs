//! Data Transfer Objects for REST request/response serialization.

pub mod common_dto;
pub mod connection_dto;

pub use common_dto::*;
pub use connection_dto::*;
