//! Connection and message DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::PaginationMeta;
use crate::domain::Connection;

/// A live connection as listed by the REST API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConnectionDto {
    /// Connection identifier.
    pub id: uuid::Uuid,
    /// When the session opened.
    pub opened_at: DateTime<Utc>,
    /// Initialization payload, if set.
    pub init_data: Option<String>,
}

impl From<&Connection> for ConnectionDto {
    fn from(connection: &Connection) -> Self {
        Self {
            id: *connection.id().as_uuid(),
            opened_at: connection.opened_at(),
            init_data: connection.init_data().map(str::to_string),
        }
    }
}

/// Page of live connections.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConnectionListResponse {
    /// Connections on this page, oldest first.
    pub connections: Vec<ConnectionDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Body of broadcast and chat requests.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MessageRequest {
    /// Opaque text frame to send.
    pub message: String,
}

/// Body of the init-data request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InitDataRequest {
    /// Opaque initialization payload.
    pub value: String,
}

/// Result of a broadcast.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BroadcastResponse {
    /// Connections evicted because their send failed.
    pub evicted: usize,
    /// Connections still live after the broadcast.
    pub live: usize,
}

/// Result of a single-connection send.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatResponse {
    /// Whether the frame was written.
    pub delivered: bool,
}
