//! Connection and broadcast endpoint handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};

use crate::api::dto::{
    BroadcastResponse, ChatResponse, ConnectionDto, ConnectionListResponse, InitDataRequest,
    MessageRequest, PaginationParams,
};
use crate::app_state::AppState;
use crate::domain::{Connection, ConnectionId};
use crate::error::{ErrorResponse, HubError};

/// `GET /connections` — List live connections.
#[utoipa::path(
    get,
    path = "/api/v1/connections",
    tag = "Connections",
    summary = "List live connections",
    description = "Returns a paginated list of the connections currently believed reachable, oldest first.",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated connection list", body = ConnectionListResponse),
    )
)]
pub async fn list_connections(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let mut connections: Vec<ConnectionDto> = state
        .hub
        .connections()
        .await
        .iter()
        .map(|c| ConnectionDto::from(c.as_ref()))
        .collect();
    connections.sort_by_key(|c| c.opened_at);

    let (connections, pagination) = params.paginate(connections);
    Json(ConnectionListResponse {
        connections,
        pagination,
    })
}

/// `POST /broadcast` — Send a message to every live connection.
///
/// # Errors
///
/// Returns [`HubError::InvalidRequest`] if the message is empty.
#[utoipa::path(
    post,
    path = "/api/v1/broadcast",
    tag = "Connections",
    summary = "Broadcast a message",
    description = "Sends the message to every live connection. Connections whose send fails are evicted and counted.",
    request_body = MessageRequest,
    responses(
        (status = 200, description = "Broadcast attempted", body = BroadcastResponse),
        (status = 400, description = "Empty message", body = ErrorResponse),
    )
)]
pub async fn broadcast(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<impl IntoResponse, HubError> {
    validate_message(&req.message)?;
    let evicted = state.hub.broadcast(&req.message).await;
    let live = state.hub.connection_count().await;
    Ok(Json(BroadcastResponse { evicted, live }))
}

/// `POST /connections/{id}/message` — Send a message to one connection.
///
/// # Errors
///
/// Returns [`HubError::ConnectionNotFound`] if the connection is not live,
/// or [`HubError::InvalidRequest`] if the message is empty.
#[utoipa::path(
    post,
    path = "/api/v1/connections/{id}/message",
    tag = "Connections",
    summary = "Send to one connection",
    description = "Writes one frame to the connection. A failed write evicts it and reports `delivered: false`.",
    params(
        ("id" = uuid::Uuid, Path, description = "Connection UUID"),
    ),
    request_body = MessageRequest,
    responses(
        (status = 200, description = "Send attempted", body = ChatResponse),
        (status = 400, description = "Empty message", body = ErrorResponse),
        (status = 404, description = "Connection not found", body = ErrorResponse),
    )
)]
pub async fn send_to_connection(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<MessageRequest>,
) -> Result<impl IntoResponse, HubError> {
    validate_message(&req.message)?;
    let connection = find_connection(&state, id).await?;
    let delivered = state.hub.chat(&connection, &req.message).await;
    Ok(Json(ChatResponse { delivered }))
}

/// `PUT /connections/{id}/init-data` — Set a connection's init payload.
///
/// # Errors
///
/// Returns [`HubError::ConnectionNotFound`] if the connection is not live,
/// or [`HubError::InitDataAlreadySet`] if a payload was set before.
#[utoipa::path(
    put,
    path = "/api/v1/connections/{id}/init-data",
    tag = "Connections",
    summary = "Set init data",
    description = "Stores the opaque initialization payload. It can be set once per connection.",
    params(
        ("id" = uuid::Uuid, Path, description = "Connection UUID"),
    ),
    request_body = InitDataRequest,
    responses(
        (status = 204, description = "Init data stored"),
        (status = 404, description = "Connection not found", body = ErrorResponse),
        (status = 409, description = "Init data already set", body = ErrorResponse),
    )
)]
pub async fn set_init_data(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<InitDataRequest>,
) -> Result<impl IntoResponse, HubError> {
    let connection = find_connection(&state, id).await?;
    connection.set_init_data(req.value)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /connections/{id}` — Administrative disconnect.
///
/// # Errors
///
/// Returns [`HubError::ConnectionNotFound`] if the connection is not live.
#[utoipa::path(
    delete,
    path = "/api/v1/connections/{id}",
    tag = "Connections",
    summary = "Disconnect a connection",
    description = "Deregisters and closes the connection and emits a removal event.",
    params(
        ("id" = uuid::Uuid, Path, description = "Connection UUID"),
    ),
    responses(
        (status = 204, description = "Connection removed"),
        (status = 404, description = "Connection not found", body = ErrorResponse),
    )
)]
pub async fn remove_connection(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, HubError> {
    let connection = find_connection(&state, id).await?;
    if state.hub.remove(&connection).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        // Lost a race with a close callback or an eviction.
        Err(HubError::ConnectionNotFound(connection.id()))
    }
}

/// Connection routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/connections", get(list_connections))
        .route("/connections/{id}", delete(remove_connection))
        .route("/connections/{id}/message", post(send_to_connection))
        .route("/connections/{id}/init-data", put(set_init_data))
        .route("/broadcast", post(broadcast))
}

async fn find_connection(state: &AppState, id: uuid::Uuid) -> Result<Arc<Connection>, HubError> {
    let id = ConnectionId::from_uuid(id);
    state
        .hub
        .connection(id)
        .await
        .ok_or(HubError::ConnectionNotFound(id))
}

fn validate_message(message: &str) -> Result<(), HubError> {
    if message.is_empty() {
        return Err(HubError::InvalidRequest("message must not be empty".to_string()));
    }
    Ok(())
}
