//! REST API layer: route handlers, DTOs, router composition, and the
//! OpenAPI document.
//!
//! Resource endpoints are mounted under `/api/v1`; `/health` sits at the
//! root.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI description of the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "fanout-hub", description = "WebSocket fan-out hub administration API"),
    paths(
        handlers::system::health_handler,
        handlers::connections::list_connections,
        handlers::connections::broadcast,
        handlers::connections::send_to_connection,
        handlers::connections::set_init_data,
        handlers::connections::remove_connection,
    ),
    components(schemas(crate::error::ErrorResponse, crate::error::ErrorBody)),
    tags(
        (name = "System", description = "Service health"),
        (name = "Connections", description = "Live connections and message fan-out"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}
