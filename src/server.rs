//! Router assembly and the optional inbound relay.

use std::sync::{Arc, Weak};

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::domain::SubscriptionId;
use crate::hub::Hub;
use crate::ws::handler::ws_handler;

/// Builds the full application router: REST API, the WebSocket endpoint at
/// `ws_path`, and (with the `swagger-ui` feature) the Swagger UI.
pub fn build_app(state: AppState, ws_path: &str) -> Router {
    let router = Router::new()
        .merge(api::build_router())
        .route(ws_path, get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Rebroadcasts every inbound message to all live connections.
///
/// Each message is broadcast on its own task so the publishing socket's
/// read loop is not held up by the fan-out. The subscription holds only a
/// weak reference to the hub.
pub fn install_relay(hub: &Arc<Hub>) -> SubscriptionId {
    let weak: Weak<Hub> = Arc::downgrade(hub);
    hub.subscribe_messages(move |envelope| {
        let Some(hub) = weak.upgrade() else {
            return Ok(());
        };
        let runtime = tokio::runtime::Handle::try_current()?;
        let message = envelope.message().to_owned();
        runtime.spawn(async move {
            let evicted = hub.broadcast(&message).await;
            if evicted > 0 {
                hub.diagnostics()
                    .info(&format!("relay evicted {evicted} unreachable connections"));
            }
        });
        Ok(())
    })
}
