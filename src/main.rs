//! fanout-hub server entry point.
//!
//! Starts the Axum HTTP server with the WebSocket endpoint and the REST
//! administration API.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use fanout_hub::app_state::AppState;
use fanout_hub::config::HubConfig;
use fanout_hub::diagnostics::TracingSink;
use fanout_hub::hub::Hub;
use fanout_hub::server::{build_app, install_relay};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = HubConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, ws_path = %config.ws_path, "starting fanout-hub");

    // Build the hub
    let hub = Arc::new(Hub::with_sink(&config, Arc::new(TracingSink)));
    let diagnostics = hub.diagnostics().clone();
    if config.relay_inbound {
        let _ = install_relay(&hub);
        diagnostics.always("inbound relay enabled");
    }

    // Build router
    let app = build_app(AppState::new(hub), &config.ws_path);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    if let Err(err) = axum::serve(listener, app).await {
        diagnostics.fatal("server stopped", Some(&err));
        return Err(err.into());
    }

    Ok(())
}
