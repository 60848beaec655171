//! Hub configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;

use crate::error::HubError;

/// Path the WebSocket endpoint is mounted at unless overridden.
pub const DEFAULT_WS_PATH: &str = "/websocket/rails";

/// Top-level hub configuration.
///
/// Loaded once at startup via [`HubConfig::from_env`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Route of the WebSocket upgrade endpoint.
    pub ws_path: String,

    /// Capacity of each event bus's channel tap.
    pub event_bus_capacity: usize,

    /// Rebroadcast every inbound message to all connections.
    pub relay_inbound: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            ws_path: DEFAULT_WS_PATH.to_string(),
            event_bus_capacity: 1024,
            relay_inbound: true,
        }
    }
}

impl HubConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Config`] if `LISTEN_ADDR` cannot be parsed as a
    /// [`SocketAddr`] or `HUB_WS_PATH` does not start with `/`.
    pub fn from_env() -> Result<Self, HubError> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| HubError::Config(format!("LISTEN_ADDR: {e}")))?;

        let ws_path = std::env::var("HUB_WS_PATH").unwrap_or_else(|_| DEFAULT_WS_PATH.to_string());
        validate_ws_path(&ws_path)?;

        let event_bus_capacity = parse_env("EVENT_BUS_CAPACITY", 1024_usize).max(1);
        let relay_inbound = parse_env_bool("HUB_RELAY_INBOUND", true);

        Ok(Self {
            listen_addr,
            ws_path,
            event_bus_capacity,
            relay_inbound,
        })
    }
}

fn validate_ws_path(path: &str) -> Result<(), HubError> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(HubError::Config(format!(
            "HUB_WS_PATH must start with '/', got {path:?}"
        )))
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}
