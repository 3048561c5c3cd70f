//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. The
//! registry sits behind a single async mutex: every room operation runs to
//! completion inside the lock, relays included, which is what gives each room
//! one total order of events.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::services::registry::Registry;

/// Clone is required by Axum; all fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Mutex<Registry>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self { registry: Arc::new(Mutex::new(Registry::new())), config: Arc::new(config) }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// App state with default config and an empty registry.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(ServerConfig::default())
    }
}
