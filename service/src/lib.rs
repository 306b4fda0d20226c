use config::Config;
use sse::Registry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod config;
pub mod logging;

// Service-level state shared by every request handler
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub registry: Arc<Registry>,
    /// Cancelled once the server starts shutting down; every open stream
    /// watches a child of this token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(app_config: Config) -> Self {
        Self {
            config: app_config,
            registry: Arc::new(Registry::new()),
            shutdown: CancellationToken::new(),
        }
    }
}
