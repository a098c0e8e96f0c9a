//! Shared runtime state for `btsim-daemon`: an `Arc`-handle bundle of the
//! process-wide singletons every axum handler needs.

use std::sync::Arc;

use btsim_account::Registry;
use btsim_config::BtsimConfig;

/// Cloneable (`Arc`-backed) handle shared across all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub config: Arc<BtsimConfig>,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, config: Arc<BtsimConfig>) -> Self {
        Self { registry, config }
    }

    pub fn is_admin(&self, bearer: &str) -> bool {
        !self.config.server.admin_token.is_empty() && bearer == self.config.server.admin_token
    }
}
