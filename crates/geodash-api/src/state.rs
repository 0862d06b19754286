use geodash_core::config::LayeredConfig;
use geodash_coordinator::Facade;
use geodash_store::ports::GeoStore;
use std::sync::Arc;

/// Handle shared across all routes: one `Facade` per worker process (spec §4.G worker phase),
/// plus the config values the edge-level validation in `handlers` needs (limits, fuzzy
/// enablement, operating mode for `/api/status`).
#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<Facade<dyn GeoStore>>,
    pub config: Arc<LayeredConfig>,
}

impl AppState {
    pub fn new(facade: Arc<Facade<dyn GeoStore>>, config: Arc<LayeredConfig>) -> Self {
        Self { facade, config }
    }
}
