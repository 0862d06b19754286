use std::path::PathBuf;
use std::sync::Arc;

use geodash_api::config::ApiConfig;
use geodash_api::router::create_router;
use geodash_api::state::AppState;
use geodash_core::config::LayeredConfig;
use geodash_coordinator::WorkerCoordinator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geodash_api=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_config = ApiConfig::from_env();
    let config = LayeredConfig::with_defaults().load_from_env();
    if let Err(e) = config.validate() {
        tracing::error!("invalid configuration: {e}");
        std::process::exit(1);
    }

    let coordination_dir: PathBuf = std::env::var("GEODASH_COORDINATION_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".geodash-coordination"));
    let marker_path = coordination_dir.join("master_marker.json");

    // A single process plays both roles here: master phase runs once at startup, then this
    // process's own worker phase builds the index it will serve from (spec §4.G).
    if let Err(e) = WorkerCoordinator::run_master_phase(&config, &marker_path).await {
        tracing::error!("master phase failed: {e}");
        std::process::exit(1);
    }

    let facade = match WorkerCoordinator::run_worker_phase(&config, &coordination_dir).await {
        Ok(facade) => Arc::new(facade),
        Err(e) => {
            tracing::error!("worker phase failed: {e}");
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(facade, Arc::new(config)));
    let app = create_router(state);

    let addr = api_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app).await.unwrap();
}
