use crate::cli::ServerArgs;
use crate::output;
use geodash_api::router::create_router;
use geodash_api::state::AppState;
use geodash_core::config::LayeredConfig;
use geodash_core::error::GeodashError;
use geodash_coordinator::WorkerCoordinator;
use std::path::PathBuf;
use std::sync::Arc;

pub async fn execute(args: ServerArgs, config: LayeredConfig) -> i32 {
    let coordination_dir = PathBuf::from(".geodash-coordination");
    let marker_path = coordination_dir.join("master_marker.json");

    if let Err(e) = WorkerCoordinator::run_master_phase(&config, &marker_path).await {
        return output::failure(&e);
    }
    let facade = match WorkerCoordinator::run_worker_phase(&config, &coordination_dir).await {
        Ok(f) => Arc::new(f),
        Err(e) => return output::failure(&e),
    };

    let host = args.host.unwrap_or_else(|| "0.0.0.0".to_string());
    let port = args.port.unwrap_or(3001);
    let addr = format!("{host}:{port}");

    let state = Arc::new(AppState::new(facade, Arc::new(config)));
    let app = create_router(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            return output::failure(&GeodashError::ConnectionError(format!(
                "failed to bind {addr}: {e}"
            )))
        }
    };
    tracing::info!(addr = %addr, "listening");

    if let Err(e) = axum::serve(listener, app).await {
        return output::failure(&GeodashError::Uncategorised(e.to_string()));
    }
    0
}
