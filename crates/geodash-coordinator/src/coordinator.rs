//! `WorkerCoordinator` - the prefork cold-start protocol (spec §4.G): one master phase that
//! prepares the store before fork, and one worker phase each forked process runs for itself.

use crate::facade::Facade;
use crate::shared_flag::{self, SharedFlag};
use chrono::{DateTime, Utc};
use geodash_core::config::{LayeredConfig, Mode};
use geodash_core::error::{GeodashError, Result};
use geodash_search::InMemoryIndex;
use geodash_store::{open_store, CorpusLoader, GeoStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const STALE_REGION_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Written by the master phase and read by operators/tests; not consumed by the worker
/// phase itself (each worker re-derives its own state from the store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterMarker {
    pub timestamp: DateTime<Utc>,
    pub record_count: u64,
    pub status: String,
}

pub struct WorkerCoordinator;

impl WorkerCoordinator {
    /// Runs once, before fork: ensures the schema exists, imports the corpus if the store is
    /// empty, and records a marker file the deployment tooling can inspect. The store handle
    /// is dropped at the end of this call so the master holds no connections once workers
    /// start opening their own (spec §4.G master phase step 3).
    pub async fn run_master_phase(config: &LayeredConfig, marker_path: &Path) -> Result<MasterMarker> {
        let store = open_store(config).await?;
        store.ensure_schema().await?;

        let mut record_count = store.row_count().await?;
        if record_count == 0 {
            match &config.data_location.value {
                Some(location) => {
                    let loader =
                        CorpusLoader::new(config.data_batch_size.value, config.data_countries.value.clone());
                    let report = loader.load_file(store.as_ref(), Path::new(location)).await?;
                    tracing::info!(
                        rows_seen = report.rows_seen,
                        rows_inserted = report.rows_inserted,
                        rows_rejected = report.rows_rejected,
                        "master phase corpus import complete"
                    );
                    record_count = store.row_count().await?;
                }
                None => {
                    tracing::warn!("store is empty and no data.location is configured; starting with zero rows");
                }
            }
        } else {
            tracing::info!(record_count, "master phase found an existing populated store");
        }

        let marker = MasterMarker { timestamp: Utc::now(), record_count, status: "ready".to_string() };
        write_marker(marker_path, &marker)?;

        if let Some(parent) = marker_path.parent() {
            match shared_flag::sweep_stale(parent, STALE_REGION_MAX_AGE) {
                Ok(removed) if removed > 0 => {
                    tracing::info!(removed, "swept stale coordination flag files");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "stale coordination flag sweep failed"),
            }
        }

        tracing::info!(record_count, "master phase complete, closing master connections");
        Ok(marker)
    }

    /// Runs once per forked worker: opens its own store handle, builds its own
    /// `InMemoryIndex` from a full scan, and assembles the `Facade` the rest of the process
    /// uses (spec §4.G worker phase). Attaches the three coordination flags so collaborators
    /// can observe whether the name/ascii/spatial auxiliaries were already warmed by another
    /// worker, without sharing the index structures themselves across processes. `mode=simple`
    /// (spec §6.3) skips this shared-memory discipline entirely — a simple-mode deployment
    /// runs a single worker with no fan-out to coordinate.
    pub async fn run_worker_phase(config: &LayeredConfig, coordination_dir: &Path) -> Result<Facade<dyn GeoStore>> {
        let store = open_store(config).await?;
        let rows = store.all_cities().await?;
        let enable_spatial = config.database_spatial.value;
        let index = Arc::new(InMemoryIndex::build(rows, enable_spatial));

        if config.mode.value != Mode::Simple {
            let mut name_flag = SharedFlag::attach(coordination_dir, "name_index")?;
            let mut ascii_flag = SharedFlag::attach(coordination_dir, "ascii_index")?;
            let mut spatial_flag = SharedFlag::attach(coordination_dir, "spatial_index")?;
            name_flag.mark_initialized()?;
            ascii_flag.mark_initialized()?;
            if enable_spatial {
                spatial_flag.mark_initialized()?;
            }
        }

        tracing::info!(cities = index.len(), "worker phase built in-memory index");
        Ok(Facade::new(store, index, config))
    }
}

fn write_marker(path: &Path, marker: &MasterMarker) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| GeodashError::ConfigurationError(format!("failed to create {parent:?}: {e}")))?;
    }
    let json = serde_json::to_string_pretty(marker)
        .map_err(|e| GeodashError::ConfigurationError(format!("failed to serialise master marker: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| GeodashError::ConfigurationError(format!("failed to write master marker {path:?}: {e}")))
}

/// Reads a previously written master marker, e.g. for deployment health probes.
pub fn read_marker(path: &Path) -> Result<MasterMarker> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| GeodashError::ConfigurationError(format!("failed to read master marker {path:?}: {e}")))?;
    serde_json::from_str(&content)
        .map_err(|e| GeodashError::ConfigurationError(format!("failed to parse master marker {path:?}: {e}")))
}

#[allow(dead_code)]
fn marker_path_default(base: &Path) -> PathBuf {
    base.join("master_marker.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodash_core::config::LayeredConfig;
    use tempfile::tempdir;

    #[tokio::test]
    async fn master_phase_populates_empty_embedded_store_and_writes_marker() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("geodash.db");
        let csv_path = dir.path().join("cities.csv");
        std::fs::write(
            &csv_path,
            "id,name,ascii_name,country,country_code,lat,lng\n1,Paris,paris,France,FR,48.8566,2.3522\n",
        )
        .unwrap();

        let mut config = LayeredConfig::with_defaults();
        config.database_embedded_path.value = db_path.to_string_lossy().to_string();
        config.data_location.value = Some(csv_path.to_string_lossy().to_string());

        let marker_path = dir.path().join("master_marker.json");
        let marker = WorkerCoordinator::run_master_phase(&config, &marker_path).await.unwrap();

        assert_eq!(marker.record_count, 1);
        assert_eq!(marker.status, "ready");
        assert!(marker_path.exists());

        let reloaded = read_marker(&marker_path).unwrap();
        assert_eq!(reloaded.record_count, 1);
    }

    #[tokio::test]
    async fn worker_phase_builds_index_from_master_populated_store() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("geodash.db");
        let csv_path = dir.path().join("cities.csv");
        std::fs::write(
            &csv_path,
            "id,name,ascii_name,country,country_code,lat,lng\n1,Paris,paris,France,FR,48.8566,2.3522\n",
        )
        .unwrap();

        let mut config = LayeredConfig::with_defaults();
        config.database_embedded_path.value = db_path.to_string_lossy().to_string();
        config.data_location.value = Some(csv_path.to_string_lossy().to_string());

        let marker_path = dir.path().join("master_marker.json");
        WorkerCoordinator::run_master_phase(&config, &marker_path).await.unwrap();

        let coordination_dir = dir.path().join("coord");
        let facade = WorkerCoordinator::run_worker_phase(&config, &coordination_dir).await.unwrap();
        assert_eq!(facade.index().len(), 1);
    }

    #[tokio::test]
    async fn worker_phase_in_simple_mode_skips_shared_flag_files() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("geodash.db");
        let csv_path = dir.path().join("cities.csv");
        std::fs::write(
            &csv_path,
            "id,name,ascii_name,country,country_code,lat,lng\n1,Paris,paris,France,FR,48.8566,2.3522\n",
        )
        .unwrap();

        let mut config = LayeredConfig::with_defaults();
        config.database_embedded_path.value = db_path.to_string_lossy().to_string();
        config.data_location.value = Some(csv_path.to_string_lossy().to_string());
        config.mode.value = Mode::Simple;
        config.apply_mode();

        let marker_path = dir.path().join("master_marker.json");
        WorkerCoordinator::run_master_phase(&config, &marker_path).await.unwrap();

        let coordination_dir = dir.path().join("coord");
        let facade = WorkerCoordinator::run_worker_phase(&config, &coordination_dir).await.unwrap();
        assert_eq!(facade.index().len(), 1);
        assert!(!coordination_dir.exists() || std::fs::read_dir(&coordination_dir).unwrap().next().is_none());
    }
}
