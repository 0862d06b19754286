//! `Facade` (component H): presents the operations of §4 to the HTTP and CLI collaborators,
//! owning the lifecycle of `GeoStore`, `InMemoryIndex`, `SearchEngine`, `GeoEngine`, and
//! `RegionEngine` for one worker process.

use geodash_core::config::LayeredConfig;
use geodash_core::error::Result;
use geodash_core::City;
use geodash_search::{CityWithDistance, GeoEngine, InMemoryIndex, RankedCityResult, RegionEngine, SearchEngine, SearchParams};
use geodash_store::ports::BackendKind;
use geodash_store::GeoStore;
use std::sync::Arc;
use std::time::Duration;

pub struct Facade<S: GeoStore + ?Sized> {
    store: Arc<S>,
    index: Arc<InMemoryIndex>,
    search_engine: SearchEngine<S>,
    geo_engine: GeoEngine,
    region_engine: RegionEngine<S>,
}

impl<S: GeoStore + ?Sized> Facade<S> {
    pub fn new(store: Arc<S>, index: Arc<InMemoryIndex>, config: &LayeredConfig) -> Self {
        let search_engine = SearchEngine::new(
            store.clone(),
            config.cache_size.value,
            config.cache_enabled.value,
            Duration::from_secs(config.cache_ttl_secs.value),
            config.database_fts.value,
            config.location_aware_enabled.value,
            config.location_aware_distance_weight.value,
            config.location_aware_country_boost.value,
        );
        let region_engine = RegionEngine::new(store.clone());

        Self { store, index, search_engine, geo_engine: GeoEngine::new(), region_engine }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn index(&self) -> &InMemoryIndex {
        &self.index
    }

    /// `GET /api/cities/search` (spec §6.1).
    pub async fn search(&self, params: &SearchParams) -> Result<Vec<RankedCityResult>> {
        self.search_engine.search(&self.index, params).await
    }

    /// `GET /api/city/{id}`: checks the in-memory index first, falling back to the store for
    /// ids inserted since this worker's index was built (spec §6.1).
    pub async fn get_city(&self, id: u32) -> Result<Option<City>> {
        if let Some(city) = self.index.get(id) {
            return Ok(Some(city.clone()));
        }
        self.store.get_by_id(id).await
    }

    /// `GET /api/cities/coordinates` (spec §6.1).
    pub fn find_by_coordinates(&self, lat: f64, lng: f64, radius_km: f64) -> Result<Vec<CityWithDistance>> {
        self.geo_engine.find_by_coordinates(&self.index, lat, lng, radius_km)
    }

    /// `GET /api/countries` (spec §6.1).
    pub async fn get_countries(&self) -> Result<Vec<String>> {
        self.region_engine.get_countries().await
    }

    /// `GET /api/states` (spec §6.1).
    pub async fn get_states(&self, country: &str) -> Result<Vec<String>> {
        self.region_engine.get_states(country).await
    }

    /// `GET /api/cities/state` (spec §6.1).
    pub async fn get_cities_in_state(&self, state: &str, country: &str) -> Result<Vec<City>> {
        self.region_engine.get_cities_in_state(state, country).await
    }

    /// `GET /api/status`: backend kind and row count (spec §10 supplement,
    /// `{backend, row_count, mode}`).
    pub async fn status(&self) -> Result<(BackendKind, u64)> {
        let row_count = self.store.row_count().await?;
        Ok((self.store.backend_kind(), row_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use geodash_store::ports::{CityCandidate, RankedCity};

    struct StubStore {
        rows: Vec<City>,
    }

    #[async_trait]
    impl GeoStore for StubStore {
        fn backend_kind(&self) -> BackendKind {
            BackendKind::EmbeddedFile
        }
        async fn ensure_schema(&self) -> Result<()> {
            Ok(())
        }
        async fn row_count(&self) -> Result<u64> {
            Ok(self.rows.len() as u64)
        }
        async fn bulk_insert(&self, _rows: &[City]) -> Result<u64> {
            Ok(0)
        }
        async fn delete_where_country_not_in(&self, _allowed: &[String]) -> Result<u64> {
            Ok(0)
        }
        async fn get_by_id(&self, id: u32) -> Result<Option<City>> {
            Ok(self.rows.iter().find(|c| c.id == id).cloned())
        }
        async fn text_search(
            &self,
            _query: &str,
            _limit: usize,
            _country: Option<&str>,
            _user_lat: Option<f64>,
            _user_lng: Option<f64>,
        ) -> Result<Vec<RankedCity>> {
            Ok(Vec::new())
        }
        async fn radius_search(&self, _lat: f64, _lng: f64, _radius_km: f64) -> Result<Vec<CityCandidate>> {
            Ok(Vec::new())
        }
        async fn distinct_countries(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn distinct_states(&self, _country: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn cities_in_state(&self, _state: &str, _country: &str) -> Result<Vec<City>> {
            Ok(Vec::new())
        }
        async fn all_cities(&self) -> Result<Vec<City>> {
            Ok(self.rows.clone())
        }
    }

    fn city(id: u32, name: &str) -> City {
        City {
            id,
            name: name.to_string(),
            ascii_name: geodash_core::ascii_fold(name),
            country: "GB".to_string(),
            country_code: "GB".to_string(),
            state: None,
            state_code: None,
            lat: 51.5,
            lng: -0.1,
            population: None,
            timezone: None,
            geonames_id: None,
        }
    }

    #[tokio::test]
    async fn get_city_falls_back_to_store_when_absent_from_index() {
        let store = Arc::new(StubStore { rows: vec![city(1, "London")] });
        let index = Arc::new(InMemoryIndex::build(vec![], false));
        let config = LayeredConfig::with_defaults();
        let facade = Facade::new(store, index, &config);

        let found = facade.get_city(1).await.unwrap();
        assert_eq!(found.unwrap().name, "London");
        assert!(facade.get_city(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn status_reports_backend_kind_and_row_count() {
        let store = Arc::new(StubStore { rows: vec![city(1, "London"), city(2, "Paris")] });
        let index = Arc::new(InMemoryIndex::build(vec![], false));
        let config = LayeredConfig::with_defaults();
        let facade = Facade::new(store, index, &config);

        let (backend, row_count) = facade.status().await.unwrap();
        assert_eq!(backend, BackendKind::EmbeddedFile);
        assert_eq!(row_count, 2);
    }
}
