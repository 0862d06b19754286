//! `RegionEngine` - thin, cached enumeration queries over a `GeoStore` (spec §4.F).

use geodash_core::error::Result;
use geodash_core::City;
use geodash_store::ports::GeoStore;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Caches the three enumeration queries against repeated calls - countries and the
/// country-to-states fan-out barely change within a process lifetime, so re-querying the
/// store on every request would be wasted latency (spec §4.F "implemented as cached
/// queries").
pub struct RegionEngine<S: GeoStore + ?Sized> {
    store: Arc<S>,
    countries_cache: Mutex<Option<Vec<String>>>,
    states_cache: Mutex<LruCache<String, Vec<String>>>,
}

impl<S: GeoStore + ?Sized> RegionEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            countries_cache: Mutex::new(None),
            states_cache: Mutex::new(LruCache::new(NonZeroUsize::new(256).unwrap())),
        }
    }

    /// Alphabetically sorted distinct countries.
    pub async fn get_countries(&self) -> Result<Vec<String>> {
        if let Some(cached) = self.countries_cache.lock().unwrap().clone() {
            return Ok(cached);
        }
        let mut countries = self.store.distinct_countries().await?;
        countries.sort();
        *self.countries_cache.lock().unwrap() = Some(countries.clone());
        Ok(countries)
    }

    /// Alphabetically sorted distinct states within `country` (case-insensitive).
    pub async fn get_states(&self, country: &str) -> Result<Vec<String>> {
        let key = country.to_lowercase();
        if let Some(cached) = self.states_cache.lock().unwrap().get(&key) {
            return Ok(cached.clone());
        }
        let mut states = self.store.distinct_states(country).await?;
        states.sort();
        self.states_cache.lock().unwrap().put(key, states.clone());
        Ok(states)
    }

    /// Cities in `state, country`, ordered by population descending (falling back to name
    /// ascending when population is absent) - the store does this ordering itself.
    pub async fn get_cities_in_state(&self, state: &str, country: &str) -> Result<Vec<City>> {
        self.store.cities_in_state(state, country).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use geodash_store::ports::{BackendKind, CityCandidate, RankedCity};

    struct FakeStore {
        countries: Vec<String>,
    }

    #[async_trait]
    impl GeoStore for FakeStore {
        fn backend_kind(&self) -> BackendKind {
            BackendKind::EmbeddedFile
        }
        async fn ensure_schema(&self) -> Result<()> {
            Ok(())
        }
        async fn row_count(&self) -> Result<u64> {
            Ok(0)
        }
        async fn bulk_insert(&self, _rows: &[City]) -> Result<u64> {
            Ok(0)
        }
        async fn delete_where_country_not_in(&self, _allowed: &[String]) -> Result<u64> {
            Ok(0)
        }
        async fn get_by_id(&self, _id: u32) -> Result<Option<City>> {
            Ok(None)
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
            Ok(self.countries.clone())
        }
        async fn distinct_states(&self, _country: &str) -> Result<Vec<String>> {
            Ok(vec!["Zeta".to_string(), "Alpha".to_string()])
        }
        async fn cities_in_state(&self, _state: &str, _country: &str) -> Result<Vec<City>> {
            Ok(Vec::new())
        }
        async fn all_cities(&self) -> Result<Vec<City>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn countries_come_back_sorted_and_cached() {
        let store = Arc::new(FakeStore { countries: vec!["Zimbabwe".to_string(), "Andorra".to_string()] });
        let engine = RegionEngine::new(store);
        let countries = engine.get_countries().await.unwrap();
        assert_eq!(countries, vec!["Andorra".to_string(), "Zimbabwe".to_string()]);
        // Second call should hit the cache and return the same sorted result.
        assert_eq!(engine.get_countries().await.unwrap(), countries);
    }

    #[tokio::test]
    async fn states_come_back_sorted() {
        let store = Arc::new(FakeStore { countries: vec![] });
        let engine = RegionEngine::new(store);
        let states = engine.get_states("zz").await.unwrap();
        assert_eq!(states, vec!["Alpha".to_string(), "Zeta".to_string()]);
    }
}
