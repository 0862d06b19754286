//! `SearchEngine` - tiered matcher, ranker, and LRU result cache; the hottest path in the
//! system (spec §4.D).

use crate::fuzzy::token_set_ratio;
use crate::in_memory_index::InMemoryIndex;
use geo::{Distance, Haversine, Point};
use geodash_core::error::Result;
use geodash_core::City;
use geodash_store::ports::{BackendKind, GeoStore};
use lru::LruCache;
use serde::Serialize;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const EXACT_WEIGHT: f64 = 100_000.0;
const PREFIX_WEIGHT: f64 = 50_000.0;
const FUZZY_WEIGHT: f64 = 200.0;
const FUZZY_HIGH_SCORE_BONUS: f64 = 1.5;
const FUZZY_HIGH_SCORE_CUTOFF: u8 = 80;
const PROXIMITY_BASE_WEIGHT: f64 = 50_000.0;
const PROXIMITY_DIVISOR_KM: f64 = 50.0;
const MAX_FUZZY_CANDIDATES: usize = 100;
const MIN_QUERY_LEN_FOR_FUZZY: usize = 3;
const FUZZY_SKIP_CANDIDATE_COUNT: usize = 5;

/// Caller-supplied search arguments (spec §4.D "Inputs"). Owned so the same value can be
/// moved into the background task that drives [`SearchEngine::search_streaming`].
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub limit: usize,
    pub country_filter: Option<String>,
    pub user_lat: Option<f64>,
    pub user_lng: Option<f64>,
    pub user_country: Option<String>,
    pub fuzzy_threshold: u8,
}

/// A ranked result, internal tags stripped (spec §4.D "internal tags are stripped before
/// return").
#[derive(Debug, Clone, Serialize)]
pub struct RankedCityResult {
    pub city: City,
    pub score: f64,
    pub distance_km: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum MatchTier {
    Exact,
    Prefix,
    Fuzzy(u8),
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: String,
    limit: usize,
    country_filter: Option<String>,
    user_country: Option<String>,
    user_lat_milli: Option<i64>,
    user_lng_milli: Option<i64>,
    fuzzy_threshold: u8,
}

impl CacheKey {
    fn from_params(params: &SearchParams) -> Self {
        Self {
            query: params.query.to_lowercase(),
            limit: params.limit,
            country_filter: params.country_filter.as_ref().map(|c| c.to_lowercase()),
            user_country: params.user_country.as_ref().map(|c| c.to_lowercase()),
            user_lat_milli: params.user_lat.map(|v| (v * 1000.0).round() as i64),
            user_lng_milli: params.user_lng.map(|v| (v * 1000.0).round() as i64),
            fuzzy_threshold: params.fuzzy_threshold,
        }
    }
}

struct CacheEntry {
    results: Vec<RankedCityResult>,
    inserted_at: Instant,
}

/// Tiered matcher + ranker + LRU cache over one worker's `InMemoryIndex`, with an optional
/// fallback to the store's own full-text auxiliary (spec §4.D).
pub struct SearchEngine<S: GeoStore + ?Sized> {
    store: Arc<S>,
    cache: Arc<Mutex<LruCache<CacheKey, CacheEntry>>>,
    cache_enabled: bool,
    cache_ttl: Duration,
    prefer_store_fts: bool,
    location_aware_enabled: bool,
    distance_weight: f64,
    country_boost: f64,
}

impl<S: GeoStore + ?Sized> Clone for SearchEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            cache_enabled: self.cache_enabled,
            cache_ttl: self.cache_ttl,
            prefer_store_fts: self.prefer_store_fts,
            location_aware_enabled: self.location_aware_enabled,
            distance_weight: self.distance_weight,
            country_boost: self.country_boost,
        }
    }
}

impl<S: GeoStore + ?Sized> SearchEngine<S> {
    /// `location_aware_enabled` gates the country-match and proximity bias terms entirely
    /// (spec §6.3 `search.location_aware.enabled`, forced off under `mode=simple`);
    /// `distance_weight` and `country_boost` scale those two terms when it is set.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<S>,
        cache_size: usize,
        cache_enabled: bool,
        cache_ttl: Duration,
        prefer_store_fts: bool,
        location_aware_enabled: bool,
        distance_weight: f64,
        country_boost: f64,
    ) -> Self {
        let capacity = NonZeroUsize::new(cache_size.max(1)).unwrap();
        Self {
            store,
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            cache_enabled,
            cache_ttl,
            prefer_store_fts,
            location_aware_enabled,
            distance_weight,
            country_boost,
        }
    }

    /// Runs the full tiered search against `index`, consulting and populating the cache.
    pub async fn search(&self, index: &InMemoryIndex, params: &SearchParams) -> Result<Vec<RankedCityResult>> {
        let trimmed = params.query.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let key = CacheKey::from_params(params);
        if self.cache_enabled {
            if let Some(entry) = self.cache.lock().unwrap().get(&key) {
                if entry.inserted_at.elapsed() < self.cache_ttl {
                    return Ok(entry.results.clone());
                }
            }
        }

        let results = self.search_uncached(index, params).await?;

        if self.cache_enabled {
            self.cache
                .lock()
                .unwrap()
                .put(key, CacheEntry { results: results.clone(), inserted_at: Instant::now() });
        }

        Ok(results)
    }

    /// Emits the exact+prefix tier promptly, then an updated list including fuzzy results
    /// once that stage completes (spec §4.D "Asynchronous tiered response"). The channel
    /// carries at most two messages.
    pub fn search_streaming(
        &self,
        index: Arc<InMemoryIndex>,
        params: SearchParams,
    ) -> tokio::sync::mpsc::Receiver<Vec<RankedCityResult>>
    where
        S: 'static,
    {
        let (tx, rx) = tokio::sync::mpsc::channel(2);
        let engine = self.clone();
        tokio::spawn(async move {
            let quick = engine.search_tiers(&index, &params, false).await.unwrap_or_default();
            if tx.send(quick).await.is_err() {
                return;
            }
            let full = engine.search_tiers(&index, &params, true).await.unwrap_or_default();
            let _ = tx.send(full).await;
        });
        rx
    }

    async fn search_uncached(&self, index: &InMemoryIndex, params: &SearchParams) -> Result<Vec<RankedCityResult>> {
        if self.prefer_store_fts && self.store.backend_kind() == BackendKind::NetworkServer {
            match self
                .store
                .text_search(
                    &params.query,
                    params.limit,
                    params.country_filter.as_deref(),
                    params.user_lat,
                    params.user_lng,
                )
                .await
            {
                Ok(ranked) => {
                    let mut results: Vec<RankedCityResult> = ranked
                        .into_iter()
                        .map(|r| RankedCityResult { city: r.city, score: r.rank, distance_km: None })
                        .collect();
                    results.truncate(params.limit);
                    return Ok(results);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "store FTS search failed, degrading to in-memory tiers");
                }
            }
        }

        self.search_tiers(index, params, true).await
    }

    /// Runs the exact/prefix tiers, and the fuzzy tier when `allow_fuzzy` is set. Used both by
    /// the synchronous path and by each half of `search_streaming`.
    async fn search_tiers(
        &self,
        index: &InMemoryIndex,
        params: &SearchParams,
        allow_fuzzy: bool,
    ) -> Result<Vec<RankedCityResult>> {
        let folded_query = geodash_core::ascii_fold(params.query.trim());
        let country_filter = params.country_filter.as_deref();

        let exact_ids: HashSet<u32> = index.exact(&folded_query).into_iter().collect();
        let prefix_ids: Vec<u32> = index
            .prefix(&folded_query, country_filter)
            .into_iter()
            .filter(|id| !exact_ids.contains(id))
            .collect();

        let mut tagged: Vec<(u32, MatchTier)> = exact_ids.iter().map(|id| (*id, MatchTier::Exact)).collect();
        tagged.extend(prefix_ids.iter().map(|id| (*id, MatchTier::Prefix)));

        let matched_so_far = tagged.len();
        let skip_fuzzy = !allow_fuzzy
            || folded_query.chars().count() < MIN_QUERY_LEN_FOR_FUZZY
            || (matched_so_far >= FUZZY_SKIP_CANDIDATE_COUNT && matched_so_far >= params.limit);

        if !skip_fuzzy {
            let already_matched: HashSet<u32> = tagged.iter().map(|(id, _)| *id).collect();
            let mut fuzzy_hits: Vec<(u32, u8)> = index
                .iter_names(country_filter)
                .filter(|(_, id)| !already_matched.contains(id))
                .map(|(name, id)| (id, token_set_ratio(&folded_query, name)))
                .filter(|(_, score)| *score >= params.fuzzy_threshold)
                .collect();
            fuzzy_hits.sort_by(|a, b| b.1.cmp(&a.1));
            fuzzy_hits.truncate(MAX_FUZZY_CANDIDATES);
            tagged.extend(fuzzy_hits.into_iter().map(|(id, score)| (id, MatchTier::Fuzzy(score))));
        }

        let origin = match (params.user_lat, params.user_lng) {
            (Some(lat), Some(lng)) => Some(Point::new(lng, lat)),
            _ => None,
        };

        let mut scored: Vec<RankedCityResult> = tagged
            .into_iter()
            .filter_map(|(id, tier)| index.get(id).map(|city| (city.clone(), tier)))
            .map(|(city, tier)| {
                let mut score = match tier {
                    MatchTier::Exact => EXACT_WEIGHT,
                    MatchTier::Prefix => PREFIX_WEIGHT,
                    MatchTier::Fuzzy(fuzzy_score) => {
                        let mut value = fuzzy_score as f64 * FUZZY_WEIGHT;
                        if fuzzy_score > FUZZY_HIGH_SCORE_CUTOFF {
                            value *= FUZZY_HIGH_SCORE_BONUS;
                        }
                        value
                    }
                };

                if self.location_aware_enabled {
                    if let Some(user_country) = &params.user_country {
                        if city.country_code.eq_ignore_ascii_case(user_country) {
                            score += self.country_boost;
                        }
                    }
                }

                let mut distance_km = None;
                if let Some(origin) = origin {
                    let point = Point::new(city.lng, city.lat);
                    let d_km = Haversine.distance(origin, point) / 1000.0;
                    if self.location_aware_enabled {
                        score += PROXIMITY_BASE_WEIGHT * self.distance_weight / (1.0 + d_km / PROXIMITY_DIVISOR_KM);
                    }
                    distance_km = Some(d_km);
                }

                RankedCityResult { city, score, distance_km }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.city.population.unwrap_or(0).cmp(&a.city.population.unwrap_or(0)))
                .then_with(|| a.city.id.cmp(&b.city.id))
        });
        scored.truncate(params.limit);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use geodash_store::ports::{CityCandidate, RankedCity};

    struct StubStore;

    #[async_trait]
    impl GeoStore for StubStore {
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
            Ok(Vec::new())
        }
        async fn distinct_states(&self, _country: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn cities_in_state(&self, _state: &str, _country: &str) -> Result<Vec<City>> {
            Ok(Vec::new())
        }
        async fn all_cities(&self) -> Result<Vec<City>> {
            Ok(Vec::new())
        }
    }

    fn city(id: u32, name: &str, country: &str, population: Option<i64>) -> City {
        City {
            id,
            name: name.to_string(),
            ascii_name: geodash_core::ascii_fold(name),
            country: country.to_string(),
            country_code: country.to_string(),
            state: None,
            state_code: None,
            lat: 0.0,
            lng: 0.0,
            population,
            timezone: None,
            geonames_id: None,
        }
    }

    fn params(query: &str) -> SearchParams {
        SearchParams {
            query: query.to_string(),
            limit: 10,
            country_filter: None,
            user_lat: None,
            user_lng: None,
            user_country: None,
            fuzzy_threshold: 70,
        }
    }

    #[tokio::test]
    async fn empty_query_returns_empty() {
        let index = InMemoryIndex::build(vec![], false);
        let engine = SearchEngine::new(Arc::new(StubStore), 100, true, Duration::from_secs(60), false, true, 0.3, 25_000.0);
        let results = engine.search(&index, &params("  ")).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn exact_match_outranks_prefix_match() {
        let index = InMemoryIndex::build(
            vec![city(1, "London", "GB", None), city(2, "Londonderry", "GB", None)],
            false,
        );
        let engine = SearchEngine::new(Arc::new(StubStore), 100, true, Duration::from_secs(60), false, true, 0.3, 25_000.0);
        let results = engine.search(&index, &params("london")).await.unwrap();
        assert_eq!(results[0].city.id, 1);
    }

    #[tokio::test]
    async fn ties_break_by_population_then_id() {
        let index = InMemoryIndex::build(
            vec![city(2, "Springfield", "US", Some(100)), city(1, "Springfield", "US", Some(100))],
            false,
        );
        let engine = SearchEngine::new(Arc::new(StubStore), 100, true, Duration::from_secs(60), false, true, 0.3, 25_000.0);
        // Both are exact matches with identical population; lower id wins the tie-break.
        let results = engine.search(&index, &params("springfield")).await.unwrap();
        assert_eq!(results[0].city.id, 1);
    }

    #[tokio::test]
    async fn unknown_country_filter_yields_empty_not_error() {
        let index = InMemoryIndex::build(vec![city(1, "London", "GB", None)], false);
        let engine = SearchEngine::new(Arc::new(StubStore), 100, true, Duration::from_secs(60), false, true, 0.3, 25_000.0);
        let mut p = params("london");
        p.country_filter = Some("ZZ".to_string());
        let results = engine.search(&index, &p).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn cache_returns_identical_results_on_second_call() {
        let index = InMemoryIndex::build(vec![city(1, "Paris", "FR", None)], false);
        let engine = SearchEngine::new(Arc::new(StubStore), 100, true, Duration::from_secs(60), false, true, 0.3, 25_000.0);
        let first = engine.search(&index, &params("paris")).await.unwrap();
        let second = engine.search(&index, &params("paris")).await.unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].city.id, second[0].city.id);
    }

    #[tokio::test]
    async fn location_aware_disabled_ignores_country_and_proximity_bias() {
        // Two exact matches, tied apart from user_country/coordinates: with location-awareness
        // off, neither bias term should break the tie away from id order.
        let index = InMemoryIndex::build(
            vec![city(1, "Springfield", "US", None), city(2, "Springfield", "GB", None)],
            false,
        );
        let engine = SearchEngine::new(Arc::new(StubStore), 100, true, Duration::from_secs(60), false, false, 0.3, 25_000.0);
        let mut p = params("springfield");
        p.user_country = Some("GB".to_string());
        p.user_lat = Some(0.0);
        p.user_lng = Some(0.0);
        let results = engine.search(&index, &p).await.unwrap();
        assert_eq!(results[0].score, results[1].score);
        assert_eq!(results[0].city.id, 1);
    }
}
