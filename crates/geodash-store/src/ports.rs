//! The `GeoStore` port: the persistent relational store of cities plus spatial and full-text
//! auxiliaries (spec §4.A). Exposes only what the rest of the workspace needs; not a general
//! ORM.

use async_trait::async_trait;
use geodash_core::error::Result;
use geodash_core::City;

/// A city candidate returned by a store-level search, carrying whatever rank or distance
/// information that backend was able to compute.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCity {
    pub city: City,
    pub rank: f64,
}

/// A city candidate returned by `radius_search`. `distance_km` is `Some` only when the
/// backend computed an exact distance itself (the network backend via PostGIS); on the
/// embedded backend this is `None` and refinement happens in `GeoEngine`.
#[derive(Debug, Clone, PartialEq)]
pub struct CityCandidate {
    pub city: City,
    pub distance_km: Option<f64>,
}

/// Which concrete backend a `GeoStore` is using, reported on `/api/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    EmbeddedFile,
    NetworkServer,
}

/// Persistent relational store of cities plus spatial/full-text auxiliaries. Pluggable
/// backend (spec §4.A, component A).
#[async_trait]
pub trait GeoStore: Send + Sync {
    /// Which backend this store instance is (for `/api/status`).
    fn backend_kind(&self) -> BackendKind;

    /// Creates missing tables, indices, triggers, and the spatial/FTS auxiliaries iff enabled
    /// and supported by the backend. Idempotent.
    async fn ensure_schema(&self) -> Result<()>;

    /// Number of city rows currently stored.
    async fn row_count(&self) -> Result<u64>;

    /// Transactional batch insert; upserts on conflicting `id`. Returns the number of rows
    /// affected.
    async fn bulk_insert(&self, rows: &[City]) -> Result<u64>;

    /// Deletes every row whose `country_code` is not in `allowed`, in one statement.
    async fn delete_where_country_not_in(&self, allowed: &[String]) -> Result<u64>;

    /// Looks up a single city by id.
    async fn get_by_id(&self, id: u32) -> Result<Option<City>>;

    /// Full-text search via the FTS auxiliary when present. When `user_lat`/`user_lng` are
    /// supplied, final ordering blends lexical rank with a coarse L2 proximity term
    /// (spec §4.A: `0.7*lexical_rank + 0.3/(1+distance^2)`).
    async fn text_search(
        &self,
        query: &str,
        limit: usize,
        country: Option<&str>,
        user_lat: Option<f64>,
        user_lng: Option<f64>,
    ) -> Result<Vec<RankedCity>>;

    /// Candidates for a radius query. On the network backend, uses PostGIS `ST_DWithin`/
    /// `ST_Distance` directly. On the embedded backend, returns the bounding-box candidates
    /// from the spatial auxiliary for `GeoEngine` to refine. Falls back to all rows if no
    /// spatial auxiliary is present.
    async fn radius_search(&self, lat: f64, lng: f64, radius_km: f64) -> Result<Vec<CityCandidate>>;

    async fn distinct_countries(&self) -> Result<Vec<String>>;
    async fn distinct_states(&self, country: &str) -> Result<Vec<String>>;
    async fn cities_in_state(&self, state: &str, country: &str) -> Result<Vec<City>>;

    /// Every row, ordered by id. Used once per worker to build its `InMemoryIndex`; not part
    /// of the request path.
    async fn all_cities(&self) -> Result<Vec<City>>;
}
