//! Network-server `GeoStore` backend: PostgreSQL plus PostGIS (spatial auxiliary) and
//! `tsvector`/GIN (full-text auxiliary).

pub mod config;
pub mod migrations;
pub mod transaction;

pub use config::{PoolConfig, PostgresConfig};
pub use migrations::{MigrationManager, MigrationStatus};
pub use transaction::{Transaction, TransactionManager};

use crate::ports::{BackendKind, CityCandidate, GeoStore, RankedCity};
use async_trait::async_trait;
use geodash_core::error::{GeodashError, Result};
use geodash_core::City;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::Duration;

pub struct PostgresStore {
    pool: PgPool,
    config: PostgresConfig,
    transaction_manager: TransactionManager,
}

impl PostgresStore {
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| GeodashError::ConfigurationError(e.to_string()))?;

        let pool = PgPoolOptions::new()
            .min_connections(config.pool.min_connections)
            .max_connections(config.pool.max_connections)
            .acquire_timeout(config.pool.acquire_timeout)
            .idle_timeout(config.pool.idle_timeout)
            .max_lifetime(config.pool.max_lifetime)
            .connect(&config.database_url)
            .await
            .map_err(|e| GeodashError::ConnectionError(format!("failed to connect: {e}")))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| GeodashError::ConnectionError(format!("connection test failed: {e}")))?;

        let transaction_manager = TransactionManager::new(pool.clone(), Duration::from_secs(30));

        Ok(Self { pool, config, transaction_manager })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }

    /// Pings the pool, replacing connections that fail (spec §4.A: ping-on-reacquire after
    /// idle > 5 min is handled by sqlx's own idle-timeout/test-on-acquire machinery; this is
    /// the explicit health-check surface used by `/health`).
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| GeodashError::ConnectionError(format!("health check failed: {e}")))?;
        Ok(())
    }

    fn row_to_city(row: &sqlx::postgres::PgRow) -> City {
        City {
            id: row.get::<i32, _>("id") as u32,
            name: row.get("name"),
            ascii_name: row.get("ascii_name"),
            country: row.get("country"),
            country_code: row.get("country_code"),
            state: row.get("state"),
            state_code: row.get("state_code"),
            lat: row.get("lat"),
            lng: row.get("lng"),
            population: row.get::<Option<i64>, _>("population"),
            timezone: row.get("timezone"),
            geonames_id: row.get::<Option<i64>, _>("geonames_id"),
        }
    }
}

#[async_trait]
impl GeoStore for PostgresStore {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::NetworkServer
    }

    async fn ensure_schema(&self) -> Result<()> {
        let manager = MigrationManager::new(self.pool.clone());
        manager.run_migrations().await
    }

    async fn row_count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM city_data")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| GeodashError::QueryError(format!("row_count failed: {e}")))?;
        Ok(count as u64)
    }

    async fn bulk_insert(&self, rows: &[City]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut tx = self.transaction_manager.begin_transaction().await?;
        let mut affected = 0u64;
        for city in rows {
            let result = sqlx::query(
                r#"
                INSERT INTO city_data
                    (id, name, ascii_name, country, country_code, state, state_code, lat, lng, population, timezone, geonames_id)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    ascii_name = EXCLUDED.ascii_name,
                    country = EXCLUDED.country,
                    country_code = EXCLUDED.country_code,
                    state = EXCLUDED.state,
                    state_code = EXCLUDED.state_code,
                    lat = EXCLUDED.lat,
                    lng = EXCLUDED.lng,
                    population = EXCLUDED.population,
                    timezone = EXCLUDED.timezone,
                    geonames_id = EXCLUDED.geonames_id
                "#,
            )
            .bind(city.id as i32)
            .bind(&city.name)
            .bind(&city.ascii_name)
            .bind(&city.country)
            .bind(&city.country_code)
            .bind(&city.state)
            .bind(&city.state_code)
            .bind(city.lat)
            .bind(city.lng)
            .bind(city.population)
            .bind(&city.timezone)
            .bind(city.geonames_id)
            .execute(&mut **tx.inner_mut()?)
            .await
            .map_err(|e| GeodashError::QueryError(format!("bulk_insert row failed: {e}")))?;
            affected += result.rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }

    async fn delete_where_country_not_in(&self, allowed: &[String]) -> Result<u64> {
        let result = sqlx::query("DELETE FROM city_data WHERE NOT (country_code = ANY($1))")
            .bind(allowed)
            .execute(&self.pool)
            .await
            .map_err(|e| GeodashError::QueryError(format!("country filter delete failed: {e}")))?;
        Ok(result.rows_affected())
    }

    async fn get_by_id(&self, id: u32) -> Result<Option<City>> {
        let row = sqlx::query("SELECT * FROM city_data WHERE id = $1")
            .bind(id as i32)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| GeodashError::QueryError(format!("get_by_id failed: {e}")))?;
        Ok(row.map(|r| Self::row_to_city(&r)))
    }

    async fn text_search(
        &self,
        query: &str,
        limit: usize,
        country: Option<&str>,
        user_lat: Option<f64>,
        user_lng: Option<f64>,
    ) -> Result<Vec<RankedCity>> {
        if !self.config.fts_enabled {
            return Err(GeodashError::QueryError(
                "full-text auxiliary disabled; caller should fall back to in-memory tiers"
                    .to_string(),
            ));
        }

        let rows = sqlx::query(
            r#"
            SELECT *, ts_rank(search_vector, plainto_tsquery('simple', $1)) AS lexical_rank
            FROM city_data
            WHERE search_vector @@ plainto_tsquery('simple', $1)
              AND ($2::text IS NULL OR country_code = $2)
            ORDER BY lexical_rank DESC
            LIMIT $3
            "#,
        )
        .bind(query)
        .bind(country)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GeodashError::QueryError(format!("text_search failed: {e}")))?;

        let mut results: Vec<RankedCity> = rows
            .iter()
            .map(|row| {
                let city = Self::row_to_city(row);
                let lexical_rank: f32 = row.get("lexical_rank");
                let rank = if let (Some(ulat), Some(ulng)) = (user_lat, user_lng) {
                    let dx = city.lng - ulng;
                    let dy = city.lat - ulat;
                    let l2 = (dx * dx + dy * dy).sqrt();
                    0.7 * lexical_rank as f64 + 0.3 / (1.0 + l2 * l2)
                } else {
                    lexical_rank as f64
                };
                RankedCity { city, rank }
            })
            .collect();

        results.sort_by(|a, b| b.rank.partial_cmp(&a.rank).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }

    async fn radius_search(&self, lat: f64, lng: f64, radius_km: f64) -> Result<Vec<CityCandidate>> {
        if !self.config.spatial_enabled {
            let rows = sqlx::query("SELECT * FROM city_data")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| GeodashError::QueryError(format!("radius_search scan failed: {e}")))?;
            return Ok(rows
                .iter()
                .map(|r| CityCandidate { city: Self::row_to_city(r), distance_km: None })
                .collect());
        }

        let rows = sqlx::query(
            r#"
            SELECT *,
                   ST_Distance(geom::geography, ST_SetSRID(ST_MakePoint($2, $1), 4326)::geography) / 1000.0
                       AS distance_km
            FROM city_data
            WHERE ST_DWithin(geom::geography, ST_SetSRID(ST_MakePoint($2, $1), 4326)::geography, $3 * 1000)
            ORDER BY distance_km ASC
            "#,
        )
        .bind(lat)
        .bind(lng)
        .bind(radius_km)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GeodashError::QueryError(format!("radius_search failed: {e}")))?;

        Ok(rows
            .iter()
            .map(|r| CityCandidate {
                city: Self::row_to_city(r),
                distance_km: Some(r.get::<f64, _>("distance_km")),
            })
            .collect())
    }

    async fn distinct_countries(&self) -> Result<Vec<String>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT country FROM city_data ORDER BY country ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| GeodashError::QueryError(format!("distinct_countries failed: {e}")))?;
        Ok(rows)
    }

    async fn distinct_states(&self, country: &str) -> Result<Vec<String>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT state FROM city_data WHERE country_code ILIKE $1 AND state IS NOT NULL ORDER BY state ASC",
        )
        .bind(country)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GeodashError::QueryError(format!("distinct_states failed: {e}")))?;
        Ok(rows)
    }

    async fn cities_in_state(&self, state: &str, country: &str) -> Result<Vec<City>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM city_data
            WHERE state ILIKE $1 AND country_code ILIKE $2
            ORDER BY population DESC NULLS LAST, name ASC
            "#,
        )
        .bind(state)
        .bind(country)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GeodashError::QueryError(format!("cities_in_state failed: {e}")))?;
        Ok(rows.iter().map(Self::row_to_city).collect())
    }

    async fn all_cities(&self) -> Result<Vec<City>> {
        let rows = sqlx::query("SELECT * FROM city_data ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GeodashError::QueryError(format!("all_cities failed: {e}")))?;
        Ok(rows.iter().map(Self::row_to_city).collect())
    }
}
