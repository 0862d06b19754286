//! Embedded-file `GeoStore` backend: a single SQLite database file, with an R*Tree virtual
//! table for radius pre-filtering and an FTS5 virtual table for lexical search, both kept in
//! sync with `city_data` by triggers.

use crate::ports::{BackendKind, CityCandidate, GeoStore, RankedCity};
use async_trait::async_trait;
use geodash_core::error::{GeodashError, Result};
use geodash_core::City;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::str::FromStr;

const CREATE_CITY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS city_data (
    id              INTEGER PRIMARY KEY,
    name            TEXT NOT NULL,
    ascii_name      TEXT NOT NULL,
    country         TEXT NOT NULL,
    country_code    TEXT NOT NULL,
    state           TEXT,
    state_code      TEXT,
    lat             REAL NOT NULL,
    lng             REAL NOT NULL,
    population      INTEGER,
    timezone        TEXT,
    geonames_id     INTEGER
)
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_city_data_ascii_name ON city_data (ascii_name)",
    "CREATE INDEX IF NOT EXISTS idx_city_data_country ON city_data (country_code)",
    "CREATE INDEX IF NOT EXISTS idx_city_data_state ON city_data (country_code, state_code)",
];

const CREATE_RTREE: &str =
    "CREATE VIRTUAL TABLE IF NOT EXISTS city_rtree USING rtree(id, min_lat, max_lat, min_lng, max_lng)";

const CREATE_FTS: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS city_fts USING fts5(
    name, ascii_name, country, state, content='city_data', content_rowid='id'
)
"#;

const CREATE_SYNC_TRIGGERS: &[&str] = &[
    r#"
    CREATE TRIGGER IF NOT EXISTS trg_city_data_ai AFTER INSERT ON city_data BEGIN
        INSERT INTO city_rtree(id, min_lat, max_lat, min_lng, max_lng)
            VALUES (new.id, new.lat, new.lat, new.lng, new.lng);
        INSERT INTO city_fts(rowid, name, ascii_name, country, state)
            VALUES (new.id, new.name, new.ascii_name, new.country, new.state);
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS trg_city_data_ad AFTER DELETE ON city_data BEGIN
        DELETE FROM city_rtree WHERE id = old.id;
        INSERT INTO city_fts(city_fts, rowid, name, ascii_name, country, state)
            VALUES ('delete', old.id, old.name, old.ascii_name, old.country, old.state);
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS trg_city_data_au AFTER UPDATE ON city_data BEGIN
        UPDATE city_rtree SET min_lat = new.lat, max_lat = new.lat, min_lng = new.lng, max_lng = new.lng
            WHERE id = old.id;
        INSERT INTO city_fts(city_fts, rowid, name, ascii_name, country, state)
            VALUES ('delete', old.id, old.name, old.ascii_name, old.country, old.state);
        INSERT INTO city_fts(rowid, name, ascii_name, country, state)
            VALUES (new.id, new.name, new.ascii_name, new.country, new.state);
    END
    "#,
];

pub struct EmbeddedStore {
    pool: SqlitePool,
}

impl EmbeddedStore {
    pub async fn new(path: &str) -> Result<Self> {
        let options = sqlx::sqlite::SqliteConnectOptions::from_str(&format!("sqlite://{path}"))
            .map_err(|e| GeodashError::ConfigurationError(format!("invalid db path {path:?}: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| GeodashError::ConnectionError(format!("failed to open {path}: {e}")))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_city(row: &sqlx::sqlite::SqliteRow) -> City {
        City {
            id: row.get::<i64, _>("id") as u32,
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

    /// Great-circle distance in kilometres, mirroring the reference implementation's own
    /// hand-rolled haversine rather than pulling in a geometry crate for one formula.
    fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let (lat1r, lat2r) = (lat1.to_radians(), lat2.to_radians());
        let dlat = (lat2 - lat1).to_radians();
        let dlng = (lng2 - lng1).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1r.cos() * lat2r.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }
}

#[async_trait]
impl GeoStore for EmbeddedStore {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::EmbeddedFile
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_CITY_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| GeodashError::ConfigurationError(format!("create city_data failed: {e}")))?;

        for stmt in CREATE_INDEXES {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| GeodashError::ConfigurationError(format!("create index failed: {e}")))?;
        }

        sqlx::query(CREATE_RTREE)
            .execute(&self.pool)
            .await
            .map_err(|e| GeodashError::ConfigurationError(format!("create city_rtree failed: {e}")))?;

        sqlx::query(CREATE_FTS)
            .execute(&self.pool)
            .await
            .map_err(|e| GeodashError::ConfigurationError(format!("create city_fts failed: {e}")))?;

        for stmt in CREATE_SYNC_TRIGGERS {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| GeodashError::ConfigurationError(format!("create trigger failed: {e}")))?;
        }

        Ok(())
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
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| GeodashError::ConnectionError(format!("failed to begin transaction: {e}")))?;

        let mut affected = 0u64;
        for city in rows {
            sqlx::query(
                r#"
                INSERT INTO city_data
                    (id, name, ascii_name, country, country_code, state, state_code, lat, lng, population, timezone, geonames_id)
                VALUES (?,?,?,?,?,?,?,?,?,?,?,?)
                ON CONFLICT(id) DO UPDATE SET
                    name=excluded.name, ascii_name=excluded.ascii_name, country=excluded.country,
                    country_code=excluded.country_code, state=excluded.state, state_code=excluded.state_code,
                    lat=excluded.lat, lng=excluded.lng, population=excluded.population,
                    timezone=excluded.timezone, geonames_id=excluded.geonames_id
                "#,
            )
            .bind(city.id as i64)
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
            .execute(&mut *tx)
            .await
            .map_err(|e| GeodashError::QueryError(format!("bulk_insert row failed: {e}")))?;
            affected += 1;
        }

        tx.commit()
            .await
            .map_err(|e| GeodashError::TransactionError(format!("commit failed: {e}")))?;
        Ok(affected)
    }

    async fn delete_where_country_not_in(&self, allowed: &[String]) -> Result<u64> {
        if allowed.is_empty() {
            let result = sqlx::query("DELETE FROM city_data")
                .execute(&self.pool)
                .await
                .map_err(|e| GeodashError::QueryError(format!("country filter delete failed: {e}")))?;
            return Ok(result.rows_affected());
        }
        let placeholders = std::iter::repeat("?").take(allowed.len()).collect::<Vec<_>>().join(",");
        let sql = format!("DELETE FROM city_data WHERE country_code NOT IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for code in allowed {
            query = query.bind(code);
        }
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| GeodashError::QueryError(format!("country filter delete failed: {e}")))?;
        Ok(result.rows_affected())
    }

    async fn get_by_id(&self, id: u32) -> Result<Option<City>> {
        let row = sqlx::query("SELECT * FROM city_data WHERE id = ?")
            .bind(id as i64)
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
        let fts_query = format!("{}*", query.replace('"', "\"\""));

        let rows = sqlx::query(
            r#"
            SELECT city_data.*, bm25(city_fts) AS lexical_rank
            FROM city_fts
            JOIN city_data ON city_data.id = city_fts.rowid
            WHERE city_fts MATCH ?
              AND (? IS NULL OR city_data.country_code = ?)
            ORDER BY lexical_rank ASC
            LIMIT ?
            "#,
        )
        .bind(&fts_query)
        .bind(country)
        .bind(country)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GeodashError::QueryError(format!("text_search failed: {e}")))?;

        let mut results: Vec<RankedCity> = rows
            .iter()
            .map(|row| {
                let city = Self::row_to_city(row);
                // bm25() returns lower-is-better; invert so higher rank means a better match,
                // matching the network-backend's ts_rank convention.
                let lexical_rank = -row.get::<f64, _>("lexical_rank");
                let rank = if let (Some(ulat), Some(ulng)) = (user_lat, user_lng) {
                    let distance = Self::haversine_km(ulat, ulng, city.lat, city.lng);
                    0.7 * lexical_rank + 0.3 / (1.0 + distance * distance)
                } else {
                    lexical_rank
                };
                RankedCity { city, rank }
            })
            .collect();

        results.sort_by(|a, b| b.rank.partial_cmp(&a.rank).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }

    async fn radius_search(&self, lat: f64, lng: f64, radius_km: f64) -> Result<Vec<CityCandidate>> {
        let lat_delta = radius_km / 111.0;
        let lng_delta = radius_km / (111.0 * lat.to_radians().cos().max(0.01));

        let rows = sqlx::query(
            r#"
            SELECT city_data.*
            FROM city_rtree
            JOIN city_data ON city_data.id = city_rtree.id
            WHERE city_rtree.min_lat >= ? AND city_rtree.max_lat <= ?
              AND city_rtree.min_lng >= ? AND city_rtree.max_lng <= ?
            "#,
        )
        .bind(lat - lat_delta)
        .bind(lat + lat_delta)
        .bind(lng - lng_delta)
        .bind(lng + lng_delta)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GeodashError::QueryError(format!("radius_search failed: {e}")))?;

        let mut candidates: Vec<CityCandidate> = rows
            .iter()
            .map(|row| {
                let city = Self::row_to_city(row);
                let distance_km = Self::haversine_km(lat, lng, city.lat, city.lng);
                (city, distance_km)
            })
            .filter(|(_, distance_km)| *distance_km <= radius_km)
            .map(|(city, distance_km)| CityCandidate { city, distance_km: Some(distance_km) })
            .collect();

        candidates.sort_by(|a, b| {
            a.distance_km.partial_cmp(&b.distance_km).unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(candidates)
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
            "SELECT DISTINCT state FROM city_data WHERE country_code = ? COLLATE NOCASE AND state IS NOT NULL ORDER BY state ASC",
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
            WHERE state = ?1 COLLATE NOCASE AND country_code = ?2 COLLATE NOCASE
            ORDER BY population DESC, name ASC
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_distance_at_same_point() {
        let d = EmbeddedStore::haversine_km(40.0, -73.0, 40.0, -73.0);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn haversine_roughly_matches_known_pair() {
        // New York to London, approximately 5570km great-circle.
        let d = EmbeddedStore::haversine_km(40.7128, -74.0060, 51.5074, -0.1278);
        assert!((5500.0..5650.0).contains(&d), "unexpected distance: {d}");
    }
}
