//! `CorpusLoader` - reads canonicalised city rows from CSV and persists them through a
//! `GeoStore`, in the staged read→parse→validate→insert→filter pipeline of spec §4.B.

use crate::ports::GeoStore;
use csv::ReaderBuilder;
use encoding_rs::WINDOWS_1252;
use geodash_core::error::Result;
use geodash_core::{ascii_fold, City};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Counts accumulated across a corpus import, returned to the caller (CLI `import`, master
/// startup) for reporting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorpusReport {
    pub rows_seen: usize,
    pub rows_inserted: u64,
    pub rows_rejected: usize,
    pub batches_failed: usize,
    pub rows_deleted_by_country_filter: u64,
}

/// Column-name aliases recognised in arbitrary source CSVs (spec §4.B step 2).
fn canonical_column(raw: &str) -> String {
    match raw.trim().to_lowercase().as_str() {
        "latitude" => "lat",
        "longitude" => "lng",
        "city_name" | "city" => "name",
        "iso2" | "country_iso2" | "countrycode" => "country_code",
        "admin_name" | "province" | "region" => "state",
        "admin_code" => "state_code",
        "pop" => "population",
        "tz" => "timezone",
        "geoname_id" | "geonameid" => "geonames_id",
        other => other,
    }
    .to_string()
}

pub struct CorpusLoader {
    batch_size: usize,
    allowed_countries: Option<Vec<String>>,
}

impl CorpusLoader {
    pub fn new(batch_size: usize, allowed_countries: Option<Vec<String>>) -> Self {
        Self { batch_size, allowed_countries }
    }

    /// Runs the full pipeline against a file path: parse, validate, chunked-insert, optional
    /// country filter, and (for the caller to trigger) the backend's spatial post-pass.
    pub async fn load_file(&self, store: &dyn GeoStore, path: &Path) -> Result<CorpusReport> {
        let bytes = std::fs::read(path).map_err(|e| {
            geodash_core::GeodashError::DataImportError(format!(
                "failed to read corpus file {path:?}: {e}"
            ))
        })?;
        self.load_bytes(store, &bytes).await
    }

    /// Runs the pipeline against an in-memory byte buffer (spec §4.B step 1: "caller passes a
    /// path or stream").
    pub async fn load_bytes(&self, store: &dyn GeoStore, bytes: &[u8]) -> Result<CorpusReport> {
        let text = decode_with_fallback(bytes);

        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());
        let header: Vec<String> = reader
            .headers()
            .map_err(|e| {
                geodash_core::GeodashError::DataImportError(format!(
                    "failed to read CSV header: {e}"
                ))
            })?
            .iter()
            .map(canonical_column)
            .collect();

        let mut report = CorpusReport::default();
        let mut batch = Vec::with_capacity(self.batch_size);

        for record in reader.records() {
            report.rows_seen += 1;
            let record = match record {
                Ok(r) => r,
                Err(_) => {
                    report.rows_rejected += 1;
                    continue;
                }
            };
            match row_to_city(&header, &record) {
                Some(city) => batch.push(city),
                None => {
                    report.rows_rejected += 1;
                    continue;
                }
            }

            if batch.len() >= self.batch_size {
                self.flush_batch(store, &mut batch, &mut report).await;
            }
        }
        if !batch.is_empty() {
            self.flush_batch(store, &mut batch, &mut report).await;
        }

        if let Some(allowed) = &self.allowed_countries {
            report.rows_deleted_by_country_filter =
                store.delete_where_country_not_in(allowed).await?;
        }

        tracing::info!(
            rows_seen = report.rows_seen,
            rows_inserted = report.rows_inserted,
            rows_rejected = report.rows_rejected,
            batches_failed = report.batches_failed,
            "corpus import complete"
        );

        Ok(report)
    }

    /// Inserts one batch inside its own transaction; a batch failure is logged and skipped
    /// rather than aborting the whole import (spec §4.B "Failure semantics").
    async fn flush_batch(&self, store: &dyn GeoStore, batch: &mut Vec<City>, report: &mut CorpusReport) {
        match store.bulk_insert(batch).await {
            Ok(inserted) => report.rows_inserted += inserted,
            Err(e) => {
                report.batches_failed += 1;
                tracing::warn!(error = %e, batch_len = batch.len(), "corpus batch insert failed, skipping");
            }
        }
        batch.clear();
    }
}

/// UTF-8 first, ISO-8859-1 (the Windows-1252 superset) fallback on decode error (spec §4.B
/// step 2).
fn decode_with_fallback(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

fn row_to_city(header: &[String], record: &csv::StringRecord) -> Option<City> {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for (col, value) in header.iter().zip(record.iter()) {
        fields.insert(col.as_str(), value);
    }

    let name = fields.get("name")?.trim();
    if name.is_empty() {
        return None;
    }
    let country_code = fields.get("country_code")?.trim().to_uppercase();
    if country_code.len() != 2 {
        return None;
    }
    let lat: f64 = fields.get("lat")?.trim().parse().ok()?;
    let lng: f64 = fields.get("lng")?.trim().parse().ok()?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return None;
    }

    let id: u32 = fields.get("id").and_then(|v| v.trim().parse().ok()).unwrap_or(0);
    let country = fields
        .get("country")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| country_code.clone());
    let ascii_name = fields
        .get("ascii_name")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| ascii_fold(name));
    let state = fields.get("state").map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let state_code = fields.get("state_code").map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let population = fields.get("population").and_then(|v| v.trim().parse::<i64>().ok());
    let timezone = fields.get("timezone").map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let geonames_id = fields.get("geonames_id").and_then(|v| v.trim().parse::<i64>().ok());

    let city = City {
        id,
        name: name.to_string(),
        ascii_name,
        country,
        country_code,
        state,
        state_code,
        lat,
        lng,
        population,
        timezone,
        geonames_id,
    };
    city.validate().ok()?;
    Some(city)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_column_maps_known_aliases() {
        assert_eq!(canonical_column("latitude"), "lat");
        assert_eq!(canonical_column("iso2"), "country_code");
        assert_eq!(canonical_column("city_name"), "name");
        assert_eq!(canonical_column("population"), "population");
    }

    #[test]
    fn row_to_city_rejects_missing_country_code() {
        let header = vec!["name".to_string(), "lat".to_string(), "lng".to_string()];
        let record = csv::StringRecord::from(vec!["Springfield", "39.8", "-89.6"]);
        assert!(row_to_city(&header, &record).is_none());
    }

    #[test]
    fn row_to_city_synthesises_ascii_name() {
        let header =
            vec!["name".to_string(), "country_code".to_string(), "lat".to_string(), "lng".to_string()];
        let record = csv::StringRecord::from(vec!["München", "DE", "48.13", "11.58"]);
        let city = row_to_city(&header, &record).unwrap();
        assert_eq!(city.ascii_name, "munchen");
    }

    #[test]
    fn row_to_city_rejects_out_of_range_latitude() {
        let header =
            vec!["name".to_string(), "country_code".to_string(), "lat".to_string(), "lng".to_string()];
        let record = csv::StringRecord::from(vec!["Nowhere", "XX", "200.0", "0.0"]);
        assert!(row_to_city(&header, &record).is_none());
    }
}
