//! `GeoEngine` - radius queries: spatial-index bounding-box pre-filter plus Haversine
//! refinement (spec §4.E).

use crate::in_memory_index::InMemoryIndex;
use geo::{Distance, Haversine, Point};
use geodash_core::error::{GeodashError, Result};
use geodash_core::City;
use serde::Serialize;

/// A city annotated with its great-circle distance from the query point.
#[derive(Debug, Clone, Serialize)]
pub struct CityWithDistance {
    pub city: City,
    pub distance_km: f64,
}

pub struct GeoEngine;

impl GeoEngine {
    pub fn new() -> Self {
        Self
    }

    /// `find_by_coordinates(lat, lng, radius_km)` (spec §4.E contract): validates inputs,
    /// pre-filters with the spatial index's bounding rectangle, refines with Haversine, and
    /// returns results ordered by ascending distance.
    pub fn find_by_coordinates(
        &self,
        index: &InMemoryIndex,
        lat: f64,
        lng: f64,
        radius_km: f64,
    ) -> Result<Vec<CityWithDistance>> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeodashError::InvalidParameter(format!("lat out of range: {lat}")));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(GeodashError::InvalidParameter(format!("lng out of range: {lng}")));
        }
        if radius_km <= 0.0 {
            return Err(GeodashError::InvalidParameter(format!(
                "radius_km must be positive, got {radius_km}"
            )));
        }

        let lat_radius = radius_km / 111.32;
        let cos_lat = lat.to_radians().cos().abs().max(1e-6);
        let lng_radius = radius_km / (111.32 * cos_lat);

        let candidate_ids = match index.spatial_candidates(lat, lng, lat_radius, lng_radius) {
            Some(ids) => ids,
            None => index.all_ids().collect(),
        };

        let origin = Point::new(lng, lat);
        let mut results: Vec<CityWithDistance> = candidate_ids
            .into_iter()
            .filter_map(|id| index.get(id))
            .filter_map(|city| {
                let point = Point::new(city.lng, city.lat);
                let distance_km = Haversine.distance(origin, point) / 1000.0;
                (distance_km <= radius_km).then(|| CityWithDistance { city: city.clone(), distance_km })
            })
            .collect();

        results.sort_by(|a, b| a.distance_km.partial_cmp(&b.distance_km).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }
}

impl Default for GeoEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodash_core::City;

    fn city(id: u32, name: &str, lat: f64, lng: f64) -> City {
        City {
            id,
            name: name.to_string(),
            ascii_name: geodash_core::ascii_fold(name),
            country: "GB".to_string(),
            country_code: "GB".to_string(),
            state: None,
            state_code: None,
            lat,
            lng,
            population: None,
            timezone: None,
            geonames_id: None,
        }
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        let index = InMemoryIndex::build(vec![], true);
        let engine = GeoEngine::new();
        assert!(engine.find_by_coordinates(&index, 1000.0, 0.0, 10.0).is_err());
    }

    #[test]
    fn rejects_nonpositive_radius() {
        let index = InMemoryIndex::build(vec![], true);
        let engine = GeoEngine::new();
        assert!(engine.find_by_coordinates(&index, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn finds_nearby_city_and_excludes_far_one() {
        let index = InMemoryIndex::build(
            vec![city(1, "London", 51.5072, -0.1276), city(2, "Sydney", -33.8688, 151.2093)],
            true,
        );
        let engine = GeoEngine::new();
        let results = engine.find_by_coordinates(&index, 51.5, -0.1, 50.0).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].city.id, 1);
    }

    #[test]
    fn results_sorted_ascending_by_distance() {
        let index = InMemoryIndex::build(
            vec![
                city(1, "Near", 51.51, -0.12),
                city(2, "Nearer", 51.508, -0.128),
            ],
            true,
        );
        let engine = GeoEngine::new();
        let results = engine.find_by_coordinates(&index, 51.5072, -0.1276, 5.0).unwrap();
        assert!(results[0].distance_km <= results[1].distance_km);
    }
}
