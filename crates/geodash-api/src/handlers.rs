//! Route handlers for spec §6.1's primary routes; `router` maps the legacy aliases onto the
//! same functions. Parameter validation happens here, at the edge, per spec §7 — the core is
//! never called with a malformed argument.

use crate::dto::{CitiesInStateQuery, CoordinatesQuery, Envelope, SearchQuery, StatesQuery};
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use geodash_search::SearchParams;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

pub async fn health_check() -> impl IntoResponse {
    Json(Envelope::ok(HealthBody { status: "ok" }))
}

#[derive(Serialize)]
struct StatusBody {
    backend: geodash_store::ports::BackendKind,
    row_count: u64,
    mode: String,
}

/// `GET /api/status` (spec §10 supplement: `{backend, row_count, mode}`).
pub async fn status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let (backend, row_count) = state.facade.status().await?;
    let mode = format!("{:?}", state.config.mode.value).to_lowercase();
    Ok(Json(Envelope::ok(StatusBody { backend, row_count, mode })))
}

fn resolve_limit(requested: Option<usize>, config: &geodash_core::config::LayeredConfig) -> usize {
    requested.unwrap_or(config.limits_default.value).min(config.limits_max.value)
}

fn fuzzy_threshold(config: &geodash_core::config::LayeredConfig) -> u8 {
    if config.fuzzy_enabled.value {
        config.fuzzy_threshold.value
    } else {
        101
    }
}

/// `GET /api/cities/search` and the `/api/search?q=` legacy alias.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if q.user_lat.is_some() != q.user_lng.is_some() {
        return Err(ApiError::invalid_parameter("user_lat and user_lng must be provided together"));
    }

    let params = SearchParams {
        query: q.query_text().to_string(),
        limit: resolve_limit(q.limit, &state.config),
        country_filter: q.country.clone(),
        user_lat: q.user_lat,
        user_lng: q.user_lng,
        user_country: q.user_country.clone(),
        fuzzy_threshold: fuzzy_threshold(&state.config),
    };

    let results = state.facade.search(&params).await?;
    let count = results.len();
    Ok(Json(Envelope::ok_with_meta(results, json!({ "count": count }))))
}

/// `GET /api/city/{id}` and the `/api/cities/{id}` legacy alias.
pub async fn get_city(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<impl IntoResponse, ApiError> {
    match state.facade.get_city(id).await? {
        Some(city) => Ok(Json(Envelope::ok(city))),
        None => Err(ApiError::not_found(format!("no city with id {id}"))),
    }
}

/// `GET /api/cities/coordinates` and the `/api/coordinates` legacy alias.
pub async fn coordinates(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CoordinatesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let lat = q.lat.ok_or_else(|| ApiError::invalid_parameter("lat is required"))?;
    let lng = q.lng.ok_or_else(|| ApiError::invalid_parameter("lng is required"))?;
    if q.radius_km <= 0.0 {
        return Err(ApiError::invalid_parameter("radius_km must be positive"));
    }

    let limit = resolve_limit(q.limit, &state.config);
    let mut results = state.facade.find_by_coordinates(lat, lng, q.radius_km)?;
    results.truncate(limit);
    let count = results.len();
    Ok(Json(Envelope::ok_with_meta(results, json!({ "count": count }))))
}

/// `GET /api/countries`.
pub async fn countries(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let countries = state.facade.get_countries().await?;
    Ok(Json(Envelope::ok(countries)))
}

/// `GET /api/states?country=` and the `/api/countries/{c}/states` legacy alias.
pub async fn states_query(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StatesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let country = q.country.ok_or_else(|| ApiError::invalid_parameter("country is required"))?;
    states(state, country).await
}

pub async fn states_path(
    State(state): State<Arc<AppState>>,
    Path(country): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    states(state, country).await
}

async fn states(state: Arc<AppState>, country: String) -> Result<impl IntoResponse, ApiError> {
    let states = state.facade.get_states(&country).await?;
    Ok(Json(Envelope::ok(states)))
}

/// `GET /api/cities/state?state=&country=&limit=` and the
/// `/api/countries/{c}/states/{s}/cities` legacy alias.
pub async fn cities_in_state_query(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CitiesInStateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let country = q.country.ok_or_else(|| ApiError::invalid_parameter("country is required"))?;
    let state_name = q.state.ok_or_else(|| ApiError::invalid_parameter("state is required"))?;
    cities_in_state(state, state_name, country, q.limit).await
}

pub async fn cities_in_state_path(
    State(state): State<Arc<AppState>>,
    Path((country, state_name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    cities_in_state(state, state_name, country, None).await
}

async fn cities_in_state(
    state: Arc<AppState>,
    state_name: String,
    country: String,
    limit: Option<usize>,
) -> Result<impl IntoResponse, ApiError> {
    let mut cities = state.facade.get_cities_in_state(&state_name, &country).await?;
    if let Some(limit) = limit {
        cities.truncate(limit.min(state.config.limits_max.value));
    }
    let count = cities.len();
    Ok(Json(Envelope::ok_with_meta(cities, json!({ "count": count }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodash_core::config::LayeredConfig;

    #[test]
    fn resolve_limit_applies_default_when_absent() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(resolve_limit(None, &config), config.limits_default.value);
    }

    #[test]
    fn resolve_limit_clamps_over_limit_request_to_max() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(resolve_limit(Some(10_000), &config), config.limits_max.value);
    }

    #[test]
    fn resolve_limit_passes_through_in_range_request() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(resolve_limit(Some(5), &config), 5);
    }

    #[test]
    fn fuzzy_threshold_disabled_skips_all_fuzzy_candidates() {
        let mut config = LayeredConfig::with_defaults();
        config.fuzzy_enabled.value = false;
        assert_eq!(fuzzy_threshold(&config), 101);
    }

    #[test]
    fn fuzzy_threshold_enabled_uses_configured_value() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(fuzzy_threshold(&config), config.fuzzy_threshold.value);
    }
}
