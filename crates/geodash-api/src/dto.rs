//! Request query structs and the uniform response envelope (spec §6.1).

use serde::{Deserialize, Serialize};

/// `{success, status_code, data?, message?, error?, error_code?, meta?}`. The core only ever
/// produces `data`; this crate is the only place that assembles the rest.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, status_code: 200, data: Some(data), message: None, error: None, error_code: None, meta: None }
    }

    pub fn ok_with_meta(data: T, meta: serde_json::Value) -> Self {
        Self { success: true, status_code: 200, data: Some(data), message: None, error: None, error_code: None, meta: Some(meta) }
    }
}

impl Envelope<()> {
    pub fn err(status_code: u16, message: impl Into<String>, error_code: &str) -> Self {
        let message = message.into();
        Self {
            success: false,
            status_code,
            data: None,
            message: Some(message.clone()),
            error: Some(message),
            error_code: Some(error_code.to_string()),
            meta: None,
        }
    }
}

/// `GET /api/cities/search` (and the `/api/search?q=` legacy alias). `limit` is left as `None`
/// when absent so the handler can apply `config.search.limits.default` rather than a literal
/// constant (spec §8 "over-limit limit is clamped at the edge").
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub user_lat: Option<f64>,
    #[serde(default)]
    pub user_lng: Option<f64>,
    #[serde(default)]
    pub user_country: Option<String>,
}

impl SearchQuery {
    /// `query` is canonical; `q` is the legacy alias's parameter name.
    pub fn query_text(&self) -> &str {
        self.query.as_deref().or(self.q.as_deref()).unwrap_or("")
    }
}

/// `GET /api/cities/coordinates` (and `/api/coordinates`).
#[derive(Debug, Deserialize)]
pub struct CoordinatesQuery {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
    #[serde(default)]
    pub limit: Option<usize>,
}

fn default_radius_km() -> f64 {
    10.0
}

/// `GET /api/states?country=`.
#[derive(Debug, Deserialize)]
pub struct StatesQuery {
    #[serde(default)]
    pub country: Option<String>,
}

/// `GET /api/cities/state?state=&country=&limit=`.
#[derive(Debug, Deserialize)]
pub struct CitiesInStateQuery {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_omits_error_fields() {
        let body = Envelope::ok(42);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["status_code"], 200);
        assert_eq!(json["data"], 42);
        assert!(json.get("error").is_none());
        assert!(json.get("error_code").is_none());
    }

    #[test]
    fn err_envelope_omits_data_and_sets_success_false() {
        let body = Envelope::err(404, "no city with id 1", "data_not_found_error");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["status_code"], 404);
        assert_eq!(json["error_code"], "data_not_found_error");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn search_query_text_falls_back_to_legacy_q_param() {
        let q = SearchQuery {
            query: None,
            q: Some("paris".to_string()),
            limit: None,
            country: None,
            user_lat: None,
            user_lng: None,
            user_country: None,
        };
        assert_eq!(q.query_text(), "paris");
    }

    #[test]
    fn search_query_text_is_empty_when_neither_param_given() {
        let q = SearchQuery {
            query: None,
            q: None,
            limit: None,
            country: None,
            user_lat: None,
            user_lng: None,
            user_country: None,
        };
        assert_eq!(q.query_text(), "");
    }
}
