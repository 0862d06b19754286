use crate::dto::Envelope;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use geodash_core::error::GeodashError;

/// Wraps a `GeodashError`; handlers return `Result<Json<Envelope<T>>, ApiError>` and use `?`
/// against `geodash_core::error::Result`. Edge-level validation (spec §7, "raised at the edge,
/// never reach the core") is raised directly as `ApiError::invalid_parameter`.
#[derive(Debug)]
pub struct ApiError(pub GeodashError);

impl ApiError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self(GeodashError::InvalidParameter(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self(GeodashError::DataNotFoundError(message.into()))
    }
}

impl From<GeodashError> for ApiError {
    fn from(err: GeodashError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.0.status_code();
        let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error_code = self.0.error_code(), "{}", self.0);
        } else {
            tracing::warn!(error_code = self.0.error_code(), "{}", self.0);
        }
        let body: Envelope<()> = Envelope::err(status_code, self.0.to_string(), self.0.error_code());
        (status, Json(body)).into_response()
    }
}
