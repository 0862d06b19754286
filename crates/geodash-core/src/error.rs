//! Error types for GeoDash.

use thiserror::Error;

/// The error kinds the core can raise, matching the status codes the HTTP surface maps them to.
#[derive(Debug, Error)]
pub enum GeodashError {
    /// Bad URI, unsupported backend, or a configuration value that fails validation.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Connection pool acquisition or a health-check ping failed.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// A store query failed to execute.
    #[error("query error: {0}")]
    QueryError(String),

    /// A transaction failed to commit or roll back.
    #[error("transaction error: {0}")]
    TransactionError(String),

    /// Catastrophic failure reading the corpus input stream.
    #[error("data import error: {0}")]
    DataImportError(String),

    /// The requested id, country, or state does not exist.
    #[error("not found: {0}")]
    DataNotFoundError(String),

    /// Out-of-range coordinates, non-numeric parameters, missing required parameters, or an
    /// over-limit `limit`.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Anything that does not fit one of the kinds above.
    #[error("internal error: {0}")]
    Uncategorised(String),
}

impl GeodashError {
    /// The HTTP status code the API surface should report for this error kind.
    pub fn status_code(&self) -> u16 {
        match self {
            GeodashError::ConfigurationError(_) => 500,
            GeodashError::ConnectionError(_) => 503,
            GeodashError::QueryError(_) => 500,
            GeodashError::TransactionError(_) => 500,
            GeodashError::DataImportError(_) => 500,
            GeodashError::DataNotFoundError(_) => 404,
            GeodashError::InvalidParameter(_) => 400,
            GeodashError::Uncategorised(_) => 500,
        }
    }

    /// A stable slug identifying the error kind, used in the envelope's `error_code` field.
    pub fn error_code(&self) -> &'static str {
        match self {
            GeodashError::ConfigurationError(_) => "configuration_error",
            GeodashError::ConnectionError(_) => "connection_error",
            GeodashError::QueryError(_) => "query_error",
            GeodashError::TransactionError(_) => "transaction_error",
            GeodashError::DataImportError(_) => "data_import_error",
            GeodashError::DataNotFoundError(_) => "data_not_found_error",
            GeodashError::InvalidParameter(_) => "invalid_parameter",
            GeodashError::Uncategorised(_) => "uncategorised_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, GeodashError>;
