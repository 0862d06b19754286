//! Adapters from low-level I/O/parse failures into `GeodashError`, so every command returns
//! the same error type regardless of what went wrong underneath.

use geodash_core::error::GeodashError;
use std::path::Path;

pub fn write_failed(path: &Path, err: std::io::Error) -> GeodashError {
    GeodashError::ConfigurationError(format!("failed to write {}: {err}", path.display()))
}
