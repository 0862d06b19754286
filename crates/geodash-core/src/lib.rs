//! GeoDash Core - the `City` domain model, error types, and layered configuration.
//!
//! This crate has no knowledge of storage backends, search tiers, or transport surfaces; it is
//! the shared vocabulary the other crates in the workspace build on.

pub mod config;
pub mod error;
pub mod model;

pub use error::{GeodashError, Result};
pub use model::{ascii_fold, City};
