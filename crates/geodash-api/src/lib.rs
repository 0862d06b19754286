//! GeoDash HTTP surface (spec §6.1): the uniform envelope, edge-level parameter validation,
//! and the route table over `geodash-coordinator`'s `Facade`.

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::ApiConfig;
pub use router::create_router;
pub use state::AppState;
