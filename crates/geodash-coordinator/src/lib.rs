//! GeoDash Coordinator - the prefork cold-start protocol (`WorkerCoordinator`), the
//! cross-process coordination-flag discipline, and the per-worker `Facade`.

pub mod coordinator;
pub mod facade;
pub mod shared_flag;

pub use coordinator::{read_marker, MasterMarker, WorkerCoordinator};
pub use facade::Facade;
pub use shared_flag::SharedFlag;
