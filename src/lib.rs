//! Location spoofing for debugging.
//!
//! Overrides the reported device position with either a fixed point or an
//! animated route traversed at a configurable speed, so location-dependent
//! code can be exercised without physically moving. The
//! [`SimulationEngine`] owns simulated-position state; a location-query
//! interception layer substitutes [`SimulationEngine::current_position`]
//! for the real position whenever it is present.

pub mod engine;
pub mod error;
pub mod geodesic;
pub mod models;
pub mod presets;
pub mod store;

pub use engine::{SimulationEngine, TICK_INTERVAL};
pub use error::StoreError;
pub use models::{Coordinate, RouteSimulation, SpeedMode};
pub use store::{JsonFileStore, LocationStore, MemoryStore};
