//! Persistence adapter for simulated-location state.
//!
//! The engine only needs a durable key-value surface for two things: the
//! fixed-point override and the route-simulation blob. The trait keeps a
//! storage mechanism out of the engine; the two implementations here cover
//! tests/embedding (in memory) and a standalone process (JSON file).

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{Coordinate, RouteSimulation};

/// Durable store for the fixed-point override and the route simulation.
///
/// Loads are infallible: missing or malformed data degrades to defaults.
/// Saves must be atomic with respect to concurrent loads, so a reader never
/// observes a partial write.
pub trait LocationStore: Send + Sync {
    fn load_route_simulation(&self) -> RouteSimulation;
    fn save_route_simulation(&self, simulation: &RouteSimulation) -> Result<(), StoreError>;
    fn load_fixed_point(&self) -> Option<Coordinate>;
    fn save_fixed_point(&self, point: Option<Coordinate>) -> Result<(), StoreError>;
}

/// The four logical persisted fields, in one serde document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoreDocument {
    simulated_latitude: Option<f64>,
    simulated_longitude: Option<f64>,
    route_simulation: Option<RouteSimulation>,
}

impl StoreDocument {
    fn fixed_point(&self) -> Option<Coordinate> {
        match (self.simulated_latitude, self.simulated_longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        }
    }

    fn set_fixed_point(&mut self, point: Option<Coordinate>) {
        self.simulated_latitude = point.map(|p| p.lat);
        self.simulated_longitude = point.map(|p| p.lon);
    }
}

/// In-memory store for tests and for embedding inside a host that handles
/// durability itself.
#[derive(Default)]
pub struct MemoryStore {
    document: Mutex<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocationStore for MemoryStore {
    fn load_route_simulation(&self) -> RouteSimulation {
        let document = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        document.route_simulation.clone().unwrap_or_default()
    }

    fn save_route_simulation(&self, simulation: &RouteSimulation) -> Result<(), StoreError> {
        let mut document = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        document.route_simulation = Some(simulation.clone());
        Ok(())
    }

    fn load_fixed_point(&self) -> Option<Coordinate> {
        let document = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        document.fixed_point()
    }

    fn save_fixed_point(&self, point: Option<Coordinate>) -> Result<(), StoreError> {
        let mut document = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        document.set_fixed_point(point);
        Ok(())
    }
}

/// File-backed store: one JSON document, rewritten atomically via a temp
/// file and rename in the same directory.
pub struct JsonFileStore {
    path: PathBuf,
    document: Mutex<StoreDocument>,
}

impl JsonFileStore {
    /// Opens (or initializes) the store at `path`. An unreadable or
    /// malformed file is treated as empty so a corrupt store can never
    /// take the host application down.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document = Self::read_document(&path);
        Self {
            path,
            document: Mutex::new(document),
        }
    }

    fn read_document(path: &Path) -> StoreDocument {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return StoreDocument::default();
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "unreadable location store, starting empty");
                return StoreDocument::default();
            }
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), %err, "malformed location store, starting empty");
            StoreDocument::default()
        })
    }

    fn persist(&self, document: &StoreDocument) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(document)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl LocationStore for JsonFileStore {
    fn load_route_simulation(&self) -> RouteSimulation {
        let document = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        document.route_simulation.clone().unwrap_or_default()
    }

    fn save_route_simulation(&self, simulation: &RouteSimulation) -> Result<(), StoreError> {
        let mut document = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        document.route_simulation = Some(simulation.clone());
        self.persist(&document)
    }

    fn load_fixed_point(&self) -> Option<Coordinate> {
        let document = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        document.fixed_point()
    }

    fn save_fixed_point(&self, point: Option<Coordinate>) -> Result<(), StoreError> {
        let mut document = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        document.set_fixed_point(point);
        self.persist(&document)
    }
}
