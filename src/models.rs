use serde::{Deserialize, Serialize};

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Travel speed for a simulated route.
///
/// Each mode maps to a fixed meters-per-second constant except `Custom`,
/// which defers to the user-supplied scalar on [`RouteSimulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeedMode {
    #[default]
    Walk,
    Run,
    Drive,
    Flight,
    Custom,
}

impl SpeedMode {
    pub fn meters_per_second(self) -> f64 {
        match self {
            Self::Walk => 1.4,    // ~5 km/h
            Self::Run => 3.0,     // ~11 km/h
            Self::Drive => 13.9,  // ~50 km/h
            Self::Flight => 250.0, // ~900 km/h
            Self::Custom => 0.0,
        }
    }
}

/// Persisted configuration of a route simulation: the waypoints to traverse
/// in order (cyclically), the speed to traverse them at, and where traversal
/// currently is.
///
/// Two or more waypoints are required for the route to be runnable; fewer is
/// a valid but inert configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RouteSimulation {
    pub waypoints: Vec<Coordinate>,
    pub speed_mode: SpeedMode,
    pub custom_speed_mps: f64,
    pub is_active: bool,
    pub current_segment_index: usize,
}

impl RouteSimulation {
    /// The meters-per-second value actually used for traversal. Never
    /// negative; a negative custom speed clamps to a stationary zero.
    pub fn effective_speed_mps(&self) -> f64 {
        match self.speed_mode {
            SpeedMode::Custom => self.custom_speed_mps.max(0.0),
            mode => mode.meters_per_second(),
        }
    }

    pub fn is_runnable(&self) -> bool {
        self.waypoints.len() >= 2
    }

    /// Persisted segment index wrapped into the waypoint range.
    pub fn segment_index(&self) -> usize {
        if self.waypoints.is_empty() {
            0
        } else {
            self.current_segment_index % self.waypoints.len()
        }
    }
}
