//! Route simulation engine.
//!
//! Owns the authoritative simulated position for the process. In the idle
//! state it defers to the persisted fixed-point override; while a route
//! simulation is active a single driver task advances an interpolated
//! position along the waypoint cycle once per tick and broadcasts every
//! update.
//!
//! Interpolation policy: constant-bearing great-circle stepping. The
//! reported position is the projection of the accumulated progress from the
//! current segment's start along its initial bearing; distance left over
//! when a segment boundary is crossed carries into the next segment.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError, RwLock,
};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::error::StoreError;
use crate::geodesic;
use crate::models::{Coordinate, RouteSimulation};
use crate::store::LocationStore;

/// Fixed driver period. Visual speed is tied to this nominal interval, not
/// to measured wall-clock time between ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

const NOTIFY_CAPACITY: usize = 64;

/// One leg of an active simulation. Replaced wholesale on every tick so a
/// concurrent reader observes either the pre-tick or post-tick value, never
/// a half-updated one.
#[derive(Debug, Clone, Copy)]
struct Leg {
    position: Coordinate,
    segment_start: Coordinate,
    segment_end: Coordinate,
    segment_length_m: f64,
    progress_m: f64,
    segment_index: usize,
    generation: u64,
}

/// The route simulation engine.
///
/// One explicitly owned instance per process, injected into whatever
/// intercepts location queries. Construct inside a tokio runtime; the tick
/// driver is a spawned task.
pub struct SimulationEngine {
    store: Arc<dyn LocationStore>,
    leg: Arc<RwLock<Option<Leg>>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    generation: Arc<AtomicU64>,
    notifier: broadcast::Sender<Option<Coordinate>>,
}

impl SimulationEngine {
    /// Builds an engine over the given store and restores persisted state:
    /// a stored route that is active and runnable resumes simulating.
    pub fn new(store: Arc<dyn LocationStore>) -> Self {
        let (notifier, _) = broadcast::channel(NOTIFY_CAPACITY);
        let engine = Self {
            store,
            leg: Arc::new(RwLock::new(None)),
            driver: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
            notifier,
        };
        let stored = engine.store.load_route_simulation();
        if stored.is_active && stored.is_runnable() {
            engine.start(&stored);
        }
        engine
    }

    /// The current simulated position, or `None` when nothing is simulated.
    ///
    /// While a route simulation runs this is the interpolated route
    /// position. Otherwise it is the persisted fixed-point override, unless
    /// either component is zero: a zero pair is the "unset" sentinel, not a
    /// real equatorial coordinate.
    pub fn current_position(&self) -> Option<Coordinate> {
        let leg = self.leg.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(leg) = *leg {
            return Some(leg.position);
        }
        drop(leg);
        self.store
            .load_fixed_point()
            .filter(|point| point.lat != 0.0 && point.lon != 0.0)
    }

    /// Index of the segment currently being traversed, while simulating.
    pub fn current_segment_index(&self) -> Option<usize> {
        let leg = self.leg.read().unwrap_or_else(PoisonError::into_inner);
        leg.map(|leg| leg.segment_index)
    }

    /// One message per position update, tick-driven or direct write.
    pub fn subscribe(&self) -> broadcast::Receiver<Option<Coordinate>> {
        self.notifier.subscribe()
    }

    /// Persists (or clears) the fixed-point override and notifies
    /// subscribers synchronously. Ignored by readers while a route
    /// simulation is active.
    pub fn set_fixed_point(&self, point: Option<Coordinate>) -> Result<(), StoreError> {
        self.store.save_fixed_point(point)?;
        self.notify();
        Ok(())
    }

    /// Persists the route configuration and reconciles the run state:
    /// active and runnable starts (or restarts) the driver, anything else
    /// stops it. Activating with fewer than two waypoints is a no-op run,
    /// not an error.
    pub fn set_route_simulation(&self, simulation: RouteSimulation) -> Result<(), StoreError> {
        self.store.save_route_simulation(&simulation)?;
        if simulation.is_active && simulation.is_runnable() {
            self.start(&simulation);
        } else {
            self.halt_driver();
        }
        self.notify();
        Ok(())
    }

    /// Returns the engine to idle and persists the deactivation, so the
    /// route does not resume on the next engine constructed over the same
    /// store. Idempotent; the transient route position is discarded and
    /// reads fall back to the fixed-point policy.
    pub fn stop(&self) -> Result<(), StoreError> {
        let mut stored = self.store.load_route_simulation();
        if stored.is_active {
            stored.is_active = false;
            self.store.save_route_simulation(&stored)?;
        }
        if self.halt_driver() {
            self.notify();
        }
        Ok(())
    }

    fn notify(&self) {
        let _ = self.notifier.send(self.current_position());
    }

    fn start(&self, simulation: &RouteSimulation) {
        self.halt_driver();

        let waypoints = simulation.waypoints.clone();
        let index = simulation.segment_index();
        let segment_start = waypoints[index];
        let segment_end = waypoints[(index + 1) % waypoints.len()];
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let step_m = simulation.effective_speed_mps() * TICK_INTERVAL.as_secs_f64();

        tracing::debug!(
            waypoints = waypoints.len(),
            segment = index,
            speed_mps = simulation.effective_speed_mps(),
            "starting route simulation"
        );

        let initial = Leg {
            position: waypoints[0],
            segment_start,
            segment_end,
            segment_length_m: geodesic::distance_meters(segment_start, segment_end),
            progress_m: 0.0,
            segment_index: index,
            generation,
        };
        *self.leg.write().unwrap_or_else(PoisonError::into_inner) = Some(initial);

        let leg = Arc::clone(&self.leg);
        let notifier = self.notifier.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(TICK_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick completes immediately; the first
            // position advance happens one full period after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let position = {
                    let mut guard = leg.write().unwrap_or_else(PoisonError::into_inner);
                    let Some(current) = *guard else { break };
                    if current.generation != generation {
                        break;
                    }
                    let next = advance(current, &waypoints, step_m);
                    *guard = Some(next);
                    next.position
                };
                tracing::trace!(lat = position.lat, lon = position.lon, "simulated position tick");
                let _ = notifier.send(Some(position));
            }
        });

        if let Some(previous) = self
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
        {
            previous.abort();
        }
    }

    /// Stops the driver and discards the transient route state. Returns
    /// whether a simulation was actually running.
    fn halt_driver(&self) -> bool {
        // Invalidate the current generation first so a driver mid-tick
        // cannot publish into the cleared (or replaced) state.
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        let was_running = self
            .leg
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if was_running {
            tracing::debug!("route simulation stopped");
        }
        was_running
    }
}

impl Drop for SimulationEngine {
    fn drop(&mut self) {
        self.halt_driver();
    }
}

/// Advances one nominal tick: add `step_m` to the progress along the
/// current segment, crossing as many segment boundaries as the step covers
/// and carrying the leftover distance into each next segment. Waypoints
/// cycle, so the index wraps from the last segment back to the first.
fn advance(current: Leg, waypoints: &[Coordinate], step_m: f64) -> Leg {
    let mut progress = current.progress_m + step_m.max(0.0);
    let mut index = current.segment_index;
    let mut segment_start = current.segment_start;
    let mut segment_end = current.segment_end;
    let mut length = current.segment_length_m;

    if progress >= length {
        // Fully coincident waypoints leave nowhere to go; hold position.
        if lap_meters(waypoints) <= 0.0 {
            return Leg {
                position: segment_start,
                progress_m: 0.0,
                ..current
            };
        }
        while progress >= length {
            progress -= length;
            index = (index + 1) % waypoints.len();
            segment_start = waypoints[index];
            segment_end = waypoints[(index + 1) % waypoints.len()];
            length = geodesic::distance_meters(segment_start, segment_end);
        }
    }

    let position = if progress > 0.0 {
        geodesic::destination(
            segment_start,
            geodesic::bearing_degrees(segment_start, segment_end),
            progress,
        )
    } else {
        segment_start
    };

    Leg {
        position,
        segment_start,
        segment_end,
        segment_length_m: length,
        progress_m: progress,
        segment_index: index,
        generation: current.generation,
    }
}

/// Total cyclic route length in meters.
fn lap_meters(waypoints: &[Coordinate]) -> f64 {
    let n = waypoints.len();
    (0..n)
        .map(|i| geodesic::distance_meters(waypoints[i], waypoints[(i + 1) % n]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg_for(waypoints: &[Coordinate], index: usize) -> Leg {
        let segment_start = waypoints[index];
        let segment_end = waypoints[(index + 1) % waypoints.len()];
        Leg {
            position: segment_start,
            segment_start,
            segment_end,
            segment_length_m: geodesic::distance_meters(segment_start, segment_end),
            progress_m: 0.0,
            segment_index: index,
            generation: 0,
        }
    }

    #[test]
    fn test_advance_moves_step_distance_along_segment() {
        let waypoints = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0)];
        let next = advance(leg_for(&waypoints, 0), &waypoints, 1.4);

        assert_eq!(next.segment_index, 0);
        assert!((next.progress_m - 1.4).abs() < 1e-9);
        let moved = geodesic::distance_meters(waypoints[0], next.position);
        assert!((moved - 1.4).abs() < 0.01, "moved {moved} m");
        assert!(next.position.lon > 0.0);
        assert!(next.position.lat.abs() < 1e-6);
    }

    #[test]
    fn test_advance_zero_step_is_stationary() {
        let waypoints = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0)];
        let mut leg = leg_for(&waypoints, 0);
        for _ in 0..5 {
            leg = advance(leg, &waypoints, 0.0);
        }
        assert_eq!(leg.segment_index, 0);
        assert_eq!(leg.progress_m, 0.0);
        assert_eq!(leg.position, waypoints[0]);
    }

    #[test]
    fn test_advance_carries_leftover_into_next_segment() {
        let waypoints = [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.001),
            Coordinate::new(0.001, 0.001),
        ];
        let first_length = geodesic::distance_meters(waypoints[0], waypoints[1]);
        let step = first_length + 10.0;

        let next = advance(leg_for(&waypoints, 0), &waypoints, step);
        assert_eq!(next.segment_index, 1);
        assert!((next.progress_m - 10.0).abs() < 1e-6);
        let into_second = geodesic::distance_meters(waypoints[1], next.position);
        assert!((into_second - 10.0).abs() < 0.1, "got {into_second} m");
    }

    #[test]
    fn test_advance_crosses_multiple_segments_in_one_tick() {
        let waypoints = [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.0001),
            Coordinate::new(0.0001, 0.0001),
            Coordinate::new(0.0001, 0.0),
        ];
        // ~11 m per segment; a 30 m step lands in the third segment.
        let next = advance(leg_for(&waypoints, 0), &waypoints, 30.0);
        assert_eq!(next.segment_index, 2);
    }

    #[test]
    fn test_advance_wraps_from_last_segment_to_first() {
        let waypoints = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.001)];
        let length = geodesic::distance_meters(waypoints[0], waypoints[1]);

        let mut leg = leg_for(&waypoints, 1);
        leg = advance(leg, &waypoints, length + 1.0);
        assert_eq!(leg.segment_index, 0);
        assert!((leg.progress_m - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_advance_exact_boundary_snaps_to_waypoint() {
        let waypoints = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.001)];
        let length = geodesic::distance_meters(waypoints[0], waypoints[1]);

        let next = advance(leg_for(&waypoints, 0), &waypoints, length);
        assert_eq!(next.segment_index, 1);
        assert_eq!(next.progress_m, 0.0);
        assert_eq!(next.position, waypoints[1]);
    }

    #[test]
    fn test_advance_holds_when_all_waypoints_coincide() {
        let waypoints = [Coordinate::new(10.0, 10.0), Coordinate::new(10.0, 10.0)];
        let next = advance(leg_for(&waypoints, 0), &waypoints, 100.0);
        assert_eq!(next.position, waypoints[0]);
        assert_eq!(next.progress_m, 0.0);
    }

    #[test]
    fn test_advance_visits_segments_in_order_regardless_of_step() {
        let waypoints = [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.01),
            Coordinate::new(0.01, 0.01),
        ];
        for step in [50.0, 300.0, 900.0] {
            let mut leg = leg_for(&waypoints, 0);
            let mut visited = vec![leg.segment_index];
            for _ in 0..200 {
                leg = advance(leg, &waypoints, step);
                if *visited.last().unwrap() != leg.segment_index {
                    visited.push(leg.segment_index);
                }
            }
            // Indices must only ever step forward cyclically.
            for pair in visited.windows(2) {
                assert_eq!(
                    (pair[0] + 1) % waypoints.len(),
                    pair[1],
                    "step {step} skipped a segment: {visited:?}"
                );
            }
            assert!(visited.len() > 3, "step {step} never wrapped: {visited:?}");
        }
    }
}
