use std::{path::PathBuf, sync::Arc};

use clap::{Parser, ValueEnum};
use locsim::{
    presets, Coordinate, JsonFileStore, RouteSimulation, SimulationEngine, SpeedMode,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Spoof a device location from a preset city or a waypoint route"
)]
struct Args {
    /// Path of the JSON location store
    #[arg(long, default_value = "locsim.json")]
    store: PathBuf,

    /// Pin the location to a named preset city (prefix match) and exit
    #[arg(long)]
    preset: Option<String>,

    /// JSON file holding an array of {"lat": .., "lon": ..} waypoints
    #[arg(long)]
    route: Option<PathBuf>,

    /// Traversal speed for the route
    #[arg(long, value_enum, default_value_t = SpeedArg::Walk)]
    speed: SpeedArg,

    /// Meters per second, used with --speed custom
    #[arg(long, default_value_t = 0.0)]
    custom_speed: f64,

    /// Number of position updates to log before exiting
    #[arg(long, default_value_t = 30)]
    ticks: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SpeedArg {
    Walk,
    Run,
    Drive,
    Flight,
    Custom,
}

impl From<SpeedArg> for SpeedMode {
    fn from(arg: SpeedArg) -> Self {
        match arg {
            SpeedArg::Walk => Self::Walk,
            SpeedArg::Run => Self::Run,
            SpeedArg::Drive => Self::Drive,
            SpeedArg::Flight => Self::Flight,
            SpeedArg::Custom => Self::Custom,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "locsim=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let store = Arc::new(JsonFileStore::open(&args.store));
    let engine = SimulationEngine::new(store);

    if let Some(name) = &args.preset {
        let preset = presets::preset_named(name)
            .unwrap_or_else(|| panic!("no preset city matching {name:?}"));
        engine
            .set_fixed_point(Some(preset.coordinate()))
            .expect("persist fixed point");
        tracing::info!(
            title = preset.title,
            lat = preset.latitude,
            lon = preset.longitude,
            "fixed point set"
        );
        return;
    }

    let Some(route_path) = &args.route else {
        match engine.current_position() {
            Some(position) => {
                tracing::info!(lat = position.lat, lon = position.lon, "current simulated position");
            }
            None => tracing::info!("no simulated position set"),
        }
        return;
    };

    let raw = std::fs::read_to_string(route_path).expect("read route file");
    let waypoints: Vec<Coordinate> = serde_json::from_str(&raw).expect("parse route waypoints");
    let simulation = RouteSimulation {
        waypoints,
        speed_mode: args.speed.into(),
        custom_speed_mps: args.custom_speed,
        is_active: true,
        current_segment_index: 0,
    };

    let mut updates = engine.subscribe();
    engine
        .set_route_simulation(simulation)
        .expect("persist route simulation");

    for _ in 0..args.ticks {
        match updates.recv().await {
            Ok(Some(position)) => {
                tracing::info!(
                    lat = position.lat,
                    lon = position.lon,
                    segment = ?engine.current_segment_index(),
                    "simulated position"
                );
            }
            Ok(None) => tracing::info!("simulated position cleared"),
            Err(err) => {
                tracing::warn!(%err, "notification stream closed");
                break;
            }
        }
    }

    engine.stop().expect("persist route deactivation");
}
