//! Well-known city coordinates offered as one-tap fixed points.

use crate::models::Coordinate;

#[derive(Debug, Clone, Copy)]
pub struct PresetLocation {
    pub title: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

impl PresetLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

pub const PRESET_LOCATIONS: &[PresetLocation] = &[
    PresetLocation {
        title: "London, England",
        latitude: 51.509980,
        longitude: -0.133700,
    },
    PresetLocation {
        title: "Johannesburg, South Africa",
        latitude: -26.204103,
        longitude: 28.047305,
    },
    PresetLocation {
        title: "Moscow, Russia",
        latitude: 55.755786,
        longitude: 37.617633,
    },
    PresetLocation {
        title: "Mumbai, India",
        latitude: 19.017615,
        longitude: 72.856164,
    },
    PresetLocation {
        title: "Tokyo, Japan",
        latitude: 35.702069,
        longitude: 139.775327,
    },
    PresetLocation {
        title: "Sydney, Australia",
        latitude: -33.863400,
        longitude: 151.211000,
    },
    PresetLocation {
        title: "Hong Kong, China",
        latitude: 22.284681,
        longitude: 114.158177,
    },
    PresetLocation {
        title: "Honolulu, HI, USA",
        latitude: 21.282778,
        longitude: -157.829444,
    },
    PresetLocation {
        title: "San Francisco, CA, USA",
        latitude: 37.787359,
        longitude: -122.408227,
    },
    PresetLocation {
        title: "Mexico City, Mexico",
        latitude: 19.435478,
        longitude: -99.136479,
    },
    PresetLocation {
        title: "New York, NY, USA",
        latitude: 40.759211,
        longitude: -73.984638,
    },
    PresetLocation {
        title: "Rio de Janeiro, Brazil",
        latitude: -22.903539,
        longitude: -43.209587,
    },
];

/// Case-insensitive lookup by (a prefix of) the preset title.
pub fn preset_named(name: &str) -> Option<&'static PresetLocation> {
    let needle = name.to_ascii_lowercase();
    PRESET_LOCATIONS
        .iter()
        .find(|preset| preset.title.to_ascii_lowercase().starts_with(&needle))
}

/// Maps a stored fixed point back to the preset it came from, if any.
/// Exact comparison is intentional: presets are only ever written verbatim.
pub fn preset_index_of(coordinate: Coordinate) -> Option<usize> {
    PRESET_LOCATIONS
        .iter()
        .position(|preset| preset.latitude == coordinate.lat && preset.longitude == coordinate.lon)
}
