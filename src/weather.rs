//! Weather overlay: temperature circles over the station markers.

use serde::Serialize;

use crate::models::Station;
use crate::popup::weather_popup;
use crate::renderer::CircleMarker;

const MIN_RADIUS: f64 = 5.0;
const MAX_RADIUS: f64 = 20.0;

/// What the map is currently showing on top of the base layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DisplayMode {
    /// Station markers only
    #[default]
    Stations,
    /// Station markers plus the temperature overlay
    Weather,
}

/// Fill color for a temperature in °C.
#[must_use]
pub fn temperature_color(temp: f64) -> &'static str {
    match temp {
        t if t < -10.0 => "#0284c7", // cold blue
        t if t < 0.0 => "#06b6d4",   // cool cyan
        t if t < 10.0 => "#10b981",  // cool green
        t if t < 20.0 => "#eab308",  // warm yellow
        t if t < 30.0 => "#f97316",  // warm orange
        t if t < 40.0 => "#dc2626",  // hot red
        _ => "#7c2d12",              // extreme
    }
}

/// Circle radius in pixels for a temperature.
#[must_use]
pub fn temperature_radius(temp: f64) -> f64 {
    (temp / 2.0).clamp(MIN_RADIUS, MAX_RADIUS)
}

/// One circle per station that has a temperature reading.
#[must_use]
pub fn weather_circles(stations: &[Station]) -> Vec<CircleMarker> {
    stations
        .iter()
        .filter_map(|station| {
            let temp = station.temperature()?;
            Some(CircleMarker {
                station_id: station.id.clone(),
                position: station.position(),
                radius: temperature_radius(temp),
                fill_color: temperature_color(temp).to_string(),
                popup: weather_popup(station),
            })
        })
        .collect()
}
