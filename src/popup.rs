//! Marker styling and popup markup.
//!
//! Display state is derived from a station snapshot once, at add/update
//! time, and handed to the renderer as plain values.

use std::fmt::Write as _;

use serde::Serialize;

use crate::config::MapConfig;
use crate::models::Station;

/// Icon geometry of a station marker, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub color: String,
    pub icon_size: (u32, u32),
    pub icon_anchor: (u32, u32),
    pub popup_anchor: (i32, i32),
}

impl MarkerStyle {
    /// Style for a station, colored by its status.
    #[must_use]
    pub fn for_station(station: &Station, config: &MapConfig) -> Self {
        Self {
            color: config.status_color(station.active).to_string(),
            icon_size: (40, 40),
            icon_anchor: (20, 40),
            popup_anchor: (0, -40),
        }
    }
}

/// Escape text for inclusion in HTML.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_optional(value: Option<f64>, unit: &str) -> String {
    value
        .map(|v| format!("{v:.1}{unit}"))
        .unwrap_or_else(|| "N/A".into())
}

/// Build the popup for a station marker.
///
/// Shows name, location, coordinates to four decimals, a status badge and
/// either the last update time or an explicit no-data line.
#[must_use]
pub fn station_popup(station: &Station, config: &MapConfig) -> String {
    let color = config.status_color(station.active);
    let status = if station.active { "✓ Active" } else { "✗ Inactive" };

    let mut html = String::new();
    html.push_str(r#"<div class="station-popup">"#);
    let _ = write!(html, "<h3>{}</h3>", escape_html(&station.name));
    let _ = write!(
        html,
        r#"<p class="location">{}</p>"#,
        escape_html(&station.location)
    );
    let _ = write!(
        html,
        r#"<p class="coords">{:.4}, {:.4}</p>"#,
        station.latitude, station.longitude
    );
    let _ = write!(
        html,
        r#"<span class="status-badge" style="background-color: {color};">{status}</span>"#
    );

    if let Some(reading) = &station.latest_reading {
        html.push_str(r#"<ul class="reading">"#);
        let _ = write!(html, "<li>Temp: {}</li>", format_optional(reading.temperature, "°C"));
        let _ = write!(html, "<li>Humidity: {}</li>", format_optional(reading.humidity, "%"));
        let _ = write!(html, "<li>Wind: {}</li>", format_optional(reading.wind_speed, " m/s"));
        let _ = write!(html, "<li>Rain: {}</li>", format_optional(reading.rain, " mm"));
        html.push_str("</ul>");
    }

    match station.last_data_time {
        Some(t) => {
            let _ = write!(
                html,
                r#"<p class="last-update">Last update: {}</p>"#,
                t.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        None => html.push_str(r#"<p class="no-data">No data available</p>"#),
    }

    html.push_str("</div>");
    html
}

/// Build the popup for a weather overlay circle.
#[must_use]
pub fn weather_popup(station: &Station) -> String {
    let reading = station.latest_reading.clone().unwrap_or_default();
    format!(
        r#"<div class="weather-popup"><strong>{}</strong><br>🌡️ Temp: {}<br>💧 Humidity: {}<br>💨 Wind: {}</div>"#,
        escape_html(&station.name),
        format_optional(reading.temperature, "°C"),
        format_optional(reading.humidity, "%"),
        format_optional(reading.wind_speed, " m/s"),
    )
}
