//! Output formatters for station markers.
//!
//! Supports human-readable (with colors), JSON, NDJSON and GeoJSON formats.

use std::io::{self, Write};

use crate::cluster::Cluster;
use crate::models::{FeatureCollection, MarkerSnapshot};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[92m";
const RED: &str = "\x1b[91m";

const ICON_STATION: &str = "📍";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
    /// GeoJSON FeatureCollection
    Geojson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            "geojson" => Ok(Self::Geojson),
            _ => Err(format!(
                "unknown format: {s} (expected: human, json, ndjson, geojson)"
            )),
        }
    }
}

/// Write markers in human-readable format, one line each.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, markers: &[MarkerSnapshot]) -> io::Result<()> {
    for marker in markers {
        let (color, status) = if marker.active {
            (GREEN, "ACTIVE")
        } else {
            (RED, "INACTIVE")
        };
        let last = marker.last_data_time.as_deref().unwrap_or("no data");
        let temp = marker
            .temperature
            .map(|t| format!("{t:>5.1}°C"))
            .unwrap_or_else(|| "   --  ".into());

        writeln!(
            writer,
            "{ICON_STATION} {BOLD}{:<12}{RESET} │ {color}{status:8}{RESET} │ \
             {:>9.4}, {:>9.4} │ {temp} │ {DIM}{last}{RESET} │ {} ({})",
            marker.id, marker.latitude, marker.longitude, marker.name, marker.location
        )?;
    }
    Ok(())
}

/// Write markers as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, markers: &[MarkerSnapshot]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(markers)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write markers as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, markers: &[MarkerSnapshot]) -> io::Result<()> {
    for marker in markers {
        let json = serde_json::to_string(marker)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write markers as a GeoJSON `FeatureCollection`.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_geojson<W: Write>(writer: &mut W, markers: &[MarkerSnapshot]) -> io::Result<()> {
    let collection: FeatureCollection = markers.iter().cloned().collect();
    let json = serde_json::to_string_pretty(&collection)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write markers in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_markers<W: Write>(
    writer: &mut W,
    markers: &[MarkerSnapshot],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, markers),
        Format::Json => write_json(writer, markers),
        Format::Ndjson => write_ndjson(writer, markers),
        Format::Geojson => write_geojson(writer, markers),
    }
}

/// One-line summary of clusters, e.g. `3 clusters: 2×[A, B] 1×[C]`.
#[must_use]
pub fn cluster_summary(clusters: &[Cluster]) -> String {
    let groups: Vec<String> = clusters
        .iter()
        .map(|c| format!("{}×[{}]", c.len(), c.station_ids.join(", ")))
        .collect();
    format!("{} clusters: {}", clusters.len(), groups.join(" "))
}
