//! Error types for stationmap.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that can occur in stationmap operations.
///
/// Unknown station ids are never errors: update, remove and highlight on
/// an id without a marker are silent no-ops.
#[derive(Error, Debug)]
pub enum StationMapError {
    /// The renderer could not resolve the display surface
    #[error("map container '{0}' not found")]
    ContainerNotFound(String),

    /// A marker operation ran before `initialize`
    #[error("map viewport is not initialized")]
    ViewportNotReady,

    /// Station record failed validation
    #[error("invalid station: {0}")]
    InvalidStation(String),

    /// Base layer name not configured on this view
    #[error("unknown base layer: {0}")]
    UnknownLayer(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Reading a station file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API returned an error status
    #[error("station API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}
