//! Map view configuration.
//!
//! Every tunable of the map view lives here with the dashboard's defaults.
//! A JSON file may override any subset of fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::StationMapError;
use crate::geo::LatLng;

/// Marker color for stations reporting as active.
pub const ACTIVE_COLOR: &str = "#10b981";

/// Marker color for inactive stations.
pub const INACTIVE_COLOR: &str = "#ef4444";

/// A background tile layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    /// Name shown in the layer switcher
    pub name: String,
    /// URL template with `{s}`, `{z}`, `{x}`, `{y}` placeholders
    pub url_template: String,
    pub attribution: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl TileLayer {
    /// Standard OpenStreetMap tiles.
    #[must_use]
    pub fn openstreetmap() -> Self {
        Self {
            name: "Map".into(),
            url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".into(),
            attribution: "© OpenStreetMap contributors".into(),
            min_zoom: 2,
            max_zoom: 19,
        }
    }

    /// Esri world imagery.
    #[must_use]
    pub fn satellite() -> Self {
        Self {
            name: "Satellite".into(),
            url_template:
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
                    .into(),
            attribution: "Tiles © Esri".into(),
            min_zoom: 2,
            max_zoom: 19,
        }
    }
}

/// Options for the marker cluster layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    /// Markers closer than this many pixels collapse into one cluster
    pub max_cluster_radius: f64,
    /// From this zoom upward every marker is shown individually
    pub disable_clustering_at_zoom: u8,
    pub spiderfy_on_max_zoom: bool,
    pub show_coverage_on_hover: bool,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            max_cluster_radius: 80.0,
            disable_clustering_at_zoom: 15,
            spiderfy_on_max_zoom: true,
            show_coverage_on_hover: true,
        }
    }
}

/// Map view configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// World overview shown before fitting and when there are no markers
    pub default_center: LatLng,
    pub default_zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Base layers; the first one is visible after initialization
    pub base_layers: Vec<TileLayer>,
    pub cluster: ClusterOptions,
    /// Pixels kept free on each side when fitting bounds
    pub fit_padding: f64,
    /// Fitting never zooms in past this level
    pub fit_max_zoom: u8,
    /// Zoom used by `highlight_marker`
    pub highlight_zoom: u8,
    /// Hover-out closes popups only below this zoom
    pub popup_close_below_zoom: u8,
    pub active_color: String,
    pub inactive_color: String,
    pub search_placeholder: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_center: LatLng::new(40.0, 10.0),
            default_zoom: 4,
            min_zoom: 2,
            max_zoom: 19,
            base_layers: vec![TileLayer::openstreetmap(), TileLayer::satellite()],
            cluster: ClusterOptions::default(),
            fit_padding: 50.0,
            fit_max_zoom: 12,
            highlight_zoom: 14,
            popup_close_below_zoom: 13,
            active_color: ACTIVE_COLOR.into(),
            inactive_color: INACTIVE_COLOR.into(),
            search_placeholder: "Search station...".into(),
        }
    }
}

impl MapConfig {
    /// Load a configuration file; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, StationMapError> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Marker color for a station status.
    #[must_use]
    pub fn status_color(&self, active: bool) -> &str {
        if active {
            &self.active_color
        } else {
            &self.inactive_color
        }
    }

    /// Clamp a zoom level into the configured range.
    #[must_use]
    pub fn clamp_zoom(&self, zoom: u8) -> u8 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}
