//! Weather station map view.
//!
//! Keeps a map viewport and one marker per station in sync with a station
//! list: markers are colored by station status, carry an HTML popup, are
//! grouped into pixel-radius clusters and the viewport is fitted to their
//! bounds. Drawing goes through the [`renderer::MapRenderer`] trait so the
//! same view logic runs against a headless surface.

pub mod client;
pub mod cluster;
pub mod config;
pub mod errors;
pub mod geo;
pub mod models;
pub mod output;
pub mod popup;
pub mod registry;
pub mod renderer;
pub mod view;
pub mod weather;

pub use config::MapConfig;
pub use errors::StationMapError;
pub use models::Station;
pub use renderer::{HeadlessRenderer, MapRenderer};
pub use view::{StationMapView, SyncStats, Viewport};
