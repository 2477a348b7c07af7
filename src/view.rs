//! Station map view.
//!
//! Owns one viewport and the station markers shown on it. The caller
//! constructs the view, initializes it against a container and then keeps
//! markers in sync with its station list through add/update/remove.
//! Operations on unknown station IDs are silent no-ops.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cluster::{Cluster, cluster_markers};
use crate::config::MapConfig;
use crate::errors::StationMapError;
use crate::geo::{LatLng, LatLngBounds, Point, bounds_zoom, project, projected_center, unproject};
use crate::models::{MarkerSnapshot, Station};
use crate::popup::{MarkerStyle, station_popup};
use crate::registry::{MarkerEntry, MarkerRegistry, SelectCallback, UpsertResult};
use crate::renderer::{Control, LayerHandle, MapRenderer, MarkerHandle, SurfaceId};
use crate::weather::{DisplayMode, weather_circles};

/// Current map viewport and the layers installed on it.
#[derive(Debug, Clone, Serialize)]
pub struct Viewport {
    pub container: String,
    pub surface: SurfaceId,
    pub center: LatLng,
    pub zoom: u8,
    /// Name of the visible base layer
    pub base_layer: Option<String>,
    pub controls: Vec<Control>,
    #[serde(skip)]
    base_layers: Vec<(String, LayerHandle)>,
    #[serde(skip)]
    cluster_group: LayerHandle,
}

/// Outcome of [`StationMapView::sync_stations`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub added: usize,
    pub updated: usize,
    /// Stations whose coordinates changed; re-added at the new position
    pub moved: usize,
    pub removed: usize,
    /// Records that failed validation
    pub skipped: usize,
}

/// A map view over a set of station markers.
pub struct StationMapView<R: MapRenderer> {
    renderer: R,
    config: MapConfig,
    viewport: Option<Viewport>,
    markers: MarkerRegistry,
    weather_layer: Option<LayerHandle>,
    display_mode: DisplayMode,
    search_term: String,
}

impl<R: MapRenderer> StationMapView<R> {
    /// Create an uninitialized view. Nothing is rendered until
    /// [`initialize`](Self::initialize).
    pub fn new(renderer: R, config: MapConfig) -> Self {
        Self {
            renderer,
            config,
            viewport: None,
            markers: MarkerRegistry::new(),
            weather_layer: None,
            display_mode: DisplayMode::default(),
            search_term: String::new(),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    /// Create the viewport on `container`.
    ///
    /// Idempotent: once initialized, further calls return the existing
    /// viewport and ignore their arguments. With initial stations, a marker
    /// is added for each valid one and the view is fitted to them.
    ///
    /// # Errors
    ///
    /// Returns `ContainerNotFound` if the renderer cannot resolve the
    /// container. No state is kept in that case.
    pub fn initialize(
        &mut self,
        container: &str,
        initial_stations: &[Station],
    ) -> Result<&Viewport, StationMapError> {
        if self.viewport.is_some() {
            debug!("map already initialized, ignoring initialize({})", container);
        } else {
            self.create_viewport(container)?;

            if !initial_stations.is_empty() {
                for station in initial_stations {
                    if let Err(e) = self.add_station_marker(station, None) {
                        warn!("skipping station {}: {}", station.id, e);
                    }
                }
                self.fit_map_bounds()?;
            }
        }

        self.viewport.as_ref().ok_or(StationMapError::ViewportNotReady)
    }

    fn create_viewport(&mut self, container: &str) -> Result<(), StationMapError> {
        let surface = self
            .renderer
            .attach(container)
            .ok_or_else(|| StationMapError::ContainerNotFound(container.to_string()))?;

        let mut base_layers = Vec::with_capacity(self.config.base_layers.len());
        for (i, layer) in self.config.base_layers.iter().enumerate() {
            let handle = self.renderer.add_tile_layer(surface, layer);
            self.renderer.set_layer_visible(handle, i == 0);
            base_layers.push((layer.name.clone(), handle));
        }

        let controls = vec![
            Control::LayerSwitcher(base_layers.iter().map(|(name, _)| name.clone()).collect()),
            Control::Scale,
            Control::Search {
                placeholder: self.config.search_placeholder.clone(),
            },
        ];

        let cluster_group = self.renderer.add_cluster_group(surface, &self.config.cluster);
        for control in &controls {
            self.renderer.add_control(surface, control);
        }

        let center = self.config.default_center;
        let zoom = self.config.default_zoom;
        self.renderer.set_view(surface, center, zoom, false);

        info!(
            "map initialized on {} ({} base layers, cluster radius {}px)",
            container,
            base_layers.len(),
            self.config.cluster.max_cluster_radius
        );

        self.viewport = Some(Viewport {
            container: container.to_string(),
            surface,
            center,
            zoom,
            base_layer: base_layers.first().map(|(name, _)| name.clone()),
            controls,
            base_layers,
            cluster_group,
        });
        Ok(())
    }

    /// Place a marker for `station`, replacing any existing marker with the
    /// same ID. The view is not refitted.
    ///
    /// # Errors
    ///
    /// Returns `ViewportNotReady` before initialization and
    /// `InvalidStation` for an empty ID or out-of-range coordinates.
    pub fn add_station_marker(
        &mut self,
        station: &Station,
        on_select: Option<SelectCallback>,
    ) -> Result<MarkerHandle, StationMapError> {
        let group = self
            .viewport
            .as_ref()
            .map(|v| v.cluster_group)
            .ok_or(StationMapError::ViewportNotReady)?;
        station.validate()?;

        let position = station.position();
        let style = MarkerStyle::for_station(station, &self.config);
        let popup = station_popup(station, &self.config);

        let handle = self.renderer.create_marker(position, &style, &popup);
        self.renderer.add_to_group(group, handle);

        let entry = MarkerEntry {
            station: station.clone(),
            handle,
            position,
            style,
            popup,
            on_select,
        };

        if let UpsertResult::Replaced(old) = self.markers.upsert(entry) {
            debug!("replacing marker for station {}", station.id);
            self.renderer.remove_from_group(group, old.handle);
        } else {
            debug!("added marker for station {}", station.id);
        }

        Ok(handle)
    }

    /// Refresh popup and style of an existing marker from a new snapshot.
    ///
    /// The marker is never moved: relocating a station takes a remove
    /// followed by an add. Returns `false` if the station has no marker.
    pub fn update_station_marker(&mut self, station: &Station) -> bool {
        let Some(entry) = self.markers.get_mut(&station.id) else {
            return false;
        };

        if entry.position != station.position() {
            debug!(
                "station {} moved; marker stays at its original position",
                station.id
            );
        }

        entry.style = MarkerStyle::for_station(station, &self.config);
        entry.popup = station_popup(station, &self.config);
        entry.station = station.clone();
        self.renderer.set_marker_style(entry.handle, &entry.style);
        self.renderer.set_popup_content(entry.handle, &entry.popup);
        true
    }

    /// Remove a station's marker. Returns `false` if it had none.
    pub fn remove_station_marker(&mut self, station_id: &str) -> bool {
        let Some(group) = self.viewport.as_ref().map(|v| v.cluster_group) else {
            return false;
        };
        match self.markers.remove(station_id) {
            Some(entry) => {
                self.renderer.remove_from_group(group, entry.handle);
                debug!("removed marker for station {}", station_id);
                true
            }
            None => false,
        }
    }

    /// Drop every marker. Viewport and layers are left as they are.
    pub fn clear_all_markers(&mut self) {
        if let Some(viewport) = &self.viewport {
            self.renderer.clear_group(viewport.cluster_group);
        }
        self.markers.clear();
    }

    /// Fit the view to all markers.
    ///
    /// With no markers the default center and zoom are restored. Degenerate
    /// bounds (one marker, coincident markers) fit at the zoom cap; bounds
    /// that cannot be computed fall back to the default view.
    ///
    /// # Errors
    ///
    /// Returns `ViewportNotReady` before initialization.
    pub fn fit_map_bounds(&mut self) -> Result<(), StationMapError> {
        let surface = self
            .viewport
            .as_ref()
            .map(|v| v.surface)
            .ok_or(StationMapError::ViewportNotReady)?;

        let default_view = (self.config.default_center, self.config.default_zoom);
        let target = match LatLngBounds::from_points(self.markers.iter().map(|e| e.position)) {
            None => default_view,
            Some(bounds) => self.fit_target(surface, &bounds).unwrap_or_else(|| {
                warn!("could not fit bounds {:?}, using default view", bounds);
                default_view
            }),
        };

        self.apply_view(target.0, target.1, false);
        Ok(())
    }

    fn fit_target(&self, surface: SurfaceId, bounds: &LatLngBounds) -> Option<(LatLng, u8)> {
        if !bounds.is_valid() {
            return None;
        }
        let (width, height) = self.renderer.surface_size(surface);
        let max_zoom = self.config.fit_max_zoom.min(self.config.max_zoom);
        let zoom = bounds_zoom(
            bounds,
            width,
            height,
            self.config.fit_padding,
            self.config.min_zoom,
            max_zoom,
        );
        let center = projected_center(bounds);
        center.is_valid().then_some((center, zoom))
    }

    fn apply_view(&mut self, center: LatLng, zoom: u8, animate: bool) {
        let Some(viewport) = self.viewport.as_mut() else {
            return;
        };
        viewport.center = center;
        viewport.zoom = zoom;
        self.renderer.set_view(viewport.surface, center, zoom, animate);
    }

    /// Open a station's popup and fly to it. Returns `false` if it has no
    /// marker.
    pub fn highlight_marker(&mut self, station_id: &str) -> bool {
        let Some((handle, position)) = self.markers.get(station_id).map(|e| (e.handle, e.position))
        else {
            return false;
        };
        self.renderer.open_popup(handle);
        self.apply_view(position, self.config.highlight_zoom, true);
        true
    }

    pub fn get_marker(&self, station_id: &str) -> Option<&MarkerEntry> {
        self.markers.get(station_id)
    }

    /// All markers in no particular order.
    pub fn list_markers(&self) -> Vec<&MarkerEntry> {
        self.markers.iter().collect()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Marker clusters at the current zoom; empty before initialization.
    pub fn clusters(&self) -> Vec<Cluster> {
        match &self.viewport {
            Some(viewport) => self.clusters_at(viewport.zoom),
            None => Vec::new(),
        }
    }

    pub fn clusters_at(&self, zoom: u8) -> Vec<Cluster> {
        cluster_markers(
            self.markers.iter().map(|e| (e.id(), e.position)),
            zoom,
            &self.config.cluster,
        )
    }

    /// Area currently visible, from the viewport center, zoom and surface size.
    pub fn visible_bounds(&self) -> Option<LatLngBounds> {
        let viewport = self.viewport.as_ref()?;
        let (width, height) = self.renderer.surface_size(viewport.surface);
        let center = project(viewport.center, viewport.zoom);
        let south_west = unproject(
            Point {
                x: center.x - width / 2.0,
                y: center.y + height / 2.0,
            },
            viewport.zoom,
        );
        let north_east = unproject(
            Point {
                x: center.x + width / 2.0,
                y: center.y - height / 2.0,
            },
            viewport.zoom,
        );
        Some(LatLngBounds {
            south_west,
            north_east,
        })
    }

    /// Marker click: hand the station snapshot to its select callback.
    pub fn click_marker(&mut self, station_id: &str) -> bool {
        let Some(entry) = self.markers.get_mut(station_id) else {
            return false;
        };
        if let Some(on_select) = entry.on_select.as_mut() {
            on_select(&entry.station);
        }
        true
    }

    /// Pointer entered a marker: show its popup.
    pub fn hover_marker(&mut self, station_id: &str) {
        if let Some(entry) = self.markers.get(station_id) {
            self.renderer.open_popup(entry.handle);
        }
    }

    /// Pointer left a marker. Popups only auto-close while zoomed out.
    pub fn unhover_marker(&mut self, station_id: &str) {
        let Some(zoom) = self.viewport.as_ref().map(|v| v.zoom) else {
            return;
        };
        if zoom >= self.config.popup_close_below_zoom {
            return;
        }
        if let Some(entry) = self.markers.get(station_id) {
            self.renderer.close_popup(entry.handle);
        }
    }

    /// Record a pan/zoom made by the user on the rendered map.
    pub fn handle_view_change(&mut self, center: LatLng, zoom: u8) {
        if !center.is_valid() {
            warn!("ignoring view change to invalid center {:?}", center);
            return;
        }
        let zoom = self.config.clamp_zoom(zoom);
        if let Some(viewport) = self.viewport.as_mut() {
            viewport.center = center;
            viewport.zoom = zoom;
        }
    }

    /// Switch the visible base layer.
    ///
    /// # Errors
    ///
    /// Returns `ViewportNotReady` before initialization and `UnknownLayer`
    /// for a name that is not configured.
    pub fn select_base_layer(&mut self, name: &str) -> Result<(), StationMapError> {
        let viewport = self.viewport.as_mut().ok_or(StationMapError::ViewportNotReady)?;
        if !viewport.base_layers.iter().any(|(n, _)| n == name) {
            return Err(StationMapError::UnknownLayer(name.to_string()));
        }
        for (layer_name, handle) in &viewport.base_layers {
            self.renderer.set_layer_visible(*handle, layer_name == name);
        }
        viewport.base_layer = Some(name.to_string());
        Ok(())
    }

    /// Keystroke in the search box. The term is recorded; markers are not
    /// filtered.
    pub fn on_search_input(&mut self, term: &str) {
        self.search_term = term.to_lowercase();
        debug!("map search input: {:?}", self.search_term);
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Replace the weather overlay with circles for `stations` that have a
    /// temperature. Returns the number of circles drawn; no layer is added
    /// when that is zero.
    ///
    /// # Errors
    ///
    /// Returns `ViewportNotReady` before initialization.
    pub fn add_weather_layer(&mut self, stations: &[Station]) -> Result<usize, StationMapError> {
        let surface = self
            .viewport
            .as_ref()
            .map(|v| v.surface)
            .ok_or(StationMapError::ViewportNotReady)?;

        self.remove_weather_layer();

        let circles = weather_circles(stations);
        if circles.is_empty() {
            return Ok(0);
        }

        let layer = self.renderer.add_circle_layer(surface, &circles);
        self.weather_layer = Some(layer);
        self.display_mode = DisplayMode::Weather;
        debug!("weather overlay with {} circles", circles.len());
        Ok(circles.len())
    }

    /// Drop the weather overlay. Returns `false` if there was none.
    pub fn remove_weather_layer(&mut self) -> bool {
        let (Some(layer), Some(viewport)) = (self.weather_layer.take(), &self.viewport) else {
            return false;
        };
        self.renderer.remove_layer(viewport.surface, layer);
        self.display_mode = DisplayMode::Stations;
        true
    }

    pub fn weather_layer(&self) -> Option<LayerHandle> {
        self.weather_layer
    }

    /// Switch between plain station markers and the weather overlay.
    /// Turning the overlay off removes it.
    pub fn toggle_weather_visualization(&mut self, enable: bool) {
        match (enable, self.display_mode) {
            (true, DisplayMode::Stations) => self.display_mode = DisplayMode::Weather,
            (false, DisplayMode::Weather) => {
                self.remove_weather_layer();
                self.display_mode = DisplayMode::Stations;
            }
            _ => {}
        }
    }

    /// Bring the markers in line with a fresh station list and refit.
    ///
    /// Stations missing from the list lose their marker, known ones are
    /// updated in place (or removed and re-added when their coordinates
    /// changed, keeping the select callback) and new ones are added.
    /// A record that fails validation counts as skipped and its station's
    /// existing marker is removed.
    ///
    /// # Errors
    ///
    /// Returns `ViewportNotReady` before initialization.
    pub fn sync_stations(&mut self, stations: &[Station]) -> Result<SyncStats, StationMapError> {
        if self.viewport.is_none() {
            return Err(StationMapError::ViewportNotReady);
        }
        let mut stats = SyncStats::default();

        let wanted: HashSet<&str> = stations
            .iter()
            .filter(|s| s.validate().is_ok())
            .map(|s| s.id.as_str())
            .collect();
        let stale: Vec<String> = self
            .markers
            .iter()
            .map(|e| e.id().to_string())
            .filter(|id| !wanted.contains(id.as_str()))
            .collect();
        for id in stale {
            self.remove_station_marker(&id);
            stats.removed += 1;
        }

        for station in stations {
            if let Err(e) = station.validate() {
                warn!("skipping station: {}", e);
                stats.skipped += 1;
                continue;
            }
            match self.markers.get(&station.id).map(|e| e.position) {
                Some(position) if position == station.position() => {
                    self.update_station_marker(station);
                    stats.updated += 1;
                }
                Some(_) => {
                    let on_select = self
                        .markers
                        .get_mut(&station.id)
                        .and_then(|e| e.on_select.take());
                    self.add_station_marker(station, on_select)?;
                    stats.moved += 1;
                }
                None => {
                    self.add_station_marker(station, None)?;
                    stats.added += 1;
                }
            }
        }

        self.fit_map_bounds()?;
        debug!("synced stations: {:?}", stats);
        Ok(stats)
    }

    /// Output rows for every marker, sorted by station ID.
    pub fn snapshots(&self) -> Vec<MarkerSnapshot> {
        let mut rows: Vec<MarkerSnapshot> = self
            .markers
            .iter()
            .map(|entry| MarkerSnapshot {
                id: entry.station.id.clone(),
                name: entry.station.name.clone(),
                location: entry.station.location.clone(),
                latitude: entry.position.lat,
                longitude: entry.position.lng,
                active: entry.station.active,
                color: entry.style.color.clone(),
                last_data_time: entry.station.last_data_time.map(|t| t.to_rfc3339()),
                temperature: entry.station.temperature(),
            })
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::models::LatestReading;
    use crate::renderer::HeadlessRenderer;

    const CONTAINER: &str = "map-container";

    fn station(id: &str, active: bool, lat: f64, lon: f64) -> Station {
        Station {
            id: id.into(),
            name: format!("Station {id}"),
            location: "Spain".into(),
            latitude: lat,
            longitude: lon,
            active,
            last_data_time: None,
            latest_reading: None,
        }
    }

    fn view() -> StationMapView<HeadlessRenderer> {
        let renderer = HeadlessRenderer::new().with_container(CONTAINER, 800.0, 600.0);
        StationMapView::new(renderer, MapConfig::default())
    }

    fn ready_view() -> StationMapView<HeadlessRenderer> {
        let mut view = view();
        view.initialize(CONTAINER, &[]).unwrap();
        view
    }

    fn color(view: &StationMapView<HeadlessRenderer>, id: &str) -> String {
        let handle = view.get_marker(id).unwrap().handle;
        view.renderer().marker(handle).unwrap().style.color.clone()
    }

    #[test]
    fn test_initialize_installs_layers_and_controls() {
        let mut view = view();
        view.initialize(CONTAINER, &[]).unwrap();
        let viewport = view.viewport().unwrap();

        assert_eq!(viewport.zoom, 4);
        assert_eq!(viewport.center, LatLng::new(40.0, 10.0));
        assert_eq!(viewport.base_layer.as_deref(), Some("Map"));
        assert_eq!(viewport.controls.len(), 3);
        assert!(viewport.controls.contains(&Control::Scale));

        let surface = view.renderer().surface(viewport.surface).unwrap();
        assert_eq!(surface.tile_layers.len(), 2);
        assert_eq!(surface.cluster_groups.len(), 1);
        assert!(view.renderer().is_layer_visible(surface.tile_layers[0]));
        assert!(!view.renderer().is_layer_visible(surface.tile_layers[1]));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut view = view();
        let first = view.initialize(CONTAINER, &[]).unwrap().surface;
        let second = view
            .initialize(CONTAINER, &[station("A", true, 40.0, -3.0)])
            .unwrap()
            .surface;

        assert_eq!(first, second);
        assert_eq!(view.renderer().surface_count(), 1);
        let surface = view.renderer().surface(first).unwrap();
        assert_eq!(surface.tile_layers.len(), 2);
        assert_eq!(surface.controls.len(), 3);
        assert_eq!(view.marker_count(), 0);
    }

    #[test]
    fn test_missing_container_leaves_no_state() {
        let mut view = view();
        let err = view.initialize("nope", &[]).unwrap_err();
        assert!(matches!(err, StationMapError::ContainerNotFound(ref c) if c == "nope"));
        assert!(view.viewport().is_none());
        assert_eq!(view.renderer().surface_count(), 0);

        // a later call with the right container still works
        assert!(view.initialize(CONTAINER, &[]).is_ok());
    }

    #[test]
    fn test_initialize_with_stations_fits() {
        let mut view = view();
        let stations = [station("A", true, 40.0, -3.0), station("B", false, 41.0, 2.0)];
        let viewport = view.initialize(CONTAINER, &stations).unwrap();
        assert_eq!(viewport.zoom, 7);
        assert_eq!(view.marker_count(), 2);
    }

    #[test]
    fn test_operations_before_initialize() {
        let mut view = view();
        let s = station("A", true, 40.0, -3.0);
        assert!(matches!(
            view.add_station_marker(&s, None),
            Err(StationMapError::ViewportNotReady)
        ));
        assert!(matches!(view.fit_map_bounds(), Err(StationMapError::ViewportNotReady)));
        assert!(!view.update_station_marker(&s));
        assert!(!view.remove_station_marker("A"));
        assert!(!view.highlight_marker("A"));
        view.clear_all_markers();
        assert!(view.clusters().is_empty());
    }

    #[test]
    fn test_add_two_stations_and_fit() {
        let mut view = ready_view();
        view.add_station_marker(&station("A", true, 40.0, -3.0), None).unwrap();
        view.add_station_marker(&station("B", false, 41.0, 2.0), None).unwrap();

        assert_eq!(view.list_markers().len(), 2);
        assert_eq!(color(&view, "A"), "#10b981");
        assert_eq!(color(&view, "B"), "#ef4444");

        view.fit_map_bounds().unwrap();
        let visible = view.visible_bounds().unwrap();
        assert!(visible.contains(LatLng::new(40.0, -3.0)));
        assert!(visible.contains(LatLng::new(41.0, 2.0)));
        assert!(view.viewport().unwrap().zoom <= 12);
    }

    #[test]
    fn test_add_does_not_refit() {
        let mut view = ready_view();
        view.add_station_marker(&station("A", true, 40.0, -3.0), None).unwrap();
        let viewport = view.viewport().unwrap();
        assert_eq!(viewport.zoom, 4);
        assert_eq!(viewport.center, LatLng::new(40.0, 10.0));
    }

    #[test]
    fn test_same_id_replaces_entry() {
        let mut view = ready_view();
        let first = view.add_station_marker(&station("A", true, 40.0, -3.0), None).unwrap();
        let second = view.add_station_marker(&station("A", false, 40.0, -3.0), None).unwrap();

        assert_ne!(first, second);
        assert_eq!(view.marker_count(), 1);
        assert_eq!(view.get_marker("A").unwrap().handle, second);
        assert_eq!(color(&view, "A"), "#ef4444");
        // the replaced marker is released
        assert!(view.renderer().marker(first).is_none());
        assert_eq!(view.renderer().marker_count(), 1);
    }

    #[test]
    fn test_invalid_station_rejected() {
        let mut view = ready_view();
        let err = view
            .add_station_marker(&station("A", true, 95.0, 0.0), None)
            .unwrap_err();
        assert!(matches!(err, StationMapError::InvalidStation(_)));
        assert_eq!(view.marker_count(), 0);
    }

    #[test]
    fn test_update_unknown_is_noop() {
        let mut view = ready_view();
        view.add_station_marker(&station("A", true, 40.0, -3.0), None).unwrap();
        assert!(!view.update_station_marker(&station("Z", true, 1.0, 1.0)));
        assert_eq!(view.marker_count(), 1);
        assert!(view.get_marker("Z").is_none());
    }

    #[test]
    fn test_update_refreshes_popup_but_not_position() {
        let mut view = ready_view();
        view.add_station_marker(&station("A", true, 40.0, -3.0), None).unwrap();

        let mut moved = station("A", false, 45.0, 5.0);
        moved.latest_reading = Some(LatestReading {
            temperature: Some(18.0),
            ..LatestReading::default()
        });
        assert!(view.update_station_marker(&moved));

        let entry = view.get_marker("A").unwrap();
        assert_eq!(entry.position, LatLng::new(40.0, -3.0));
        assert!(!entry.station.active);

        let rendered = view.renderer().marker(entry.handle).unwrap();
        assert_eq!(rendered.position, LatLng::new(40.0, -3.0));
        assert!(rendered.popup.contains("Temp: 18.0°C"));
        assert!(rendered.popup.contains("✗ Inactive"));
        assert_eq!(rendered.style.color, "#ef4444");
    }

    #[test]
    fn test_remove_marker() {
        let mut view = ready_view();
        let handle = view.add_station_marker(&station("A", true, 40.0, -3.0), None).unwrap();

        assert!(!view.remove_station_marker("never-added"));
        assert!(view.get_marker("never-added").is_none());

        assert!(view.remove_station_marker("A"));
        assert!(view.get_marker("A").is_none());
        assert!(view.renderer().marker(handle).is_none());
        assert!(!view.remove_station_marker("A"));
    }

    #[test]
    fn test_clear_all_markers_keeps_viewport() {
        let mut view = ready_view();
        view.add_station_marker(&station("A", true, 40.0, -3.0), None).unwrap();
        view.add_station_marker(&station("B", false, 41.0, 2.0), None).unwrap();
        view.fit_map_bounds().unwrap();
        let zoom = view.viewport().unwrap().zoom;

        view.clear_all_markers();
        assert!(view.list_markers().is_empty());
        assert_eq!(view.renderer().marker_count(), 0);
        assert_eq!(view.viewport().unwrap().zoom, zoom);
        assert_eq!(view.viewport().unwrap().base_layer.as_deref(), Some("Map"));
    }

    #[test]
    fn test_fit_empty_resets_to_default() {
        let mut view = ready_view();
        view.handle_view_change(LatLng::new(10.0, 10.0), 9);
        view.fit_map_bounds().unwrap();

        let viewport = view.viewport().unwrap();
        assert_eq!(viewport.center, LatLng::new(40.0, 10.0));
        assert_eq!(viewport.zoom, 4);
    }

    #[test]
    fn test_fit_single_and_coincident_markers() {
        let mut view = ready_view();
        view.add_station_marker(&station("A", true, 40.0, -3.0), None).unwrap();
        view.fit_map_bounds().unwrap();
        let viewport = view.viewport().unwrap();
        assert_eq!(viewport.zoom, 12);
        assert!((viewport.center.lat - 40.0).abs() < 1e-6);
        assert!((viewport.center.lng + 3.0).abs() < 1e-6);

        view.add_station_marker(&station("B", true, 40.0, -3.0), None).unwrap();
        view.fit_map_bounds().unwrap();
        assert_eq!(view.viewport().unwrap().zoom, 12);
    }

    #[test]
    fn test_highlight_marker() {
        let mut view = ready_view();
        let handle = view.add_station_marker(&station("A", true, 40.0, -3.0), None).unwrap();

        assert!(!view.highlight_marker("missing"));
        assert!(view.highlight_marker("A"));

        assert!(view.renderer().marker(handle).unwrap().popup_open);
        let viewport = view.viewport().unwrap();
        assert_eq!(viewport.zoom, 14);
        assert_eq!(viewport.center, LatLng::new(40.0, -3.0));
        let surface = view.renderer().surface(viewport.surface).unwrap();
        assert_eq!(surface.view, Some((LatLng::new(40.0, -3.0), 14, true)));
    }

    #[test]
    fn test_click_invokes_select_callback() {
        let mut view = ready_view();
        let selected = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&selected);
        view.add_station_marker(
            &station("A", true, 40.0, -3.0),
            Some(Box::new(move |s: &Station| sink.lock().unwrap().push(s.id.clone()))),
        )
        .unwrap();
        view.add_station_marker(&station("B", true, 41.0, 2.0), None).unwrap();

        assert!(view.click_marker("A"));
        assert!(view.click_marker("B"));
        assert!(!view.click_marker("C"));
        assert_eq!(*selected.lock().unwrap(), vec!["A".to_string()]);
    }

    #[test]
    fn test_hover_popup_behavior() {
        let mut view = ready_view();
        let handle = view.add_station_marker(&station("A", true, 40.0, -3.0), None).unwrap();

        view.hover_marker("A");
        assert!(view.renderer().marker(handle).unwrap().popup_open);
        view.unhover_marker("A");
        assert!(!view.renderer().marker(handle).unwrap().popup_open);

        // zoomed in close, popups stay open on hover-out
        view.handle_view_change(LatLng::new(40.0, -3.0), 13);
        view.hover_marker("A");
        view.unhover_marker("A");
        assert!(view.renderer().marker(handle).unwrap().popup_open);
    }

    #[test]
    fn test_clusters_follow_zoom() {
        let mut view = ready_view();
        view.add_station_marker(&station("A", true, 40.0, -3.0), None).unwrap();
        view.add_station_marker(&station("A2", true, 40.01, -3.01), None).unwrap();
        view.add_station_marker(&station("B", false, 41.0, 2.0), None).unwrap();

        assert_eq!(view.clusters().len(), 1);
        assert_eq!(view.clusters_at(8).len(), 2);
        assert_eq!(view.clusters_at(15).len(), 3);
    }

    #[test]
    fn test_select_base_layer() {
        let mut view = ready_view();
        view.select_base_layer("Satellite").unwrap();
        assert_eq!(view.viewport().unwrap().base_layer.as_deref(), Some("Satellite"));

        let surface = view.viewport().unwrap().surface;
        let layers = view.renderer().surface(surface).unwrap().tile_layers.clone();
        assert!(!view.renderer().is_layer_visible(layers[0]));
        assert!(view.renderer().is_layer_visible(layers[1]));

        assert!(matches!(
            view.select_base_layer("Terrain"),
            Err(StationMapError::UnknownLayer(_))
        ));
    }

    #[test]
    fn test_search_input_does_not_filter() {
        let mut view = ready_view();
        view.add_station_marker(&station("A", true, 40.0, -3.0), None).unwrap();
        view.on_search_input("MADRID");
        assert_eq!(view.search_term(), "madrid");
        assert_eq!(view.marker_count(), 1);
    }

    #[test]
    fn test_weather_overlay() {
        let mut view = ready_view();
        let mut warm = station("A", true, 40.0, -3.0);
        warm.latest_reading = Some(LatestReading {
            temperature: Some(24.0),
            ..LatestReading::default()
        });
        let plain = station("B", true, 41.0, 2.0);

        assert_eq!(view.add_weather_layer(&[plain.clone()]).unwrap(), 0);
        assert!(view.weather_layer().is_none());

        assert_eq!(view.add_weather_layer(&[warm.clone(), plain]).unwrap(), 1);
        let layer = view.weather_layer().unwrap();
        assert_eq!(view.display_mode(), DisplayMode::Weather);
        assert_eq!(view.renderer().circles(layer).unwrap().len(), 1);

        // adding again replaces the previous overlay
        view.add_weather_layer(&[warm]).unwrap();
        assert!(view.renderer().circles(layer).is_none());

        view.toggle_weather_visualization(false);
        assert!(view.weather_layer().is_none());
        assert_eq!(view.display_mode(), DisplayMode::Stations);
    }

    #[test]
    fn test_sync_stations() {
        let mut view = ready_view();
        let clicks = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&clicks);
        view.add_station_marker(
            &station("A", true, 40.0, -3.0),
            Some(Box::new(move |_: &Station| *sink.lock().unwrap() += 1)),
        )
        .unwrap();
        view.add_station_marker(&station("B", true, 41.0, 2.0), None).unwrap();
        view.add_station_marker(&station("C", true, 42.0, 1.0), None).unwrap();

        let stats = view
            .sync_stations(&[
                station("A", true, 43.0, -8.0),
                station("B", false, 41.0, 2.0),
                station("D", true, 39.5, -0.4),
                station("E", true, 100.0, 0.0),
            ])
            .unwrap();

        assert_eq!(
            stats,
            SyncStats {
                added: 1,
                updated: 1,
                moved: 1,
                removed: 1,
                skipped: 1,
            }
        );
        assert_eq!(view.marker_count(), 3);
        assert!(view.get_marker("C").is_none());
        assert_eq!(view.get_marker("A").unwrap().position, LatLng::new(43.0, -8.0));
        assert_eq!(color(&view, "B"), "#ef4444");

        // the moved marker kept its select callback
        view.click_marker("A");
        assert_eq!(*clicks.lock().unwrap(), 1);

        let visible = view.visible_bounds().unwrap();
        assert!(visible.contains(LatLng::new(43.0, -8.0)));
        assert!(visible.contains(LatLng::new(39.5, -0.4)));
    }

    #[test]
    fn test_sync_invalid_record_drops_existing_marker() {
        let mut view = ready_view();
        view.add_station_marker(&station("A", true, 40.0, -3.0), None).unwrap();
        view.add_station_marker(&station("B", true, 41.0, 2.0), None).unwrap();

        let stats = view
            .sync_stations(&[station("A", false, 95.0, -3.0), station("B", true, 41.0, 2.0)])
            .unwrap();

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.updated, 1);
        assert!(view.get_marker("A").is_none());
        assert_eq!(view.marker_count(), 1);
    }

    #[test]
    fn test_snapshots_sorted() {
        let mut view = ready_view();
        view.add_station_marker(&station("B", false, 41.0, 2.0), None).unwrap();
        view.add_station_marker(&station("A", true, 40.0, -3.0), None).unwrap();

        let rows = view.snapshots();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "A");
        assert_eq!(rows[0].color, "#10b981");
        assert_eq!(rows[1].color, "#ef4444");
    }
}
