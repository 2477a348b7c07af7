//! Rendering seam.
//!
//! The map view never draws anything itself. Tile layers, controls, marker
//! placement, the cluster layer and popups are delegated to a
//! [`MapRenderer`]. [`HeadlessRenderer`] keeps everything in memory; it
//! backs the CLI and the tests.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::config::{ClusterOptions, TileLayer};
use crate::geo::LatLng;
use crate::popup::MarkerStyle;

/// Display surface created for a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SurfaceId(pub u64);

/// Handle to a marker owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MarkerHandle(pub u64);

/// Handle to a layer (tiles, cluster group, overlay).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LayerHandle(pub u64);

/// Map controls installed at initialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Control {
    /// Base layer switcher listing layer names
    LayerSwitcher(Vec<String>),
    /// Distance scale
    Scale,
    /// Station-name search box
    Search { placeholder: String },
}

/// Circle marker of the weather overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircleMarker {
    pub station_id: String,
    pub position: LatLng,
    /// Radius in pixels
    pub radius: f64,
    pub fill_color: String,
    pub popup: String,
}

/// Geographic rendering capability.
///
/// Any library offering tile layers, marker placement, clustering and
/// popups can implement this.
pub trait MapRenderer {
    /// Resolve a container to a display surface, `None` if it does not exist.
    fn attach(&mut self, container: &str) -> Option<SurfaceId>;

    /// Surface size in pixels (width, height).
    fn surface_size(&self, surface: SurfaceId) -> (f64, f64);

    fn add_tile_layer(&mut self, surface: SurfaceId, layer: &TileLayer) -> LayerHandle;

    fn set_layer_visible(&mut self, layer: LayerHandle, visible: bool);

    fn add_control(&mut self, surface: SurfaceId, control: &Control);

    fn add_cluster_group(&mut self, surface: SurfaceId, options: &ClusterOptions) -> LayerHandle;

    fn create_marker(&mut self, position: LatLng, style: &MarkerStyle, popup: &str) -> MarkerHandle;

    fn set_marker_style(&mut self, marker: MarkerHandle, style: &MarkerStyle);

    fn set_popup_content(&mut self, marker: MarkerHandle, popup: &str);

    fn add_to_group(&mut self, group: LayerHandle, marker: MarkerHandle);

    /// Detach a marker from its group and release it.
    fn remove_from_group(&mut self, group: LayerHandle, marker: MarkerHandle);

    /// Detach and release every marker of a group.
    fn clear_group(&mut self, group: LayerHandle);

    fn open_popup(&mut self, marker: MarkerHandle);

    fn close_popup(&mut self, marker: MarkerHandle);

    fn set_view(&mut self, surface: SurfaceId, center: LatLng, zoom: u8, animate: bool);

    fn add_circle_layer(&mut self, surface: SurfaceId, circles: &[CircleMarker]) -> LayerHandle;

    fn remove_layer(&mut self, surface: SurfaceId, layer: LayerHandle);
}

/// State of one marker inside the headless renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMarker {
    pub position: LatLng,
    pub style: MarkerStyle,
    pub popup: String,
    pub popup_open: bool,
}

/// State of one surface inside the headless renderer.
#[derive(Debug, Clone, Default)]
pub struct RenderedSurface {
    pub size: (f64, f64),
    pub tile_layers: Vec<LayerHandle>,
    pub controls: Vec<Control>,
    pub cluster_groups: Vec<LayerHandle>,
    pub overlays: Vec<LayerHandle>,
    /// Last view set: center, zoom and whether it was animated
    pub view: Option<(LatLng, u8, bool)>,
}

/// In-memory renderer.
///
/// Containers must be registered with [`HeadlessRenderer::with_container`]
/// before a view can attach to them.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    containers: HashMap<String, (f64, f64)>,
    surfaces: HashMap<SurfaceId, RenderedSurface>,
    markers: HashMap<MarkerHandle, RenderedMarker>,
    groups: HashMap<LayerHandle, HashSet<MarkerHandle>>,
    visible_layers: HashSet<LayerHandle>,
    circle_layers: HashMap<LayerHandle, Vec<CircleMarker>>,
    next_id: u64,
}

impl HeadlessRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a container of the given pixel size.
    #[must_use]
    pub fn with_container(mut self, name: &str, width: f64, height: f64) -> Self {
        self.containers.insert(name.to_string(), (width, height));
        self
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Number of surfaces attached so far.
    #[must_use]
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    #[must_use]
    pub fn surface(&self, surface: SurfaceId) -> Option<&RenderedSurface> {
        self.surfaces.get(&surface)
    }

    #[must_use]
    pub fn marker(&self, marker: MarkerHandle) -> Option<&RenderedMarker> {
        self.markers.get(&marker)
    }

    /// Live (unreleased) marker count.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    #[must_use]
    pub fn group_len(&self, group: LayerHandle) -> usize {
        self.groups.get(&group).map_or(0, HashSet::len)
    }

    #[must_use]
    pub fn is_layer_visible(&self, layer: LayerHandle) -> bool {
        self.visible_layers.contains(&layer)
    }

    #[must_use]
    pub fn circles(&self, layer: LayerHandle) -> Option<&[CircleMarker]> {
        self.circle_layers.get(&layer).map(Vec::as_slice)
    }
}

impl MapRenderer for HeadlessRenderer {
    fn attach(&mut self, container: &str) -> Option<SurfaceId> {
        let size = *self.containers.get(container)?;
        let id = SurfaceId(self.next());
        self.surfaces.insert(
            id,
            RenderedSurface {
                size,
                ..RenderedSurface::default()
            },
        );
        debug!("attached surface {} to container {}", id.0, container);
        Some(id)
    }

    fn surface_size(&self, surface: SurfaceId) -> (f64, f64) {
        self.surfaces.get(&surface).map_or((0.0, 0.0), |s| s.size)
    }

    fn add_tile_layer(&mut self, surface: SurfaceId, layer: &TileLayer) -> LayerHandle {
        let handle = LayerHandle(self.next());
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.tile_layers.push(handle);
        }
        debug!("added tile layer {} as {}", layer.name, handle.0);
        handle
    }

    fn set_layer_visible(&mut self, layer: LayerHandle, visible: bool) {
        if visible {
            self.visible_layers.insert(layer);
        } else {
            self.visible_layers.remove(&layer);
        }
    }

    fn add_control(&mut self, surface: SurfaceId, control: &Control) {
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.controls.push(control.clone());
        }
    }

    fn add_cluster_group(&mut self, surface: SurfaceId, _options: &ClusterOptions) -> LayerHandle {
        let handle = LayerHandle(self.next());
        self.groups.insert(handle, HashSet::new());
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.cluster_groups.push(handle);
        }
        handle
    }

    fn create_marker(&mut self, position: LatLng, style: &MarkerStyle, popup: &str) -> MarkerHandle {
        let handle = MarkerHandle(self.next());
        self.markers.insert(
            handle,
            RenderedMarker {
                position,
                style: style.clone(),
                popup: popup.to_string(),
                popup_open: false,
            },
        );
        handle
    }

    fn set_marker_style(&mut self, marker: MarkerHandle, style: &MarkerStyle) {
        if let Some(m) = self.markers.get_mut(&marker) {
            m.style = style.clone();
        }
    }

    fn set_popup_content(&mut self, marker: MarkerHandle, popup: &str) {
        if let Some(m) = self.markers.get_mut(&marker) {
            m.popup = popup.to_string();
        }
    }

    fn add_to_group(&mut self, group: LayerHandle, marker: MarkerHandle) {
        self.groups.entry(group).or_default().insert(marker);
    }

    fn remove_from_group(&mut self, group: LayerHandle, marker: MarkerHandle) {
        if let Some(members) = self.groups.get_mut(&group) {
            members.remove(&marker);
        }
        self.markers.remove(&marker);
    }

    fn clear_group(&mut self, group: LayerHandle) {
        if let Some(members) = self.groups.get_mut(&group) {
            for marker in members.drain() {
                self.markers.remove(&marker);
            }
        }
    }

    fn open_popup(&mut self, marker: MarkerHandle) {
        if let Some(m) = self.markers.get_mut(&marker) {
            m.popup_open = true;
        }
    }

    fn close_popup(&mut self, marker: MarkerHandle) {
        if let Some(m) = self.markers.get_mut(&marker) {
            m.popup_open = false;
        }
    }

    fn set_view(&mut self, surface: SurfaceId, center: LatLng, zoom: u8, animate: bool) {
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.view = Some((center, zoom, animate));
        }
    }

    fn add_circle_layer(&mut self, surface: SurfaceId, circles: &[CircleMarker]) -> LayerHandle {
        let handle = LayerHandle(self.next());
        self.circle_layers.insert(handle, circles.to_vec());
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.overlays.push(handle);
        }
        handle
    }

    fn remove_layer(&mut self, surface: SurfaceId, layer: LayerHandle) {
        self.circle_layers.remove(&layer);
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.overlays.retain(|l| *l != layer);
        }
    }
}
