//! Marker clustering.
//!
//! Greedy pixel-radius clustering: at a given zoom every marker joins the
//! first cluster whose projected center lies within `max_cluster_radius`
//! pixels, otherwise it starts a new one. From
//! `disable_clustering_at_zoom` upward every marker stands alone.

use serde::Serialize;

use crate::config::ClusterOptions;
use crate::geo::{LatLng, LatLngBounds, Point, project, unproject};

/// A group of nearby markers shown as one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    /// Mean position of the members in projected space
    pub center: LatLng,
    pub bounds: LatLngBounds,
    /// Member station IDs, sorted
    pub station_ids: Vec<String>,
}

impl Cluster {
    #[must_use]
    pub fn len(&self) -> usize {
        self.station_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.station_ids.is_empty()
    }

    /// A lone marker rather than a collapsed group.
    #[must_use]
    pub fn is_single(&self) -> bool {
        self.station_ids.len() == 1
    }
}

/// Working state while clustering.
struct Pending {
    sum_x: f64,
    sum_y: f64,
    center: Point,
    bounds: LatLngBounds,
    ids: Vec<String>,
}

impl Pending {
    fn new(id: &str, position: LatLng, pixel: Point) -> Self {
        Self {
            sum_x: pixel.x,
            sum_y: pixel.y,
            center: pixel,
            bounds: LatLngBounds::from_point(position),
            ids: vec![id.to_string()],
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn push(&mut self, id: &str, position: LatLng, pixel: Point) {
        self.sum_x += pixel.x;
        self.sum_y += pixel.y;
        self.ids.push(id.to_string());
        let n = self.ids.len() as f64;
        self.center = Point {
            x: self.sum_x / n,
            y: self.sum_y / n,
        };
        self.bounds.extend(position);
    }
}

/// Group markers for display at `zoom`.
///
/// Input order does not matter; markers are processed by ID so the result
/// is deterministic.
pub fn cluster_markers<'a, I>(markers: I, zoom: u8, options: &ClusterOptions) -> Vec<Cluster>
where
    I: IntoIterator<Item = (&'a str, LatLng)>,
{
    let mut markers: Vec<(&str, LatLng)> = markers.into_iter().collect();
    markers.sort_by(|a, b| a.0.cmp(b.0));

    let clustering = zoom < options.disable_clustering_at_zoom;
    let mut pending: Vec<Pending> = Vec::new();

    for (id, position) in markers {
        let pixel = project(position, zoom);
        let target = if clustering {
            pending
                .iter_mut()
                .find(|c| c.center.distance(&pixel) <= options.max_cluster_radius)
        } else {
            None
        };

        match target {
            Some(cluster) => cluster.push(id, position, pixel),
            None => pending.push(Pending::new(id, position, pixel)),
        }
    }

    pending
        .into_iter()
        .map(|p| Cluster {
            center: unproject(p.center, zoom),
            bounds: p.bounds,
            station_ids: p.ids,
        })
        .collect()
}
