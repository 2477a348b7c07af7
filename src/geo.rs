//! Geographic primitives.
//!
//! Coordinates, bounding boxes and the spherical Web-Mercator projection
//! used for clustering distances and bounds fitting.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Tile edge in pixels at zoom 0.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the Web-Mercator projection.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check that both components are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Bounding box over a set of coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    /// Degenerate bounds covering a single point.
    #[must_use]
    pub fn from_point(point: LatLng) -> Self {
        Self {
            south_west: point,
            north_east: point,
        }
    }

    /// Bounds over all points, `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::from_point(first);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    /// Grow the box to include a point.
    pub fn extend(&mut self, point: LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    /// Both corners valid and ordered.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.south_west.is_valid()
            && self.north_east.is_valid()
            && self.south_west.lat <= self.north_east.lat
            && self.south_west.lng <= self.north_east.lng
    }

    /// Check if a point is within the bounding box.
    #[must_use]
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }
}

/// A point in projected pixel space at some zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Pixel scale of the whole world at a zoom level.
#[must_use]
pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * 2f64.powi(i32::from(zoom))
}

/// Project a coordinate to world pixels at `zoom`.
#[must_use]
pub fn project(point: LatLng, zoom: u8) -> Point {
    let scale = world_size(zoom);
    let lat = point.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT) * PI / 180.0;
    let x = (point.lng + 180.0) / 360.0 * scale;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * scale;
    Point { x, y }
}

/// Inverse of [`project`].
#[must_use]
pub fn unproject(point: Point, zoom: u8) -> LatLng {
    let scale = world_size(zoom);
    let lng = point.x / scale * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * point.y / scale);
    let lat = n.sinh().atan() * 180.0 / PI;
    LatLng::new(lat, lng)
}

/// Largest integer zoom at which `bounds` fits in a `width`×`height`
/// surface after removing `padding` pixels from every side, clamped to
/// `[min_zoom, max_zoom]`.
///
/// Zero-extent bounds (a single point) fit at any zoom and return
/// `max_zoom`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn bounds_zoom(
    bounds: &LatLngBounds,
    width: f64,
    height: f64,
    padding: f64,
    min_zoom: u8,
    max_zoom: u8,
) -> u8 {
    let avail_x = width - 2.0 * padding;
    let avail_y = height - 2.0 * padding;
    if avail_x <= 0.0 || avail_y <= 0.0 {
        return min_zoom;
    }

    let sw = project(bounds.south_west, 0);
    let ne = project(bounds.north_east, 0);
    let span_x = (ne.x - sw.x).abs();
    let span_y = (sw.y - ne.y).abs();

    let scale_x = if span_x > 0.0 { avail_x / span_x } else { f64::INFINITY };
    let scale_y = if span_y > 0.0 { avail_y / span_y } else { f64::INFINITY };
    let scale = scale_x.min(scale_y);
    if !scale.is_finite() {
        return max_zoom;
    }

    let zoom = scale.log2().floor();
    if zoom <= f64::from(min_zoom) {
        min_zoom
    } else if zoom >= f64::from(max_zoom) {
        max_zoom
    } else {
        zoom as u8
    }
}

/// Center of `bounds` in projected space, which is what a map shows in
/// the middle of the surface after fitting with symmetric padding.
#[must_use]
pub fn projected_center(bounds: &LatLngBounds) -> LatLng {
    let sw = project(bounds.south_west, 0);
    let ne = project(bounds.north_east, 0);
    unproject(
        Point {
            x: (sw.x + ne.x) / 2.0,
            y: (sw.y + ne.y) / 2.0,
        },
        0,
    )
}
