//! Station marker registry.
//!
//! Maps station IDs to their marker entries. At most one entry exists per
//! ID; inserting an ID that is already present replaces the entry and
//! hands the old one back so its marker can be released.

use std::collections::HashMap;
use std::fmt;

use crate::geo::LatLng;
use crate::models::Station;
use crate::popup::MarkerStyle;
use crate::renderer::MarkerHandle;

/// Callback invoked with the station snapshot when its marker is clicked.
pub type SelectCallback = Box<dyn FnMut(&Station) + Send>;

/// A station's marker and the display state derived from its snapshot.
pub struct MarkerEntry {
    /// Snapshot at the last add/update
    pub station: Station,
    /// Renderer-owned marker
    pub handle: MarkerHandle,
    /// Where the marker was placed; fixed for the entry's lifetime
    pub position: LatLng,
    pub style: MarkerStyle,
    pub popup: String,
    pub(crate) on_select: Option<SelectCallback>,
}

impl MarkerEntry {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.station.id
    }
}

impl fmt::Debug for MarkerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkerEntry")
            .field("station", &self.station)
            .field("handle", &self.handle)
            .field("position", &self.position)
            .field("style", &self.style)
            .field("on_select", &self.on_select.is_some())
            .finish_non_exhaustive()
    }
}

/// Result of inserting an entry.
#[derive(Debug)]
pub enum UpsertResult {
    /// First entry for this ID
    New,
    /// An entry existed and was replaced; the old entry is returned
    Replaced(MarkerEntry),
}

/// ID → marker entry mapping.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    entries: HashMap<String, MarkerEntry>,
}

impl MarkerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry keyed by its station ID, replacing any previous one.
    pub fn upsert(&mut self, entry: MarkerEntry) -> UpsertResult {
        match self.entries.insert(entry.station.id.clone(), entry) {
            Some(old) => UpsertResult::Replaced(old),
            None => UpsertResult::New,
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&MarkerEntry> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut MarkerEntry> {
        self.entries.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<MarkerEntry> {
        self.entries.remove(id)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// All entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &MarkerEntry> {
        self.entries.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
