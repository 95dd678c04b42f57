//! Complaint markers, clustered when crowded.

use civic_map_complaint_models::{BoundingBox, Complaint, Coordinates};

use crate::cluster::{self, ClusterConfig};
use crate::style::MarkerIcon;
use crate::surface::{MapSurface, Overlay, OverlayId};

/// One complaint drawn as an icon.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Complaint the marker stands for.
    pub complaint_id: String,
    /// Marker position.
    pub position: Coordinates,
    /// Icon keyed by the complaint's category.
    pub icon: MarkerIcon,
}

/// An entry of the marker overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerItem {
    /// A single complaint.
    Marker(Marker),
    /// Several nearby complaints drawn as one bubble.
    Cluster {
        /// Mean member position.
        center: Coordinates,
        /// Member complaint ids.
        complaint_ids: Vec<String>,
        /// Box around every member.
        bounds: BoundingBox,
    },
}

impl MarkerItem {
    /// Number of complaints this entry represents.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Marker(_) => 1,
            Self::Cluster { complaint_ids, .. } => complaint_ids.len(),
        }
    }
}

/// View parameters the marker overlay depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerView<'a> {
    /// Current map zoom.
    pub zoom: f64,
    /// Whether the clustering layer toggle is on.
    pub clustering_enabled: bool,
    /// Id of the selected complaint, drawn enlarged.
    pub selected: Option<&'a str>,
}

/// Builds the overlay entries for `complaints`.
///
/// Complaints without valid coordinates are left out. Selected complaints
/// are never absorbed into a cluster.
#[must_use]
pub fn build_markers(
    complaints: &[&Complaint],
    view: &MarkerView<'_>,
    config: &ClusterConfig,
) -> Vec<MarkerItem> {
    let markers: Vec<Marker> = complaints
        .iter()
        .filter_map(|complaint| {
            let position = complaint.valid_coordinates()?;
            let selected = view.selected == Some(complaint.id.as_str());
            Some(Marker {
                complaint_id: complaint.id.clone(),
                position,
                icon: MarkerIcon::new(complaint.category_label(), selected),
            })
        })
        .collect();

    if markers.len() < complaints.len() {
        log::trace!(
            "Dropped {} complaints without valid coordinates from the marker layer",
            complaints.len() - markers.len()
        );
    }

    if !config.is_active(markers.len(), view.zoom, view.clustering_enabled) {
        return markers.into_iter().map(MarkerItem::Marker).collect();
    }

    let (selected, rest): (Vec<Marker>, Vec<Marker>) = markers
        .into_iter()
        .partition(|m| view.selected == Some(m.complaint_id.as_str()));

    let positions: Vec<Coordinates> = rest.iter().map(|m| m.position).collect();
    let mut slots: Vec<Option<Marker>> = rest.into_iter().map(Some).collect();

    let mut items: Vec<MarkerItem> = cluster::cluster(&positions, view.zoom, config.radius_px)
        .into_iter()
        .filter_map(|group| {
            if let [only] = group.members.as_slice() {
                return slots[*only].take().map(MarkerItem::Marker);
            }
            let complaint_ids = group
                .members
                .iter()
                .filter_map(|&i| slots[i].take().map(|m| m.complaint_id))
                .collect();
            Some(MarkerItem::Cluster {
                center: group.center,
                complaint_ids,
                bounds: group.bounds,
            })
        })
        .collect();
    items.extend(selected.into_iter().map(MarkerItem::Marker));
    items
}

/// The marker layer.
#[derive(Debug)]
pub struct MarkerLayer {
    config: ClusterConfig,
    overlay: Option<OverlayId>,
    items: Vec<MarkerItem>,
}

impl MarkerLayer {
    /// Creates a layer with the given clustering constants.
    #[must_use]
    pub const fn new(config: ClusterConfig) -> Self {
        Self {
            config,
            overlay: None,
            items: Vec::new(),
        }
    }

    /// Clustering constants in use.
    #[must_use]
    pub const fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Redraws the layer for `complaints`, or removes it when not
    /// `visible`. The previous overlay is always removed first.
    pub fn render(
        &mut self,
        surface: &mut dyn MapSurface,
        complaints: &[&Complaint],
        visible: bool,
        view: &MarkerView<'_>,
    ) {
        self.clear(surface);
        if !visible {
            return;
        }
        self.items = build_markers(complaints, view, &self.config);
        log::debug!(
            "Drawing {} marker entries for {} complaints",
            self.items.len(),
            complaints.len()
        );
        self.overlay = Some(surface.add_overlay(Overlay::Markers(self.items.clone())));
    }

    /// Removes the layer from `surface`.
    pub fn clear(&mut self, surface: &mut dyn MapSurface) {
        if let Some(id) = self.overlay.take() {
            surface.remove_overlay(id);
        }
        self.items.clear();
    }

    /// Whether the layer is currently drawn.
    #[must_use]
    pub const fn is_shown(&self) -> bool {
        self.overlay.is_some()
    }

    /// Entries currently drawn.
    #[must_use]
    pub fn items(&self) -> &[MarkerItem] {
        &self.items
    }

    /// Handles a click on entry `index`.
    ///
    /// A marker click returns its complaint id. A cluster click zooms the
    /// surface to the cluster's bounds and returns `None`.
    pub fn click(&self, surface: &mut dyn MapSurface, index: usize) -> Option<String> {
        match self.items.get(index)? {
            MarkerItem::Marker(marker) => Some(marker.complaint_id.clone()),
            MarkerItem::Cluster { bounds, .. } => {
                surface.fit_bounds(*bounds);
                None
            }
        }
    }
}

impl Default for MarkerLayer {
    fn default() -> Self {
        Self::new(ClusterConfig::default())
    }
}
