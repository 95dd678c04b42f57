//! Region boundary polygons with hover and selection styling.

use std::sync::Arc;

use civic_map_territory_models::{RegionSelection, Territory, TerritoryLevel};

use crate::style::BoundaryStyle;
use crate::surface::{BoundaryFeature, MapSurface, Overlay, OverlayId};

/// The boundary layer of one territory level.
#[derive(Debug)]
pub struct BoundaryLayer {
    level: TerritoryLevel,
    overlay: Option<OverlayId>,
    source: Option<Arc<Vec<Territory>>>,
    hovered: Option<usize>,
    selected: Option<usize>,
}

impl BoundaryLayer {
    /// Creates a hidden layer for `level`.
    #[must_use]
    pub const fn new(level: TerritoryLevel) -> Self {
        Self {
            level,
            overlay: None,
            source: None,
            hovered: None,
            selected: None,
        }
    }

    /// Level this layer draws.
    #[must_use]
    pub const fn level(&self) -> TerritoryLevel {
        self.level
    }

    /// Brings the surface in line with `visible`, `territories` and
    /// `selection`.
    ///
    /// The overlay is rebuilt only when the territory collection changes;
    /// a selection change restyles the two affected features.
    pub fn sync(
        &mut self,
        surface: &mut dyn MapSurface,
        visible: bool,
        territories: &Arc<Vec<Territory>>,
        selection: &RegionSelection,
    ) {
        if !visible {
            self.clear(surface);
            return;
        }

        let selected = territories.iter().position(|t| t.is_selected_by(selection));

        let same_source = self
            .source
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, territories));
        if let (Some(id), true) = (self.overlay, same_source) {
            if selected != self.selected {
                let previous = std::mem::replace(&mut self.selected, selected);
                for index in [previous, selected].into_iter().flatten() {
                    surface.restyle(id, index, self.style_of(index));
                }
            }
            return;
        }

        self.clear(surface);
        self.selected = selected;
        let features = territories
            .iter()
            .enumerate()
            .map(|(index, territory)| BoundaryFeature {
                key: territory.selection_key().to_string(),
                name: territory.name.clone(),
                boundary: territory.boundary.clone(),
                style: self.style_of(index),
            })
            .collect();
        log::debug!(
            "Drawing {} {} boundaries",
            territories.len(),
            self.level
        );
        self.overlay = Some(surface.add_overlay(Overlay::Boundaries {
            level: self.level,
            features,
        }));
        self.source = Some(Arc::clone(territories));
    }

    /// Removes the overlay and forgets hover state.
    pub fn clear(&mut self, surface: &mut dyn MapSurface) {
        if let Some(id) = self.overlay.take() {
            surface.remove_overlay(id);
        }
        self.source = None;
        self.hovered = None;
        self.selected = None;
    }

    /// Whether the layer is currently drawn.
    #[must_use]
    pub const fn is_shown(&self) -> bool {
        self.overlay.is_some()
    }

    /// Index of the hovered feature.
    #[must_use]
    pub const fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Highlights feature `index`, restoring the previously hovered one.
    pub fn hover(&mut self, surface: &mut dyn MapSurface, index: usize) {
        let Some(id) = self.overlay else {
            return;
        };
        if self.hovered == Some(index) || index >= self.feature_count() {
            return;
        }
        if let Some(previous) = self.hovered.replace(index) {
            surface.restyle(id, previous, self.style_of(previous));
        }
        surface.restyle(id, index, self.style_of(index));
    }

    /// Restores the hovered feature's normal style.
    pub fn unhover(&mut self, surface: &mut dyn MapSurface) {
        if let (Some(id), Some(previous)) = (self.overlay, self.hovered.take()) {
            surface.restyle(id, previous, self.style_of(previous));
        }
    }

    /// Handles a click on feature `index`: fits the surface to the
    /// feature's bounds and returns the territory for the selection
    /// callback.
    pub fn click(&self, surface: &mut dyn MapSurface, index: usize) -> Option<Territory> {
        self.overlay?;
        let territory = self.source.as_ref()?.get(index)?.clone();
        if let Some(bounds) = territory.bounds() {
            surface.fit_bounds(bounds);
        }
        Some(territory)
    }

    fn feature_count(&self) -> usize {
        self.source.as_ref().map_or(0, |s| s.len())
    }

    const fn style_of(&self, index: usize) -> BoundaryStyle {
        BoundaryStyle::new(
            self.level,
            matches!(self.hovered, Some(h) if h == index),
            matches!(self.selected, Some(s) if s == index),
        )
    }
}
