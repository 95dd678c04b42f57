//! The map orchestrator.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use civic_map_api::ComplaintBackend;
use civic_map_complaint_models::{BoundingBox, Complaint, DerivedStats};
use civic_map_complaints::{ComplaintStore, FetchOutcome};
use civic_map_filter::{FilterAction, FilterState, Layer, LayerVisibility};
use civic_map_render::markers::MarkerView;
use civic_map_render::style::{self, LegendEntry};
use civic_map_render::{BoundaryLayer, HeatmapLayer, MapSurface, MarkerLayer};
use civic_map_territory::TerritoryStore;
use civic_map_territory_models::{TerritoryLevel, TerritorySelectEvent};

use crate::config::EngineConfig;
use crate::viewport::Viewport;

type ComplaintCallback = Box<dyn Fn(&Complaint) + Send + Sync>;
type TerritoryCallback = Box<dyn Fn(&TerritorySelectEvent) + Send + Sync>;

/// The error banner shown after a failed complaint fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBanner {
    /// User-facing message.
    pub message: String,
    /// Whether a retry action should be offered.
    pub retryable: bool,
}

#[derive(Debug, Clone, Default)]
struct ViewState {
    filters: FilterState,
    layers: LayerVisibility,
    viewport: Viewport,
    selected_complaint: Option<String>,
}

struct Renderers<S> {
    surface: S,
    markers: MarkerLayer,
    heatmap: HeatmapLayer,
    fine: BoundaryLayer,
    coarse: BoundaryLayer,
}

impl<S> Renderers<S> {
    fn boundaries(&mut self, level: TerritoryLevel) -> (&mut S, &mut BoundaryLayer) {
        match level {
            TerritoryLevel::Fine => (&mut self.surface, &mut self.fine),
            TerritoryLevel::Coarse => (&mut self.surface, &mut self.coarse),
        }
    }
}

/// Composes the filter state, both stores and the render layers.
///
/// Filter state, layer visibility and the viewport are owned here and
/// nowhere else; stores and renderers receive read-only snapshots. The
/// region selection lives only in [`FilterState::region`], which the
/// territory store and boundary layers read.
///
/// All methods take `&self`, so concurrent filter changes (a dragged
/// slider) can overlap and be coalesced by the complaint store's
/// debounce.
pub struct MapOrchestrator<B: ?Sized, S> {
    config: EngineConfig,
    complaints: ComplaintStore<B>,
    territories: TerritoryStore<B>,
    view: Mutex<ViewState>,
    render: Mutex<Renderers<S>>,
    on_complaint_select: Option<ComplaintCallback>,
    on_territory_select: Option<TerritoryCallback>,
}

impl<B: ComplaintBackend + ?Sized, S: MapSurface> MapOrchestrator<B, S> {
    /// Builds an engine drawing on `surface`.
    ///
    /// Initial filters are `config.initial_filters` merged over the
    /// built-in defaults; initial layers come from `config.layers`.
    #[must_use]
    pub fn new(backend: Arc<B>, surface: S, config: EngineConfig) -> Self {
        let complaints = ComplaintStore::new(Arc::clone(&backend)).with_debounce(config.debounce());
        let territories = TerritoryStore::new(backend, config.backend.city.clone());
        let view = ViewState {
            filters: config.initial_filters.clone().into_state(),
            layers: config.layers,
            viewport: Viewport::default(),
            selected_complaint: None,
        };
        let render = Renderers {
            surface,
            markers: MarkerLayer::new(config.clustering),
            heatmap: HeatmapLayer::new(config.heatmap),
            fine: BoundaryLayer::new(TerritoryLevel::Fine),
            coarse: BoundaryLayer::new(TerritoryLevel::Coarse),
        };
        Self {
            config,
            complaints,
            territories,
            view: Mutex::new(view),
            render: Mutex::new(render),
            on_complaint_select: None,
            on_territory_select: None,
        }
    }

    /// Sets the callback fired when a complaint marker is clicked.
    #[must_use]
    pub fn on_complaint_select(mut self, callback: impl Fn(&Complaint) + Send + Sync + 'static) -> Self {
        self.on_complaint_select = Some(Box::new(callback));
        self
    }

    /// Sets the callback fired when a region boundary is clicked.
    #[must_use]
    pub fn on_territory_select(
        mut self,
        callback: impl Fn(&TerritorySelectEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_territory_select = Some(Box::new(callback));
        self
    }

    /// Loads both territory levels and the first complaint page in
    /// parallel, then draws everything.
    pub async fn initialize(&self) -> FetchOutcome {
        let (territory_errors, outcome) =
            futures::future::join(self.territories.load_all(), self.refresh()).await;
        for error in territory_errors {
            log::warn!("{error}");
        }
        self.redraw();
        outcome
    }

    /// Applies a filter action, redraws the client-refined view at once,
    /// then refetches.
    pub async fn apply(&self, action: FilterAction) -> FetchOutcome {
        self.update_filters(action);
        self.redraw();
        self.refresh().await
    }

    /// Fetches complaints for the current filters and redraws on success.
    ///
    /// When the heatmap layer is on, the server heatmap is fetched too.
    pub async fn refresh(&self) -> FetchOutcome {
        let (params, heatmap_on) = {
            let view = self.lock_view();
            (view.filters.to_api_params(), view.layers.heatmap)
        };
        let outcome = self.complaints.fetch(params.clone()).await;
        if outcome.is_loaded() {
            if heatmap_on {
                self.complaints.fetch_heatmap(&params).await;
            }
            self.redraw();
        }
        outcome
    }

    /// Re-issues the last complaint fetch (the banner's retry action).
    pub async fn retry(&self) -> FetchOutcome {
        let outcome = self.complaints.retry().await;
        if outcome.is_loaded() {
            self.redraw();
        }
        outcome
    }

    /// Flips one layer, loading whatever it needs, and redraws.
    pub async fn toggle_layer(&self, layer: Layer) -> LayerVisibility {
        let layers = {
            let mut view = self.lock_view();
            view.layers = view.layers.toggle(layer);
            view.layers
        };
        log::debug!(
            "Layer {layer} {}",
            if layers.is_enabled(layer) { "on" } else { "off" }
        );

        if layers.is_enabled(layer) {
            match layer {
                Layer::Heatmap => {
                    let params = self.lock_view().filters.to_api_params();
                    self.complaints.fetch_heatmap(&params).await;
                }
                Layer::FineBoundaries => self.load_territories(TerritoryLevel::Fine).await,
                Layer::CoarseBoundaries => self.load_territories(TerritoryLevel::Coarse).await,
                Layer::Markers | Layer::Clustering => {}
            }
        }
        self.redraw();
        layers
    }

    /// Handles a click on boundary feature `index` of `level`.
    ///
    /// Fits the viewport to the region, selects it (clearing any
    /// selection of the other level), fires the territory callback and
    /// refetches. Returns `None` if nothing was hit.
    pub async fn click_boundary(&self, level: TerritoryLevel, index: usize) -> Option<FetchOutcome> {
        let territory = {
            let mut render = self.lock_render();
            let (surface, layer) = render.boundaries(level);
            layer.click(surface, index)?
        };
        log::info!("Selected {level} region {}", territory.name);

        let action = match territory.level {
            TerritoryLevel::Fine => FilterAction::SetRegionFine(territory.id.clone()),
            TerritoryLevel::Coarse => FilterAction::SetRegionCoarse(territory.name.clone()),
        };
        self.update_filters(action);
        self.redraw();

        if let Some(callback) = &self.on_territory_select {
            callback(&territory.select_event());
        }
        Some(self.refresh().await)
    }

    /// Reloads one territory level and redraws.
    pub async fn refresh_territories(&self, level: TerritoryLevel) {
        if let Err(e) = self.territories.refresh(level).await {
            log::warn!("{e}");
        }
        self.redraw();
    }

    async fn load_territories(&self, level: TerritoryLevel) {
        if let Err(e) = self.territories.load(level).await {
            log::warn!("{e}");
        }
    }
}

impl<B: ?Sized, S: MapSurface> MapOrchestrator<B, S> {
    /// Records a new viewport and redraws the markers for its zoom.
    /// Returns the number of complaints now in view.
    pub fn on_viewport_change(&self, bounds: BoundingBox, zoom: f64) -> usize {
        self.lock_view().viewport = Viewport::new(bounds, zoom);
        self.redraw();
        self.visible_count()
    }

    /// Number of loaded complaints inside the current viewport.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        let bounds = self.lock_view().viewport.bounds;
        self.complaints.count_in_bounds(&bounds)
    }

    /// Loaded complaints that pass the client-side refinement, in order.
    #[must_use]
    pub fn refined_complaints(&self) -> Vec<Complaint> {
        let filters = self.filters();
        let complaints = self.complaints.complaints();
        filters
            .predicate()
            .refine(&complaints)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Handles a click on marker entry `index`.
    ///
    /// A complaint marker is selected and reported through the complaint
    /// callback. A cluster zooms the viewport to its members instead.
    pub fn click_marker(&self, index: usize) -> Option<Complaint> {
        let id = {
            let mut render = self.lock_render();
            let Renderers {
                surface, markers, ..
            } = &mut *render;
            markers.click(surface, index)?
        };
        self.select_complaint(&id)
    }

    /// Selects the complaint with `id`, enlarging its marker and firing
    /// the complaint callback.
    pub fn select_complaint(&self, id: &str) -> Option<Complaint> {
        let complaint = self.complaints.get_by_id(id)?;
        self.lock_view().selected_complaint = Some(complaint.id.clone());
        self.redraw();
        if let Some(callback) = &self.on_complaint_select {
            callback(&complaint);
        }
        Some(complaint)
    }

    /// Highlights boundary feature `index` of `level`.
    pub fn hover_boundary(&self, level: TerritoryLevel, index: usize) {
        let mut render = self.lock_render();
        let (surface, layer) = render.boundaries(level);
        layer.hover(surface, index);
    }

    /// Clears the hover highlight of `level`.
    pub fn unhover_boundary(&self, level: TerritoryLevel) {
        let mut render = self.lock_render();
        let (surface, layer) = render.boundaries(level);
        layer.unhover(surface);
    }

    /// Bounding box of the selected region, from its first ring only.
    #[must_use]
    pub fn bounds_of_selection(&self) -> Option<BoundingBox> {
        let region = self.lock_view().filters.region.clone();
        self.territories.bounds_of_selection(&region)
    }

    /// Fits the viewport to [`Self::bounds_of_selection`].
    pub fn fit_to_selection(&self) -> Option<BoundingBox> {
        let bounds = self.bounds_of_selection()?;
        self.lock_render().surface.fit_bounds(bounds);
        Some(bounds)
    }

    /// Banner for the last failed complaint fetch.
    #[must_use]
    pub fn error_banner(&self) -> Option<ErrorBanner> {
        self.complaints.error().map(|e| ErrorBanner {
            message: e.message,
            retryable: e.retryable,
        })
    }

    /// Dismisses the error banner.
    pub fn dismiss_error(&self) {
        self.complaints.clear_error();
    }

    /// Legend rows, when the legend is enabled.
    #[must_use]
    pub fn legend(&self) -> Option<Vec<LegendEntry>> {
        self.config.map.show_legend.then(style::legend)
    }

    /// Whether the embedding page should show the filter panel.
    #[must_use]
    pub const fn show_filter_panel(&self) -> bool {
        self.config.map.show_filter_panel
    }

    /// Snapshot of the filter state.
    #[must_use]
    pub fn filters(&self) -> FilterState {
        self.lock_view().filters.clone()
    }

    /// Snapshot of the layer visibility.
    #[must_use]
    pub fn layers(&self) -> LayerVisibility {
        self.lock_view().layers
    }

    /// Current viewport.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.lock_view().viewport
    }

    /// Id of the selected complaint.
    #[must_use]
    pub fn selected_complaint(&self) -> Option<String> {
        self.lock_view().selected_complaint.clone()
    }

    /// Statistics over the loaded complaints.
    #[must_use]
    pub fn stats(&self) -> DerivedStats {
        self.complaints.stats()
    }

    /// Whether a complaint fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.complaints.is_loading()
    }

    /// The complaint store.
    #[must_use]
    pub const fn complaint_store(&self) -> &ComplaintStore<B> {
        &self.complaints
    }

    /// The territory store.
    #[must_use]
    pub const fn territory_store(&self) -> &TerritoryStore<B> {
        &self.territories
    }

    /// Configuration the engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs `f` with the drawing surface.
    pub fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.lock_render().surface)
    }

    /// Redraws every layer from the current snapshots. Layers that did not
    /// change are left alone.
    pub fn redraw(&self) {
        let view = self.lock_view().clone();
        let complaints = self.complaints.complaints();
        let refined = view.filters.predicate().refine(&complaints);
        let weights = self.complaints.heatmap_weights();
        let fine = self.territories.territories(TerritoryLevel::Fine);
        let coarse = self.territories.territories(TerritoryLevel::Coarse);

        let marker_view = MarkerView {
            zoom: view.viewport.zoom,
            clustering_enabled: view.layers.clustering,
            selected: view.selected_complaint.as_deref(),
        };

        let mut render = self.lock_render();
        let Renderers {
            surface,
            markers,
            heatmap,
            fine: fine_layer,
            coarse: coarse_layer,
        } = &mut *render;
        markers.render(&mut *surface, &refined, view.layers.markers, &marker_view);
        heatmap.sync(&mut *surface, view.layers.heatmap, &weights);
        fine_layer.sync(
            &mut *surface,
            view.layers.fine_boundaries,
            &fine,
            &view.filters.region,
        );
        coarse_layer.sync(
            &mut *surface,
            view.layers.coarse_boundaries,
            &coarse,
            &view.filters.region,
        );
    }

    fn update_filters(&self, action: FilterAction) {
        let mut view = self.lock_view();
        view.filters = std::mem::take(&mut view.filters).apply(action);
    }

    fn lock_view(&self) -> MutexGuard<'_, ViewState> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_render(&self) -> MutexGuard<'_, Renderers<S>> {
        self.render.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
