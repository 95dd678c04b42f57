//! Cached territory collections, one per level.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use civic_map_api::{ComplaintBackend, envelope};
use civic_map_complaint_models::BoundingBox;
use civic_map_territory_models::{RegionSelection, Territory, TerritoryLevel};

use crate::TerritoryError;
use crate::normalize::normalize_territories;

#[derive(Default)]
struct LevelCache {
    territories: Arc<Vec<Territory>>,
    loaded: bool,
    error: Option<String>,
}

#[derive(Default)]
struct TerritoryState {
    fine: LevelCache,
    coarse: LevelCache,
}

impl TerritoryState {
    const fn level(&self, level: TerritoryLevel) -> &LevelCache {
        match level {
            TerritoryLevel::Fine => &self.fine,
            TerritoryLevel::Coarse => &self.coarse,
        }
    }

    fn level_mut(&mut self, level: TerritoryLevel) -> &mut LevelCache {
        match level {
            TerritoryLevel::Fine => &mut self.fine,
            TerritoryLevel::Coarse => &mut self.coarse,
        }
    }
}

/// Owns the fine and coarse territory collections for one city.
pub struct TerritoryStore<B: ?Sized> {
    backend: Arc<B>,
    city: String,
    state: Mutex<TerritoryState>,
}

impl<B: ComplaintBackend + ?Sized> TerritoryStore<B> {
    /// Creates an empty store for `city`.
    #[must_use]
    pub fn new(backend: Arc<B>, city: impl Into<String>) -> Self {
        Self {
            backend,
            city: city.into(),
            state: Mutex::new(TerritoryState::default()),
        }
    }

    /// Loads both levels in parallel, skipping levels already cached.
    ///
    /// A failure on one level does not affect the other.
    pub async fn load_all(&self) -> Vec<TerritoryError> {
        let (fine, coarse) = futures::future::join(
            self.load(TerritoryLevel::Fine),
            self.load(TerritoryLevel::Coarse),
        )
        .await;
        [fine.err(), coarse.err()].into_iter().flatten().collect()
    }

    /// Returns the cached collection for `level`, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`TerritoryError`] if the level is not cached yet and the
    /// request fails.
    pub async fn load(&self, level: TerritoryLevel) -> Result<Arc<Vec<Territory>>, TerritoryError> {
        {
            let state = self.lock();
            let cache = state.level(level);
            if cache.loaded {
                return Ok(Arc::clone(&cache.territories));
            }
        }
        self.refresh(level).await
    }

    /// Re-fetches `level`, replacing the cached collection on success.
    ///
    /// # Errors
    ///
    /// Returns [`TerritoryError`] if the request fails. The previously
    /// cached collection stays in place.
    pub async fn refresh(&self, level: TerritoryLevel) -> Result<Arc<Vec<Territory>>, TerritoryError> {
        log::info!("Fetching {level} territories for {}", self.city);

        match self.backend.fetch_territories(level, &self.city).await {
            Ok(body) => {
                let records = envelope::territory_records(body);
                let territories = Arc::new(normalize_territories(&records, level));
                log::info!("Loaded {} {level} territories", territories.len());

                let mut state = self.lock();
                let cache = state.level_mut(level);
                cache.territories = Arc::clone(&territories);
                cache.loaded = true;
                cache.error = None;
                Ok(territories)
            }
            Err(source) => {
                log::warn!("Failed to fetch {level} territories: {source}");
                self.lock().level_mut(level).error = Some(source.to_string());
                Err(TerritoryError::Fetch { level, source })
            }
        }
    }
}

impl<B: ?Sized> TerritoryStore<B> {
    /// City the territories belong to.
    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Cached collection for `level` (empty until loaded).
    #[must_use]
    pub fn territories(&self, level: TerritoryLevel) -> Arc<Vec<Territory>> {
        Arc::clone(&self.lock().level(level).territories)
    }

    /// Whether `level` has been loaded successfully at least once.
    #[must_use]
    pub fn is_loaded(&self, level: TerritoryLevel) -> bool {
        self.lock().level(level).loaded
    }

    /// Message of the last failed fetch for `level`.
    #[must_use]
    pub fn error(&self, level: TerritoryLevel) -> Option<String> {
        self.lock().level(level).error.clone()
    }

    /// The territory of `level` selected by `key` (id for fine, name for
    /// coarse).
    #[must_use]
    pub fn find(&self, level: TerritoryLevel, key: &str) -> Option<Territory> {
        self.lock()
            .level(level)
            .territories
            .iter()
            .find(|t| t.selection_key() == key)
            .cloned()
    }

    /// The territory picked by `selection`.
    #[must_use]
    pub fn selected(&self, selection: &RegionSelection) -> Option<Territory> {
        let level = selection.level()?;
        self.lock()
            .level(level)
            .territories
            .iter()
            .find(|t| t.is_selected_by(selection))
            .cloned()
    }

    /// Bounding box of the selected territory's first ring.
    ///
    /// Only the exterior ring of the first polygon is considered; see
    /// [`Self::full_bounds_of_selection`] for the whole shape.
    #[must_use]
    pub fn bounds_of_selection(&self, selection: &RegionSelection) -> Option<BoundingBox> {
        self.selected(selection)?.first_ring_bounds()
    }

    /// Bounding box over every polygon of the selected territory.
    #[must_use]
    pub fn full_bounds_of_selection(&self, selection: &RegionSelection) -> Option<BoundingBox> {
        self.selected(selection)?.bounds()
    }

    fn lock(&self) -> MutexGuard<'_, TerritoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use civic_map_api::ApiError;
    use civic_map_filter::ApiParams;
    use serde_json::{Value, json};

    use super::*;

    #[derive(Default)]
    struct FakeBackend {
        fail: Mutex<bool>,
        calls: AtomicUsize,
        cities: Mutex<Vec<String>>,
    }

    fn ring(x: f64, y: f64) -> Value {
        json!([[x, y], [x + 0.1, y], [x + 0.1, y + 0.1], [x, y + 0.1], [x, y]])
    }

    #[async_trait]
    impl ComplaintBackend for FakeBackend {
        async fn fetch_complaints(&self, _params: &ApiParams) -> Result<Value, ApiError> {
            Ok(json!([]))
        }

        async fn fetch_heatmap(&self, _params: &ApiParams) -> Result<Value, ApiError> {
            Ok(json!([]))
        }

        async fn fetch_territories(
            &self,
            level: TerritoryLevel,
            city: &str,
        ) -> Result<Value, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.cities.lock().unwrap().push(city.to_string());
            // Coarse answers slower so both requests overlap.
            let delay = match level {
                TerritoryLevel::Fine => 10,
                TerritoryLevel::Coarse => 50,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if *self.fail.lock().unwrap() {
                return Err(ApiError::Status {
                    status: 502,
                    message: "Bad Gateway".to_string(),
                });
            }
            Ok(match level {
                TerritoryLevel::Fine => json!({ "data": { "territories": [
                    { "_id": "UC12", "name": "Saddar", "town": "Central",
                      "boundary": { "type": "MultiPolygon",
                                    "coordinates": [[ring(67.0, 24.8)], [ring(67.5, 25.0)]] } },
                    { "_id": "UC13", "name": "Garden",
                      "boundary": { "type": "Polygon", "coordinates": [ring(67.2, 24.9)] } },
                ] } }),
                TerritoryLevel::Coarse => json!({ "type": "FeatureCollection", "features": [
                    { "type": "Feature", "properties": { "name": "Central" },
                      "geometry": { "rings": [ring(66.9, 24.7)] } },
                ] }),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn loads_both_levels_and_caches() {
        let backend = Arc::new(FakeBackend::default());
        let store = TerritoryStore::new(Arc::clone(&backend), "Karachi");

        let started = tokio::time::Instant::now();
        assert!(store.load_all().await.is_empty());
        assert!(started.elapsed() < Duration::from_millis(60));

        assert_eq!(store.territories(TerritoryLevel::Fine).len(), 2);
        assert_eq!(store.territories(TerritoryLevel::Coarse).len(), 1);
        assert!(store.territories(TerritoryLevel::Coarse).iter().all(|t| t.level == TerritoryLevel::Coarse));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        assert!(backend.cities.lock().unwrap().iter().all(|c| c == "Karachi"));

        store.load_all().await;
        store.load(TerritoryLevel::Fine).await.unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);

        store.refresh(TerritoryLevel::Fine).await.unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_cache() {
        let backend = Arc::new(FakeBackend::default());
        let store = TerritoryStore::new(Arc::clone(&backend), "Karachi");
        store.load(TerritoryLevel::Fine).await.unwrap();

        *backend.fail.lock().unwrap() = true;
        let error = store.refresh(TerritoryLevel::Fine).await.unwrap_err();
        assert!(error.is_retryable());
        assert_eq!(store.territories(TerritoryLevel::Fine).len(), 2);
        assert!(store.error(TerritoryLevel::Fine).unwrap().contains("502"));

        let errors = store.load_all().await;
        assert_eq!(errors.len(), 1);
        assert!(!store.is_loaded(TerritoryLevel::Coarse));
        assert!(store.territories(TerritoryLevel::Coarse).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn selection_lookup_and_bounds() {
        let backend = Arc::new(FakeBackend::default());
        let store = TerritoryStore::new(backend, "Karachi");
        store.load_all().await;

        let fine = RegionSelection::Fine("UC12".to_string());
        let selected = store.selected(&fine).unwrap();
        assert_eq!(selected.name, "Saddar");
        assert_eq!(selected.parent_name.as_deref(), Some("Central"));

        let first = store.bounds_of_selection(&fine).unwrap();
        assert!((first.east - 67.1).abs() < 1e-9);
        assert!((first.north - 24.9).abs() < 1e-9);
        let full = store.full_bounds_of_selection(&fine).unwrap();
        assert!((full.east - 67.6).abs() < 1e-9);
        assert!((full.north - 25.1).abs() < 1e-9);

        let coarse = RegionSelection::Coarse("Central".to_string());
        assert_eq!(store.selected(&coarse).map(|t| t.name), Some("Central".to_string()));
        assert!(store.selected(&RegionSelection::Coarse("UC12".to_string())).is_none());
        assert!(store.bounds_of_selection(&RegionSelection::None).is_none());
        assert_eq!(
            store.find(TerritoryLevel::Fine, "UC13").map(|t| t.name),
            Some("Garden".to_string())
        );
    }
}
