//! The complaint store.
//!
//! Holds the current complaint collection and everything derived from it.
//! Fetches are debounced and sequenced: every call to
//! [`ComplaintStore::fetch`] takes the next request id, waits out the
//! debounce interval, and only reaches the network if no newer call was
//! made meanwhile. A response is applied only if its request is still
//! the newest one when it arrives, so a slow response for an old filter
//! can never overwrite a newer result.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use civic_map_api::{ComplaintBackend, envelope};
use civic_map_complaint_models::{BoundingBox, Complaint, DerivedStats, HeatmapPoint};
use civic_map_filter::ApiParams;
use serde_json::Value;

use crate::normalize::normalize_records;

/// Default quiet interval before a fetch is sent.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// A failed fetch, kept until the next successful one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    /// Request that failed.
    pub request_id: u64,
    /// User-facing failure message.
    pub message: String,
    /// Whether retrying the same request may succeed.
    pub retryable: bool,
}

/// Result of one [`ComplaintStore::fetch`] call.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The response was applied and is now the current collection.
    Loaded(Arc<Vec<Complaint>>),
    /// A newer fetch was issued; this call's response (if any) was dropped.
    Superseded,
    /// The request failed. The previous collection is still in place.
    Failed(FetchError),
}

impl FetchOutcome {
    /// The complaints this call produced: the loaded list, or nothing for
    /// superseded and failed calls.
    #[must_use]
    pub fn complaints(&self) -> &[Complaint] {
        match self {
            Self::Loaded(complaints) => complaints,
            Self::Superseded | Self::Failed(_) => &[],
        }
    }

    /// Whether the response was applied.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

#[derive(Default)]
struct StoreState {
    complaints: Arc<Vec<Complaint>>,
    stats: DerivedStats,
    heatmap: Arc<Vec<HeatmapPoint>>,
    last_params: Option<ApiParams>,
    error: Option<FetchError>,
}

/// Owns the complaint collection for the map.
pub struct ComplaintStore<B: ?Sized> {
    backend: Arc<B>,
    debounce: Duration,
    latest_request: AtomicU64,
    latest_heatmap_request: AtomicU64,
    in_flight: AtomicUsize,
    state: Mutex<StoreState>,
}

impl<B: ComplaintBackend + ?Sized> ComplaintStore<B> {
    /// Creates an empty store with the default debounce interval.
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            debounce: DEFAULT_DEBOUNCE,
            latest_request: AtomicU64::new(0),
            latest_heatmap_request: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Overrides the debounce interval. Zero disables debouncing.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Fetches complaints for `params`.
    ///
    /// Calls made within the debounce interval of each other coalesce:
    /// only the last one reaches the backend, the others return
    /// [`FetchOutcome::Superseded`]. On failure the previous collection is
    /// kept and the error is recorded (see [`Self::error`]).
    pub async fn fetch(&self, params: ApiParams) -> FetchOutcome {
        let request_id = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.debounce.is_zero() {
            tokio::time::sleep(self.debounce).await;
        }
        if self.is_stale(request_id) {
            log::debug!("Complaint request #{request_id} coalesced into a newer one");
            return FetchOutcome::Superseded;
        }

        log::info!(
            "Fetching complaints (request #{request_id}, {} params)",
            params.len()
        );
        self.lock().last_params = Some(params.clone());

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let result = self.backend.fetch_complaints(&params).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.is_stale(request_id) {
            log::debug!("Discarding response for superseded request #{request_id}");
            return FetchOutcome::Superseded;
        }

        match result {
            Ok(body) => {
                let complaints = Arc::new(normalize_records(envelope::complaint_records(body)));
                log::info!(
                    "Loaded {} complaints (request #{request_id})",
                    complaints.len()
                );
                self.install(Arc::clone(&complaints));
                FetchOutcome::Loaded(complaints)
            }
            Err(e) => {
                log::warn!("Complaint request #{request_id} failed: {e}");
                let error = FetchError {
                    request_id,
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                };
                self.lock().error = Some(error.clone());
                FetchOutcome::Failed(error)
            }
        }
    }

    /// Re-issues the last fetch (or an unfiltered one if none was made).
    pub async fn retry(&self) -> FetchOutcome {
        let params = self.lock().last_params.clone().unwrap_or_default();
        self.fetch(params).await
    }

    /// Fetches the server's precomputed heatmap for `params`.
    ///
    /// Falls back to weights computed from the current collection when the
    /// request fails or the body holds no usable points. Returns the
    /// weights now in effect.
    pub async fn fetch_heatmap(&self, params: &ApiParams) -> Arc<Vec<HeatmapPoint>> {
        let request_id = self.latest_heatmap_request.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.backend.fetch_heatmap(params).await;

        if self.latest_heatmap_request.load(Ordering::SeqCst) != request_id {
            log::debug!("Discarding heatmap response for superseded request #{request_id}");
            return self.heatmap_weights();
        }

        let mut state = self.lock();
        match result {
            Ok(body) => {
                let points: Vec<HeatmapPoint> = envelope::heatmap_records(body)
                    .iter()
                    .filter_map(parse_heat_point)
                    .collect();
                if points.is_empty() {
                    log::warn!("Heatmap response held no usable points, using local weights");
                    state.heatmap = Arc::new(local_weights(&state.complaints));
                } else {
                    log::debug!("Loaded {} server heatmap points", points.len());
                    state.heatmap = Arc::new(points);
                }
            }
            Err(e) => {
                log::warn!("Heatmap request failed, using local weights: {e}");
                state.heatmap = Arc::new(local_weights(&state.complaints));
            }
        }
        Arc::clone(&state.heatmap)
    }

    fn is_stale(&self, request_id: u64) -> bool {
        self.latest_request.load(Ordering::SeqCst) != request_id
    }
}

impl<B: ?Sized> ComplaintStore<B> {
    /// Whether a backend request is currently outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Current collection.
    #[must_use]
    pub fn complaints(&self) -> Arc<Vec<Complaint>> {
        Arc::clone(&self.lock().complaints)
    }

    /// Statistics over the current collection.
    #[must_use]
    pub fn stats(&self) -> DerivedStats {
        self.lock().stats.clone()
    }

    /// Heatmap weights in effect. Replaced (never mutated) whenever they
    /// change, so `Arc::ptr_eq` tells whether a rebuild is needed.
    #[must_use]
    pub fn heatmap_weights(&self) -> Arc<Vec<HeatmapPoint>> {
        Arc::clone(&self.lock().heatmap)
    }

    /// Error from the most recent failed fetch, cleared by the next
    /// successful one.
    #[must_use]
    pub fn error(&self) -> Option<FetchError> {
        self.lock().error.clone()
    }

    /// Dismisses the current error.
    pub fn clear_error(&self) {
        self.lock().error = None;
    }

    /// Parameters of the last fetch that reached the backend.
    #[must_use]
    pub fn last_params(&self) -> Option<ApiParams> {
        self.lock().last_params.clone()
    }

    /// Every complaint whose coordinates fall inside `bounds`.
    ///
    /// A linear scan; complaints without valid coordinates never match.
    #[must_use]
    pub fn get_in_bounds(&self, bounds: &BoundingBox) -> Vec<Complaint> {
        self.lock()
            .complaints
            .iter()
            .filter(|c| c.valid_coordinates().is_some_and(|p| bounds.contains(&p)))
            .cloned()
            .collect()
    }

    /// Number of complaints inside `bounds`, without cloning them.
    #[must_use]
    pub fn count_in_bounds(&self, bounds: &BoundingBox) -> usize {
        self.lock()
            .complaints
            .iter()
            .filter(|c| c.valid_coordinates().is_some_and(|p| bounds.contains(&p)))
            .count()
    }

    /// Complaints whose category label equals `category`.
    #[must_use]
    pub fn get_by_category(&self, category: &str) -> Vec<Complaint> {
        self.lock()
            .complaints
            .iter()
            .filter(|c| c.category_label() == category)
            .cloned()
            .collect()
    }

    /// The complaint with `id`.
    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<Complaint> {
        self.lock().complaints.iter().find(|c| c.id == id).cloned()
    }

    /// Replaces the collection and everything derived from it.
    fn install(&self, complaints: Arc<Vec<Complaint>>) {
        let stats = DerivedStats::from_complaints(&complaints);
        let heatmap = Arc::new(local_weights(&complaints));
        let mut state = self.lock();
        state.complaints = complaints;
        state.stats = stats;
        state.heatmap = heatmap;
        state.error = None;
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Heatmap weights computed from complaint severities.
fn local_weights(complaints: &[Complaint]) -> Vec<HeatmapPoint> {
    complaints
        .iter()
        .filter_map(Complaint::heatmap_point)
        .collect()
}

/// Parses `[lat, lng, intensity]` or `{lat, lng, intensity}`.
fn parse_heat_point(value: &Value) -> Option<HeatmapPoint> {
    let (lat, lng, intensity) = match value {
        Value::Array(items) => (
            items.first()?.as_f64()?,
            items.get(1)?.as_f64()?,
            items.get(2).and_then(Value::as_f64).unwrap_or(0.5),
        ),
        Value::Object(map) => (
            map.get("lat")?.as_f64()?,
            map.get("lng")?.as_f64()?,
            map.get("intensity")
                .or_else(|| map.get("weight"))
                .and_then(Value::as_f64)
                .unwrap_or(0.5),
        ),
        _ => return None,
    };
    if !(lat.is_finite() && lng.is_finite() && intensity.is_finite()) {
        return None;
    }
    Some(HeatmapPoint {
        lat,
        lng,
        intensity: intensity.clamp(0.0, 1.0),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use civic_map_api::ApiError;
    use civic_map_territory_models::TerritoryLevel;
    use serde_json::json;

    use super::*;

    /// One scripted backend answer: `None` is a 503.
    struct Scripted {
        delay: Duration,
        body: Option<Value>,
    }

    #[derive(Default)]
    struct FakeBackend {
        complaints: Mutex<VecDeque<Scripted>>,
        heatmap: Mutex<Option<Value>>,
        calls: AtomicUsize,
        seen_params: Mutex<Vec<ApiParams>>,
    }

    impl FakeBackend {
        fn push(&self, delay_ms: u64, body: Option<Value>) {
            self.complaints.lock().unwrap().push_back(Scripted {
                delay: Duration::from_millis(delay_ms),
                body,
            });
        }
    }

    fn unavailable() -> ApiError {
        ApiError::Status {
            status: 503,
            message: "Service Unavailable".to_string(),
        }
    }

    #[async_trait]
    impl ComplaintBackend for FakeBackend {
        async fn fetch_complaints(&self, params: &ApiParams) -> Result<Value, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_params.lock().unwrap().push(params.clone());
            let scripted = self.complaints.lock().unwrap().pop_front();
            let Some(scripted) = scripted else {
                return Err(unavailable());
            };
            tokio::time::sleep(scripted.delay).await;
            scripted.body.ok_or_else(unavailable)
        }

        async fn fetch_heatmap(&self, _params: &ApiParams) -> Result<Value, ApiError> {
            self.heatmap.lock().unwrap().clone().ok_or_else(unavailable)
        }

        async fn fetch_territories(
            &self,
            _level: TerritoryLevel,
            _city: &str,
        ) -> Result<Value, ApiError> {
            Err(unavailable())
        }
    }

    fn store(backend: &Arc<FakeBackend>) -> ComplaintStore<FakeBackend> {
        ComplaintStore::new(Arc::clone(backend)).with_debounce(Duration::ZERO)
    }

    fn five_complaints() -> Value {
        let records = (0_u8..5)
            .map(|i| {
                json!({
                    "_id": format!("c{i}"),
                    "category": if i % 2 == 0 { "Water" } else { "Roads" },
                    "location": { "coordinates": [f64::from(i).mul_add(0.01, 67.0), 24.9] },
                })
            })
            .collect();
        Value::Array(records)
    }

    #[tokio::test]
    async fn nested_envelope_normalizes_and_weights() {
        let backend = Arc::new(FakeBackend::default());
        backend.push(
            0,
            Some(json!({ "data": { "complaints": [
                { "_id": "a", "severity": 9, "location": { "coordinates": [67.0, 24.9] } }
            ] } })),
        );
        let store = store(&backend);

        let outcome = store.fetch(ApiParams::new()).await;
        assert_eq!(outcome.complaints().len(), 1);

        let weights = store.heatmap_weights();
        assert_eq!(weights.len(), 1);
        let [lat, lng, intensity] = weights[0].as_triple();
        assert!((lat - 24.9).abs() < 1e-9);
        assert!((lng - 67.0).abs() < 1e-9);
        assert!((intensity - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stats_follow_each_fetch() {
        let backend = Arc::new(FakeBackend::default());
        backend.push(0, Some(five_complaints()));
        backend.push(0, Some(json!([{ "id": "solo" }])));
        let store = store(&backend);

        store.fetch(ApiParams::new()).await;
        let stats = store.stats();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.by_category.get("Water"), Some(&3));
        assert_eq!(stats.by_category.get("Roads"), Some(&2));
        assert_eq!(stats.by_status.get("reported"), Some(&5));

        store.fetch(ApiParams::new()).await;
        let stats = store.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.by_category.get("Other"), Some(&1));
        assert_eq!(store.complaints().len(), 1);
    }

    #[tokio::test]
    async fn failure_keeps_stale_collection() {
        let backend = Arc::new(FakeBackend::default());
        backend.push(0, Some(five_complaints()));
        backend.push(0, None);
        let store = store(&backend);

        assert!(store.fetch(ApiParams::new()).await.is_loaded());
        let outcome = store.fetch(ApiParams::new()).await;

        assert!(matches!(outcome, FetchOutcome::Failed(_)));
        assert!(outcome.complaints().is_empty());
        assert_eq!(store.complaints().len(), 5);
        let error = store.error().unwrap();
        assert!(error.retryable);
        assert!(error.message.contains("503"));

        let everywhere = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
        assert_eq!(store.get_in_bounds(&everywhere).len(), 5);
    }

    #[tokio::test]
    async fn success_clears_error() {
        let backend = Arc::new(FakeBackend::default());
        backend.push(0, None);
        backend.push(0, Some(five_complaints()));
        let store = store(&backend);

        store.fetch(ApiParams::new()).await;
        assert!(store.error().is_some());
        assert!(store.retry().await.is_loaded());
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn retry_reuses_last_params() {
        let backend = Arc::new(FakeBackend::default());
        backend.push(0, None);
        backend.push(0, Some(json!([])));
        let store = store(&backend);

        let mut params = ApiParams::new();
        params.insert("category", "Water");
        store.fetch(params.clone()).await;
        store.retry().await;

        let seen = backend.seen_params.lock().unwrap();
        assert_eq!(seen.as_slice(), [params.clone(), params]);
    }

    #[tokio::test]
    async fn malformed_body_loads_empty_list() {
        let backend = Arc::new(FakeBackend::default());
        backend.push(0, Some(five_complaints()));
        backend.push(0, Some(json!({ "message": "ok" })));
        let store = store(&backend);

        store.fetch(ApiParams::new()).await;
        let outcome = store.fetch(ApiParams::new()).await;
        assert!(outcome.is_loaded());
        assert!(store.complaints().is_empty());
        assert!(store.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_fetches_coalesce() {
        let backend = Arc::new(FakeBackend::default());
        backend.push(0, Some(five_complaints()));
        let store = ComplaintStore::new(Arc::clone(&backend));

        let mut last = ApiParams::new();
        last.insert("severity_min", "3");

        let (a, b, c) = tokio::join!(
            store.fetch(ApiParams::new()),
            store.fetch(ApiParams::new()),
            store.fetch(last.clone()),
        );

        assert!(matches!(a, FetchOutcome::Superseded));
        assert!(matches!(b, FetchOutcome::Superseded));
        assert_eq!(c.complaints().len(), 5);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.last_params(), Some(last));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stale_response_is_discarded() {
        let backend = Arc::new(FakeBackend::default());
        backend.push(500, Some(five_complaints()));
        backend.push(10, Some(json!([{ "id": "newest" }])));
        let store = store(&backend);

        let (older, newer) = tokio::join!(
            store.fetch(ApiParams::new()),
            store.fetch(ApiParams::new()),
        );

        assert!(matches!(older, FetchOutcome::Superseded));
        assert!(newer.is_loaded());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        let current = store.complaints();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id, "newest");
    }

    #[tokio::test]
    async fn bounds_queries_are_subsets() {
        let backend = Arc::new(FakeBackend::default());
        let store = store(&backend);
        let bbox = BoundingBox::new(66.0, 24.0, 68.0, 26.0);
        assert!(store.get_in_bounds(&bbox).is_empty());

        backend.push(
            0,
            Some(json!([
                { "id": "in", "lat": 24.9, "lng": 67.0 },
                { "id": "out", "lat": 31.5, "lng": 74.3 },
                { "id": "nowhere" },
            ])),
        );
        store.fetch(ApiParams::new()).await;

        let all = store.complaints();
        let inside = store.get_in_bounds(&bbox);
        assert!(inside.iter().all(|c| all.contains(c)));
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].id, "in");
        assert_eq!(store.count_in_bounds(&bbox), 1);
        assert_eq!(store.get_by_id("out").map(|c| c.id), Some("out".to_string()));
        assert_eq!(store.get_by_category("Other").len(), 3);
        assert!(store.get_by_id("missing").is_none());
    }

    #[tokio::test]
    async fn heatmap_prefers_server_and_falls_back() {
        let backend = Arc::new(FakeBackend::default());
        backend.push(0, Some(five_complaints()));
        let store = store(&backend);
        store.fetch(ApiParams::new()).await;
        let local = store.heatmap_weights();
        assert_eq!(local.len(), 5);

        *backend.heatmap.lock().unwrap() =
            Some(json!([[24.9, 67.0, 0.7], [24.8, 67.1, 3.0], ["bad"]]));
        let server = store.fetch_heatmap(&ApiParams::new()).await;
        assert_eq!(server.len(), 2);
        assert!((server[1].intensity - 1.0).abs() < f64::EPSILON);
        assert!(!Arc::ptr_eq(&server, &local));

        *backend.heatmap.lock().unwrap() = None;
        let fallback = store.fetch_heatmap(&ApiParams::new()).await;
        assert_eq!(fallback.len(), 5);
        assert!(fallback.iter().all(|p| (p.intensity - 0.5).abs() < f64::EPSILON));
    }

    #[tokio::test]
    async fn unusable_heatmap_body_falls_back_to_local_weights() {
        let backend = Arc::new(FakeBackend::default());
        backend.push(0, Some(five_complaints()));
        let store = store(&backend);
        store.fetch(ApiParams::new()).await;

        *backend.heatmap.lock().unwrap() = Some(json!({ "message": "internal" }));
        assert_eq!(store.fetch_heatmap(&ApiParams::new()).await.len(), 5);

        *backend.heatmap.lock().unwrap() = Some(json!([["bad"], { "lat": "x" }]));
        assert_eq!(store.fetch_heatmap(&ApiParams::new()).await.len(), 5);
    }
}
