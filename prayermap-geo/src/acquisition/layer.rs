//! Viewport-driven boundary layer state.
//!
//! The map component reports viewport changes here and renders whatever
//! [`LayerState`] comes back. When viewport changes overlap, only the latest
//! one may update the state; results for superseded viewports are discarded.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::facade::{AcquisitionOutcome, BoundaryAcquisition};
use crate::boundary::{BoundaryType, ProcessedBoundary};
use crate::cache::CacheEntryInfo;
use crate::geo::{BoundingBox, LonLat};
use crate::hierarchy::{Entity, HierarchyLevel, HierarchyResolver};
use crate::source::{AsyncHttpClient, QueryScope};

/// What the map is currently showing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom: f64,
    pub center: LonLat,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub selected_entity_id: Option<String>,
    /// ISO 3166-1 alpha-2 filter
    #[serde(default)]
    pub country: Option<String>,
    /// ISO 3166-2 filter
    #[serde(default)]
    pub region: Option<String>,
}

impl Viewport {
    pub fn new(zoom: f64, center: LonLat) -> Self {
        Self {
            zoom,
            center,
            bbox: None,
            selected_entity_id: None,
            country: None,
            region: None,
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_selection(mut self, entity_id: impl Into<String>) -> Self {
        self.selected_entity_id = Some(entity_id.into());
        self
    }

    pub fn scope(&self) -> QueryScope {
        QueryScope {
            bbox: self.bbox,
            country: self.country.clone(),
            region: self.region.clone(),
        }
        .normalized()
    }
}

/// Render state for the boundary layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerState {
    pub boundaries: Arc<Vec<ProcessedBoundary>>,
    pub is_loading: bool,
    /// User-facing error from the last acquisition
    pub error: Option<String>,
    /// Granularity of the boundaries being shown
    pub dataset_granularity: Option<BoundaryType>,
    /// Hierarchy level for the current viewport
    pub hierarchy: Option<HierarchyLevel>,
    /// Whether the last failure was a temporary pause
    pub temporarily_unavailable: bool,
}

/// Holds the viewport, hierarchy, and boundary state for one map.
pub struct BoundaryLayer<C: AsyncHttpClient + 'static> {
    acquisition: BoundaryAcquisition<C>,
    hierarchy: RwLock<HierarchyResolver>,
    viewport: Mutex<Option<Viewport>>,
    state: Mutex<LayerState>,
    generation: AtomicU64,
}

impl<C: AsyncHttpClient + 'static> BoundaryLayer<C> {
    pub fn new(acquisition: BoundaryAcquisition<C>, hierarchy: HierarchyResolver) -> Self {
        Self {
            acquisition,
            hierarchy: RwLock::new(hierarchy),
            viewport: Mutex::new(None),
            state: Mutex::new(LayerState::default()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn acquisition(&self) -> &BoundaryAcquisition<C> {
        &self.acquisition
    }

    /// Replaces the entity directory and re-resolves the hierarchy for the
    /// current viewport.
    pub fn set_entities(&self, entities: Vec<Entity>) {
        self.hierarchy.write().set_entities(entities);
        let viewport = self.viewport.lock().clone();
        if let Some(viewport) = viewport {
            let level = self.resolve_hierarchy(&viewport);
            self.state.lock().hierarchy = Some(level);
        }
    }

    /// Applies a new viewport and loads its boundaries.
    pub async fn update_viewport(&self, viewport: Viewport) -> LayerState {
        self.load(viewport, true).await
    }

    /// Reloads the current viewport, bypassing the cache.
    ///
    /// Returns the current state unchanged when no viewport has been set.
    pub async fn reload(&self) -> LayerState {
        let viewport = self.viewport.lock().clone();
        match viewport {
            Some(viewport) => self.load(viewport, false).await,
            None => self.state(),
        }
    }

    pub fn state(&self) -> LayerState {
        self.state.lock().clone()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport.lock().clone()
    }

    pub fn cache_entries(&self) -> Vec<CacheEntryInfo> {
        self.acquisition.cache().entries()
    }

    pub fn clear_cache(&self) {
        self.acquisition.cache().clear();
    }

    async fn load(&self, viewport: Viewport, use_cache: bool) -> LayerState {
        let level = self.resolve_hierarchy(&viewport);
        let scope = viewport.scope();
        let zoom = viewport.zoom;

        let generation = {
            let mut state = self.state.lock();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *self.viewport.lock() = Some(viewport);
            state.is_loading = true;
            state.hierarchy = Some(level);
            generation
        };

        let outcome = if use_cache {
            self.acquisition.acquire(zoom, &scope).await
        } else {
            self.acquisition.acquire_fresh(zoom, &scope).await
        };

        // Checked under the state lock so a newer load cannot start in between
        let mut state = self.state.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Discarding boundaries for superseded viewport");
            return state.clone();
        }
        apply_outcome(&mut state, outcome);
        state.clone()
    }

    fn resolve_hierarchy(&self, viewport: &Viewport) -> HierarchyLevel {
        self.hierarchy.read().resolve(
            viewport.zoom,
            viewport.center,
            viewport.selected_entity_id.as_deref(),
        )
    }
}

fn apply_outcome(state: &mut LayerState, outcome: AcquisitionOutcome) {
    state.is_loading = false;
    match outcome.error {
        Some(err) => {
            // Keep showing the previous boundaries during a temporary pause
            if !err.is_temporary() {
                state.boundaries = Arc::new(Vec::new());
                state.dataset_granularity = None;
            }
            state.temporarily_unavailable = err.is_temporary();
            state.error = Some(err.to_string());
        }
        None => {
            state.boundaries = outcome.boundaries;
            state.dataset_granularity = outcome.dataset_granularity;
            state.temporarily_unavailable = false;
            state.error = None;
        }
    }
}
