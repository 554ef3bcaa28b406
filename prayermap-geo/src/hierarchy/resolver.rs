//! Viewport → hierarchy level resolution and aggregation.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::entity::{Entity, EntityDirectory};
use crate::boundary::BoundaryType;
use crate::geo::{haversine_km, LonLat};

/// Administrative level a viewport represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyLevelKind {
    World,
    Continent,
    Country,
    State,
    City,
    Neighborhood,
}

impl HierarchyLevelKind {
    /// Entity type that lives at this level. `World` has none.
    pub fn entity_kind(&self) -> Option<BoundaryType> {
        match self {
            HierarchyLevelKind::World => None,
            HierarchyLevelKind::Continent => Some(BoundaryType::Continent),
            HierarchyLevelKind::Country => Some(BoundaryType::Country),
            HierarchyLevelKind::State => Some(BoundaryType::State),
            HierarchyLevelKind::City => Some(BoundaryType::City),
            HierarchyLevelKind::Neighborhood => Some(BoundaryType::Neighborhood),
        }
    }

    /// Entity type of this level's children.
    pub fn child_kind(&self) -> Option<BoundaryType> {
        match self {
            HierarchyLevelKind::World => Some(BoundaryType::Continent),
            HierarchyLevelKind::Continent => Some(BoundaryType::Country),
            HierarchyLevelKind::Country => Some(BoundaryType::State),
            HierarchyLevelKind::State => Some(BoundaryType::City),
            HierarchyLevelKind::City => Some(BoundaryType::Neighborhood),
            HierarchyLevelKind::Neighborhood => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HierarchyLevelKind::World => "world",
            HierarchyLevelKind::Continent => "continent",
            HierarchyLevelKind::Country => "country",
            HierarchyLevelKind::State => "state",
            HierarchyLevelKind::City => "city",
            HierarchyLevelKind::Neighborhood => "neighborhood",
        }
    }
}

impl From<BoundaryType> for HierarchyLevelKind {
    fn from(kind: BoundaryType) -> Self {
        match kind {
            BoundaryType::Continent => HierarchyLevelKind::Continent,
            BoundaryType::Country => HierarchyLevelKind::Country,
            BoundaryType::State => HierarchyLevelKind::State,
            BoundaryType::City => HierarchyLevelKind::City,
            BoundaryType::Neighborhood => HierarchyLevelKind::Neighborhood,
        }
    }
}

impl fmt::Display for HierarchyLevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper zoom bound (inclusive) for each hierarchy level.
///
/// Zoom values above `city` resolve to neighborhoods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelThresholds {
    pub world: f64,
    pub continent: f64,
    pub country: f64,
    pub state: f64,
    pub city: f64,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            world: 3.0,
            continent: 5.0,
            country: 8.0,
            state: 12.0,
            city: 15.0,
        }
    }
}

impl LevelThresholds {
    pub fn level_for(&self, zoom: f64) -> HierarchyLevelKind {
        if zoom <= self.world {
            HierarchyLevelKind::World
        } else if zoom <= self.continent {
            HierarchyLevelKind::Continent
        } else if zoom <= self.country {
            HierarchyLevelKind::Country
        } else if zoom <= self.state {
            HierarchyLevelKind::State
        } else if zoom <= self.city {
            HierarchyLevelKind::City
        } else {
            HierarchyLevelKind::Neighborhood
        }
    }
}

type EntityPredicate = Arc<dyn Fn(&Entity) -> bool + Send + Sync>;

/// Predicates selecting the critical and revival subsets.
#[derive(Clone)]
pub struct AggregationPredicates {
    critical: EntityPredicate,
    revival: EntityPredicate,
}

impl AggregationPredicates {
    pub fn new<C, R>(critical: C, revival: R) -> Self
    where
        C: Fn(&Entity) -> bool + Send + Sync + 'static,
        R: Fn(&Entity) -> bool + Send + Sync + 'static,
    {
        Self {
            critical: Arc::new(critical),
            revival: Arc::new(revival),
        }
    }

    pub fn is_critical(&self, entity: &Entity) -> bool {
        (self.critical)(entity)
    }

    pub fn is_revival(&self, entity: &Entity) -> bool {
        (self.revival)(entity)
    }
}

impl Default for AggregationPredicates {
    /// Reads the entity's own `critical` / `revival` flags.
    fn default() -> Self {
        Self::new(|e| e.critical, |e| e.revival)
    }
}

impl fmt::Debug for AggregationPredicates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationPredicates").finish_non_exhaustive()
    }
}

/// Summed counters over a set of entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedStats {
    pub total: u64,
    pub entity_count: usize,
    pub critical_count: usize,
    pub critical_total: u64,
    pub revival_count: usize,
    pub revival_total: u64,
}

impl AggregatedStats {
    fn add(&mut self, entity: &Entity, predicates: &AggregationPredicates) {
        self.total = self.total.saturating_add(entity.value);
        self.entity_count += 1;
        if predicates.is_critical(entity) {
            self.critical_count += 1;
            self.critical_total = self.critical_total.saturating_add(entity.value);
        }
        if predicates.is_revival(entity) {
            self.revival_count += 1;
            self.revival_total = self.revival_total.saturating_add(entity.value);
        }
    }
}

/// The resolved level for one viewport. Recomputed on every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyLevel {
    pub level: HierarchyLevelKind,
    pub zoom: f64,
    pub focus: Option<Entity>,
    pub children: Vec<Entity>,
    pub aggregated: AggregatedStats,
}

/// Maps a viewport to a hierarchy level over an entity directory.
///
/// Resolution never fails: unknown selections fall back to the viewport and
/// an empty directory yields an empty, zero-aggregate level.
#[derive(Debug, Clone, Default)]
pub struct HierarchyResolver {
    directory: EntityDirectory,
    thresholds: LevelThresholds,
    predicates: AggregationPredicates,
}

impl HierarchyResolver {
    pub fn new(directory: EntityDirectory) -> Self {
        Self {
            directory,
            ..Default::default()
        }
    }

    pub fn with_thresholds(mut self, thresholds: LevelThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_predicates(mut self, predicates: AggregationPredicates) -> Self {
        self.predicates = predicates;
        self
    }

    pub fn directory(&self) -> &EntityDirectory {
        &self.directory
    }

    pub fn thresholds(&self) -> &LevelThresholds {
        &self.thresholds
    }

    /// Replaces the entity list.
    pub fn set_entities(&mut self, entities: Vec<Entity>) {
        self.directory.replace(entities);
    }

    /// Resolves the viewport.
    ///
    /// A known `selected_entity_id` overrides the viewport: its type sets the
    /// level. Otherwise the level comes from `zoom` and the focus is the
    /// nearest entity of that level to `center`.
    pub fn resolve(
        &self,
        zoom: f64,
        center: LonLat,
        selected_entity_id: Option<&str>,
    ) -> HierarchyLevel {
        if let Some(id) = selected_entity_id {
            match self.directory.get(id) {
                Some(selected) => return self.level_for_focus(zoom, selected),
                None => tracing::debug!(id, "Selected entity not found, using viewport"),
            }
        }

        let level = self.thresholds.level_for(zoom);
        let candidates: Vec<&Entity> = match level.entity_kind() {
            Some(kind) => self.directory.of_kind(kind).collect(),
            None => Vec::new(),
        };

        match nearest(&candidates, center) {
            Some(focus) => self.level_for_focus(zoom, focus),
            None => {
                let children: Vec<Entity> = match level {
                    // Top-level continents
                    HierarchyLevelKind::World => self
                        .directory
                        .of_kind(BoundaryType::Continent)
                        .filter(|e| e.parent_id.is_none())
                        .cloned()
                        .collect(),
                    _ => candidates.into_iter().cloned().collect(),
                };
                let mut aggregated = AggregatedStats::default();
                for child in &children {
                    aggregated.add(child, &self.predicates);
                }
                HierarchyLevel {
                    level,
                    zoom,
                    focus: None,
                    children,
                    aggregated,
                }
            }
        }
    }

    /// Parent chain of an entity, nearest first.
    pub fn ancestors(&self, entity_id: &str) -> Vec<Entity> {
        self.directory
            .ancestors(entity_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Aggregates an entity and its whole subtree.
    pub fn aggregate(&self, entity_id: &str) -> AggregatedStats {
        let mut stats = AggregatedStats::default();
        if let Some(entity) = self.directory.get(entity_id) {
            stats.add(entity, &self.predicates);
            for descendant in self.directory.descendants(entity_id) {
                stats.add(descendant, &self.predicates);
            }
        }
        stats
    }

    fn level_for_focus(&self, zoom: f64, focus: &Entity) -> HierarchyLevel {
        let level = HierarchyLevelKind::from(focus.kind);
        let children = match level.child_kind() {
            Some(kind) => self
                .directory
                .children_of(&focus.id)
                .filter(|e| e.kind == kind)
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        HierarchyLevel {
            level,
            zoom,
            focus: Some(focus.clone()),
            children,
            aggregated: self.aggregate(&focus.id),
        }
    }
}

/// Nearest entity by great-circle distance. Ties keep the first.
fn nearest<'a>(candidates: &[&'a Entity], center: LonLat) -> Option<&'a Entity> {
    let mut best: Option<(&Entity, f64)> = None;
    for &entity in candidates {
        let distance = haversine_km(center, entity.coordinates);
        let closer = match best {
            Some((_, best_distance)) => distance < best_distance,
            None => true,
        };
        if closer {
            best = Some((entity, distance));
        }
    }
    best.map(|(entity, _)| entity)
}
