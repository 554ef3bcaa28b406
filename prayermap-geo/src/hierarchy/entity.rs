//! Geographic entities and the parent → children index over them.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::boundary::BoundaryType;
use crate::geo::LonLat;

/// A geographic entity with its per-entity counter and flags.
///
/// Entities are read-only input; the directory never mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BoundaryType,
    pub coordinates: LonLat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub value: u64,
    #[serde(default)]
    pub critical: bool,
    #[serde(default)]
    pub revival: bool,
}

impl Entity {
    /// Convenience constructor with zeroed counters.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: BoundaryType,
        coordinates: LonLat,
        parent_id: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            coordinates,
            parent_id: parent_id.map(str::to_string),
            value: 0,
            critical: false,
            revival: false,
        }
    }

    pub fn with_value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }

    pub fn with_flags(mut self, critical: bool, revival: bool) -> Self {
        self.critical = critical;
        self.revival = revival;
        self
    }
}

/// Entity list with id and parent → children indexes.
///
/// Indexes are built once per load, so subtree walks never rescan the list.
#[derive(Debug, Clone, Default)]
pub struct EntityDirectory {
    entities: Vec<Entity>,
    by_id: HashMap<String, usize>,
    children: HashMap<String, Vec<usize>>,
}

impl EntityDirectory {
    pub fn new(entities: Vec<Entity>) -> Self {
        let mut directory = Self::default();
        directory.replace(entities);
        directory
    }

    /// Parses a JSON array of entities.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let entities: Vec<Entity> = serde_json::from_str(json)?;
        Ok(Self::new(entities))
    }

    /// Swaps in a new entity list and rebuilds the indexes.
    ///
    /// When ids repeat, the first occurrence wins.
    pub fn replace(&mut self, entities: Vec<Entity>) {
        let mut kept = Vec::with_capacity(entities.len());
        let mut by_id = HashMap::with_capacity(entities.len());
        let mut children: HashMap<String, Vec<usize>> = HashMap::new();

        for entity in entities {
            if by_id.contains_key(&entity.id) {
                tracing::warn!(id = %entity.id, "Duplicate entity id ignored");
                continue;
            }
            let index = kept.len();
            by_id.insert(entity.id.clone(), index);
            if let Some(parent) = &entity.parent_id {
                children.entry(parent.clone()).or_default().push(index);
            }
            kept.push(entity);
        }

        tracing::debug!(
            entities = kept.len(),
            parents = children.len(),
            "Entity directory indexed"
        );

        self.entities = kept;
        self.by_id = by_id;
        self.children = children;
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.by_id.get(id).map(|&i| &self.entities[i])
    }

    /// Entities of one type, in input order.
    pub fn of_kind(&self, kind: BoundaryType) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    /// Direct children of `id`, in input order.
    pub fn children_of<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.entities[i])
    }

    /// Every entity below `id`, excluding `id` itself.
    ///
    /// Parent cycles in the input are tolerated: each entity is visited once.
    pub fn descendants(&self, id: &str) -> Vec<&Entity> {
        let mut visited: HashSet<usize> = HashSet::new();
        if let Some(&root) = self.by_id.get(id) {
            visited.insert(root);
        }

        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.children.get(id).cloned().unwrap_or_default();
        stack.reverse();

        while let Some(index) = stack.pop() {
            if !visited.insert(index) {
                continue;
            }
            let entity = &self.entities[index];
            out.push(entity);
            if let Some(kids) = self.children.get(&entity.id) {
                stack.extend(kids.iter().rev().copied());
            }
        }
        out
    }

    /// Parent chain of `id`, nearest first. Stops at a missing parent or a cycle.
    pub fn ancestors(&self, id: &str) -> Vec<&Entity> {
        let mut out = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(id);

        let mut current = self.get(id).and_then(|e| e.parent_id.as_deref());
        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                break;
            }
            match self.get(parent_id) {
                Some(parent) => {
                    out.push(parent);
                    current = parent.parent_id.as_deref();
                }
                None => break,
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, kind: BoundaryType, parent: Option<&str>) -> Entity {
        Entity::new(id, id.to_uppercase(), kind, LonLat::new(0.0, 0.0), parent)
    }

    fn tree() -> EntityDirectory {
        EntityDirectory::new(vec![
            entity("af", BoundaryType::Continent, None),
            entity("ke", BoundaryType::Country, Some("af")),
            entity("ng", BoundaryType::Country, Some("af")),
            entity("nairobi-county", BoundaryType::State, Some("ke")),
            entity("nairobi", BoundaryType::City, Some("nairobi-county")),
        ])
    }

    #[test]
    fn test_lookup_and_children() {
        let dir = tree();
        assert_eq!(dir.len(), 5);
        assert_eq!(dir.get("ke").unwrap().name, "KE");
        assert!(dir.get("missing").is_none());

        let kids: Vec<_> = dir.children_of("af").map(|e| e.id.as_str()).collect();
        assert_eq!(kids, vec!["ke", "ng"]);
        assert_eq!(dir.children_of("nairobi").count(), 0);
    }

    #[test]
    fn test_descendants_walk_whole_subtree() {
        let dir = tree();
        let ids: Vec<_> = dir.descendants("af").iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec!["ke", "nairobi-county", "nairobi", "ng"]);
        assert!(dir.descendants("nairobi").is_empty());
        assert!(dir.descendants("missing").is_empty());
    }

    #[test]
    fn test_descendants_tolerate_cycles() {
        let dir = EntityDirectory::new(vec![
            entity("a", BoundaryType::Country, Some("b")),
            entity("b", BoundaryType::State, Some("a")),
        ]);
        let ids: Vec<_> = dir.descendants("a").iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(dir.ancestors("a").len(), 1);
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let dir = tree();
        let ids: Vec<_> = dir.ancestors("nairobi").iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec!["nairobi-county", "ke", "af"]);
        assert!(dir.ancestors("af").is_empty());
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut first = entity("x", BoundaryType::Country, None);
        first.name = "First".into();
        let mut second = entity("x", BoundaryType::Country, None);
        second.name = "Second".into();

        let mut duplicate_child = entity("y", BoundaryType::State, Some("x"));
        duplicate_child.name = "Stray".into();

        let dir = EntityDirectory::new(vec![
            first,
            second,
            entity("y", BoundaryType::State, Some("x")),
            duplicate_child,
        ]);
        assert_eq!(dir.get("x").unwrap().name, "First");
        assert_eq!(dir.len(), 2);
        let countries: Vec<_> = dir
            .of_kind(BoundaryType::Country)
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(countries, vec!["First"]);
        let kids: Vec<_> = dir.children_of("x").map(|e| e.name.as_str()).collect();
        assert_eq!(kids, vec!["Y"]);
    }

    #[test]
    fn test_replace_rebuilds_index() {
        let mut dir = tree();
        dir.replace(vec![entity("eu", BoundaryType::Continent, None)]);
        assert_eq!(dir.len(), 1);
        assert!(dir.get("af").is_none());
        assert_eq!(dir.children_of("af").count(), 0);
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"id": "ke", "name": "Kenya", "type": "country",
             "coordinates": {"lon": 37.9, "lat": 0.02}, "parent_id": "af",
             "value": 12, "critical": true},
            {"id": "af", "name": "Africa", "type": "continent",
             "coordinates": {"lon": 20.0, "lat": 5.0}}
        ]"#;
        let dir = EntityDirectory::from_json(json).unwrap();
        let kenya = dir.get("ke").unwrap();
        assert_eq!(kenya.value, 12);
        assert!(kenya.critical);
        assert!(!kenya.revival);
        assert_eq!(dir.get("af").unwrap().value, 0);
    }
}
