//! Resolved Catalog
//!
//! Entities live in one arena per kind, in ingestion order. Relations are
//! stored as arena positions, and a parent -> children index makes traversal
//! downward as cheap as following a parent link upward.
//!
//! A catalog has no mutating methods. A new ingestion pass produces a new
//! catalog, which callers swap in through [`CatalogHandle`].

use serde::ser::{Serialize, SerializeMap, Serializer};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::entity::{Entity, EntityRef};
use crate::error::ResolutionError;
use crate::record::RecordBatch;
use crate::resolver::{Resolution, Resolver};
use crate::schema::Kind;

/// Entities of one kind plus an id index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct KindArena {
    pub(crate) entities: Vec<Entity>,
    pub(crate) by_id: HashMap<String, usize>,
}

/// Search result
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SearchHit {
    pub kind: Kind,
    pub id: String,
    pub name: String,
    pub score: i64,
}

/// Immutable, queryable entity graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCatalog {
    /// Kinds in processing order
    pub(crate) kinds: Vec<Kind>,
    pub(crate) arenas: HashMap<Kind, KindArena>,
    /// Index: parent -> relation -> children in ingestion order
    pub(crate) children: HashMap<EntityRef, HashMap<&'static str, Vec<EntityRef>>>,
}

impl ResolvedCatalog {
    /// Look up an entity by kind and id
    pub fn get_by_id(&self, kind: Kind, id: &str) -> Option<&Entity> {
        let arena = self.arenas.get(&kind)?;
        arena.by_id.get(id).map(|&idx| &arena.entities[idx])
    }

    /// Follow an arena reference
    pub fn get(&self, entity: EntityRef) -> Option<&Entity> {
        self.arenas.get(&entity.kind)?.entities.get(entity.index)
    }

    /// Children linked to the given parent through `relation`, in the order
    /// their records were ingested
    pub fn children_of(&self, kind: Kind, id: &str, relation: &str) -> Vec<&Entity> {
        let Some(parent) = self.get_by_id(kind, id) else {
            return Vec::new();
        };
        self.children_of_entity(parent, relation)
    }

    /// Like [`ResolvedCatalog::children_of`], keeping only children of `child_kind`
    pub fn children_of_kind(
        &self,
        kind: Kind,
        id: &str,
        relation: &str,
        child_kind: Kind,
    ) -> Vec<&Entity> {
        self.children_of(kind, id, relation)
            .into_iter()
            .filter(|e| e.kind == child_kind)
            .collect()
    }

    pub fn children_of_entity(&self, parent: &Entity, relation: &str) -> Vec<&Entity> {
        self.children
            .get(&parent.entity_ref())
            .and_then(|by_relation| by_relation.get(relation))
            .map(|refs| refs.iter().filter_map(|r| self.get(*r)).collect())
            .unwrap_or_default()
    }

    /// Resolved parent of an entity
    pub fn parent_of(&self, entity: &Entity, relation: &str) -> Option<&Entity> {
        entity.parent(relation).and_then(|p| self.get(p.entity_ref()))
    }

    /// All entities of a kind in ingestion order
    pub fn all_of_kind(&self, kind: Kind) -> &[Entity] {
        self.arenas
            .get(&kind)
            .map(|a| a.entities.as_slice())
            .unwrap_or(&[])
    }

    /// Kinds in processing order
    pub fn kinds(&self) -> &[Kind] {
        &self.kinds
    }

    pub fn count(&self, kind: Kind) -> usize {
        self.all_of_kind(kind).len()
    }

    /// Total entity count
    pub fn len(&self) -> usize {
        self.arenas.values().map(|a| a.entities.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entities, kind by kind in processing order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.kinds.iter().flat_map(move |k| self.all_of_kind(*k).iter())
    }

    /// Fuzzy search entities of a kind by display name
    pub fn search(&self, kind: Kind, query: &str, limit: usize) -> Vec<SearchHit> {
        use fuzzy_matcher::skim::SkimMatcherV2;
        use fuzzy_matcher::FuzzyMatcher;

        let matcher = SkimMatcherV2::default();
        let mut results: Vec<(i64, &Entity)> = self
            .all_of_kind(kind)
            .iter()
            .filter_map(|e| matcher.fuzzy_match(e.display_name(), query).map(|score| (score, e)))
            .collect();

        // Stable sort keeps ingestion order among equal scores
        results.sort_by(|a, b| b.0.cmp(&a.0));

        results
            .into_iter()
            .take(limit)
            .map(|(score, e)| SearchHit {
                kind: e.kind,
                id: e.id.clone(),
                name: e.display_name().to_string(),
                score,
            })
            .collect()
    }

    /// SHA-256 over the canonical JSON form; equal for structurally equal catalogs
    pub fn fingerprint(&self) -> serde_json::Result<String> {
        let canonical = serde_json::to_vec(self)?;
        Ok(format!("{:x}", Sha256::digest(&canonical)))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Export the entity graph to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        const PALETTE: [&str; 6] = [
            "#00BCD4", "#FF9800", "#4CAF50", "#9C27B0", "#F44336", "#607D8B",
        ];

        let mut output = String::new();

        output.push_str("digraph Catalog {\n");
        output.push_str("  rankdir=BT;\n");
        output.push_str(
            "  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n",
        );
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#808080\"];\n\n");

        for (i, kind) in self.kinds.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            for entity in self.all_of_kind(*kind) {
                output.push_str(&format!(
                    "  \"{}\" [label=\"{}\", fillcolor=\"{}\"];\n",
                    dot_id(entity.kind, &entity.id),
                    escape(entity.display_name()),
                    color
                ));
            }
        }

        output.push('\n');

        for entity in self.iter() {
            for (relation, parent) in &entity.parent_refs {
                output.push_str(&format!(
                    "  \"{}\" -> \"{}\" [label=\"{}\"];\n",
                    dot_id(entity.kind, &entity.id),
                    dot_id(parent.kind, &parent.id),
                    relation
                ));
            }
        }

        output.push_str("}\n");
        output
    }
}

fn dot_id(kind: Kind, id: &str) -> String {
    format!("{}:{}", kind, escape(id))
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Serialize for ResolvedCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.kinds.len()))?;
        for kind in &self.kinds {
            map.serialize_entry(kind, self.all_of_kind(*kind))?;
        }
        map.end()
    }
}

/// Assembles a catalog kind by kind during resolution
#[derive(Debug, Default)]
pub(crate) struct CatalogBuilder {
    catalog: ResolvedCatalog,
}

impl CatalogBuilder {
    /// Arena position of an accepted entity
    pub(crate) fn lookup(&self, kind: Kind, id: &str) -> Option<usize> {
        self.catalog.arenas.get(&kind)?.by_id.get(id).copied()
    }

    /// Add a finished kind. Entity indices must match their positions.
    pub(crate) fn push_kind(&mut self, kind: Kind, entities: Vec<Entity>) {
        let by_id = entities
            .iter()
            .map(|e| (e.id.clone(), e.index))
            .collect();

        for entity in &entities {
            for (relation, parent) in &entity.parent_refs {
                self.catalog
                    .children
                    .entry(parent.entity_ref())
                    .or_default()
                    .entry(*relation)
                    .or_default()
                    .push(entity.entity_ref());
            }
        }

        self.catalog.kinds.push(kind);
        self.catalog.arenas.insert(kind, KindArena { entities, by_id });
    }

    pub(crate) fn finish(self) -> ResolvedCatalog {
        self.catalog
    }
}

/// Process-wide pointer to the current catalog.
///
/// Readers take an `Arc` snapshot that never changes under them. A new
/// catalog is only published after its resolution succeeded.
#[derive(Debug, Default)]
pub struct CatalogHandle {
    current: RwLock<Arc<ResolvedCatalog>>,
}

impl CatalogHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: ResolvedCatalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Snapshot of the current catalog
    pub fn current(&self) -> Arc<ResolvedCatalog> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the current catalog, returning the previous one
    pub fn publish(&self, catalog: ResolvedCatalog) -> Arc<ResolvedCatalog> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, Arc::new(catalog))
    }

    /// Resolve a batch and publish the result on success.
    ///
    /// On failure the current catalog stays in place. Errors collected in
    /// lenient mode are returned; the catalog is published regardless.
    pub fn resolve_and_publish(
        &self,
        resolver: &Resolver,
        batch: &RecordBatch,
    ) -> Result<Vec<ResolutionError>, ResolutionError> {
        let Resolution { catalog, errors } = resolver.resolve(batch)?;
        self.publish(catalog);
        Ok(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::registry::SchemaRegistry;
    use crate::record::RawRecord;

    fn queen() -> RecordBatch {
        RecordBatch::new()
            .with("Artist", RawRecord::new("A1").with_field("Name", "Queen"))
            .with("Artist", RawRecord::new("A2").with_field("Name", "Queensryche"))
            .with(
                "Album",
                RawRecord::new("AL1")
                    .with_field("Name", "News of the World")
                    .with_field("ArtistId", "A1"),
            )
            .with(
                "Album",
                RawRecord::new("AL2")
                    .with_field("Name", "A Night at the Opera")
                    .with_field("ArtistId", "A1"),
            )
    }

    fn media_resolver() -> Resolver {
        Resolver::new(Arc::new(SchemaRegistry::media_library()), ResolverConfig::default())
    }

    fn resolve(batch: &RecordBatch) -> ResolvedCatalog {
        media_resolver().resolve(batch).unwrap().catalog
    }

    #[test]
    fn test_queries() {
        let catalog = resolve(&queen());
        let artist = Kind::new("Artist");
        let album = Kind::new("Album");

        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.count(album), 2);
        assert_eq!(catalog.kinds(), &[artist, album, Kind::new("Track")]);
        assert!(catalog.get_by_id(album, "AL9").is_none());
        assert!(catalog.get_by_id(Kind::new("Playlist"), "AL1").is_none());

        let al2 = catalog.get_by_id(album, "AL2").unwrap();
        assert_eq!(catalog.parent_of(al2, "artist").unwrap().id, "A1");
        assert!(catalog.parent_of(al2, "label").is_none());

        let children: Vec<_> = catalog
            .children_of(artist, "A1", "artist")
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(children, vec!["AL1", "AL2"]);
        assert!(catalog.children_of(artist, "A2", "artist").is_empty());
        assert!(catalog.children_of(artist, "A1", "album").is_empty());
        assert_eq!(catalog.children_of_kind(artist, "A1", "artist", Kind::new("Track")).len(), 0);
    }

    #[test]
    fn test_search() {
        let catalog = resolve(&queen());
        let hits = catalog.search(Kind::new("Album"), "news", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "AL1");
        assert_eq!(hits[0].name, "News of the World");
        assert_eq!(catalog.search(Kind::new("Artist"), "queen", 10).len(), 2);
        assert!(catalog.search(Kind::new("Album"), "zzzz", 10).is_empty());
        assert_eq!(catalog.search(Kind::new("Artist"), "q", 1).len(), 1);
    }

    #[test]
    fn test_json_export() {
        let catalog = resolve(&queen());
        let json: serde_json::Value = serde_json::from_str(&catalog.to_json().unwrap()).unwrap();
        assert_eq!(json["Album"][0]["id"], "AL1");
        assert_eq!(json["Album"][0]["attributes"]["Name"], "News of the World");
        assert_eq!(json["Album"][0]["parent_refs"]["artist"]["kind"], "Artist");
        assert_eq!(json["Album"][0]["parent_refs"]["artist"]["id"], "A1");
        assert!(json["Artist"][0].get("parent_refs").is_none());
    }

    #[test]
    fn test_fingerprint() {
        let first = resolve(&queen()).fingerprint().unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, resolve(&queen()).fingerprint().unwrap());
        assert_ne!(first, ResolvedCatalog::default().fingerprint().unwrap());
    }

    #[test]
    fn test_to_dot() {
        let dot = resolve(&queen()).to_dot();
        assert!(dot.contains("\"Album:AL1\" [label=\"News of the World\""));
        assert!(dot.contains("\"Album:AL1\" -> \"Artist:A1\" [label=\"artist\"];"));
    }

    #[test]
    fn test_handle_publish() {
        let handle = CatalogHandle::new();
        assert!(handle.current().is_empty());

        let before = handle.current();
        let previous = handle.publish(resolve(&queen()));
        assert!(previous.is_empty());
        assert!(before.is_empty());
        assert_eq!(handle.current().len(), 4);
    }

    #[test]
    fn test_handle_keeps_catalog_on_failure() {
        let resolver = media_resolver();
        let handle = CatalogHandle::with_catalog(resolve(&queen()));

        let bad = RecordBatch::new()
            .with("Album", RawRecord::new("AL1").with_field("ArtistId", "A9"));
        assert!(handle.resolve_and_publish(&resolver, &bad).is_err());
        assert_eq!(handle.current().len(), 4);

        let fresh = RecordBatch::new().with("Artist", RawRecord::new("A3"));
        let errors = handle.resolve_and_publish(&resolver, &fresh).unwrap();
        assert!(errors.is_empty());
        assert_eq!(handle.current().len(), 1);
    }
}
