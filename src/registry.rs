//! Entity Schema Registry
//!
//! Holds the kind declarations for a process. The registry is assembled once
//! through [`RegistryBuilder`] and never changes afterwards.

use std::collections::HashMap;
use std::collections::HashSet;

use crate::error::{ResolutionError, SchemaError};
use crate::schema::{FieldDescriptor, Kind, KindSchema, ParentRefDescriptor};

/// The registered entity kinds
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    /// Kind schemas in registration order
    schemas: Vec<KindSchema>,
    /// Index: kind name -> position in `schemas`
    by_name: HashMap<&'static str, usize>,
}

impl SchemaRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Artist, Album and Track as found in an imported music library
    pub fn media_library() -> Self {
        Self::builder()
            .kind(KindSchema::new("Artist").string("Name"))
            .kind(
                KindSchema::new("Album")
                    .string("Name")
                    .string("CoverArtPath")
                    .integer("Year")
                    .boolean("Compilation")
                    .integer("Rating")
                    .parent("ArtistId", "artist", "Artist"),
            )
            .kind(
                KindSchema::new("Track")
                    .string("Title")
                    .string("Path")
                    .integer("TrackNumber")
                    .integer("DiscNumber")
                    .integer("Duration")
                    .integer("Rating")
                    .parent("AlbumId", "album", "Album")
                    .parent("ArtistId", "artist", "Artist"),
            )
            .build()
            .expect("built-in media library schema is valid")
    }

    /// Look up a kind by name
    pub fn kind(&self, name: &str) -> Result<Kind, ResolutionError> {
        self.schema(name).map(|s| s.kind)
    }

    /// Get the full declaration of a kind
    pub fn schema(&self, name: &str) -> Result<&KindSchema, ResolutionError> {
        self.by_name
            .get(name)
            .map(|&idx| &self.schemas[idx])
            .ok_or_else(|| ResolutionError::UnknownKind { kind: name.to_string() })
    }

    /// Ordered attribute descriptors of a kind
    pub fn attributes(&self, name: &str) -> Result<&[FieldDescriptor], ResolutionError> {
        self.schema(name).map(|s| s.attributes.as_slice())
    }

    /// Parent reference descriptors of a kind
    pub fn parent_refs(&self, name: &str) -> Result<&[ParentRefDescriptor], ResolutionError> {
        self.schema(name).map(|s| s.parents.as_slice())
    }

    /// All kinds in registration order
    pub fn kinds(&self) -> impl Iterator<Item = Kind> + '_ {
        self.schemas.iter().map(|s| s.kind)
    }

    pub fn schemas(&self) -> &[KindSchema] {
        &self.schemas
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Collects kind declarations and validates them as a whole
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    schemas: Vec<KindSchema>,
}

impl RegistryBuilder {
    pub fn kind(mut self, schema: KindSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        let mut by_name = HashMap::with_capacity(self.schemas.len());

        for (idx, schema) in self.schemas.iter().enumerate() {
            if by_name.insert(schema.kind.name(), idx).is_some() {
                return Err(SchemaError::DuplicateKind(schema.kind.to_string()));
            }

            let mut fields = HashSet::new();
            let field_names = schema
                .attributes
                .iter()
                .map(|f| f.name)
                .chain(schema.parents.iter().map(|p| p.field_name));
            for name in field_names {
                if !fields.insert(name) {
                    return Err(SchemaError::DuplicateField {
                        kind: schema.kind.to_string(),
                        field: name.to_string(),
                    });
                }
            }

            let mut relations = HashSet::new();
            for parent in &schema.parents {
                if !relations.insert(parent.relation) {
                    return Err(SchemaError::DuplicateRelation {
                        kind: schema.kind.to_string(),
                        relation: parent.relation.to_string(),
                    });
                }
            }
        }

        // Targets may be declared after the kinds that reference them
        for schema in &self.schemas {
            for parent in &schema.parents {
                if !by_name.contains_key(parent.target_kind.name()) {
                    return Err(SchemaError::UnknownTarget {
                        kind: schema.kind.to_string(),
                        field: parent.field_name.to_string(),
                        target: parent.target_kind.to_string(),
                    });
                }
            }
        }

        Ok(SchemaRegistry {
            schemas: self.schemas,
            by_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarType;

    #[test]
    fn test_media_library() {
        let registry = SchemaRegistry::media_library();
        assert_eq!(registry.len(), 3);

        let attrs: Vec<_> = registry.attributes("Album").unwrap().iter().map(|f| f.name).collect();
        assert_eq!(attrs, vec!["Name", "CoverArtPath", "Year", "Compilation", "Rating"]);

        let parents = registry.parent_refs("Album").unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].field_name, "ArtistId");
        assert_eq!(parents[0].relation, "artist");
        assert_eq!(parents[0].target_kind, Kind::new("Artist"));

        assert_eq!(
            registry.attributes("Album").unwrap()[3].scalar_type,
            ScalarType::Boolean
        );
    }

    #[test]
    fn test_unknown_kind() {
        let registry = SchemaRegistry::media_library();
        assert_eq!(
            registry.kind("Playlist"),
            Err(ResolutionError::UnknownKind { kind: "Playlist".into() })
        );
        assert!(registry.parent_refs("Genre").is_err());
    }

    #[test]
    fn test_forward_target_allowed() {
        let registry = SchemaRegistry::builder()
            .kind(KindSchema::new("Album").parent("ArtistId", "artist", "Artist"))
            .kind(KindSchema::new("Artist").string("Name"))
            .build()
            .unwrap();
        let kinds: Vec<_> = registry.kinds().map(|k| k.name()).collect();
        assert_eq!(kinds, vec!["Album", "Artist"]);
    }

    #[test]
    fn test_rejects_invalid_declarations() {
        let dup_kind = SchemaRegistry::builder()
            .kind(KindSchema::new("Artist"))
            .kind(KindSchema::new("Artist"))
            .build();
        assert_eq!(dup_kind.unwrap_err(), SchemaError::DuplicateKind("Artist".into()));

        let dup_field = SchemaRegistry::builder()
            .kind(KindSchema::new("Artist"))
            .kind(
                KindSchema::new("Album")
                    .string("ArtistId")
                    .parent("ArtistId", "artist", "Artist"),
            )
            .build();
        assert!(matches!(dup_field, Err(SchemaError::DuplicateField { .. })));

        let dup_relation = SchemaRegistry::builder()
            .kind(KindSchema::new("Artist"))
            .kind(
                KindSchema::new("Album")
                    .parent("ArtistId", "artist", "Artist")
                    .parent("AlbumArtistId", "artist", "Artist"),
            )
            .build();
        assert!(matches!(dup_relation, Err(SchemaError::DuplicateRelation { .. })));

        let unknown = SchemaRegistry::builder()
            .kind(KindSchema::new("Album").parent("LabelId", "label", "Label"))
            .build();
        assert!(matches!(unknown, Err(SchemaError::UnknownTarget { .. })));
    }
}
