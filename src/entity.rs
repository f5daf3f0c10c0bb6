//! Resolved entities

use serde::Serialize;
use std::collections::BTreeMap;

use crate::schema::{Kind, ScalarValue};

/// Position of an entity inside its kind's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityRef {
    pub kind: Kind,
    pub index: usize,
}

/// A resolved parent link
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParentRef {
    pub kind: Kind,
    pub id: String,
    /// Arena position of the parent
    #[serde(skip)]
    pub index: usize,
}

impl ParentRef {
    pub fn target(&self) -> (Kind, &str) {
        (self.kind, self.id.as_str())
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            kind: self.kind,
            index: self.index,
        }
    }
}

/// A typed record with its parent references resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub id: String,
    pub kind: Kind,
    #[serde(skip)]
    pub index: usize,
    pub attributes: BTreeMap<&'static str, ScalarValue>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parent_refs: BTreeMap<&'static str, ParentRef>,
}

impl Entity {
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            kind: self.kind,
            index: self.index,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&ScalarValue> {
        self.attributes.get(name)
    }

    pub fn parent(&self, relation: &str) -> Option<&ParentRef> {
        self.parent_refs.get(relation)
    }

    /// Display name: the `Name` or `Title` attribute, falling back to the id
    pub fn display_name(&self) -> &str {
        ["Name", "Title"]
            .iter()
            .find_map(|key| {
                self.attributes
                    .get(*key)
                    .and_then(|v| v.as_str())
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or(self.id.as_str())
    }
}
