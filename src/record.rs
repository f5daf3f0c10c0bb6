//! Raw input records
//!
//! Records arrive untyped: an id plus string fields, grouped by kind name in
//! the order the importer produced them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One flat record prior to attribute coercion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }
}

/// Records of one ingestion pass, keyed by kind name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordBatch {
    records: BTreeMap<String, Vec<RawRecord>>,
}

impl RecordBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to a kind, keeping ingestion order
    pub fn push(&mut self, kind: impl Into<String>, record: RawRecord) {
        self.records.entry(kind.into()).or_default().push(record);
    }

    pub fn with(mut self, kind: impl Into<String>, record: RawRecord) -> Self {
        self.push(kind, record);
        self
    }

    pub fn extend(
        &mut self,
        kind: impl Into<String>,
        records: impl IntoIterator<Item = RawRecord>,
    ) {
        self.records.entry(kind.into()).or_default().extend(records);
    }

    /// Records of one kind; empty when the batch has none
    pub fn records(&self, kind: &str) -> &[RawRecord] {
        self.records.get(kind).map(|r| r.as_slice()).unwrap_or(&[])
    }

    /// Kind names present in the batch
    pub fn kind_names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(|k| k.as_str())
    }

    /// Total number of records across kinds
    pub fn len(&self) -> usize {
        self.records.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
