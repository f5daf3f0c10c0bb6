//! Error types for schema registration and catalog resolution

use thiserror::Error;

use crate::schema::{Kind, ScalarType};

/// Result type for crate-level operations (loading, configuration, CLI)
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Structured failure of a resolution pass.
///
/// Schema/configuration defects (`UnknownKind`, `CycleDetected`,
/// `InvalidProcessingOrder`) and `Cancelled` are always fatal. Data defects
/// (`EmptyId`, `DuplicateId`, `DanglingReference`, `InvalidAttribute`) abort the pass in
/// strict mode and are collected alongside the catalog in lenient mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Unknown kind: {kind}")]
    UnknownKind { kind: String },

    #[error("Record of kind {kind} has an empty id")]
    EmptyId { kind: Kind },

    #[error("Duplicate id: {kind} {id}")]
    DuplicateId { kind: Kind, id: String },

    #[error(
        "Dangling reference: {kind} {id} relation '{relation}' names missing {target_kind} {target}"
    )]
    DanglingReference {
        kind: Kind,
        id: String,
        relation: &'static str,
        target_kind: Kind,
        target: String,
    },

    #[error(
        "Invalid attribute: {kind} {id} field '{field}' expected {expected}, got '{value}'"
    )]
    InvalidAttribute {
        kind: Kind,
        id: String,
        field: &'static str,
        expected: ScalarType,
        value: String,
    },

    #[error("Cycle detected among kinds: {}", .kinds.join(" -> "))]
    CycleDetected { kinds: Vec<String> },

    #[error("Invalid processing order: {0}")]
    InvalidProcessingOrder(String),

    #[error("Resolution cancelled after {completed_kinds} kind(s)")]
    Cancelled { completed_kinds: usize },
}

impl ResolutionError {
    /// Errors that end the pass regardless of mode
    pub fn is_fatal(&self) -> bool {
        !self.is_data_defect()
    }

    /// Errors tied to individual records
    pub fn is_data_defect(&self) -> bool {
        matches!(
            self,
            Self::EmptyId { .. }
                | Self::DuplicateId { .. }
                | Self::DanglingReference { .. }
                | Self::InvalidAttribute { .. }
        )
    }

    /// The (kind, id) of the record this error is about, if any
    pub fn record(&self) -> Option<(Kind, &str)> {
        match self {
            Self::DuplicateId { kind, id }
            | Self::DanglingReference { kind, id, .. }
            | Self::InvalidAttribute { kind, id, .. } => Some((*kind, id.as_str())),
            Self::EmptyId { kind } => Some((*kind, "")),
            _ => None,
        }
    }
}

/// Schema registration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Kind already registered: {0}")]
    DuplicateKind(String),

    #[error("Field declared twice on {kind}: {field}")]
    DuplicateField { kind: String, field: String },

    #[error("Relation declared twice on {kind}: {relation}")]
    DuplicateRelation { kind: String, relation: String },

    #[error("Parent reference {kind}.{field} targets unregistered kind {target}")]
    UnknownTarget { kind: String, field: String, target: String },
}

/// Crate-level errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid record input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
