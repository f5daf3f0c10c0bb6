//! Catalog Graph
//!
//! Rebuilds a media library's object graph (Artists → Albums → Tracks) from
//! flat, id-referencing records.
//!
//! ## Features
//!
//! - **Declarative Relations**: Parent references are declared per kind in a
//!   static [`SchemaRegistry`]; no joins are hard-coded
//! - **Parents-First Resolution**: Kinds are processed in dependency order so
//!   every reference is checked with a single lookup
//! - **Referential Integrity**: Duplicate ids, dangling references and kind
//!   cycles are reported as structured [`ResolutionError`]s
//! - **Strict or Lenient**: Abort on the first bad record, or skip bad records
//!   and report them next to the catalog
//! - **Immutable Snapshots**: A [`ResolvedCatalog`] never changes; a
//!   [`CatalogHandle`] swaps in new catalogs after successful passes
//!
//! ## Architecture
//!
//! ```text
//! RecordBatch ──► Resolver ──► ResolvedCatalog ──► CatalogHandle
//!                    │
//!                    ├── SchemaRegistry (kinds, attributes, parent refs)
//!                    └── KindGraph      (processing order, cycles)
//! ```

pub mod catalog;
pub mod config;
pub mod entity;
pub mod error;
pub mod graph;
pub mod loader;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod schema;

pub use catalog::{CatalogHandle, ResolvedCatalog, SearchHit};
pub use config::{CatalogConfig, InputConfig, ResolverConfig};
pub use entity::{Entity, EntityRef, ParentRef};
pub use error::{CatalogError, ResolutionError, Result, SchemaError};
pub use graph::{KindCycle, KindGraph};
pub use loader::LoadConfig;
pub use record::{RawRecord, RecordBatch};
pub use registry::{RegistryBuilder, SchemaRegistry};
pub use resolver::{CancellationToken, Resolution, Resolver};
pub use schema::{FieldDescriptor, Kind, KindSchema, ParentRefDescriptor, ScalarType, ScalarValue};
