//! Graph Resolver
//!
//! Turns a [`RecordBatch`] into a [`ResolvedCatalog`]. Kinds are processed
//! parents-first, so by the time a record's parent reference is examined the
//! target kind's arena is complete and a single id lookup decides whether the
//! link resolves.
//!
//! In strict mode the first data defect ends the pass. In lenient mode the
//! offending records are left out and every defect is reported next to the
//! catalog. Leaving a record out can orphan records that reference it; those
//! are reported as dangling too.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

pub use tokio_util::sync::CancellationToken;

use crate::catalog::{CatalogBuilder, ResolvedCatalog};
use crate::config::ResolverConfig;
use crate::entity::{Entity, ParentRef};
use crate::error::ResolutionError;
use crate::graph::KindGraph;
use crate::record::{RawRecord, RecordBatch};
use crate::registry::SchemaRegistry;
use crate::schema::{Kind, KindSchema};

/// Outcome of a successful pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub catalog: ResolvedCatalog,
    /// Data defects skipped in lenient mode; always empty in strict mode
    pub errors: Vec<ResolutionError>,
}

impl Resolution {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Resolves record batches against a fixed schema.
///
/// `resolve` borrows the resolver immutably and keeps all working state on
/// the stack, so one resolver can serve concurrent passes.
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: Arc<SchemaRegistry>,
    graph: KindGraph,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(registry: Arc<SchemaRegistry>, config: ResolverConfig) -> Self {
        let graph = KindGraph::from_registry(&registry);
        Self {
            registry,
            graph,
            config,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn kind_graph(&self) -> &KindGraph {
        &self.graph
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Order in which kinds are processed: the configured override if any,
    /// otherwise parents-first by registration order.
    pub fn processing_order(&self) -> Result<Vec<Kind>, ResolutionError> {
        if self.config.kind_processing_order.is_empty() {
            return self.graph.topological_order();
        }

        // A cyclic schema has no valid order; report the cycle itself
        if let Some(cycle) = crate::graph::find_cycles(&self.graph).into_iter().next() {
            return Err(cycle.into_error());
        }

        let order = self
            .config
            .kind_processing_order
            .iter()
            .map(|name| self.registry.kind(name))
            .collect::<Result<Vec<_>, _>>()?;
        self.graph.validate_order(&order)?;
        Ok(order)
    }

    pub fn resolve(&self, batch: &RecordBatch) -> Result<Resolution, ResolutionError> {
        self.resolve_with_cancel(batch, &CancellationToken::new())
    }

    /// Resolve a batch, checking `cancel` before each kind is processed.
    ///
    /// A pass already inside a kind finishes that kind before stopping.
    pub fn resolve_with_cancel(
        &self,
        batch: &RecordBatch,
        cancel: &CancellationToken,
    ) -> Result<Resolution, ResolutionError> {
        self.run(batch, cancel, |_| {})
    }

    /// Resolution loop; `after_kind` sees each kind once it is complete
    fn run(
        &self,
        batch: &RecordBatch,
        cancel: &CancellationToken,
        mut after_kind: impl FnMut(Kind),
    ) -> Result<Resolution, ResolutionError> {
        for name in batch.kind_names() {
            self.registry.kind(name)?;
        }
        let order = self.processing_order()?;

        let mut pass = Pass {
            strict: self.config.strict_mode,
            errors: Vec::new(),
        };
        let mut builder = CatalogBuilder::default();

        for (completed, &kind) in order.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(completed_kinds = completed, "Resolution cancelled");
                return Err(ResolutionError::Cancelled {
                    completed_kinds: completed,
                });
            }

            let schema = self.registry.schema(kind.name())?;
            let records = batch.records(kind.name());
            let entities = self.resolve_kind(schema, records, &builder, &mut pass)?;

            tracing::debug!(
                kind = %kind,
                records = records.len(),
                accepted = entities.len(),
                "Resolved kind"
            );
            builder.push_kind(kind, entities);
            after_kind(kind);
        }

        let catalog = builder.finish();
        tracing::info!(
            entities = catalog.len(),
            kinds = catalog.kinds().len(),
            errors = pass.errors.len(),
            strict = pass.strict,
            "Resolution complete"
        );

        Ok(Resolution {
            catalog,
            errors: pass.errors,
        })
    }

    /// Build the accepted entities of one kind, in ingestion order
    fn resolve_kind(
        &self,
        schema: &KindSchema,
        records: &[RawRecord],
        builder: &CatalogBuilder,
        pass: &mut Pass,
    ) -> Result<Vec<Entity>, ResolutionError> {
        let kind = schema.kind;

        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(records.len());
        for record in records {
            *seen.entry(record.id.as_str()).or_default() += 1;
        }

        let mut reported = HashSet::new();
        let mut entities = Vec::with_capacity(records.len());

        for record in records {
            if record.id.is_empty() {
                pass.defect(ResolutionError::EmptyId { kind })?;
                continue;
            }

            // No copy of a duplicated id is kept
            if seen[record.id.as_str()] > 1 {
                if reported.insert(record.id.as_str()) {
                    pass.defect(ResolutionError::DuplicateId {
                        kind,
                        id: record.id.clone(),
                    })?;
                }
                continue;
            }

            let mut defects = Vec::new();
            let entity = build_entity(schema, record, entities.len(), builder, &mut defects);
            if defects.is_empty() {
                entities.push(entity);
            } else {
                for defect in defects {
                    pass.defect(defect)?;
                }
            }
        }

        Ok(entities)
    }
}

/// Mode-dependent handling of data defects for one pass
struct Pass {
    strict: bool,
    errors: Vec<ResolutionError>,
}

impl Pass {
    fn defect(&mut self, error: ResolutionError) -> Result<(), ResolutionError> {
        if self.strict {
            return Err(error);
        }
        tracing::warn!(error = %error, "Skipping record");
        self.errors.push(error);
        Ok(())
    }
}

/// Coerce attributes and link parents. Problems are pushed to `defects`;
/// the entity is only usable when none were found.
fn build_entity(
    schema: &KindSchema,
    record: &RawRecord,
    index: usize,
    builder: &CatalogBuilder,
    defects: &mut Vec<ResolutionError>,
) -> Entity {
    let kind = schema.kind;
    let mut attributes = BTreeMap::new();
    let mut parent_refs = BTreeMap::new();

    for field in &schema.attributes {
        let Some(raw) = record.field(field.name) else {
            continue;
        };
        match field.scalar_type.coerce(raw) {
            Ok(Some(value)) => {
                attributes.insert(field.name, value);
            }
            Ok(None) => {}
            Err(invalid) => defects.push(ResolutionError::InvalidAttribute {
                kind,
                id: record.id.clone(),
                field: field.name,
                expected: invalid.expected,
                value: raw.to_string(),
            }),
        }
    }

    for parent in &schema.parents {
        let target = record.field(parent.field_name).unwrap_or_default();
        if target.is_empty() && parent.optional {
            continue;
        }
        // An empty id never names a parent
        let found = Some(target)
            .filter(|t| !t.is_empty())
            .and_then(|t| builder.lookup(parent.target_kind, t));
        match found {
            Some(target_index) => {
                parent_refs.insert(
                    parent.relation,
                    ParentRef {
                        kind: parent.target_kind,
                        id: target.to_string(),
                        index: target_index,
                    },
                );
            }
            None => defects.push(ResolutionError::DanglingReference {
                kind,
                id: record.id.clone(),
                relation: parent.relation,
                target_kind: parent.target_kind,
                target: target.to_string(),
            }),
        }
    }

    for name in record.fields.keys() {
        if !schema.declares(name) {
            tracing::debug!(
                kind = %kind,
                id = %record.id,
                field = %name,
                "Ignoring undeclared field"
            );
        }
    }

    Entity {
        id: record.id.clone(),
        kind,
        index,
        attributes,
        parent_refs,
    }
}
