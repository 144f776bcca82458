//! Raw schema to normalized schema transformation.
//!
//! Single pass structure:
//! 1. build table/field lookups and resolve every field's typed options
//! 2. resolve link targets, pair up two-sided links, classify cardinality,
//!    and collect dependency edges
//! 3. plan the creation order over the dependency graph
//! 4. mark link fields inside a cycle (or self-referential) as deferred
//!
//! Any referential inconsistency fails the whole normalization; a partial
//! schema is never returned.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::airtable::{FieldType, RawField, RawSchema, RawTable};

use super::graph::DependencyGraph;
use super::{
    Cardinality, FieldConfig, FieldSummary, LinkConfig, NormalizeError, NormalizeResult,
    NormalizedSchema, Relationship, RelationshipKind, TableSummary, ViewSummary,
};

/// Normalize a raw schema into a validated, relationship-aware model.
pub fn normalize(raw: &RawSchema) -> NormalizeResult<NormalizedSchema> {
    let ctx = LookupContext::build(raw)?;

    let mut relationships: Vec<Relationship> = Vec::new();
    let mut tables: Vec<TableSummary> = Vec::new();
    let mut self_referential: BTreeSet<String> = BTreeSet::new();
    // Link fields already covered by an emitted two-sided relationship.
    let mut paired_fields: HashSet<(String, String)> = HashSet::new();

    for table in &raw.tables {
        let mut fields: Vec<FieldSummary> = Vec::new();
        let mut dependencies: BTreeSet<String> = BTreeSet::new();

        for field in &table.fields {
            let config = ctx.config(&table.id, &field.id).clone();
            let mut linked_table_id: Option<String> = None;

            match &config {
                FieldConfig::Link(link) => {
                    let target = ctx.require_table(table, field, &link.linked_table_id)?;
                    linked_table_id = Some(target.id.clone());

                    if target.id == table.id {
                        self_referential.insert(table.id.clone());
                    } else {
                        dependencies.insert(target.id.clone());
                    }

                    if let Some(rel) = classify_link(
                        &ctx,
                        table,
                        field,
                        link,
                        target,
                        &mut paired_fields,
                    )? {
                        relationships.push(rel);
                    }
                }
                FieldConfig::Lookup {
                    record_link_field_id,
                    ..
                }
                | FieldConfig::Rollup {
                    record_link_field_id,
                    ..
                }
                | FieldConfig::Count {
                    record_link_field_id,
                } => {
                    let link = ctx.require_link_field(table, field, record_link_field_id)?;
                    // The record link field already validated its target.
                    linked_table_id = Some(link.linked_table_id.clone());
                    if link.linked_table_id != table.id {
                        dependencies.insert(link.linked_table_id.clone());
                    }
                }
                _ => {}
            }

            let linked_table_name = linked_table_id
                .as_deref()
                .and_then(|id| ctx.table_name(id))
                .map(String::from);

            fields.push(FieldSummary {
                id: field.id.clone(),
                name: field.name.clone(),
                field_type: field.field_type,
                description: field.description.clone(),
                is_primary: table.primary_field_id.as_deref() == Some(field.id.as_str()),
                config,
                linked_table_id,
                linked_table_name,
                deferred: false,
            });
        }

        let views = table
            .views
            .iter()
            .map(|view| ViewSummary {
                id: view.id.clone(),
                name: view.name.clone(),
                view_type: view.view_type.clone(),
                visible_field_ids: view.visible_field_ids.clone(),
            })
            .collect();

        tables.push(TableSummary {
            id: table.id.clone(),
            name: table.name.clone(),
            description: table.description.clone(),
            primary_field_id: table.primary_field_id.clone(),
            fields,
            views,
            dependencies: dependencies.into_iter().collect(),
        });
    }

    let mut graph = DependencyGraph::new(raw.tables.iter().map(|t| t.id.clone()));
    for table in &tables {
        for prerequisite in &table.dependencies {
            graph.add_dependency(&table.id, prerequisite);
        }
    }
    let plan = graph.creation_plan();

    let mut circular_tables = plan.circular.clone();
    circular_tables.extend(self_referential.iter().cloned());
    if !circular_tables.is_empty() {
        tracing::warn!(
            tables = ?circular_tables,
            "circular dependencies detected; link fields into the cycle are deferred"
        );
    }

    mark_deferred_fields(&mut tables, &plan.groups, &self_referential);

    tracing::debug!(
        tables = tables.len(),
        relationships = relationships.len(),
        circular = circular_tables.len(),
        "schema normalized"
    );

    Ok(NormalizedSchema {
        base_id: raw.id.clone(),
        base_name: raw.name.clone(),
        tables,
        relationships,
        creation_order: plan.order,
        circular_tables,
    })
}

/// Classify one link field into a relationship, unless its two-sided
/// partner already produced it.
fn classify_link(
    ctx: &LookupContext<'_>,
    table: &RawTable,
    field: &RawField,
    link: &LinkConfig,
    target: &RawTable,
    paired_fields: &mut HashSet<(String, String)>,
) -> NormalizeResult<Option<Relationship>> {
    let self_link = target.id == table.id;

    let (cardinality, to_field_id) = match &link.inverse_link_field_id {
        Some(inverse_id) => {
            let partner = ctx.require_inverse(table, field, target, inverse_id)?;
            (
                Cardinality::from_link_flags(
                    link.prefers_single_record_link,
                    partner.prefers_single_record_link,
                ),
                Some(inverse_id.clone()),
            )
        }
        None => (
            Cardinality::from_one_sided_flag(link.prefers_single_record_link),
            None,
        ),
    };

    // A two-sided pair is emitted once, owned by whichever side the raw
    // table order reaches first.
    if paired_fields.contains(&(table.id.clone(), field.id.clone())) {
        return Ok(None);
    }
    if let Some(inverse_id) = &to_field_id {
        paired_fields.insert((target.id.clone(), inverse_id.clone()));
    }

    let kind = if self_link {
        RelationshipKind::SelfReferential
    } else if to_field_id.is_some() {
        RelationshipKind::TwoSided
    } else {
        RelationshipKind::OneSided
    };

    Ok(Some(Relationship {
        from_table_id: table.id.clone(),
        from_table_name: table.name.clone(),
        from_field_id: field.id.clone(),
        from_field_name: field.name.clone(),
        to_table_id: target.id.clone(),
        to_table_name: target.name.clone(),
        to_field_id,
        cardinality,
        kind,
    }))
}

/// Mark link and link-derived fields as deferred when their target sits in
/// the same cycle as the owning table, or on the owning table itself.
fn mark_deferred_fields(
    tables: &mut [TableSummary],
    groups: &[BTreeSet<String>],
    self_referential: &BTreeSet<String>,
) {
    for table in tables.iter_mut() {
        let group = groups.iter().find(|g| g.contains(&table.id));
        for field in &mut table.fields {
            let Some(target) = &field.linked_table_id else {
                continue;
            };
            let self_link = *target == table.id && self_referential.contains(&table.id);
            let cyclic = group.is_some_and(|g| g.contains(target));
            if self_link || cyclic {
                field.deferred = true;
            }
        }
    }
}

/// Table and field lookups plus pre-resolved field configs.
struct LookupContext<'a> {
    tables: HashMap<&'a str, &'a RawTable>,
    fields: HashMap<&'a str, HashMap<&'a str, &'a RawField>>,
    configs: HashMap<&'a str, HashMap<&'a str, FieldConfig>>,
}

impl<'a> LookupContext<'a> {
    fn build(raw: &'a RawSchema) -> NormalizeResult<Self> {
        let mut tables = HashMap::new();
        let mut fields: HashMap<&str, HashMap<&str, &RawField>> = HashMap::new();
        let mut configs = HashMap::new();

        for table in &raw.tables {
            tables.insert(table.id.as_str(), table);
            let by_id = fields.entry(table.id.as_str()).or_default();
            let config_by_id: &mut HashMap<&str, FieldConfig> =
                configs.entry(table.id.as_str()).or_default();

            for field in &table.fields {
                by_id.insert(field.id.as_str(), field);
                let config = FieldConfig::resolve(field.field_type, field.options.as_ref())
                    .map_err(|reason| NormalizeError::InvalidOptions {
                        table_id: table.id.clone(),
                        field_id: field.id.clone(),
                        field_type: field.field_type,
                        reason,
                    })?;
                config_by_id.insert(field.id.as_str(), config);
            }
        }

        Ok(Self {
            tables,
            fields,
            configs,
        })
    }

    fn config(&self, table_id: &str, field_id: &str) -> &FieldConfig {
        // Every field was resolved during build.
        &self.configs[table_id][field_id]
    }

    fn table_name(&self, table_id: &str) -> Option<&str> {
        self.tables.get(table_id).map(|t| t.name.as_str())
    }

    fn require_table(
        &self,
        table: &RawTable,
        field: &RawField,
        target_id: &str,
    ) -> NormalizeResult<&'a RawTable> {
        self.tables
            .get(target_id)
            .copied()
            .ok_or_else(|| NormalizeError::UnknownLinkTarget {
                table_id: table.id.clone(),
                field_id: field.id.clone(),
                target_id: target_id.to_string(),
            })
    }

    /// Resolve a lookup/rollup/count field's record link field on the same
    /// table, requiring it to be a record link.
    fn require_link_field(
        &self,
        table: &RawTable,
        field: &RawField,
        record_link_field_id: &str,
    ) -> NormalizeResult<&LinkConfig> {
        let invalid = |reason: String| NormalizeError::InvalidOptions {
            table_id: table.id.clone(),
            field_id: field.id.clone(),
            field_type: field.field_type,
            reason,
        };

        let Some(linked) = self
            .fields
            .get(table.id.as_str())
            .and_then(|by_id| by_id.get(record_link_field_id))
        else {
            return Err(invalid(format!(
                "references unknown record link field '{}'",
                record_link_field_id
            )));
        };

        match self.config(&table.id, &linked.id) {
            FieldConfig::Link(link) => Ok(link),
            _ => Err(invalid(format!(
                "references field '{}' which is not a record link field",
                record_link_field_id
            ))),
        }
    }

    /// Validate the inverse side of a two-sided link pair.
    fn require_inverse(
        &self,
        table: &RawTable,
        field: &RawField,
        target: &RawTable,
        inverse_id: &str,
    ) -> NormalizeResult<&LinkConfig> {
        let inconsistent = |reason: String| NormalizeError::InconsistentLinkPair {
            table_id: table.id.clone(),
            field_id: field.id.clone(),
            partner_table_id: target.id.clone(),
            partner_field_id: inverse_id.to_string(),
            reason,
        };

        let Some(partner) = self
            .fields
            .get(target.id.as_str())
            .and_then(|by_id| by_id.get(inverse_id))
        else {
            return Err(inconsistent("no such field exists".to_string()));
        };

        let FieldConfig::Link(partner_link) = self.config(&target.id, &partner.id) else {
            return Err(inconsistent(format!(
                "field '{}' is not a record link field",
                inverse_id
            )));
        };

        if partner_link.linked_table_id != table.id {
            return Err(inconsistent(format!(
                "its options target table '{}' instead",
                partner_link.linked_table_id
            )));
        }

        // Both sides must declare each other; a half-declared pair would
        // make the emitted relationships depend on raw table order.
        match &partner_link.inverse_link_field_id {
            Some(back) if back != &field.id => {
                return Err(inconsistent(format!(
                    "its inverse points at field '{}'",
                    back
                )));
            }
            None => {
                return Err(inconsistent(
                    "its options do not name this field as their inverse".to_string(),
                ));
            }
            _ => {}
        }

        Ok(partner_link)
    }
}
