//! Normalized schema model.
//!
//! Types produced by normalization: a validated, relationship-aware view of
//! a base with explicit cardinalities, a dependency-respecting creation
//! order, and flagged circular dependencies. Nothing here is mutated after
//! construction; each normalization produces a fresh immutable value.

mod graph;
mod normalizer;

pub use graph::{CreationPlan, DependencyGraph};
pub use normalizer::normalize;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::airtable::FieldType;

/// Result type for normalization.
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Errors raised while normalizing a raw schema.
///
/// Normalization never retries and never drops malformed input; every
/// inconsistency is surfaced with the offending identifiers.
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// A link-type field targets a table id that does not exist in the base.
    #[error("link field '{field_id}' on table '{table_id}' targets unknown table '{target_id}'")]
    UnknownLinkTarget {
        table_id: String,
        field_id: String,
        target_id: String,
    },

    /// Type-specific options do not match the declared type tag.
    #[error("field '{field_id}' on table '{table_id}' has invalid {field_type} options: {reason}")]
    InvalidOptions {
        table_id: String,
        field_id: String,
        field_type: FieldType,
        reason: String,
    },

    /// Two link fields claim to be paired but disagree about it.
    #[error(
        "link field '{field_id}' on table '{table_id}' names '{partner_field_id}' \
         on table '{partner_table_id}' as its inverse, but {reason}"
    )]
    InconsistentLinkPair {
        table_id: String,
        field_id: String,
        partner_table_id: String,
        partner_field_id: String,
        reason: String,
    },
}

/// Multiplicity of a relationship, read from the owning side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    /// Reverse the cardinality (swap the two sides).
    pub fn reverse(self) -> Self {
        match self {
            Cardinality::OneToMany => Cardinality::ManyToOne,
            Cardinality::ManyToOne => Cardinality::OneToMany,
            other => other,
        }
    }

    /// Classify a two-sided link pair from each side's
    /// "prefers a single record" flag.
    ///
    /// `from_single` means each source record links to at most one target
    /// record; `to_single` the converse.
    pub fn from_link_flags(from_single: bool, to_single: bool) -> Self {
        match (from_single, to_single) {
            (true, true) => Cardinality::OneToOne,
            (true, false) => Cardinality::ManyToOne,
            (false, true) => Cardinality::OneToMany,
            (false, false) => Cardinality::ManyToMany,
        }
    }

    /// Classify a one-sided link (no reciprocal field on the target).
    pub fn from_one_sided_flag(from_single: bool) -> Self {
        if from_single {
            Cardinality::OneToOne
        } else {
            Cardinality::ManyToOne
        }
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cardinality::OneToOne => write!(f, "1:1"),
            Cardinality::OneToMany => write!(f, "1:N"),
            Cardinality::ManyToOne => write!(f, "N:1"),
            Cardinality::ManyToMany => write!(f, "N:N"),
        }
    }
}

/// How the relationship was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// A link field with no reciprocal field on the target table.
    OneSided,
    /// A pair of matching link fields, one on each table.
    TwoSided,
    /// A link field targeting its own table.
    SelfReferential,
}

/// A resolved relationship edge between two tables.
///
/// Derived once during normalization from link fields; immutable afterward
/// and owned exclusively by the [`NormalizedSchema`] that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub from_table_id: String,
    pub from_table_name: String,
    pub from_field_id: String,
    pub from_field_name: String,
    pub to_table_id: String,
    pub to_table_name: String,
    /// The reciprocal field on the target table, for two-sided pairs.
    pub to_field_id: Option<String>,
    pub cardinality: Cardinality,
    pub kind: RelationshipKind,
}

/// Typed, validated field options keyed by the field's type tag.
///
/// Tags without structural significance keep their raw options under
/// [`FieldConfig::Other`] so the model round-trips losslessly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldConfig {
    Link(LinkConfig),
    Select {
        choices: Vec<SelectChoice>,
    },
    Number {
        precision: Option<u8>,
        symbol: Option<String>,
    },
    Lookup {
        record_link_field_id: String,
        field_id_in_linked_table: Option<String>,
    },
    Rollup {
        record_link_field_id: String,
        field_id_in_linked_table: Option<String>,
    },
    Count {
        record_link_field_id: String,
    },
    Formula {
        expression: Option<String>,
    },
    Other {
        options: serde_json::Map<String, serde_json::Value>,
    },
    None,
}

/// Options of a record-link field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub linked_table_id: String,
    /// The paired link field on the target table, when two-sided.
    pub inverse_link_field_id: Option<String>,
    /// Whether each record links to at most one target record.
    pub prefers_single_record_link: bool,
}

/// One choice of a single/multiple select field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectChoice {
    pub id: Option<String>,
    pub name: String,
    pub color: Option<String>,
}

impl FieldConfig {
    /// Interpret raw options against the declared type tag.
    ///
    /// Returns a human-readable reason on mismatch; the caller attaches
    /// table/field context.
    pub fn resolve(
        field_type: FieldType,
        options: Option<&serde_json::Value>,
    ) -> Result<FieldConfig, String> {
        let obj = match options {
            Some(serde_json::Value::Object(map)) => Some(map),
            Some(other) => {
                return Err(format!("options must be an object, got {}", type_name(other)))
            }
            None => None,
        };

        match field_type {
            FieldType::MultipleRecordLinks => {
                let map = obj.ok_or("link field is missing its options")?;
                let linked_table_id = expect_string(map, "linkedTableId")?
                    .ok_or("link options are missing 'linkedTableId'")?;
                Ok(FieldConfig::Link(LinkConfig {
                    linked_table_id,
                    inverse_link_field_id: expect_string(map, "inverseLinkFieldId")?,
                    prefers_single_record_link: map
                        .get("prefersSingleRecordLink")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false),
                }))
            }
            FieldType::Lookup | FieldType::MultipleLookupValues => {
                let map = obj.ok_or("lookup field is missing its options")?;
                Ok(FieldConfig::Lookup {
                    record_link_field_id: expect_string(map, "recordLinkFieldId")?
                        .ok_or("lookup options are missing 'recordLinkFieldId'")?,
                    field_id_in_linked_table: expect_string(map, "fieldIdInLinkedTable")?,
                })
            }
            FieldType::Rollup => {
                let map = obj.ok_or("rollup field is missing its options")?;
                Ok(FieldConfig::Rollup {
                    record_link_field_id: expect_string(map, "recordLinkFieldId")?
                        .ok_or("rollup options are missing 'recordLinkFieldId'")?,
                    field_id_in_linked_table: expect_string(map, "fieldIdInLinkedTable")?,
                })
            }
            FieldType::Count => {
                let map = obj.ok_or("count field is missing its options")?;
                Ok(FieldConfig::Count {
                    record_link_field_id: expect_string(map, "recordLinkFieldId")?
                        .ok_or("count options are missing 'recordLinkFieldId'")?,
                })
            }
            FieldType::SingleSelect | FieldType::MultipleSelects => {
                let choices = obj
                    .and_then(|map| map.get("choices"))
                    .and_then(|v| v.as_array())
                    .map(|items| {
                        items
                            .iter()
                            .map(|item| {
                                let name = item
                                    .get("name")
                                    .and_then(|v| v.as_str())
                                    .ok_or("select choice is missing 'name'")?;
                                Ok(SelectChoice {
                                    id: item
                                        .get("id")
                                        .and_then(|v| v.as_str())
                                        .map(String::from),
                                    name: name.to_string(),
                                    color: item
                                        .get("color")
                                        .and_then(|v| v.as_str())
                                        .map(String::from),
                                })
                            })
                            .collect::<Result<Vec<_>, String>>()
                    })
                    .transpose()?
                    .unwrap_or_default();
                Ok(FieldConfig::Select { choices })
            }
            FieldType::Number | FieldType::Currency | FieldType::Percent => {
                Ok(FieldConfig::Number {
                    precision: obj
                        .and_then(|map| map.get("precision"))
                        .and_then(|v| v.as_u64())
                        .map(|p| p.min(u8::MAX as u64) as u8),
                    symbol: obj
                        .and_then(|map| expect_string(map, "symbol").ok())
                        .flatten(),
                })
            }
            FieldType::Formula => Ok(FieldConfig::Formula {
                expression: obj
                    .and_then(|map| expect_string(map, "formula").ok())
                    .flatten(),
            }),
            _ => match obj {
                Some(map) => Ok(FieldConfig::Other {
                    options: map.clone(),
                }),
                None => Ok(FieldConfig::None),
            },
        }
    }
}

fn expect_string(
    map: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Result<Option<String>, String> {
    match map.get(key) {
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(serde_json::Value::Null) | None => Ok(None),
        Some(other) => Err(format!("'{}' must be a string, got {}", key, type_name(other))),
    }
}

fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}

/// A field in the normalized model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSummary {
    pub id: String,
    pub name: String,
    pub field_type: FieldType,
    pub description: Option<String>,
    pub is_primary: bool,
    pub config: FieldConfig,
    /// The table this field references, for link and link-derived fields.
    pub linked_table_id: Option<String>,
    pub linked_table_name: Option<String>,
    /// Create this field only after all tables exist (self-referential or
    /// cyclic link).
    pub deferred: bool,
}

/// A view in the normalized model, passed through from the raw schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewSummary {
    pub id: String,
    pub name: String,
    pub view_type: String,
    pub visible_field_ids: Vec<String>,
}

/// A table in the normalized model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub primary_field_id: Option<String>,
    pub fields: Vec<FieldSummary>,
    pub views: Vec<ViewSummary>,
    /// Ids of tables that should exist before this one, sorted.
    pub dependencies: Vec<String>,
}

/// The validated, acyclic-checked graph over all tables in a base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedSchema {
    pub base_id: String,
    pub base_name: String,
    pub tables: Vec<TableSummary>,
    pub relationships: Vec<Relationship>,
    /// Total order over table ids; for every non-circular dependency edge
    /// A -> B, B appears no later than A.
    pub creation_order: Vec<String>,
    /// Tables involved in a self-reference or dependency cycle. Their link
    /// fields into the cycle are marked deferred rather than failing.
    pub circular_tables: BTreeSet<String>,
}

impl NormalizedSchema {
    /// Look up a table by id.
    pub fn table(&self, id: &str) -> Option<&TableSummary> {
        self.tables.iter().find(|t| t.id == id)
    }

    /// Creation order as table names, in the same sequence as
    /// [`NormalizedSchema::creation_order`].
    pub fn creation_order_names(&self) -> Vec<&str> {
        self.creation_order
            .iter()
            .map(|id| self.table(id).map(|t| t.name.as_str()).unwrap_or(id))
            .collect()
    }
}
