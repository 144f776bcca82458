//! Raw wire types for the Airtable Metadata API.
//!
//! These structs mirror the JSON payloads returned by the metadata endpoint
//! and are deserialized verbatim after structural validation. Field options
//! stay as raw JSON here; the typed interpretation (keyed by the field's
//! type tag) happens during normalization in [`crate::schema`].

use serde::{Deserialize, Serialize};

/// A complete base schema as fetched from the metadata endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSchema {
    /// Base identifier (e.g. `appXXXXXXXXXXXXXX`).
    pub id: String,
    /// Human-readable base name. Falls back to the id when the API
    /// does not report a name.
    pub name: String,
    /// Tables in the order the API returned them.
    pub tables: Vec<RawTable>,
}

impl RawSchema {
    /// Total number of fields across all tables.
    pub fn field_count(&self) -> usize {
        self.tables.iter().map(|t| t.fields.len()).sum()
    }
}

/// A single table record, with nested fields and views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTable {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_field_id: Option<String>,
    /// A table with zero fields is valid.
    #[serde(default)]
    pub fields: Vec<RawField>,
    #[serde(default)]
    pub views: Vec<RawView>,
}

/// A single field record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawField {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Type-specific options, shape varies by `field_type`. Interpreted
    /// and validated by the normalizer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

/// A single view record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawView {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub view_type: String,
    /// Field ids visible in this view, in display order.
    #[serde(default)]
    pub visible_field_ids: Vec<String>,
}

/// Closed enumeration of Airtable field type tags.
///
/// Unrecognized tags fail deserialization rather than being coerced to a
/// generic unknown type, so every accepted field has a tag the rest of the
/// pipeline knows how to interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    SingleLineText,
    MultilineText,
    RichText,
    Email,
    Url,
    PhoneNumber,
    Number,
    Currency,
    Percent,
    Duration,
    Rating,
    Checkbox,
    Date,
    DateTime,
    SingleSelect,
    MultipleSelects,
    SingleCollaborator,
    MultipleCollaborators,
    MultipleRecordLinks,
    #[serde(rename = "lookup")]
    Lookup,
    MultipleLookupValues,
    Rollup,
    Count,
    Formula,
    MultipleAttachments,
    Barcode,
    Button,
    AutoNumber,
    CreatedTime,
    CreatedBy,
    LastModifiedTime,
    LastModifiedBy,
    ExternalSyncSource,
    AiText,
}

impl FieldType {
    /// The wire tag for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::SingleLineText => "singleLineText",
            FieldType::MultilineText => "multilineText",
            FieldType::RichText => "richText",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::PhoneNumber => "phoneNumber",
            FieldType::Number => "number",
            FieldType::Currency => "currency",
            FieldType::Percent => "percent",
            FieldType::Duration => "duration",
            FieldType::Rating => "rating",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::DateTime => "dateTime",
            FieldType::SingleSelect => "singleSelect",
            FieldType::MultipleSelects => "multipleSelects",
            FieldType::SingleCollaborator => "singleCollaborator",
            FieldType::MultipleCollaborators => "multipleCollaborators",
            FieldType::MultipleRecordLinks => "multipleRecordLinks",
            FieldType::Lookup => "lookup",
            FieldType::MultipleLookupValues => "multipleLookupValues",
            FieldType::Rollup => "rollup",
            FieldType::Count => "count",
            FieldType::Formula => "formula",
            FieldType::MultipleAttachments => "multipleAttachments",
            FieldType::Barcode => "barcode",
            FieldType::Button => "button",
            FieldType::AutoNumber => "autoNumber",
            FieldType::CreatedTime => "createdTime",
            FieldType::CreatedBy => "createdBy",
            FieldType::LastModifiedTime => "lastModifiedTime",
            FieldType::LastModifiedBy => "lastModifiedBy",
            FieldType::ExternalSyncSource => "externalSyncSource",
            FieldType::AiText => "aiText",
        }
    }

    /// Is this a record-link field (the source of relationship edges)?
    pub fn is_link(&self) -> bool {
        matches!(self, FieldType::MultipleRecordLinks)
    }

    /// Does this type derive its value through a record-link field on the
    /// same table (lookup, rollup, count)?
    pub fn is_link_derived(&self) -> bool {
        matches!(
            self,
            FieldType::Lookup
                | FieldType::MultipleLookupValues
                | FieldType::Rollup
                | FieldType::Count
        )
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
