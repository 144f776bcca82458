//! Markdown guide generation for a normalized base schema.
//!
//! The report is meant to be read by a person recreating or auditing the
//! base: it lists table structure, relationships with their cardinality,
//! and a dependency-respecting creation order with deferred link fields
//! called out.

use chrono::Utc;

use crate::schema::{NormalizedSchema, Relationship, RelationshipKind, TableSummary};

/// Rough size classification used in the report overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
        }
    }
}

/// Classify a schema by table count, relationship count, and cycles.
pub fn classify_complexity(schema: &NormalizedSchema) -> Complexity {
    if !schema.circular_tables.is_empty() || schema.tables.len() > 15 {
        Complexity::Complex
    } else if schema.tables.len() > 5 || schema.relationships.len() > 5 {
        Complexity::Moderate
    } else {
        Complexity::Simple
    }
}

/// Render the full markdown guide for a schema.
pub fn render(schema: &NormalizedSchema) -> String {
    let mut out = String::new();

    render_header(&mut out, schema);
    render_overview(&mut out, schema);
    render_tables(&mut out, schema);
    render_relationships(&mut out, schema);
    render_creation_order(&mut out, schema);

    out
}

fn render_header(out: &mut String, schema: &NormalizedSchema) {
    out.push_str(&format!("# Base Schema Guide: {}\n\n", schema.base_name));
    out.push_str(&format!("- Base id: `{}`\n", schema.base_id));
    out.push_str(&format!(
        "- Generated: {}\n\n",
        Utc::now().format("%Y-%m-%d %H:%M UTC")
    ));
}

fn render_overview(out: &mut String, schema: &NormalizedSchema) {
    let field_count: usize = schema.tables.iter().map(|t| t.fields.len()).sum();
    let view_count: usize = schema.tables.iter().map(|t| t.views.len()).sum();

    out.push_str("## Overview\n\n");
    out.push_str(&format!("- Tables: {}\n", schema.tables.len()));
    out.push_str(&format!("- Fields: {field_count}\n"));
    out.push_str(&format!("- Views: {view_count}\n"));
    out.push_str(&format!(
        "- Relationships: {}\n",
        schema.relationships.len()
    ));
    out.push_str(&format!(
        "- Complexity: {}\n",
        classify_complexity(schema).as_str()
    ));
    if !schema.circular_tables.is_empty() {
        let names: Vec<&str> = schema
            .circular_tables
            .iter()
            .map(|id| schema.table(id).map(|t| t.name.as_str()).unwrap_or(id))
            .collect();
        out.push_str(&format!(
            "- Circular dependencies involving: {}\n",
            names.join(", ")
        ));
    }
    out.push('\n');
}

fn render_tables(out: &mut String, schema: &NormalizedSchema) {
    out.push_str("## Tables\n\n");

    for table in &schema.tables {
        render_table(out, schema, table);
    }
}

fn render_table(out: &mut String, schema: &NormalizedSchema, table: &TableSummary) {
    out.push_str(&format!("### {}\n\n", table.name));
    if let Some(desc) = &table.description {
        if !desc.is_empty() {
            out.push_str(&format!("{desc}\n\n"));
        }
    }

    out.push_str("| Field | Type | Notes |\n");
    out.push_str("|-------|------|-------|\n");
    for field in &table.fields {
        let mut notes = Vec::new();
        if field.is_primary {
            notes.push("primary".to_string());
        }
        if let Some(name) = &field.linked_table_name {
            notes.push(format!("links to {name}"));
        }
        if field.deferred {
            notes.push("deferred".to_string());
        }
        if let Some(desc) = &field.description {
            if !desc.is_empty() {
                notes.push(desc.clone());
            }
        }
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            field.name,
            field.field_type.as_str(),
            notes.join("; ")
        ));
    }
    out.push('\n');

    if !table.views.is_empty() {
        out.push_str("Views: ");
        let views: Vec<String> = table
            .views
            .iter()
            .map(|v| format!("{} ({})", v.name, v.view_type))
            .collect();
        out.push_str(&views.join(", "));
        out.push_str("\n\n");
    }

    if !table.dependencies.is_empty() {
        let names: Vec<&str> = table
            .dependencies
            .iter()
            .map(|id| schema.table(id).map(|t| t.name.as_str()).unwrap_or(id))
            .collect();
        out.push_str(&format!("Depends on: {}\n\n", names.join(", ")));
    }
}

fn render_relationships(out: &mut String, schema: &NormalizedSchema) {
    out.push_str("## Relationships\n\n");

    if schema.relationships.is_empty() {
        out.push_str("None.\n\n");
        return;
    }

    for rel in &schema.relationships {
        out.push_str(&format!("- {}\n", describe_relationship(rel)));
    }
    out.push('\n');
}

fn describe_relationship(rel: &Relationship) -> String {
    let kind = match rel.kind {
        RelationshipKind::OneSided => "one-sided",
        RelationshipKind::TwoSided => "two-sided",
        RelationshipKind::SelfReferential => "self-referential",
    };
    format!(
        "`{}.{}` -> `{}` ({}, {})",
        rel.from_table_name, rel.from_field_name, rel.to_table_name, rel.cardinality, kind
    )
}

fn render_creation_order(out: &mut String, schema: &NormalizedSchema) {
    out.push_str("## Creation Order\n\n");
    out.push_str("Create tables in this order so link targets exist first:\n\n");

    for (i, id) in schema.creation_order.iter().enumerate() {
        let name = schema.table(id).map(|t| t.name.as_str()).unwrap_or(id);
        if schema.circular_tables.contains(id) {
            out.push_str(&format!(
                "{}. {} (part of a cycle; create deferred link fields last)\n",
                i + 1,
                name
            ));
        } else {
            out.push_str(&format!("{}. {}\n", i + 1, name));
        }
    }
    out.push('\n');

    let deferred: Vec<String> = schema
        .tables
        .iter()
        .flat_map(|t| {
            t.fields
                .iter()
                .filter(|f| f.deferred)
                .map(move |f| format!("`{}.{}`", t.name, f.name))
        })
        .collect();
    if !deferred.is_empty() {
        out.push_str(&format!(
            "Deferred link fields (add after all tables exist): {}\n",
            deferred.join(", ")
        ));
    }
}
