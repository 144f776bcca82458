//! Normalization behavior: link resolution, cardinality classification,
//! creation order, and circular dependency handling.

use serde_json::json;

use airlens::airtable::RawSchema;
use airlens::schema::{normalize, Cardinality, NormalizeError, RelationshipKind};

fn schema(tables: serde_json::Value) -> RawSchema {
    serde_json::from_value(json!({
        "id": "app1",
        "name": "Test Base",
        "tables": tables,
    }))
    .unwrap()
}

fn text_field(id: &str, name: &str) -> serde_json::Value {
    json!({"id": id, "name": name, "type": "singleLineText"})
}

fn link_field(id: &str, name: &str, options: serde_json::Value) -> serde_json::Value {
    json!({"id": id, "name": name, "type": "multipleRecordLinks", "options": options})
}

#[test]
fn test_flat_base_keeps_input_order() {
    let raw = schema(json!([
        {"id": "tblC", "name": "Gamma", "fields": [text_field("f1", "Name")]},
        {"id": "tblA", "name": "Alpha", "fields": [text_field("f2", "Name")]},
        {"id": "tblB", "name": "Beta", "fields": []},
    ]));

    let normalized = normalize(&raw).unwrap();

    assert_eq!(normalized.creation_order, vec!["tblC", "tblA", "tblB"]);
    assert!(normalized.relationships.is_empty());
    assert!(normalized.circular_tables.is_empty());
}

#[test]
fn test_link_target_created_first() {
    let raw = schema(json!([
        {"id": "tblOrders", "name": "Orders", "fields": [
            link_field("fldCust", "Customer", json!({"linkedTableId": "tblCustomers"})),
        ]},
        {"id": "tblCustomers", "name": "Customers", "fields": [text_field("fldName", "Name")]},
    ]));

    let normalized = normalize(&raw).unwrap();

    assert_eq!(normalized.creation_order, vec!["tblCustomers", "tblOrders"]);
    let orders = normalized.table("tblOrders").unwrap();
    assert_eq!(orders.dependencies, vec!["tblCustomers"]);
}

#[test]
fn test_one_sided_link_classification() {
    let raw = schema(json!([
        {"id": "tblA", "name": "A", "fields": [
            link_field("fld1", "Multi", json!({"linkedTableId": "tblB"})),
            link_field("fld2", "Single", json!({
                "linkedTableId": "tblB",
                "prefersSingleRecordLink": true,
            })),
        ]},
        {"id": "tblB", "name": "B", "fields": []},
    ]));

    let normalized = normalize(&raw).unwrap();

    assert_eq!(normalized.relationships.len(), 2);
    let multi = &normalized.relationships[0];
    assert_eq!(multi.cardinality, Cardinality::ManyToOne);
    assert_eq!(multi.kind, RelationshipKind::OneSided);
    assert!(multi.to_field_id.is_none());

    let single = &normalized.relationships[1];
    assert_eq!(single.cardinality, Cardinality::OneToOne);
}

#[test]
fn test_two_sided_pair_emitted_once() {
    let raw = schema(json!([
        {"id": "tblCustomers", "name": "Customers", "fields": [
            link_field("fldOrders", "Orders", json!({
                "linkedTableId": "tblOrders",
                "inverseLinkFieldId": "fldCust",
            })),
        ]},
        {"id": "tblOrders", "name": "Orders", "fields": [
            link_field("fldCust", "Customer", json!({
                "linkedTableId": "tblCustomers",
                "inverseLinkFieldId": "fldOrders",
                "prefersSingleRecordLink": true,
            })),
        ]},
    ]));

    let normalized = normalize(&raw).unwrap();

    assert_eq!(normalized.relationships.len(), 1);
    let rel = &normalized.relationships[0];
    // Owned by the first side raw order reaches.
    assert_eq!(rel.from_table_id, "tblCustomers");
    assert_eq!(rel.to_field_id.as_deref(), Some("fldCust"));
    assert_eq!(rel.kind, RelationshipKind::TwoSided);
    // Customers side links many orders, each order links one customer.
    assert_eq!(rel.cardinality, Cardinality::OneToMany);
}

#[test]
fn test_many_to_many_classification() {
    let raw = schema(json!([
        {"id": "tblStudents", "name": "Students", "fields": [
            link_field("fldClasses", "Classes", json!({
                "linkedTableId": "tblClasses",
                "inverseLinkFieldId": "fldStudents",
            })),
        ]},
        {"id": "tblClasses", "name": "Classes", "fields": [
            link_field("fldStudents", "Students", json!({
                "linkedTableId": "tblStudents",
                "inverseLinkFieldId": "fldClasses",
            })),
        ]},
    ]));

    let normalized = normalize(&raw).unwrap();

    assert_eq!(normalized.relationships.len(), 1);
    assert_eq!(normalized.relationships[0].cardinality, Cardinality::ManyToMany);
}

#[test]
fn test_dangling_link_target_fails() {
    let raw = schema(json!([
        {"id": "tblA", "name": "A", "fields": [
            link_field("fld1", "Ghost", json!({"linkedTableId": "tblMissing"})),
        ]},
    ]));

    let err = normalize(&raw).unwrap_err();

    match err {
        NormalizeError::UnknownLinkTarget { target_id, .. } => {
            assert_eq!(target_id, "tblMissing");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_inconsistent_pair_fails() {
    let raw = schema(json!([
        {"id": "tblA", "name": "A", "fields": [
            link_field("fld1", "ToB", json!({
                "linkedTableId": "tblB",
                "inverseLinkFieldId": "fld2",
            })),
        ]},
        {"id": "tblB", "name": "B", "fields": [
            // Claims to be fld1's inverse but targets a different table.
            link_field("fld2", "Elsewhere", json!({"linkedTableId": "tblC"})),
        ]},
        {"id": "tblC", "name": "C", "fields": []},
    ]));

    let err = normalize(&raw).unwrap_err();

    assert!(matches!(err, NormalizeError::InconsistentLinkPair { .. }));
}

#[test]
fn test_half_declared_pair_fails_in_either_order() {
    // A.f links to B with no inverse; B.g claims f as its inverse. The
    // pairing is contradictory and must fail no matter which table the
    // raw schema lists first.
    let a = json!({"id": "tblA", "name": "A", "fields": [
        link_field("fldF", "ToB", json!({"linkedTableId": "tblB"})),
    ]});
    let b = json!({"id": "tblB", "name": "B", "fields": [
        link_field("fldG", "ToA", json!({
            "linkedTableId": "tblA",
            "inverseLinkFieldId": "fldF",
        })),
    ]});

    for tables in [json!([a.clone(), b.clone()]), json!([b, a])] {
        let err = normalize(&schema(tables)).unwrap_err();
        assert!(matches!(err, NormalizeError::InconsistentLinkPair { .. }));
    }
}

#[test]
fn test_self_referential_link_deferred() {
    let raw = schema(json!([
        {"id": "tblEmp", "name": "Employees", "fields": [
            text_field("fldName", "Name"),
            link_field("fldMgr", "Manager", json!({
                "linkedTableId": "tblEmp",
                "prefersSingleRecordLink": true,
            })),
        ]},
    ]));

    let normalized = normalize(&raw).unwrap();

    assert!(normalized.circular_tables.contains("tblEmp"));
    assert_eq!(normalized.creation_order, vec!["tblEmp"]);
    assert_eq!(
        normalized.relationships[0].kind,
        RelationshipKind::SelfReferential
    );

    let table = normalized.table("tblEmp").unwrap();
    assert!(!table.fields[0].deferred);
    assert!(table.fields[1].deferred);
}

#[test]
fn test_mutual_links_flagged_circular() {
    let raw = schema(json!([
        {"id": "tblA", "name": "A", "fields": [
            link_field("fld1", "ToB", json!({"linkedTableId": "tblB"})),
        ]},
        {"id": "tblB", "name": "B", "fields": [
            link_field("fld2", "ToA", json!({"linkedTableId": "tblA"})),
        ]},
    ]));

    let normalized = normalize(&raw).unwrap();

    // Both tables are still planned, in input order, and flagged.
    assert_eq!(normalized.creation_order, vec!["tblA", "tblB"]);
    assert!(normalized.circular_tables.contains("tblA"));
    assert!(normalized.circular_tables.contains("tblB"));

    let a = normalized.table("tblA").unwrap();
    let b = normalized.table("tblB").unwrap();
    assert!(a.fields[0].deferred);
    assert!(b.fields[0].deferred);
}

#[test]
fn test_link_outside_cycle_is_not_deferred() {
    let raw = schema(json!([
        {"id": "tblA", "name": "A", "fields": [
            link_field("fld1", "ToB", json!({"linkedTableId": "tblB"})),
            link_field("fld2", "ToC", json!({"linkedTableId": "tblC"})),
        ]},
        {"id": "tblB", "name": "B", "fields": [
            link_field("fld3", "ToA", json!({"linkedTableId": "tblA"})),
        ]},
        {"id": "tblC", "name": "C", "fields": []},
    ]));

    let normalized = normalize(&raw).unwrap();

    let a = normalized.table("tblA").unwrap();
    assert!(a.fields[0].deferred, "link into the cycle is deferred");
    assert!(!a.fields[1].deferred, "link to an acyclic table is not");
    assert_eq!(normalized.creation_order[0], "tblC");
}

#[test]
fn test_lookup_adds_dependency_without_relationship() {
    let raw = schema(json!([
        {"id": "tblOrders", "name": "Orders", "fields": [
            link_field("fldCust", "Customer", json!({"linkedTableId": "tblCustomers"})),
            {"id": "fldCity", "name": "Customer City", "type": "multipleLookupValues",
             "options": {"recordLinkFieldId": "fldCust", "fieldIdInLinkedTable": "fldC"}},
        ]},
        {"id": "tblCustomers", "name": "Customers", "fields": [text_field("fldC", "City")]},
    ]));

    let normalized = normalize(&raw).unwrap();

    // One relationship from the link field only.
    assert_eq!(normalized.relationships.len(), 1);
    let orders = normalized.table("tblOrders").unwrap();
    assert_eq!(orders.dependencies, vec!["tblCustomers"]);
    assert_eq!(
        orders.fields[1].linked_table_name.as_deref(),
        Some("Customers")
    );
}

#[test]
fn test_lookup_through_non_link_field_fails() {
    let raw = schema(json!([
        {"id": "tblA", "name": "A", "fields": [
            text_field("fldText", "Notes"),
            {"id": "fldBad", "name": "Broken", "type": "rollup",
             "options": {"recordLinkFieldId": "fldText"}},
        ]},
    ]));

    let err = normalize(&raw).unwrap_err();

    assert!(matches!(err, NormalizeError::InvalidOptions { .. }));
}

#[test]
fn test_link_missing_options_fails() {
    let raw = schema(json!([
        {"id": "tblA", "name": "A", "fields": [
            {"id": "fld1", "name": "Bare", "type": "multipleRecordLinks"},
        ]},
    ]));

    let err = normalize(&raw).unwrap_err();

    assert!(matches!(err, NormalizeError::InvalidOptions { .. }));
}

#[test]
fn test_primary_field_and_views_carried() {
    let raw = schema(json!([
        {"id": "tblA", "name": "A", "primaryFieldId": "fld1",
         "fields": [text_field("fld1", "Name"), text_field("fld2", "Notes")],
         "views": [{"id": "viw1", "name": "Grid", "type": "grid"}]},
    ]));

    let normalized = normalize(&raw).unwrap();

    let table = normalized.table("tblA").unwrap();
    assert!(table.fields[0].is_primary);
    assert!(!table.fields[1].is_primary);
    assert_eq!(table.views.len(), 1);
    assert_eq!(table.views[0].view_type, "grid");
}

#[test]
fn test_empty_base() {
    let raw = schema(json!([]));

    let normalized = normalize(&raw).unwrap();

    assert!(normalized.tables.is_empty());
    assert!(normalized.creation_order.is_empty());
    assert_eq!(normalized.base_name, "Test Base");
}
