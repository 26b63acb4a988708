//! Semantic validation (spec §4.3). Runs five passes over a parsed
//! [`Schema`], each collecting its own errors; the caller sees the union.
//! Validation succeeds only when every pass returns no errors.

use crate::ast::{RecordKind, Schema, TypeExpr};
use crate::reserved;
use itertools::Itertools;
use std::collections::{HashMap, HashSet};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("record `{0}` is declared more than once")]
    DuplicateRecord(String),
    #[error("field `{field}` is declared more than once in record `{record}`")]
    DuplicateField { record: String, field: String },
    #[error("record `{0}` has no fields; every record must have at least one field")]
    EmptyRecord(String),
    #[error("record `{record}`, field `{field}` references unknown type `{target}`")]
    UnknownType {
        record: String,
        field: String,
        target: String,
    },
    #[error("record `{record}`, field `{field}` is an array of arrays, which is not permitted")]
    NestedArray { record: String, field: String },
    #[error("record `{record}`, field `{field}` is an array of optionals, which is not permitted")]
    OptionalInArray { record: String, field: String },
    #[error("`{name}` is a reserved identifier in a supported target language")]
    ReservedIdentifier { name: String },
    #[error("cycle in record references with no optional back-edge: {}", .path.iter().join(" -> "))]
    Cycle { path: Vec<String> },
}

/// The outcome of running all five validation passes.
#[derive(Debug, Default)]
pub struct Validated {
    pub errors: Vec<ValidationError>,
}

impl Validated {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate(schema: &Schema) -> Validated {
    let mut errors = Vec::new();

    naming_pass(schema, &mut errors);
    structural_pass(schema, &mut errors);
    type_resolution_pass(schema, &mut errors);
    cycle_pass(schema, &mut errors);
    reserved_keyword_pass(schema, &mut errors);

    Validated { errors }
}

/// Pass 1: reserved-word collisions and duplicate field names within a
/// record. Duplicate record names are deferred to the structural pass,
/// which already needs a full scan of record names.
fn naming_pass(schema: &Schema, errors: &mut Vec<ValidationError>) {
    for record in &schema.records {
        if reserved::is_reserved(&record.name) {
            errors.push(ValidationError::ReservedIdentifier {
                name: record.name.clone(),
            });
        }
        let mut seen = HashSet::new();
        for field in &record.fields {
            if reserved::is_reserved(&field.name) {
                errors.push(ValidationError::ReservedIdentifier {
                    name: field.name.clone(),
                });
            }
            if !seen.insert(field.name.as_str()) {
                errors.push(ValidationError::DuplicateField {
                    record: record.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
    }
}

/// Pass 2: every record has at least one field; record names are unique.
fn structural_pass(schema: &Schema, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for record in &schema.records {
        if record.fields.is_empty() {
            errors.push(ValidationError::EmptyRecord(record.name.clone()));
        }
        if !seen.insert(record.name.as_str()) {
            errors.push(ValidationError::DuplicateRecord(record.name.clone()));
        }
    }
}

/// Pass 3: every named type reference resolves within the schema;
/// optional wraps only a named record; arrays never directly contain
/// arrays (already rejected by the parser's grammar, re-checked here so a
/// hand-built [`Schema`] that skips the parser is held to the same rule).
fn type_resolution_pass(schema: &Schema, errors: &mut Vec<ValidationError>) {
    let record_names: HashSet<&str> = schema.records.iter().map(|r| r.name.as_str()).collect();

    for record in &schema.records {
        for field in &record.fields {
            check_type(&record_names, &record.name, &field.name, &field.ty, errors);
        }
    }
}

fn check_type(
    record_names: &HashSet<&str>,
    record: &str,
    field: &str,
    ty: &TypeExpr,
    errors: &mut Vec<ValidationError>,
) {
    match ty {
        TypeExpr::Primitive(_) => {}
        TypeExpr::Named(name) => {
            if !record_names.contains(name.as_str()) {
                errors.push(ValidationError::UnknownType {
                    record: record.to_string(),
                    field: field.to_string(),
                    target: name.clone(),
                });
            }
        }
        TypeExpr::Optional(name) => {
            if !record_names.contains(name.as_str()) {
                errors.push(ValidationError::UnknownType {
                    record: record.to_string(),
                    field: field.to_string(),
                    target: name.clone(),
                });
            }
        }
        TypeExpr::Array(inner) => {
            if inner.is_array() {
                errors.push(ValidationError::NestedArray {
                    record: record.to_string(),
                    field: field.to_string(),
                });
                return;
            }
            if matches!(inner.as_ref(), TypeExpr::Optional(_)) {
                errors.push(ValidationError::OptionalInArray {
                    record: record.to_string(),
                    field: field.to_string(),
                });
                return;
            }
            check_type(record_names, record, field, inner, errors);
        }
    }
}

/// Pass 4: the record-reference graph must have no cycle that consists
/// entirely of non-weak (non-optional) edges. A self-reference without
/// `optional` counts as a one-node cycle.
fn cycle_pass(schema: &Schema, errors: &mut Vec<ValidationError>) {
    // Adjacency: record name -> Vec<(target, is_weak)>.
    let mut graph: HashMap<&str, Vec<(&str, bool)>> = HashMap::new();
    for record in &schema.records {
        let edges = graph.entry(record.name.as_str()).or_default();
        for field in &record.fields {
            collect_edges(&field.ty, edges);
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut mark: HashMap<&str, Mark> = schema
        .records
        .iter()
        .map(|r| (r.name.as_str(), Mark::Unvisited))
        .collect();

    fn visit<'a>(
        node: &'a str,
        graph: &HashMap<&'a str, Vec<(&'a str, bool)>>,
        mark: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
        errors: &mut Vec<ValidationError>,
    ) {
        match mark.get(node) {
            Some(Mark::Done) | None => return,
            Some(Mark::InProgress) => {
                // Found a strong-edge-only cycle back to `node`.
                let start = stack.iter().position(|n| *n == node).unwrap_or(0);
                let mut path: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
                path.push(node.to_string());
                errors.push(ValidationError::Cycle { path });
                return;
            }
            Some(Mark::Unvisited) => {}
        }
        mark.insert(node, Mark::InProgress);
        stack.push(node);
        if let Some(edges) = graph.get(node) {
            for (target, weak) in edges {
                if *weak {
                    continue;
                }
                visit(target, graph, mark, stack, errors);
            }
        }
        stack.pop();
        mark.insert(node, Mark::Done);
    }

    for record in &schema.records {
        let mut stack = Vec::new();
        visit(record.name.as_str(), &graph, &mut mark, &mut stack, errors);
    }
}

fn collect_edges<'a>(ty: &'a TypeExpr, edges: &mut Vec<(&'a str, bool)>) {
    match ty {
        TypeExpr::Primitive(_) => {}
        TypeExpr::Named(name) => edges.push((name.as_str(), false)),
        TypeExpr::Optional(name) => edges.push((name.as_str(), true)),
        TypeExpr::Array(inner) => collect_edges(inner, edges),
    }
}

/// Pass 5: re-checks reserved-word collisions now that every type
/// reference is known to resolve. In this wire format, field/record
/// identifiers never compose with the identifiers of the records they
/// reference (there is no nested namespacing), so this pass currently
/// flags the same collisions as the naming pass; it exists as a separate
/// pass so a future target backend that *does* compose names (e.g. an
/// enum-style discriminant named after a referenced record) has a place
/// to add resolution-dependent checks without touching pass 1.
fn reserved_keyword_pass(schema: &Schema, errors: &mut Vec<ValidationError>) {
    for record in &schema.records {
        if let RecordKind::Message = record.kind {
            let dispatch_name = format!("{}Variant", record.name);
            if reserved::is_reserved(&dispatch_name) {
                errors.push(ValidationError::ReservedIdentifier { name: dispatch_name });
            }
        }
    }
}
