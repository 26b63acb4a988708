//! Integration suite for `sdp_core::validate`'s five passes (spec §4.3),
//! driven end to end through `sdp_core::compile`.

use sdp_core::validate::ValidationError;
use sdp_core::compile;

fn errors_of(src: &str) -> Vec<ValidationError> {
    let pipeline = compile(src);
    assert!(pipeline.lex_errors.is_empty());
    assert!(pipeline.parse_errors.is_empty(), "{:?}", pipeline.parse_errors);
    pipeline.validated.errors
}

#[test]
fn a_realistic_multi_record_schema_validates_clean() {
    let src = r#"
struct Address {
    street: string,
    city: string,
}

struct Person {
    name: string,
    age: u8,
    address: Address,
    nicknames: []string,
    manager: ?Person,
}

message Greeting {
    person: Person,
    text: string,
}
"#;
    let errors = errors_of(src);
    assert!(errors.is_empty(), "{errors:?}");
}

#[test]
fn reports_every_error_kind_in_one_pass_over_a_deliberately_broken_schema() {
    let src = r#"
struct type { a: Missing, a: u32 }
struct A { x: A }
"#;
    let errors = errors_of(src);
    assert!(errors.iter().any(|e| matches!(e, ValidationError::ReservedIdentifier { .. })));
    assert!(errors.iter().any(|e| matches!(e, ValidationError::UnknownType { .. })));
    assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateField { .. })));
    assert!(errors.iter().any(|e| matches!(e, ValidationError::Cycle { .. })));
}

#[test]
fn three_way_mutual_cycle_without_optional_is_rejected() {
    let src = "struct A { b: B }\nstruct B { c: C }\nstruct C { a: A }";
    let errors = errors_of(src);
    assert!(errors.iter().any(|e| matches!(e, ValidationError::Cycle { .. })));
}

#[test]
fn three_way_mutual_cycle_with_an_optional_edge_is_accepted() {
    let src = "struct A { b: B }\nstruct B { c: ?C }\nstruct C { a: A }";
    let errors = errors_of(src);
    assert!(errors.is_empty(), "{errors:?}");
}

#[test]
fn duplicate_record_names_are_reported() {
    let errors = errors_of("struct A { x: u32 }\nstruct A { y: u32 }");
    assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateRecord(_))));
}
