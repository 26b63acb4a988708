//! Integration suite for `sdp_core::parser` (spec §4.2 grammar), driven
//! off literal `.sdp`-shaped source strings through `sdp_core::compile`.

use sdp_core::{compile, PrimitiveKind, RecordKind, TypeExpr};

#[test]
fn parses_every_type_expression_shape() {
    let src = r#"
struct Inner { v: u32 }
struct Outer {
    a: u8, b: u16, c: u32, d: u64,
    e: i8, f: i16, g: i32, h: i64,
    i: f32, j: f64, k: bool, l: string,
    m: Inner,
    n: []u32,
    o: ?Inner,
}
"#;
    let pipeline = compile(src);
    assert!(pipeline.lex_errors.is_empty());
    assert!(pipeline.parse_errors.is_empty(), "{:?}", pipeline.parse_errors);
    let outer = pipeline.schema.record("Outer").unwrap();
    assert_eq!(outer.fields.len(), 15);
    assert_eq!(outer.fields[12].ty, TypeExpr::Named("Inner".to_string()));
    assert_eq!(
        outer.fields[13].ty,
        TypeExpr::Array(Box::new(TypeExpr::Primitive(PrimitiveKind::U32)))
    );
    assert_eq!(outer.fields[14].ty, TypeExpr::Optional("Inner".to_string()));
}

#[test]
fn message_kind_is_distinguished_from_struct() {
    let pipeline = compile("message M { x: u32 }\nstruct S { x: u32 }");
    assert!(pipeline.parse_errors.is_empty());
    assert_eq!(pipeline.schema.record("M").unwrap().kind, RecordKind::Message);
    assert_eq!(pipeline.schema.record("S").unwrap().kind, RecordKind::Struct);
}

#[test]
fn parser_resynchronizes_past_multiple_malformed_records() {
    let src = "struct A { x: }\nstruct B { y: }\nstruct C { z: u32 }";
    let pipeline = compile(src);
    assert!(pipeline.parse_errors.len() >= 2);
    assert!(pipeline.schema.record("C").is_some());
}

#[test]
fn trailing_comma_and_no_trailing_comma_both_parse() {
    let a = compile("struct A { x: u32, y: u32, }");
    let b = compile("struct B { x: u32, y: u32 }");
    assert!(a.parse_errors.is_empty());
    assert!(b.parse_errors.is_empty());
    assert_eq!(a.schema.record("A").unwrap().fields.len(), 2);
    assert_eq!(b.schema.record("B").unwrap().fields.len(), 2);
}
