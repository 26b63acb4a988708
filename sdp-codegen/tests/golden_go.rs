//! Golden-style snapshot tests for the Go target backend (spec §6 "go").

use sdp_codegen::go;
use sdp_core::compile;

const SCHEMA: &str = r#"
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

fn generate() -> std::collections::BTreeMap<String, String> {
    let pipeline = compile(SCHEMA);
    assert!(pipeline.is_ok(), "{:?} {:?}", pipeline.parse_errors, pipeline.validated.errors);
    go::generate(&pipeline.schema, "greetpkg")
}

#[test]
fn emits_expected_file_set() {
    let files = generate();
    assert_eq!(
        files.keys().cloned().collect::<Vec<_>>(),
        vec!["decode.go", "encode.go", "errors.go", "types.go"]
    );
}

#[test]
fn package_clause_uses_derived_package_name() {
    let files = generate();
    for f in files.values() {
        assert!(f.starts_with("// Code generated by sdp-codegen. DO NOT EDIT.\n\npackage greetpkg\n"));
    }
}

#[test]
fn types_file_has_expected_struct_and_pointer_and_slice_shapes() {
    let files = generate();
    let types = &files["types.go"];
    assert!(types.contains("type Address struct {"));
    assert!(types.contains("type Person struct {"));
    assert!(types.contains("Manager *Person"));
    assert!(types.contains("Nicknames []string"));
    assert!(types.contains("const TypeIDGreeting uint64"));
}

#[test]
fn encode_and_decode_expose_every_public_operation_from_spec_4_5() {
    let files = generate();
    assert!(files["encode.go"].contains("func SizeOfPerson(v *Person) int"));
    assert!(files["encode.go"].contains("func EncodeToBufferPerson"));
    assert!(files["encode.go"].contains("func EncodePerson(v *Person) []byte"));
    assert!(files["encode.go"].contains("func EncodeToStreamPerson"));
    assert!(files["encode.go"].contains("func EncodeMessageGreeting"));
    assert!(files["decode.go"].contains("func DecodePerson(buf []byte) (*Person, error)"));
    assert!(files["decode.go"].contains("func DecodeFromStreamPerson"));
    assert!(files["decode.go"].contains("func DecodeMessageGreeting"));
    assert!(files["decode.go"].contains("func DispatchMessage"));
}

#[test]
fn generation_is_byte_identical_across_runs() {
    assert_eq!(generate(), generate());
}

#[test]
fn every_emitted_file_has_balanced_braces() {
    for (name, src) in generate() {
        let open = src.matches('{').count();
        let close = src.matches('}').count();
        assert_eq!(open, close, "{name} has unbalanced braces");
    }
}
