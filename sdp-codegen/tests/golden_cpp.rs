//! Golden-style snapshot tests for the C++ target backend (spec §6 "cpp").

use sdp_codegen::cpp;
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
    cpp::generate(&pipeline.schema)
}

#[test]
fn emits_the_expected_header_and_source_set() {
    let files = generate();
    assert_eq!(
        files.keys().cloned().collect::<Vec<_>>(),
        vec![
            "decode.cpp",
            "decode.hpp",
            "encode.cpp",
            "encode.hpp",
            "endian.hpp",
            "types.hpp",
        ]
    );
}

#[test]
fn types_header_uses_unique_ptr_and_vector_and_sdp_namespace() {
    let files = generate();
    let types = &files["types.hpp"];
    assert!(types.contains("namespace sdp {"));
    assert!(types.contains("struct Person {"));
    assert!(types.contains("std::unique_ptr<Person> manager{};"));
    assert!(types.contains("std::vector<std::string> nicknames{};"));
    assert!(types.contains("static constexpr uint64_t kTypeId"));
}

#[test]
fn encode_and_decode_headers_declare_every_operation_from_spec_4_5() {
    let files = generate();
    assert!(files["encode.hpp"].contains("std::size_t size_of_person(const Person& v);"));
    assert!(files["encode.hpp"].contains("encode_to_buffer_person"));
    assert!(files["encode.hpp"].contains("std::vector<uint8_t> encode_person(const Person& v);"));
    assert!(files["encode.hpp"].contains("encode_message_greeting"));
    assert!(files["decode.hpp"].contains("Person decode_person(const uint8_t* buf, std::size_t len);"));
    assert!(files["decode.hpp"].contains("decode_message_greeting"));
    assert!(files["decode.hpp"].contains("dispatch_message"));
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
