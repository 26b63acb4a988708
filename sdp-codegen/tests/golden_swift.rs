//! Golden-style snapshot tests for the Swift target backend (spec §6
//! "swift: emits the C++17 implementation as above plus Package.swift
//! and module.modulemap for C++ interop consumption").

use sdp_codegen::swift;
use sdp_core::compile;

const SCHEMA: &str = "struct P { a: u32, b: bool, c: string }\nmessage M { x: u32 }";

fn generate() -> std::collections::BTreeMap<String, String> {
    let pipeline = compile(SCHEMA);
    assert!(pipeline.is_ok(), "{:?} {:?}", pipeline.parse_errors, pipeline.validated.errors);
    swift::generate(&pipeline.schema)
}

#[test]
fn emits_cpp_file_set_plus_two_swift_packaging_files() {
    let files = generate();
    assert_eq!(
        files.keys().cloned().collect::<Vec<_>>(),
        vec![
            "Package.swift",
            "decode.cpp",
            "decode.hpp",
            "encode.cpp",
            "encode.hpp",
            "endian.hpp",
            "module.modulemap",
            "types.hpp",
        ]
    );
}

#[test]
fn package_swift_targets_cxx17() {
    let files = generate();
    assert!(files["Package.swift"].contains("cxx17"));
    assert!(files["Package.swift"].contains("SdpGenerated"));
}

#[test]
fn module_map_exposes_every_header() {
    let files = generate();
    let map = &files["module.modulemap"];
    for header in ["types.hpp", "encode.hpp", "decode.hpp", "endian.hpp"] {
        assert!(map.contains(header), "module map missing header {header}");
    }
}

#[test]
fn generation_is_byte_identical_across_runs() {
    assert_eq!(generate(), generate());
}
