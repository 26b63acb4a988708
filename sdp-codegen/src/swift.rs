//! The Swift target backend (spec §4.5, §6 "swift: emits the C++17
//! implementation as above plus Package.swift and module.modulemap for
//! C++ interop consumption"). Swift's C++ interop story means there is
//! no distinct Swift-native codec: this module re-emits the `cpp` file
//! set unchanged and adds the two packaging files Swift needs to import
//! that C++ code as a module.

use crate::cpp;
use crate::naming::pascal_case;
use sdp_core::Schema;
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub fn generate(schema: &Schema) -> BTreeMap<String, String> {
    let mut files = cpp::generate(schema);
    files.insert("Package.swift".to_string(), gen_package_swift());
    files.insert("module.modulemap".to_string(), gen_module_modulemap(schema));
    files
}

fn gen_package_swift() -> String {
    r#"// swift-tools-version:5.9
// Code generated by sdp-codegen. DO NOT EDIT.
import PackageDescription

let package = Package(
    name: "SdpGenerated",
    products: [
        .library(name: "SdpGenerated", targets: ["SdpGenerated"])
    ],
    targets: [
        .target(
            name: "SdpGenerated",
            cxxSettings: [.unsafeFlags(["-std=c++17"])]
        )
    ],
    cLanguageStandard: .c11,
    cxxLanguageStandard: .cxx17
)
"#
    .to_string()
}

fn gen_module_modulemap(schema: &Schema) -> String {
    let mut out = String::new();
    out.push_str("// Code generated by sdp-codegen. DO NOT EDIT.\n\n");
    out.push_str("module SdpGenerated {\n");
    out.push_str("    header \"types.hpp\"\n");
    out.push_str("    header \"encode.hpp\"\n");
    out.push_str("    header \"decode.hpp\"\n");
    out.push_str("    header \"endian.hpp\"\n");
    out.push_str("    requires cplusplus17\n");
    out.push_str("    export *\n");
    out.push_str("}\n");

    if !schema.records.is_empty() {
        out.push_str("\n// Records available through the `sdp` namespace once imported: ");
        let names: Vec<String> = schema.records.iter().map(|r| pascal_case(&r.name)).collect();
        let _ = writeln!(out, "{}", names.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdp_core::compile;

    fn schema(src: &str) -> Schema {
        let pipeline = compile(src);
        assert!(pipeline.is_ok(), "{:?} {:?}", pipeline.parse_errors, pipeline.validated.errors);
        pipeline.schema
    }

    #[test]
    fn emits_cpp_files_plus_swift_packaging() {
        let schema = schema("struct P { a: u32, b: bool, c: string }");
        let files = generate(&schema);
        assert!(files.contains_key("types.hpp"));
        assert!(files.contains_key("encode.cpp"));
        assert!(files.contains_key("decode.cpp"));
        assert!(files["Package.swift"].contains("swift-tools-version:5.9"));
        assert!(files["module.modulemap"].contains("module SdpGenerated {"));
    }

    #[test]
    fn module_map_requires_cplusplus17() {
        let schema = schema("struct P { a: u32 }");
        let files = generate(&schema);
        assert!(files["module.modulemap"].contains("requires cplusplus17"));
    }

    #[test]
    fn generation_is_deterministic() {
        let schema = schema("struct A { x: u32 }\nmessage B { y: []u64, z: ?A }");
        assert_eq!(generate(&schema), generate(&schema));
    }
}
