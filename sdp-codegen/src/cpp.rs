//! The C++ target backend (spec §4.5, §6 "cpp: emits types.hpp,
//! encode.hpp, encode.cpp, decode.hpp, decode.cpp, endian.hpp in an `sdp`
//! namespace"). Shares the little-endian bulk-copy optimization with the
//! Rust backend (spec §9): `endian.hpp` carries the compile-time host
//! check, `encode.cpp`/`decode.cpp` take the bulk-copy path when it holds
//! and fall back to a per-element loop otherwise.

use crate::naming::{pascal_case, snake_case};
use sdp_core::{wire, PrimitiveKind, Record, RecordKind, Schema, TypeExpr};
use std::collections::BTreeMap;
use std::fmt::Write as _;

const HEADER: &str = "// Code generated by sdp-codegen. DO NOT EDIT.\n\n";
const NAMESPACE: &str = "sdp";

pub fn generate(schema: &Schema) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    files.insert("types.hpp".to_string(), gen_types_hpp(schema));
    files.insert("endian.hpp".to_string(), gen_endian_hpp());
    files.insert("encode.hpp".to_string(), gen_encode_hpp(schema));
    files.insert("encode.cpp".to_string(), gen_encode_cpp(schema));
    files.insert("decode.hpp".to_string(), gen_decode_hpp(schema));
    files.insert("decode.cpp".to_string(), gen_decode_cpp(schema));
    files
}

fn messages(schema: &Schema) -> Vec<&Record> {
    schema
        .records
        .iter()
        .filter(|r| matches!(r.kind, RecordKind::Message))
        .collect()
}

fn cpp_primitive(p: PrimitiveKind) -> &'static str {
    match p {
        PrimitiveKind::U8 => "uint8_t",
        PrimitiveKind::U16 => "uint16_t",
        PrimitiveKind::U32 => "uint32_t",
        PrimitiveKind::U64 => "uint64_t",
        PrimitiveKind::I8 => "int8_t",
        PrimitiveKind::I16 => "int16_t",
        PrimitiveKind::I32 => "int32_t",
        PrimitiveKind::I64 => "int64_t",
        PrimitiveKind::F32 => "float",
        PrimitiveKind::F64 => "double",
        PrimitiveKind::Bool => "bool",
        PrimitiveKind::String => "std::string",
    }
}

fn cpp_field_type(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Primitive(p) => cpp_primitive(*p).to_string(),
        TypeExpr::Named(name) => pascal_case(name),
        TypeExpr::Array(inner) => format!("std::vector<{}>", cpp_field_type(inner)),
        TypeExpr::Optional(name) => format!("std::unique_ptr<{}>", pascal_case(name)),
    }
}

fn doc_lines(doc: &Option<String>, indent: &str, out: &mut String) {
    if let Some(d) = doc {
        for line in d.lines() {
            let _ = writeln!(out, "{indent}/// {line}");
        }
    }
}

fn gen_types_hpp(schema: &Schema) -> String {
    let mut out = String::from(HEADER);
    out.push_str("#pragma once\n\n");
    out.push_str("#include <cstdint>\n#include <memory>\n#include <string>\n#include <vector>\n\n");
    let _ = writeln!(out, "namespace {NAMESPACE} {{\n");

    for record in &schema.records {
        let name = pascal_case(&record.name);
        doc_lines(&record.doc, "", &mut out);
        let _ = writeln!(out, "struct {name} {{");
        for field in &record.fields {
            doc_lines(&field.doc, "    ", &mut out);
            let fname = snake_case(&field.name);
            let fty = cpp_field_type(&field.ty);
            let _ = writeln!(out, "    {fty} {fname}{{}};");
        }
        if let RecordKind::Message = record.kind {
            let type_id = wire::type_id(&record.name);
            out.push('\n');
            let _ = writeln!(
                out,
                "    /// 64-bit FNV-1a of the schema name \"{}\" (spec §6 \"Type ID algorithm\").",
                record.name
            );
            let _ = writeln!(out, "    static constexpr uint64_t kTypeId = 0x{type_id:016x}ULL;");
        }
        out.push_str("};\n\n");
    }

    let msgs = messages(schema);
    if !msgs.is_empty() {
        out.push_str("/// Closed sum over every message record in the schema, returned by\n");
        out.push_str("/// dispatch_message (spec §4.5 \"dispatch-message\").\n");
        out.push_str("struct MessageVariant {\n");
        for m in &msgs {
            let name = pascal_case(&m.name);
            let _ = writeln!(out, "    std::unique_ptr<{name}> {};", snake_case(&m.name));
        }
        out.push_str("};\n\n");
    }

    let _ = writeln!(out, "}}  // namespace {NAMESPACE}");
    out
}

fn gen_endian_hpp() -> String {
    let mut out = String::from(HEADER);
    out.push_str("#pragma once\n\n");
    out.push_str("#include <cstdint>\n#include <cstring>\n\n");
    let _ = writeln!(out, "namespace {NAMESPACE} {{\n");
    out.push_str(
        r#"/// True when the host's native byte order matches the wire format
/// (spec §9 "Bulk-copy optimization"). Evaluated once; gates the
/// bulk-copy path in encode.cpp/decode.cpp.
inline bool host_is_little_endian() {
    static const bool value = [] {
        uint16_t x = 1;
        uint8_t byte0;
        std::memcpy(&byte0, &x, 1);
        return byte0 == 1;
    }();
    return value;
}

"#,
    );
    let _ = writeln!(out, "}}  // namespace {NAMESPACE}");
    out
}

fn gen_encode_hpp(schema: &Schema) -> String {
    let mut out = String::from(HEADER);
    out.push_str("#pragma once\n\n");
    out.push_str("#include <cstddef>\n#include <cstdint>\n#include <vector>\n\n");
    out.push_str("#include \"types.hpp\"\n\n");
    let _ = writeln!(out, "namespace {NAMESPACE} {{\n");

    for record in &schema.records {
        let name = pascal_case(&record.name);
        let fn_suffix = snake_case(&record.name);
        let _ = writeln!(out, "/// Exact encoded byte length of v (spec §8 invariant 2).");
        let _ = writeln!(out, "std::size_t size_of_{fn_suffix}(const {name}& v);");
        let _ = writeln!(
            out,
            "/// Writes v into buf at *cursor in wire format, advancing it. Allocation-free."
        );
        let _ = writeln!(
            out,
            "void encode_to_buffer_{fn_suffix}(const {name}& v, uint8_t* buf, std::size_t* cursor);"
        );
        let _ = writeln!(
            out,
            "/// Allocates a single buffer of exactly size_of_{fn_suffix}(v) bytes (spec §8 invariant 3)."
        );
        let _ = writeln!(out, "std::vector<uint8_t> encode_{fn_suffix}(const {name}& v);");
        if let RecordKind::Message = record.kind {
            let _ = writeln!(
                out,
                "/// Wraps v in the 12-byte message envelope (spec §4.4 \"message envelope\")."
            );
            let _ = writeln!(out, "std::vector<uint8_t> encode_message_{fn_suffix}(const {name}& v);");
        }
        out.push('\n');
    }

    let _ = writeln!(out, "}}  // namespace {NAMESPACE}");
    out
}

fn size_expr(ty: &TypeExpr, expr: &str) -> String {
    match ty {
        TypeExpr::Primitive(p) => match wire::fixed_width(*p) {
            Some(w) => w.to_string(),
            None => format!("4 + {expr}.size()"),
        },
        TypeExpr::Named(name) => format!("size_of_{}({expr})", snake_case(name)),
        TypeExpr::Array(inner) => match inner.as_ref() {
            TypeExpr::Primitive(p) if p.is_trivial_layout() => {
                let w = wire::fixed_width(*p).unwrap();
                format!("4 + {expr}.size() * {w}")
            }
            _ => {
                let elem = size_expr(inner, "e");
                format!(
                    "[&] {{ std::size_t s = 4; for (const auto& e : {expr}) {{ s += {elem}; }} return s; }}()"
                )
            }
        },
        TypeExpr::Optional(name) => format!(
            "(1 + ({expr} ? size_of_{}(*{expr}) : 0))",
            snake_case(name)
        ),
    }
}

fn gen_encode_cpp(schema: &Schema) -> String {
    let mut out = String::from(HEADER);
    out.push_str("#include \"encode.hpp\"\n\n#include <cstring>\n\n#include \"endian.hpp\"\n\n");
    let _ = writeln!(out, "namespace {NAMESPACE} {{\n");

    for record in &schema.records {
        let name = pascal_case(&record.name);
        let fn_suffix = snake_case(&record.name);

        let _ = writeln!(out, "std::size_t size_of_{fn_suffix}(const {name}& v) {{");
        out.push_str("    std::size_t n = 0;\n");
        for field in &record.fields {
            let fname = snake_case(&field.name);
            let term = size_expr(&field.ty, &format!("v.{fname}"));
            let _ = writeln!(out, "    n += {term};");
        }
        out.push_str("    return n;\n}\n\n");

        let _ = writeln!(
            out,
            "void encode_to_buffer_{fn_suffix}(const {name}& v, uint8_t* buf, std::size_t* cursor) {{"
        );
        for field in &record.fields {
            let fname = snake_case(&field.name);
            encode_stmt(&field.ty, &format!("v.{fname}"), "    ", &mut out);
        }
        out.push_str("}\n\n");

        let _ = writeln!(out, "std::vector<uint8_t> encode_{fn_suffix}(const {name}& v) {{");
        let _ = writeln!(out, "    std::vector<uint8_t> buf(size_of_{fn_suffix}(v));");
        out.push_str("    std::size_t cursor = 0;\n");
        let _ = writeln!(
            out,
            "    encode_to_buffer_{fn_suffix}(v, buf.empty() ? nullptr : buf.data(), &cursor);"
        );
        out.push_str("    return buf;\n}\n\n");

        if let RecordKind::Message = record.kind {
            let _ = writeln!(out, "std::vector<uint8_t> encode_message_{fn_suffix}(const {name}& v) {{");
            let _ = writeln!(out, "    auto payload = encode_{fn_suffix}(v);");
            out.push_str("    std::vector<uint8_t> buf(12 + payload.size());\n");
            let _ = writeln!(out, "    uint64_t type_id = {name}::kTypeId;");
            out.push_str("    std::memcpy(buf.data(), &type_id, 8);\n");
            out.push_str("    uint32_t payload_size = static_cast<uint32_t>(payload.size());\n");
            out.push_str("    std::memcpy(buf.data() + 8, &payload_size, 4);\n");
            out.push_str("    if (!payload.empty()) { std::memcpy(buf.data() + 12, payload.data(), payload.size()); }\n");
            out.push_str("    return buf;\n}\n\n");
        }
    }

    let _ = writeln!(out, "}}  // namespace {NAMESPACE}");
    out
}

fn encode_stmt(ty: &TypeExpr, expr: &str, indent: &str, out: &mut String) {
    match ty {
        TypeExpr::Primitive(p) => {
            let w = wire::fixed_width(*p);
            match p {
                PrimitiveKind::Bool => {
                    let _ = writeln!(out, "{indent}buf[*cursor] = {expr} ? 1 : 0;");
                    let _ = writeln!(out, "{indent}*cursor += 1;");
                }
                PrimitiveKind::String => {
                    let _ = writeln!(out, "{indent}{{");
                    let _ = writeln!(out, "{indent}    uint32_t len = static_cast<uint32_t>({expr}.size());");
                    let _ = writeln!(out, "{indent}    std::memcpy(buf + *cursor, &len, 4);");
                    let _ = writeln!(out, "{indent}    *cursor += 4;");
                    let _ = writeln!(
                        out,
                        "{indent}    if (!{expr}.empty()) {{ std::memcpy(buf + *cursor, {expr}.data(), {expr}.size()); }}"
                    );
                    let _ = writeln!(out, "{indent}    *cursor += {expr}.size();");
                    let _ = writeln!(out, "{indent}}}");
                }
                _ => {
                    let w = w.unwrap();
                    let _ = writeln!(out, "{indent}std::memcpy(buf + *cursor, &{expr}, {w});");
                    let _ = writeln!(out, "{indent}*cursor += {w};");
                }
            }
        }
        TypeExpr::Named(name) => {
            let _ = writeln!(out, "{indent}encode_to_buffer_{}({expr}, buf, cursor);", snake_case(name));
        }
        TypeExpr::Array(inner) => {
            let _ = writeln!(out, "{indent}{{");
            let _ = writeln!(out, "{indent}    uint32_t count = static_cast<uint32_t>({expr}.size());");
            let _ = writeln!(out, "{indent}    std::memcpy(buf + *cursor, &count, 4);");
            let _ = writeln!(out, "{indent}    *cursor += 4;");
            match inner.as_ref() {
                TypeExpr::Primitive(p) if p.is_trivial_layout() => {
                    let w = wire::fixed_width(*p).unwrap();
                    let _ = writeln!(out, "{indent}    std::size_t byte_len = {expr}.size() * {w};");
                    let _ = writeln!(out, "{indent}    if (host_is_little_endian()) {{");
                    let _ = writeln!(
                        out,
                        "{indent}        if (byte_len > 0) {{ std::memcpy(buf + *cursor, {expr}.data(), byte_len); }}"
                    );
                    let _ = writeln!(out, "{indent}    }} else {{");
                    let _ = writeln!(out, "{indent}        std::size_t off = *cursor;");
                    let _ = writeln!(out, "{indent}        for (const auto& e : {expr}) {{");
                    let _ = writeln!(out, "{indent}            std::memcpy(buf + off, &e, {w});");
                    let _ = writeln!(out, "{indent}            off += {w};");
                    let _ = writeln!(out, "{indent}        }}");
                    let _ = writeln!(out, "{indent}    }}");
                    let _ = writeln!(out, "{indent}    *cursor += byte_len;");
                }
                _ => {
                    let _ = writeln!(out, "{indent}    for (const auto& item : {expr}) {{");
                    encode_stmt(inner, "item", &format!("{indent}        "), out);
                    let _ = writeln!(out, "{indent}    }}");
                }
            }
            let _ = writeln!(out, "{indent}}}");
        }
        TypeExpr::Optional(name) => {
            let _ = writeln!(out, "{indent}if ({expr}) {{");
            let _ = writeln!(out, "{indent}    buf[*cursor] = 1;");
            let _ = writeln!(out, "{indent}    *cursor += 1;");
            let _ = writeln!(out, "{indent}    encode_to_buffer_{}(*{expr}, buf, cursor);", snake_case(name));
            let _ = writeln!(out, "{indent}}} else {{");
            let _ = writeln!(out, "{indent}    buf[*cursor] = 0;");
            let _ = writeln!(out, "{indent}    *cursor += 1;");
            let _ = writeln!(out, "{indent}}}");
        }
    }
}

fn gen_decode_hpp(schema: &Schema) -> String {
    let mut out = String::from(HEADER);
    out.push_str("#pragma once\n\n");
    out.push_str("#include <cstddef>\n#include <cstdint>\n#include <optional>\n#include <stdexcept>\n#include <vector>\n\n");
    out.push_str("#include \"types.hpp\"\n\n");
    let _ = writeln!(out, "namespace {NAMESPACE} {{\n");
    let _ = writeln!(out, "constexpr uint64_t kMaxFrameBytes = {};", wire::MAX_FRAME_BYTES);
    let _ = writeln!(out, "constexpr uint64_t kMaxArrayElements = {};", wire::MAX_ARRAY_ELEMENTS);
    let _ = writeln!(
        out,
        "constexpr uint64_t kMaxCumulativeElements = {};\n",
        wire::MAX_CUMULATIVE_ELEMENTS
    );
    out.push_str(
        r#"/// The closed decode-error set (spec §4.5 "Errors file", §7).
/// No kInvalidPresenceFlag: every decoder below treats any non-zero
/// presence byte as present rather than rejecting values other than 1
/// (spec §9 Open Question (a)).
enum class DecodeError {
    kUnexpectedEof,
    kArrayTooLarge,
    kTooManyElements,
    kDataTooLarge,
    kUnknownMessageType,
    kMessageSizeMismatch,
};

/// Per-decode state tracking the cumulative array-element budget against
/// kMaxCumulativeElements (spec §3 "Decode context"). Stack local; never
/// shared across concurrent decodes.
struct DecodeContext {
    uint64_t cumulative_elements = 0;
};

/// Thrown by the generated decoders on any DecodeError (spec §7 "Runtime
/// errors short-circuit"); callers should catch this rather than let it
/// escape past the decode-message boundary.
class DecodeException : public std::runtime_error {
public:
    explicit DecodeException(DecodeError error);
    DecodeError error() const { return error_; }

private:
    DecodeError error_;
};

"#,
    );

    for record in &schema.records {
        let name = pascal_case(&record.name);
        let fn_suffix = snake_case(&record.name);
        let _ = writeln!(out, "/// Decodes a byte-mode {name} frame (spec §4.5 \"decode (public)\").");
        let _ = writeln!(out, "{name} decode_{fn_suffix}(const uint8_t* buf, std::size_t len);");
        if let RecordKind::Message = record.kind {
            let _ = writeln!(
                out,
                "/// Parses the envelope, checks the type id and payload size, then decodes the payload."
            );
            let _ = writeln!(
                out,
                "{name} decode_message_{fn_suffix}(const uint8_t* buf, std::size_t len);"
            );
        }
        out.push('\n');
    }

    let msgs = messages(schema);
    if !msgs.is_empty() {
        out.push_str("/// Parses the envelope and looks the type id up in the schema's message\n");
        out.push_str("/// records, returning a freshly decoded, tagged variant.\n");
        out.push_str("MessageVariant dispatch_message(const uint8_t* buf, std::size_t len);\n\n");
    }

    let _ = writeln!(out, "}}  // namespace {NAMESPACE}");
    out
}

fn gen_decode_cpp(schema: &Schema) -> String {
    let mut out = String::from(HEADER);
    out.push_str("#include \"decode.hpp\"\n\n#include <cstring>\n\n#include \"endian.hpp\"\n\n");
    let _ = writeln!(out, "namespace {NAMESPACE} {{\n");
    out.push_str(
        r#"DecodeException::DecodeException(DecodeError error)
    : std::runtime_error("sdp decode error"), error_(error) {}

"#,
    );

    for record in &schema.records {
        let name = pascal_case(&record.name);
        let fn_suffix = snake_case(&record.name);

        let _ = writeln!(
            out,
            "static {name} decode_{fn_suffix}_at(const uint8_t* buf, std::size_t len, std::size_t* cursor, DecodeContext* ctx) {{"
        );
        let _ = writeln!(out, "    {name} v;");
        for field in &record.fields {
            let fname = snake_case(&field.name);
            decode_stmt(&field.ty, &format!("v.{fname}"), "    ", &mut out);
        }
        out.push_str("    return v;\n}\n\n");

        let _ = writeln!(out, "{name} decode_{fn_suffix}(const uint8_t* buf, std::size_t len) {{");
        out.push_str("    if (len > kMaxFrameBytes) { throw DecodeException(DecodeError::kDataTooLarge); }\n");
        out.push_str("    DecodeContext ctx;\n    std::size_t cursor = 0;\n");
        let _ = writeln!(out, "    return decode_{fn_suffix}_at(buf, len, &cursor, &ctx);");
        out.push_str("}\n\n");

        if let RecordKind::Message = record.kind {
            let _ = writeln!(out, "{name} decode_message_{fn_suffix}(const uint8_t* buf, std::size_t len) {{");
            out.push_str("    if (len > kMaxFrameBytes) { throw DecodeException(DecodeError::kDataTooLarge); }\n");
            out.push_str("    if (len < 12) { throw DecodeException(DecodeError::kUnexpectedEof); }\n");
            out.push_str("    uint64_t type_id;\n    std::memcpy(&type_id, buf, 8);\n");
            let _ = writeln!(
                out,
                "    if (type_id != {name}::kTypeId) {{ throw DecodeException(DecodeError::kUnknownMessageType); }}"
            );
            out.push_str("    uint32_t payload_size;\n    std::memcpy(&payload_size, buf + 8, 4);\n");
            out.push_str("    if (12 + static_cast<std::size_t>(payload_size) != len) { throw DecodeException(DecodeError::kMessageSizeMismatch); }\n");
            out.push_str("    DecodeContext ctx;\n    std::size_t cursor = 12;\n");
            let _ = writeln!(out, "    return decode_{fn_suffix}_at(buf, len, &cursor, &ctx);");
            out.push_str("}\n\n");
        }
    }

    let msgs = messages(schema);
    if !msgs.is_empty() {
        out.push_str("MessageVariant dispatch_message(const uint8_t* buf, std::size_t len) {\n");
        out.push_str("    if (len < 12) { throw DecodeException(DecodeError::kUnexpectedEof); }\n");
        out.push_str("    uint64_t type_id;\n    std::memcpy(&type_id, buf, 8);\n");
        out.push_str("    MessageVariant out;\n");
        for m in &msgs {
            let name = pascal_case(&m.name);
            let fn_suffix = snake_case(&m.name);
            let _ = writeln!(out, "    if (type_id == {name}::kTypeId) {{");
            let _ = writeln!(
                out,
                "        out.{fn_suffix} = std::make_unique<{name}>(decode_message_{fn_suffix}(buf, len));"
            );
            out.push_str("        return out;\n    }\n");
        }
        out.push_str("    throw DecodeException(DecodeError::kUnknownMessageType);\n}\n\n");
    }

    let _ = writeln!(out, "}}  // namespace {NAMESPACE}");
    out
}

fn decode_stmt(ty: &TypeExpr, var: &str, indent: &str, out: &mut String) {
    match ty {
        TypeExpr::Primitive(p) => match p {
            PrimitiveKind::Bool => {
                let _ = writeln!(out, "{indent}if (*cursor + 1 > len) {{ throw DecodeException(DecodeError::kUnexpectedEof); }}");
                let _ = writeln!(out, "{indent}{var} = buf[*cursor] != 0;");
                let _ = writeln!(out, "{indent}*cursor += 1;");
            }
            PrimitiveKind::String => {
                let _ = writeln!(out, "{indent}if (*cursor + 4 > len) {{ throw DecodeException(DecodeError::kUnexpectedEof); }}");
                let _ = writeln!(out, "{indent}uint32_t {var}_len;");
                let _ = writeln!(out, "{indent}std::memcpy(&{var}_len, buf + *cursor, 4);");
                let _ = writeln!(out, "{indent}*cursor += 4;");
                let _ = writeln!(
                    out,
                    "{indent}if (*cursor + {var}_len > len) {{ throw DecodeException(DecodeError::kUnexpectedEof); }}"
                );
                let _ = writeln!(
                    out,
                    "{indent}{var}.assign(reinterpret_cast<const char*>(buf + *cursor), {var}_len);"
                );
                let _ = writeln!(out, "{indent}*cursor += {var}_len;");
            }
            _ => {
                let w = wire::fixed_width(*p).unwrap();
                let _ = writeln!(out, "{indent}if (*cursor + {w} > len) {{ throw DecodeException(DecodeError::kUnexpectedEof); }}");
                let _ = writeln!(out, "{indent}std::memcpy(&{var}, buf + *cursor, {w});");
                let _ = writeln!(out, "{indent}*cursor += {w};");
            }
        },
        TypeExpr::Named(name) => {
            let _ = writeln!(
                out,
                "{indent}{var} = decode_{}_at(buf, len, cursor, ctx);",
                snake_case(name)
            );
        }
        TypeExpr::Array(inner) => {
            let count_var = format!("{}_count", var.replace('.', "_"));
            let _ = writeln!(out, "{indent}if (*cursor + 4 > len) {{ throw DecodeException(DecodeError::kUnexpectedEof); }}");
            let _ = writeln!(out, "{indent}uint32_t {count_var};");
            let _ = writeln!(out, "{indent}std::memcpy(&{count_var}, buf + *cursor, 4);");
            let _ = writeln!(out, "{indent}*cursor += 4;");
            let _ = writeln!(
                out,
                "{indent}if (static_cast<uint64_t>({count_var}) > kMaxArrayElements) {{ throw DecodeException(DecodeError::kArrayTooLarge); }}"
            );
            let _ = writeln!(out, "{indent}ctx->cumulative_elements += {count_var};");
            let _ = writeln!(
                out,
                "{indent}if (ctx->cumulative_elements > kMaxCumulativeElements) {{ throw DecodeException(DecodeError::kTooManyElements); }}"
            );
            match inner.as_ref() {
                TypeExpr::Primitive(p) if p.is_trivial_layout() => {
                    let w = wire::fixed_width(*p).unwrap();
                    let cty = cpp_primitive(*p);
                    let byte_len_var = format!("{}_byte_len", var.replace('.', "_"));
                    let _ = writeln!(out, "{indent}std::size_t {byte_len_var} = static_cast<std::size_t>({count_var}) * {w};");
                    let _ = writeln!(
                        out,
                        "{indent}if (*cursor + {byte_len_var} > len) {{ throw DecodeException(DecodeError::kUnexpectedEof); }}"
                    );
                    let _ = writeln!(out, "{indent}{var}.resize({count_var});");
                    let _ = writeln!(out, "{indent}if (host_is_little_endian()) {{");
                    let _ = writeln!(
                        out,
                        "{indent}    if ({byte_len_var} > 0) {{ std::memcpy({var}.data(), buf + *cursor, {byte_len_var}); }}"
                    );
                    let _ = writeln!(out, "{indent}}} else {{");
                    let _ = writeln!(out, "{indent}    for (uint32_t i = 0; i < {count_var}; ++i) {{");
                    let _ = writeln!(out, "{indent}        {cty} e;");
                    let _ = writeln!(out, "{indent}        std::memcpy(&e, buf + *cursor + i * {w}, {w});");
                    let _ = writeln!(out, "{indent}        {var}[i] = e;");
                    let _ = writeln!(out, "{indent}    }}");
                    let _ = writeln!(out, "{indent}}}");
                    let _ = writeln!(out, "{indent}*cursor += {byte_len_var};");
                }
                _ => {
                    let _ = writeln!(out, "{indent}{var}.reserve({count_var});");
                    let _ = writeln!(out, "{indent}for (uint32_t i = 0; i < {count_var}; ++i) {{");
                    let item_var = format!("{}_item", var.replace('.', "_"));
                    decode_item_stmt(inner, &item_var, &format!("{indent}    "), out);
                    let _ = writeln!(out, "{indent}    {var}.push_back(std::move({item_var}));");
                    let _ = writeln!(out, "{indent}}}");
                }
            }
        }
        TypeExpr::Optional(name) => {
            let _ = writeln!(out, "{indent}if (*cursor + 1 > len) {{ throw DecodeException(DecodeError::kUnexpectedEof); }}");
            let presence_var = format!("{}_presence", var.replace('.', "_"));
            let _ = writeln!(out, "{indent}uint8_t {presence_var} = buf[*cursor];");
            let _ = writeln!(out, "{indent}*cursor += 1;");
            let _ = writeln!(out, "{indent}if ({presence_var} != 0) {{");
            let _ = writeln!(
                out,
                "{indent}    {var} = std::make_unique<{}>(decode_{}_at(buf, len, cursor, ctx));",
                pascal_case(name),
                snake_case(name)
            );
            let _ = writeln!(out, "{indent}}}");
        }
    }
}

fn decode_item_stmt(ty: &TypeExpr, var: &str, indent: &str, out: &mut String) {
    match ty {
        TypeExpr::Named(name) => {
            let _ = writeln!(
                out,
                "{indent}{} {var} = decode_{}_at(buf, len, cursor, ctx);",
                pascal_case(name),
                snake_case(name)
            );
        }
        TypeExpr::Primitive(PrimitiveKind::String) => {
            let _ = writeln!(out, "{indent}std::string {var};");
            let _ = writeln!(out, "{indent}if (*cursor + 4 > len) {{ throw DecodeException(DecodeError::kUnexpectedEof); }}");
            let _ = writeln!(out, "{indent}uint32_t {var}_len;");
            let _ = writeln!(out, "{indent}std::memcpy(&{var}_len, buf + *cursor, 4);");
            let _ = writeln!(out, "{indent}*cursor += 4;");
            let _ = writeln!(out, "{indent}if (*cursor + {var}_len > len) {{ throw DecodeException(DecodeError::kUnexpectedEof); }}");
            let _ = writeln!(out, "{indent}{var}.assign(reinterpret_cast<const char*>(buf + *cursor), {var}_len);");
            let _ = writeln!(out, "{indent}*cursor += {var}_len;");
        }
        _ => {
            let _ = writeln!(out, "{indent}{} {var}{{}};", cpp_field_type(ty));
            decode_stmt(ty, var, indent, out);
        }
    }
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
    fn emits_struct_and_routines() {
        let schema = schema("struct P { a: u32, b: bool, c: string }");
        let files = generate(&schema);
        assert!(files["types.hpp"].contains("struct P {"));
        assert!(files["encode.hpp"].contains("size_of_p(const P& v)"));
        assert!(files["decode.hpp"].contains("P decode_p(const uint8_t* buf, std::size_t len)"));
    }

    #[test]
    fn message_gets_type_id_constant_and_dispatch() {
        let schema = schema("message Err { code: u32, text: string }");
        let files = generate(&schema);
        assert!(files["types.hpp"].contains("static constexpr uint64_t kTypeId"));
        assert!(files["decode.hpp"].contains("dispatch_message"));
    }

    #[test]
    fn bulk_copy_path_is_gated_on_native_endianness() {
        let schema = schema("struct L { xs: []u32 }");
        let files = generate(&schema);
        assert!(files["encode.cpp"].contains("host_is_little_endian()"));
        assert!(files["decode.cpp"].contains("host_is_little_endian()"));
    }

    #[test]
    fn generation_is_deterministic() {
        let schema = schema("struct A { x: u32 }\nmessage B { y: []u64, z: ?A }");
        assert_eq!(generate(&schema), generate(&schema));
    }
}
