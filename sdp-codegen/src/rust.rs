//! The Rust target backend (spec §4.5, §6 "rust: emits lib.rs (or the
//! conventional set of mod.rs/types.rs/encode.rs/decode.rs)").
//!
//! This module emits the conventional multi-file layout: `mod.rs` wires
//! the submodules together, `types.rs` holds the native record types and
//! per-message type-ID constants, `encode.rs` and `decode.rs` hold the
//! size-of/encode/decode routines, `errors.rs` the closed decode-error
//! set, and `support.rs` the little-endian bulk-copy helper shared by
//! every array-of-primitive field (spec §9 "Bulk-copy optimization").

use crate::naming::{pascal_case, snake_case};
use sdp_core::{wire, PrimitiveKind, Record, RecordKind, Schema, TypeExpr};
use std::collections::BTreeMap;
use std::fmt::Write as _;

const HEADER: &str = "// Code generated by sdp-codegen. DO NOT EDIT.\n\n";

pub fn generate(schema: &Schema) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    files.insert("mod.rs".to_string(), gen_mod(schema));
    files.insert("types.rs".to_string(), gen_types(schema));
    files.insert("errors.rs".to_string(), gen_errors());
    files.insert("support.rs".to_string(), gen_support());
    files.insert("encode.rs".to_string(), gen_encode(schema));
    files.insert("decode.rs".to_string(), gen_decode(schema));
    files
}

fn messages(schema: &Schema) -> Vec<&Record> {
    schema
        .records
        .iter()
        .filter(|r| matches!(r.kind, RecordKind::Message))
        .collect()
}

fn gen_mod(schema: &Schema) -> String {
    let mut out = String::from(HEADER);
    out.push_str("//! Generated types, encoders, and decoders for this schema.\n\n");
    out.push_str("mod support;\n\n");
    out.push_str("pub mod decode;\npub mod encode;\npub mod errors;\npub mod types;\n\n");
    out.push_str("pub use decode::*;\npub use encode::*;\npub use errors::*;\npub use types::*;\n");
    if !messages(schema).is_empty() {
        out.push('\n');
    }
    out
}

fn rust_primitive(p: PrimitiveKind) -> &'static str {
    match p {
        PrimitiveKind::U8 => "u8",
        PrimitiveKind::U16 => "u16",
        PrimitiveKind::U32 => "u32",
        PrimitiveKind::U64 => "u64",
        PrimitiveKind::I8 => "i8",
        PrimitiveKind::I16 => "i16",
        PrimitiveKind::I32 => "i32",
        PrimitiveKind::I64 => "i64",
        PrimitiveKind::F32 => "f32",
        PrimitiveKind::F64 => "f64",
        PrimitiveKind::Bool => "bool",
        PrimitiveKind::String => "String",
    }
}

fn rust_field_type(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Primitive(p) => rust_primitive(*p).to_string(),
        TypeExpr::Named(name) => pascal_case(name),
        TypeExpr::Array(inner) => format!("Vec<{}>", rust_field_type(inner)),
        TypeExpr::Optional(name) => format!("Option<Box<{}>>", pascal_case(name)),
    }
}

fn doc_lines(doc: &Option<String>, indent: &str, out: &mut String) {
    if let Some(d) = doc {
        for line in d.lines() {
            let _ = writeln!(out, "{indent}/// {line}");
        }
    }
}

fn gen_types(schema: &Schema) -> String {
    let mut out = String::from(HEADER);
    out.push_str("//! Native record types (spec §4.5 \"Types file\").\n\n");

    for record in &schema.records {
        let name = pascal_case(&record.name);
        doc_lines(&record.doc, "", &mut out);
        out.push_str("#[derive(Debug, Clone, PartialEq)]\n");
        let _ = writeln!(out, "pub struct {name} {{");
        for field in &record.fields {
            doc_lines(&field.doc, "    ", &mut out);
            let fname = snake_case(&field.name);
            let fty = rust_field_type(&field.ty);
            let _ = writeln!(out, "    pub {fname}: {fty},");
        }
        out.push_str("}\n\n");

        if let RecordKind::Message = record.kind {
            let type_id = wire::type_id(&record.name);
            let _ = writeln!(out, "impl {name} {{");
            let _ = writeln!(
                out,
                "    /// 64-bit FNV-1a of the schema name `\"{}\"` (spec §6 \"Type ID algorithm\").",
                record.name
            );
            let _ = writeln!(out, "    pub const TYPE_ID: u64 = 0x{type_id:016x};");
            out.push_str("}\n\n");
        }
    }

    let msgs = messages(schema);
    if !msgs.is_empty() {
        out.push_str("/// Closed sum over every message record in the schema, returned by\n");
        out.push_str("/// [`super::decode::dispatch_message`] (spec §4.5 \"dispatch-message\").\n");
        out.push_str("#[derive(Debug, Clone, PartialEq)]\n");
        out.push_str("pub enum MessageVariant {\n");
        for m in &msgs {
            let name = pascal_case(&m.name);
            let _ = writeln!(out, "    {name}({name}),");
        }
        out.push_str("}\n");
    }

    out
}

fn gen_errors() -> String {
    let mut out = String::from(HEADER);
    out.push_str("//! Closed decode-error set (spec §4.5 \"Errors file\", §7).\n\n");
    out.push_str(
        r#"// No `InvalidPresenceFlag` variant: every decoder below treats any
// non-zero presence byte as present rather than rejecting values other
// than 0x01 (spec §9 Open Question (a)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("array element count exceeds the 1,000,000-element limit")]
    ArrayTooLarge,
    #[error("cumulative array element count exceeds the 10,000,000-element limit")]
    TooManyElements,
    #[error("input exceeds the 128 MiB frame limit")]
    DataTooLarge,
    #[error("unknown message type id {0:#x}")]
    UnknownMessageType(u64),
    #[error("message envelope payload_size does not match the remaining input")]
    MessageSizeMismatch,
}
"#,
    );
    out
}

/// The little-endian bulk-copy helper (spec §4.5, §9 "Bulk-copy
/// optimization"): a single byte-range copy on little-endian hosts, a
/// per-element `to_le_bytes`/`from_le_bytes` loop otherwise, so the
/// generated code is correct on both endiannesses even though SDP's wire
/// format assumes a little-endian host (spec §1 Non-goals).
fn gen_support() -> String {
    let mut out = String::from(HEADER);
    out.push_str("//! Bulk little-endian copy helpers for primitive arrays.\n\n");
    out.push_str(
        r#"/// Implemented for every fixed-width wire primitive (everything but
/// `string`), giving [`bulk_copy_into`] and [`bulk_copy_from`] a single
/// generic implementation instead of one per primitive type.
pub(crate) trait WireScalar: Copy + Sized {
    fn to_wire_bytes(self, dst: &mut [u8]);
    fn from_wire_bytes(src: &[u8]) -> Self;
}

macro_rules! impl_wire_scalar_int {
    ($($t:ty),*) => {
        $(
            impl WireScalar for $t {
                fn to_wire_bytes(self, dst: &mut [u8]) {
                    dst.copy_from_slice(&self.to_le_bytes());
                }
                fn from_wire_bytes(src: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(src);
                    <$t>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_wire_scalar_int!(u8, u16, u32, u64, i8, i16, i32, i64);

impl WireScalar for bool {
    fn to_wire_bytes(self, dst: &mut [u8]) {
        dst[0] = self as u8;
    }
    fn from_wire_bytes(src: &[u8]) -> Self {
        src[0] != 0
    }
}

impl WireScalar for f32 {
    fn to_wire_bytes(self, dst: &mut [u8]) {
        dst.copy_from_slice(&self.to_bits().to_le_bytes());
    }
    fn from_wire_bytes(src: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(src);
        f32::from_bits(u32::from_le_bytes(buf))
    }
}

impl WireScalar for f64 {
    fn to_wire_bytes(self, dst: &mut [u8]) {
        dst.copy_from_slice(&self.to_bits().to_le_bytes());
    }
    fn from_wire_bytes(src: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(src);
        f64::from_bits(u64::from_le_bytes(buf))
    }
}

/// Writes `values` into `buf` starting at `*cursor`, advancing it. On a
/// little-endian host this is a single byte-range copy out of `values`'s
/// own backing storage; elsewhere it falls back to a per-element
/// `to_le_bytes` loop that produces identical wire bytes.
pub(crate) fn bulk_copy_into<T: WireScalar>(buf: &mut [u8], cursor: &mut usize, values: &[T]) {
    let width = std::mem::size_of::<T>();
    let byte_len = width * values.len();
    #[cfg(target_endian = "little")]
    {
        let src =
            unsafe { std::slice::from_raw_parts(values.as_ptr() as *const u8, byte_len) };
        buf[*cursor..*cursor + byte_len].copy_from_slice(src);
    }
    #[cfg(not(target_endian = "little"))]
    {
        for (i, v) in values.iter().enumerate() {
            v.to_wire_bytes(&mut buf[*cursor + i * width..*cursor + (i + 1) * width]);
        }
    }
    *cursor += byte_len;
}

/// Reads `count` little-endian `T` values out of `src`, which must be
/// exactly `count * size_of::<T>()` bytes (the caller bounds-checks this
/// before calling, per spec §4.5 "mandatory bounds checks before every
/// read"). Pre-sizes the returned `Vec` to `count` (spec §8 invariant 4,
/// "single allocation during decode of primitive arrays").
pub(crate) fn bulk_copy_from<T: WireScalar>(src: &[u8], count: usize) -> Vec<T> {
    let width = std::mem::size_of::<T>();
    let mut out = Vec::with_capacity(count);
    #[cfg(target_endian = "little")]
    {
        let ptr = src.as_ptr() as *const T;
        for i in 0..count {
            out.push(unsafe { ptr.add(i).read_unaligned() });
        }
    }
    #[cfg(not(target_endian = "little"))]
    {
        for i in 0..count {
            out.push(T::from_wire_bytes(&src[i * width..(i + 1) * width]));
        }
    }
    out
}
"#,
    );
    out
}

/// Builds a Rust expression computing the encoded byte size of `expr`
/// (which must be an expression of the field's Rust type, e.g. `&v.xs`).
fn size_expr(ty: &TypeExpr, expr: &str) -> String {
    match ty {
        TypeExpr::Primitive(p) => match wire::fixed_width(*p) {
            Some(w) => w.to_string(),
            None => format!("4 + {expr}.len()"),
        },
        TypeExpr::Named(name) => format!("size_of_{}(&{expr})", snake_case(name)),
        TypeExpr::Array(inner) => match inner.as_ref() {
            TypeExpr::Primitive(p) if p.is_trivial_layout() => {
                let w = wire::fixed_width(*p).unwrap();
                format!("4 + {expr}.len() * {w}")
            }
            _ => {
                let elem = size_expr(inner, "e");
                format!("4 + {expr}.iter().map(|e| {elem}).sum::<usize>()")
            }
        },
        TypeExpr::Optional(name) => format!(
            "1 + {expr}.as_ref().map(|b| size_of_{}(b)).unwrap_or(0)",
            snake_case(name)
        ),
    }
}

fn gen_encode(schema: &Schema) -> String {
    let mut out = String::from(HEADER);
    out.push_str("//! size-of / encode-to-buffer / encode / encode-to-stream (spec §4.5).\n\n");
    out.push_str("use super::support::bulk_copy_into;\nuse super::types::*;\n\n");

    for record in &schema.records {
        let name = pascal_case(&record.name);
        let fn_suffix = snake_case(&record.name);

        let _ = writeln!(out, "/// Exact encoded byte length of `v` (spec §8 invariant 2).");
        let _ = writeln!(out, "pub fn size_of_{fn_suffix}(v: &{name}) -> usize {{");
        out.push_str("    0");
        for field in &record.fields {
            let fname = snake_case(&field.name);
            let term = size_expr(&field.ty, &format!("v.{fname}"));
            let _ = write!(out, "\n        + ({term})");
        }
        out.push_str("\n}\n\n");

        let _ = writeln!(
            out,
            "/// Writes `v` into `buf` at `*cursor` in wire format, advancing it. Allocation-free."
        );
        let _ = writeln!(
            out,
            "pub fn encode_to_buffer_{fn_suffix}(v: &{name}, buf: &mut [u8], cursor: &mut usize) {{"
        );
        for field in &record.fields {
            let fname = snake_case(&field.name);
            encode_stmt(&field.ty, &format!("&v.{fname}"), "    ", &mut out);
        }
        out.push_str("}\n\n");

        let _ = writeln!(
            out,
            "/// Allocates a single buffer of exactly `size_of_{fn_suffix}(v)` bytes and encodes into it (spec §8 invariant 3)."
        );
        let _ = writeln!(out, "pub fn encode_{fn_suffix}(v: &{name}) -> Vec<u8> {{");
        let _ = writeln!(out, "    let n = size_of_{fn_suffix}(v);");
        out.push_str("    let mut buf = vec![0u8; n];\n");
        out.push_str("    let mut cursor = 0usize;\n");
        let _ = writeln!(out, "    encode_to_buffer_{fn_suffix}(v, &mut buf, &mut cursor);");
        out.push_str("    buf\n}\n\n");

        let _ = writeln!(
            out,
            "pub fn encode_to_stream_{fn_suffix}<W: std::io::Write>(v: &{name}, w: &mut W) -> std::io::Result<()> {{"
        );
        let _ = writeln!(out, "    w.write_all(&encode_{fn_suffix}(v))");
        out.push_str("}\n\n");

        if let RecordKind::Message = record.kind {
            let _ = writeln!(
                out,
                "/// Wraps `v` in the 12-byte message envelope (spec §4.4 \"message envelope\")."
            );
            let _ = writeln!(out, "pub fn encode_message_{fn_suffix}(v: &{name}) -> Vec<u8> {{");
            let _ = writeln!(out, "    let payload = encode_{fn_suffix}(v);");
            out.push_str("    let mut buf = Vec::with_capacity(12 + payload.len());\n");
            let _ = writeln!(out, "    buf.extend_from_slice(&{name}::TYPE_ID.to_le_bytes());");
            out.push_str("    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());\n");
            out.push_str("    buf.extend_from_slice(&payload);\n");
            out.push_str("    buf\n}\n\n");
        }
    }

    out
}

fn encode_stmt(ty: &TypeExpr, expr: &str, indent: &str, out: &mut String) {
    match ty {
        TypeExpr::Primitive(p) => {
            let w = wire::fixed_width(*p);
            match p {
                PrimitiveKind::Bool => {
                    let _ = writeln!(out, "{indent}buf[*cursor] = if *{expr} {{ 1 }} else {{ 0 }};");
                    let _ = writeln!(out, "{indent}*cursor += 1;");
                }
                PrimitiveKind::F32 | PrimitiveKind::F64 => {
                    let w = w.unwrap();
                    let _ = writeln!(
                        out,
                        "{indent}buf[*cursor..*cursor + {w}].copy_from_slice(&({expr}).to_bits().to_le_bytes());"
                    );
                    let _ = writeln!(out, "{indent}*cursor += {w};");
                }
                PrimitiveKind::String => {
                    let _ = writeln!(out, "{indent}{{");
                    let _ = writeln!(out, "{indent}    let bytes = ({expr}).as_bytes();");
                    let _ = writeln!(
                        out,
                        "{indent}    buf[*cursor..*cursor + 4].copy_from_slice(&(bytes.len() as u32).to_le_bytes());"
                    );
                    let _ = writeln!(out, "{indent}    *cursor += 4;");
                    let _ = writeln!(
                        out,
                        "{indent}    buf[*cursor..*cursor + bytes.len()].copy_from_slice(bytes);"
                    );
                    let _ = writeln!(out, "{indent}    *cursor += bytes.len();");
                    let _ = writeln!(out, "{indent}}}");
                }
                _ => {
                    let w = w.unwrap();
                    let _ = writeln!(
                        out,
                        "{indent}buf[*cursor..*cursor + {w}].copy_from_slice(&({expr}).to_le_bytes());"
                    );
                    let _ = writeln!(out, "{indent}*cursor += {w};");
                }
            }
        }
        TypeExpr::Named(name) => {
            let _ = writeln!(out, "{indent}encode_to_buffer_{}({expr}, buf, cursor);", snake_case(name));
        }
        TypeExpr::Array(inner) => {
            let _ = writeln!(out, "{indent}{{");
            let _ = writeln!(
                out,
                "{indent}    buf[*cursor..*cursor + 4].copy_from_slice(&(({expr}).len() as u32).to_le_bytes());"
            );
            let _ = writeln!(out, "{indent}    *cursor += 4;");
            match inner.as_ref() {
                TypeExpr::Primitive(p) if p.is_trivial_layout() => {
                    let _ = writeln!(out, "{indent}    bulk_copy_into(buf, cursor, ({expr}).as_slice());");
                }
                _ => {
                    let _ = writeln!(out, "{indent}    for item in {expr}.iter() {{");
                    encode_stmt(inner, "item", &format!("{indent}        "), out);
                    let _ = writeln!(out, "{indent}    }}");
                }
            }
            let _ = writeln!(out, "{indent}}}");
        }
        TypeExpr::Optional(name) => {
            let _ = writeln!(out, "{indent}match {expr}.as_ref() {{");
            let _ = writeln!(out, "{indent}    Some(inner) => {{");
            let _ = writeln!(out, "{indent}        buf[*cursor] = 1;");
            let _ = writeln!(out, "{indent}        *cursor += 1;");
            let _ = writeln!(
                out,
                "{indent}        encode_to_buffer_{}(inner, buf, cursor);",
                snake_case(name)
            );
            let _ = writeln!(out, "{indent}    }}");
            let _ = writeln!(out, "{indent}    None => {{");
            let _ = writeln!(out, "{indent}        buf[*cursor] = 0;");
            let _ = writeln!(out, "{indent}        *cursor += 1;");
            let _ = writeln!(out, "{indent}    }}");
            let _ = writeln!(out, "{indent}}}");
        }
    }
}

fn gen_decode(schema: &Schema) -> String {
    let mut out = String::from(HEADER);
    out.push_str("//! decode / decode-from-stream / decode-message / dispatch-message (spec §4.5).\n\n");
    out.push_str("use super::errors::DecodeError;\nuse super::support::bulk_copy_from;\nuse super::types::*;\n\n");
    out.push_str("/// Maximum total input length accepted by `decode` (spec §4.4).\n");
    let _ = writeln!(out, "pub const MAX_FRAME_BYTES: u64 = {};", wire::MAX_FRAME_BYTES);
    out.push_str("/// Maximum element count of any single array (spec §4.4).\n");
    let _ = writeln!(out, "pub const MAX_ARRAY_ELEMENTS: u64 = {};", wire::MAX_ARRAY_ELEMENTS);
    out.push_str("/// Maximum cumulative array element count across one decode (spec §4.4).\n");
    let _ = writeln!(
        out,
        "pub const MAX_CUMULATIVE_ELEMENTS: u64 = {};",
        wire::MAX_CUMULATIVE_ELEMENTS
    );
    out.push('\n');

    out.push_str(
        r#"/// Per-decode state tracking the cumulative array-element budget
/// against [`MAX_CUMULATIVE_ELEMENTS`] (spec §3 "Decode context"). Stack
/// local; never shared across concurrent decodes.
#[derive(Debug, Default)]
pub struct DecodeContext {
    cumulative_elements: u64,
}

impl DecodeContext {
    pub fn new() -> Self {
        Self::default()
    }
}

"#,
    );

    for record in &schema.records {
        let name = pascal_case(&record.name);
        let fn_suffix = snake_case(&record.name);

        let _ = writeln!(
            out,
            "/// Decodes a byte-mode `{name}` frame (spec §4.5 \"decode (public)\")."
        );
        let _ = writeln!(out, "pub fn decode_{fn_suffix}(buf: &[u8]) -> Result<{name}, DecodeError> {{");
        out.push_str("    if buf.len() as u64 > MAX_FRAME_BYTES {\n        return Err(DecodeError::DataTooLarge);\n    }\n");
        out.push_str("    let mut ctx = DecodeContext::new();\n");
        out.push_str("    let mut cursor = 0usize;\n");
        let _ = writeln!(out, "    decode_{fn_suffix}_at(buf, &mut cursor, &mut ctx)");
        out.push_str("}\n\n");

        let _ = writeln!(
            out,
            "pub(crate) fn decode_{fn_suffix}_at(buf: &[u8], cursor: &mut usize, ctx: &mut DecodeContext) -> Result<{name}, DecodeError> {{"
        );
        for field in &record.fields {
            let fname = snake_case(&field.name);
            decode_stmt(&field.ty, &fname, "    ", &mut out);
        }
        let _ = writeln!(out, "    Ok({name} {{");
        for field in &record.fields {
            let fname = snake_case(&field.name);
            let _ = writeln!(out, "        {fname},");
        }
        out.push_str("    })\n}\n\n");

        let _ = writeln!(
            out,
            "/// Reads the input fully into memory, then decodes it (spec §4.5 \"decode-from-stream\")."
        );
        let _ = writeln!(
            out,
            "pub fn decode_from_stream_{fn_suffix}<R: std::io::Read>(r: &mut R) -> Result<{name}, DecodeError> {{"
        );
        out.push_str("    let mut buf = Vec::new();\n");
        out.push_str("    r.read_to_end(&mut buf).map_err(|_| DecodeError::UnexpectedEof)?;\n");
        let _ = writeln!(out, "    decode_{fn_suffix}(&buf)");
        out.push_str("}\n\n");

        if let RecordKind::Message = record.kind {
            let _ = writeln!(
                out,
                "/// Parses the 12-byte envelope, checks the type id and payload size, then decodes the payload (spec §4.5 \"decode-message\")."
            );
            let _ = writeln!(
                out,
                "pub fn decode_message_{fn_suffix}(buf: &[u8]) -> Result<{name}, DecodeError> {{"
            );
            out.push_str("    if buf.len() as u64 > MAX_FRAME_BYTES {\n        return Err(DecodeError::DataTooLarge);\n    }\n");
            out.push_str("    if buf.len() < 12 {\n        return Err(DecodeError::UnexpectedEof);\n    }\n");
            out.push_str("    let type_id = u64::from_le_bytes(buf[0..8].try_into().unwrap());\n");
            let _ = writeln!(out, "    if type_id != {name}::TYPE_ID {{");
            out.push_str("        return Err(DecodeError::UnknownMessageType(type_id));\n    }\n");
            out.push_str("    let payload_size = u32::from_le_bytes(buf[8..12].try_into().unwrap()) as usize;\n");
            out.push_str("    if 12 + payload_size != buf.len() {\n        return Err(DecodeError::MessageSizeMismatch);\n    }\n");
            out.push_str("    let mut ctx = DecodeContext::new();\n");
            out.push_str("    let mut cursor = 12usize;\n");
            let _ = writeln!(out, "    decode_{fn_suffix}_at(buf, &mut cursor, &mut ctx)");
            out.push_str("}\n\n");
        }
    }

    let msgs = messages(schema);
    if !msgs.is_empty() {
        out.push_str("/// Parses the envelope and looks the type id up in the schema's message\n");
        out.push_str("/// records, returning a freshly decoded, tagged variant (spec §4.5 \"dispatch-message\").\n");
        out.push_str("pub fn dispatch_message(buf: &[u8]) -> Result<MessageVariant, DecodeError> {\n");
        out.push_str("    if buf.len() < 12 {\n        return Err(DecodeError::UnexpectedEof);\n    }\n");
        out.push_str("    let type_id = u64::from_le_bytes(buf[0..8].try_into().unwrap());\n");
        out.push_str("    match type_id {\n");
        for m in &msgs {
            let name = pascal_case(&m.name);
            let fn_suffix = snake_case(&m.name);
            let _ = writeln!(
                out,
                "        id if id == {name}::TYPE_ID => Ok(MessageVariant::{name}(decode_message_{fn_suffix}(buf)?)),"
            );
        }
        out.push_str("        other => Err(DecodeError::UnknownMessageType(other)),\n");
        out.push_str("    }\n}\n");
    }

    out
}

fn decode_stmt(ty: &TypeExpr, var: &str, indent: &str, out: &mut String) {
    match ty {
        TypeExpr::Primitive(p) => match p {
            PrimitiveKind::Bool => {
                let _ = writeln!(out, "{indent}if *cursor + 1 > buf.len() {{ return Err(DecodeError::UnexpectedEof); }}");
                let _ = writeln!(out, "{indent}let {var} = buf[*cursor] != 0;");
                let _ = writeln!(out, "{indent}*cursor += 1;");
            }
            PrimitiveKind::F32 | PrimitiveKind::F64 => {
                let w = wire::fixed_width(*p).unwrap();
                let uty = if w == 4 { "u32" } else { "u64" };
                let fty = rust_primitive(*p);
                let _ = writeln!(
                    out,
                    "{indent}if *cursor + {w} > buf.len() {{ return Err(DecodeError::UnexpectedEof); }}"
                );
                let _ = writeln!(
                    out,
                    "{indent}let {var} = {fty}::from_bits({uty}::from_le_bytes(buf[*cursor..*cursor + {w}].try_into().unwrap()));"
                );
                let _ = writeln!(out, "{indent}*cursor += {w};");
            }
            PrimitiveKind::String => {
                let _ = writeln!(out, "{indent}if *cursor + 4 > buf.len() {{ return Err(DecodeError::UnexpectedEof); }}");
                let _ = writeln!(
                    out,
                    "{indent}let len = u32::from_le_bytes(buf[*cursor..*cursor + 4].try_into().unwrap()) as usize;"
                );
                let _ = writeln!(out, "{indent}*cursor += 4;");
                let _ = writeln!(out, "{indent}if *cursor + len > buf.len() {{ return Err(DecodeError::UnexpectedEof); }}");
                let _ = writeln!(
                    out,
                    "{indent}// UTF-8 validation is lossy, not rejecting: spec leaves text validation to the target's native constructor."
                );
                let _ = writeln!(
                    out,
                    "{indent}let {var} = String::from_utf8_lossy(&buf[*cursor..*cursor + len]).into_owned();"
                );
                let _ = writeln!(out, "{indent}*cursor += len;");
            }
            _ => {
                let w = wire::fixed_width(*p).unwrap();
                let fty = rust_primitive(*p);
                let _ = writeln!(
                    out,
                    "{indent}if *cursor + {w} > buf.len() {{ return Err(DecodeError::UnexpectedEof); }}"
                );
                let _ = writeln!(
                    out,
                    "{indent}let {var} = {fty}::from_le_bytes(buf[*cursor..*cursor + {w}].try_into().unwrap());"
                );
                let _ = writeln!(out, "{indent}*cursor += {w};");
            }
        },
        TypeExpr::Named(name) => {
            let _ = writeln!(
                out,
                "{indent}let {var} = decode_{}_at(buf, cursor, ctx)?;",
                snake_case(name)
            );
        }
        TypeExpr::Array(inner) => {
            let count_var = format!("{var}_count");
            let _ = writeln!(out, "{indent}if *cursor + 4 > buf.len() {{ return Err(DecodeError::UnexpectedEof); }}");
            let _ = writeln!(
                out,
                "{indent}let {count_var} = u32::from_le_bytes(buf[*cursor..*cursor + 4].try_into().unwrap()) as usize;"
            );
            let _ = writeln!(out, "{indent}*cursor += 4;");
            let _ = writeln!(
                out,
                "{indent}if {count_var} as u64 > MAX_ARRAY_ELEMENTS {{ return Err(DecodeError::ArrayTooLarge); }}"
            );
            let _ = writeln!(out, "{indent}ctx.cumulative_elements += {count_var} as u64;");
            let _ = writeln!(
                out,
                "{indent}if ctx.cumulative_elements > MAX_CUMULATIVE_ELEMENTS {{ return Err(DecodeError::TooManyElements); }}"
            );
            match inner.as_ref() {
                TypeExpr::Primitive(p) if p.is_trivial_layout() => {
                    let w = wire::fixed_width(*p).unwrap();
                    let fty = rust_primitive(*p);
                    let _ = writeln!(out, "{indent}let {var}_byte_len = {count_var} * {w};");
                    let _ = writeln!(
                        out,
                        "{indent}if *cursor + {var}_byte_len > buf.len() {{ return Err(DecodeError::UnexpectedEof); }}"
                    );
                    let _ = writeln!(
                        out,
                        "{indent}let {var} = bulk_copy_from::<{fty}>(&buf[*cursor..*cursor + {var}_byte_len], {count_var});"
                    );
                    let _ = writeln!(out, "{indent}*cursor += {var}_byte_len;");
                }
                _ => {
                    let _ = writeln!(out, "{indent}let mut {var} = Vec::with_capacity({count_var});");
                    let _ = writeln!(out, "{indent}for _ in 0..{count_var} {{");
                    let elem_var = format!("{var}_item");
                    decode_stmt(inner, &elem_var, &format!("{indent}    "), out);
                    let _ = writeln!(out, "{indent}    {var}.push({elem_var});");
                    let _ = writeln!(out, "{indent}}}");
                }
            }
        }
        TypeExpr::Optional(name) => {
            let _ = writeln!(out, "{indent}if *cursor + 1 > buf.len() {{ return Err(DecodeError::UnexpectedEof); }}");
            let _ = writeln!(out, "{indent}let {var}_presence = buf[*cursor];");
            let _ = writeln!(out, "{indent}*cursor += 1;");
            let _ = writeln!(out, "{indent}let {var} = if {var}_presence != 0 {{");
            let _ = writeln!(
                out,
                "{indent}    Some(Box::new(decode_{}_at(buf, cursor, ctx)?))",
                snake_case(name)
            );
            let _ = writeln!(out, "{indent}}} else {{");
            let _ = writeln!(out, "{indent}    None");
            let _ = writeln!(out, "{indent}}};");
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
    fn emits_struct_and_routines_for_primitive_record() {
        let schema = schema("struct P { a: u32, b: bool, c: string }");
        let files = generate(&schema);
        assert!(files["types.rs"].contains("pub struct P {"));
        assert!(files["encode.rs"].contains("pub fn size_of_p(v: &P) -> usize"));
        assert!(files["encode.rs"].contains("pub fn encode_p(v: &P) -> Vec<u8>"));
        assert!(files["decode.rs"].contains("pub fn decode_p(buf: &[u8]) -> Result<P, DecodeError>"));
    }

    #[test]
    fn message_gets_type_id_and_envelope_routines() {
        let schema = schema("message Err { code: u32, text: string }");
        let files = generate(&schema);
        assert!(files["types.rs"].contains("pub const TYPE_ID: u64"));
        assert!(files["encode.rs"].contains("pub fn encode_message_err"));
        assert!(files["decode.rs"].contains("pub fn decode_message_err"));
        assert!(files["decode.rs"].contains("pub fn dispatch_message"));
    }

    #[test]
    fn generation_is_deterministic() {
        let schema = schema("struct A { x: u32 }\nmessage B { y: []u64, z: ?A }");
        let first = generate(&schema);
        let second = generate(&schema);
        assert_eq!(first, second);
    }

    #[test]
    fn optional_and_array_and_nested_record_fields_compile_to_expected_shapes() {
        let schema = schema("struct Node { v: u32, next: ?Node, xs: []u32 }");
        let files = generate(&schema);
        assert!(files["types.rs"].contains("pub next: Option<Box<Node>>,"));
        assert!(files["types.rs"].contains("pub xs: Vec<u32>,"));
        assert!(files["encode.rs"].contains("bulk_copy_into(buf, cursor, (&v.xs).as_slice())"));
        assert!(files["decode.rs"].contains("bulk_copy_from::<u32>"));
    }
}
