//! The Go target backend: the reference implementation (spec §2, §6
//! "go: emits types.go, encode.go, decode.go, errors.go under a package
//! name derived from the output directory's leaf name"). This is the
//! one target for which the bulk-copy array optimization is mandatory,
//! not merely recommended (spec §4.5).

use crate::naming::pascal_case;
use sdp_core::{wire, PrimitiveKind, Record, RecordKind, Schema, TypeExpr};
use std::collections::BTreeMap;
use std::fmt::Write as _;

const HEADER_FMT: &str = "// Code generated by sdp-codegen. DO NOT EDIT.\n\npackage {pkg}\n\n";

pub fn generate(schema: &Schema, package: &str) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    files.insert("types.go".to_string(), gen_types(schema, package));
    files.insert("errors.go".to_string(), gen_errors(package));
    files.insert("encode.go".to_string(), gen_encode(schema, package));
    files.insert("decode.go".to_string(), gen_decode(schema, package));
    files
}

fn header(package: &str) -> String {
    HEADER_FMT.replace("{pkg}", package)
}

fn messages(schema: &Schema) -> Vec<&Record> {
    schema
        .records
        .iter()
        .filter(|r| matches!(r.kind, RecordKind::Message))
        .collect()
}

fn go_primitive(p: PrimitiveKind) -> &'static str {
    match p {
        PrimitiveKind::U8 => "uint8",
        PrimitiveKind::U16 => "uint16",
        PrimitiveKind::U32 => "uint32",
        PrimitiveKind::U64 => "uint64",
        PrimitiveKind::I8 => "int8",
        PrimitiveKind::I16 => "int16",
        PrimitiveKind::I32 => "int32",
        PrimitiveKind::I64 => "int64",
        PrimitiveKind::F32 => "float32",
        PrimitiveKind::F64 => "float64",
        PrimitiveKind::Bool => "bool",
        PrimitiveKind::String => "string",
    }
}

fn go_field_type(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Primitive(p) => go_primitive(*p).to_string(),
        TypeExpr::Named(name) => pascal_case(name),
        TypeExpr::Array(inner) => format!("[]{}", go_field_type(inner)),
        TypeExpr::Optional(name) => format!("*{}", pascal_case(name)),
    }
}

fn doc_lines(doc: &Option<String>, prefix: &str, out: &mut String) {
    if let Some(d) = doc {
        for line in d.lines() {
            let _ = writeln!(out, "{prefix}// {line}");
        }
    }
}

fn gen_types(schema: &Schema, package: &str) -> String {
    let mut out = header(package);
    for record in &schema.records {
        let name = pascal_case(&record.name);
        doc_lines(&record.doc, "", &mut out);
        let _ = writeln!(out, "type {name} struct {{");
        for field in &record.fields {
            doc_lines(&field.doc, "\t", &mut out);
            let fname = pascal_case(&field.name);
            let fty = go_field_type(&field.ty);
            let _ = writeln!(out, "\t{fname} {fty}");
        }
        out.push_str("}\n\n");

        if let RecordKind::Message = record.kind {
            let type_id = wire::type_id(&record.name);
            let _ = writeln!(
                out,
                "// TypeID{name} is the 64-bit FNV-1a hash of the schema name \"{}\" (spec §6).",
                record.name
            );
            let _ = writeln!(out, "const TypeID{name} uint64 = 0x{type_id:016x}\n");
        }
    }

    let msgs = messages(schema);
    if !msgs.is_empty() {
        out.push_str("// MessageVariant is the closed sum over every message record in the\n");
        out.push_str("// schema, returned by DispatchMessage.\n");
        out.push_str("type MessageVariant struct {\n");
        for m in &msgs {
            let name = pascal_case(&m.name);
            let _ = writeln!(out, "\t{name} *{name}");
        }
        out.push_str("}\n");
    }

    out
}

fn gen_errors(package: &str) -> String {
    let mut out = header(package);
    out.push_str(
        r#"// No ErrInvalidPresenceFlag: every decoder below treats any non-zero
// presence byte as present rather than rejecting values other than 1
// (spec §9 Open Question (a)).
import "errors"

var (
	ErrUnexpectedEOF       = errors.New("sdp: unexpected end of input")
	ErrArrayTooLarge       = errors.New("sdp: array element count exceeds the 1,000,000-element limit")
	ErrTooManyElements     = errors.New("sdp: cumulative array element count exceeds the 10,000,000-element limit")
	ErrDataTooLarge        = errors.New("sdp: input exceeds the 128 MiB frame limit")
	ErrUnknownMessageType  = errors.New("sdp: unknown message type id")
	ErrMessageSizeMismatch = errors.New("sdp: message envelope payload_size does not match the remaining input")
)
"#,
    );
    out
}

/// Whether any field (recursively, through arrays) uses an `f32`/`f64`
/// primitive, which pulls in Go's `math` package for bit reinterpretation.
fn schema_has_float(schema: &Schema) -> bool {
    fn ty_has_float(ty: &TypeExpr) -> bool {
        match ty {
            TypeExpr::Primitive(PrimitiveKind::F32 | PrimitiveKind::F64) => true,
            TypeExpr::Array(inner) => ty_has_float(inner),
            _ => false,
        }
    }
    schema
        .records
        .iter()
        .flat_map(|r| &r.fields)
        .any(|f| ty_has_float(&f.ty))
}

/// Whether any field is an array of a trivial-layout primitive, which is
/// the only case `decode.go`'s bulk-copy path (and its `unsafe.Slice` call)
/// ever fires for. `encode.go` doesn't need this: its package-level
/// `nativeLittleEndian` var always uses `unsafe.Pointer`, regardless of
/// schema content.
fn schema_has_primitive_array(schema: &Schema) -> bool {
    fn ty_is_primitive_array(ty: &TypeExpr) -> bool {
        matches!(
            ty,
            TypeExpr::Array(inner) if matches!(inner.as_ref(), TypeExpr::Primitive(p) if p.is_trivial_layout())
        )
    }
    schema
        .records
        .iter()
        .flat_map(|r| &r.fields)
        .any(|f| ty_is_primitive_array(&f.ty))
}

fn gen_encode(schema: &Schema, package: &str) -> String {
    let mut out = header(package);
    let mut imports = vec!["\"encoding/binary\"", "\"io\"", "\"unsafe\""];
    if schema_has_float(schema) {
        imports.push("\"math\"");
    }
    imports.sort_unstable();
    let _ = writeln!(out, "import (");
    for imp in &imports {
        let _ = writeln!(out, "\t{imp}");
    }
    out.push_str(")\n\n");
    out.push_str(
        r#"// nativeLittleEndian is evaluated once; the bulk-copy path below is
// taken only when the host's native byte order matches the wire format
// (spec §4.5 "mandatory" for this target, §9 "Bulk-copy optimization").
var nativeLittleEndian = func() bool {
	var x uint16 = 1
	return *(*byte)(unsafe.Pointer(&x)) == 1
}()

"#,
    );

    for record in &schema.records {
        let name = pascal_case(&record.name);

        let _ = writeln!(out, "// SizeOf{name} returns the exact encoded byte length of v.");
        let _ = writeln!(out, "func SizeOf{name}(v *{name}) int {{");
        out.push_str("\tn := 0\n");
        for field in &record.fields {
            let fname = pascal_case(&field.name);
            let term = go_size_expr(&field.ty, &format!("v.{fname}"));
            let _ = writeln!(out, "\tn += {term}");
        }
        out.push_str("\treturn n\n}\n\n");

        let _ = writeln!(
            out,
            "// EncodeToBuffer{name} writes v into buf at *cursor in wire format, advancing it."
        );
        let _ = writeln!(out, "func EncodeToBuffer{name}(v *{name}, buf []byte, cursor *int) {{");
        for field in &record.fields {
            let fname = pascal_case(&field.name);
            go_encode_stmt(&field.ty, &format!("v.{fname}"), "\t", &mut out);
        }
        out.push_str("}\n\n");

        let _ = writeln!(
            out,
            "// Encode{name} allocates a single buffer of exactly SizeOf{name}(v) bytes and encodes into it."
        );
        let _ = writeln!(out, "func Encode{name}(v *{name}) []byte {{");
        let _ = writeln!(out, "\tbuf := make([]byte, SizeOf{name}(v))");
        out.push_str("\tcursor := 0\n");
        let _ = writeln!(out, "\tEncodeToBuffer{name}(v, buf, &cursor)");
        out.push_str("\treturn buf\n}\n\n");

        let _ = writeln!(out, "// EncodeToStream{name} writes v's encoded bytes to w.");
        let _ = writeln!(out, "func EncodeToStream{name}(v *{name}, w io.Writer) error {{");
        let _ = writeln!(out, "\t_, err := w.Write(Encode{name}(v))");
        out.push_str("\treturn err\n}\n\n");

        if let RecordKind::Message = record.kind {
            let _ = writeln!(out, "// EncodeMessage{name} wraps v in the 12-byte message envelope.");
            let _ = writeln!(out, "func EncodeMessage{name}(v *{name}) []byte {{");
            let _ = writeln!(out, "\tpayload := Encode{name}(v)");
            out.push_str("\tbuf := make([]byte, 12+len(payload))\n");
            let _ = writeln!(out, "\tbinary.LittleEndian.PutUint64(buf[0:8], TypeID{name})");
            out.push_str("\tbinary.LittleEndian.PutUint32(buf[8:12], uint32(len(payload)))\n");
            out.push_str("\tcopy(buf[12:], payload)\n");
            out.push_str("\treturn buf\n}\n\n");
        }
    }

    out
}

fn go_size_expr(ty: &TypeExpr, expr: &str) -> String {
    match ty {
        TypeExpr::Primitive(p) => match wire::fixed_width(*p) {
            Some(w) => format!("{w}"),
            None => format!("4 + len({expr})"),
        },
        TypeExpr::Named(name) => format!("SizeOf{}(&{expr})", pascal_case(name)),
        TypeExpr::Array(inner) => match inner.as_ref() {
            TypeExpr::Primitive(p) if p.is_trivial_layout() => {
                let w = wire::fixed_width(*p).unwrap();
                format!("4 + len({expr})*{w}")
            }
            TypeExpr::Named(name) => {
                format!(
                    "func() int {{ s := 4; for i := range {expr} {{ s += SizeOf{}(&{expr}[i]) }}; return s }}()",
                    pascal_case(name)
                )
            }
            _ => format!(
                "func() int {{ s := 4; for _, e := range {expr} {{ s += 4 + len(e) }}; return s }}()"
            ),
        },
        TypeExpr::Optional(name) => format!(
            "func() int {{ if {expr} == nil {{ return 1 }}; return 1 + SizeOf{}({expr}) }}()",
            pascal_case(name)
        ),
    }
}

fn go_encode_stmt(ty: &TypeExpr, expr: &str, indent: &str, out: &mut String) {
    match ty {
        TypeExpr::Primitive(p) => match p {
            PrimitiveKind::Bool => {
                let _ = writeln!(out, "{indent}if {expr} {{ buf[*cursor] = 1 }} else {{ buf[*cursor] = 0 }}");
                let _ = writeln!(out, "{indent}*cursor++");
            }
            PrimitiveKind::String => {
                let _ = writeln!(
                    out,
                    "{indent}binary.LittleEndian.PutUint32(buf[*cursor:*cursor+4], uint32(len({expr})))"
                );
                let _ = writeln!(out, "{indent}*cursor += 4");
                let _ = writeln!(out, "{indent}copy(buf[*cursor:*cursor+len({expr})], {expr})");
                let _ = writeln!(out, "{indent}*cursor += len({expr})");
            }
            PrimitiveKind::F32 => {
                let _ = writeln!(
                    out,
                    "{indent}binary.LittleEndian.PutUint32(buf[*cursor:*cursor+4], math.Float32bits({expr}))"
                );
                let _ = writeln!(out, "{indent}*cursor += 4");
            }
            PrimitiveKind::F64 => {
                let _ = writeln!(
                    out,
                    "{indent}binary.LittleEndian.PutUint64(buf[*cursor:*cursor+8], math.Float64bits({expr}))"
                );
                let _ = writeln!(out, "{indent}*cursor += 8");
            }
            _ => {
                let w = wire::fixed_width(*p).unwrap();
                let cast = go_uint_cast(*p);
                let _ = writeln!(
                    out,
                    "{indent}binary.LittleEndian.PutUint{bits}(buf[*cursor:*cursor+{w}], {cast}({expr}))",
                    bits = w * 8
                );
                let _ = writeln!(out, "{indent}*cursor += {w}");
            }
        },
        TypeExpr::Named(name) => {
            let _ = writeln!(out, "{indent}EncodeToBuffer{}(&{expr}, buf, cursor)", pascal_case(name));
        }
        TypeExpr::Array(inner) => {
            let _ = writeln!(
                out,
                "{indent}binary.LittleEndian.PutUint32(buf[*cursor:*cursor+4], uint32(len({expr})))"
            );
            let _ = writeln!(out, "{indent}*cursor += 4");
            match inner.as_ref() {
                TypeExpr::Primitive(p) if p.is_trivial_layout() => {
                    let w = wire::fixed_width(*p).unwrap();
                    let _ = writeln!(out, "{indent}if nativeLittleEndian {{");
                    let _ = writeln!(out, "{indent}\tn := len({expr}) * {w}");
                    let _ = writeln!(
                        out,
                        "{indent}\tsrc := unsafe.Slice((*byte)(unsafe.Pointer(&{expr}[0])), n)"
                    );
                    let _ = writeln!(out, "{indent}\tif n > 0 {{ copy(buf[*cursor:*cursor+n], src) }}");
                    let _ = writeln!(out, "{indent}\t*cursor += n");
                    let _ = writeln!(out, "{indent}}} else {{");
                    let _ = writeln!(out, "{indent}\tfor _, e := range {expr} {{");
                    go_encode_stmt(&TypeExpr::Primitive(*p), "e", &format!("{indent}\t\t"), out);
                    let _ = writeln!(out, "{indent}\t}}");
                    let _ = writeln!(out, "{indent}}}");
                }
                _ => {
                    let _ = writeln!(out, "{indent}for _, item := range {expr} {{");
                    go_encode_stmt(inner, "item", &format!("{indent}\t"), out);
                    let _ = writeln!(out, "{indent}}}");
                }
            }
        }
        TypeExpr::Optional(name) => {
            let _ = writeln!(out, "{indent}if {expr} != nil {{");
            let _ = writeln!(out, "{indent}\tbuf[*cursor] = 1");
            let _ = writeln!(out, "{indent}\t*cursor++");
            let _ = writeln!(out, "{indent}\tEncodeToBuffer{}({expr}, buf, cursor)", pascal_case(name));
            let _ = writeln!(out, "{indent}}} else {{");
            let _ = writeln!(out, "{indent}\tbuf[*cursor] = 0");
            let _ = writeln!(out, "{indent}\t*cursor++");
            let _ = writeln!(out, "{indent}}}");
        }
    }
}

fn go_uint_cast(p: PrimitiveKind) -> &'static str {
    match p {
        PrimitiveKind::U16 | PrimitiveKind::I16 => "uint16",
        PrimitiveKind::U32 | PrimitiveKind::I32 => "uint32",
        PrimitiveKind::U64 | PrimitiveKind::I64 => "uint64",
        _ => "uint8",
    }
}

fn gen_decode(schema: &Schema, package: &str) -> String {
    let mut out = header(package);
    let mut imports = vec!["\"encoding/binary\"", "\"io\""];
    if schema_has_float(schema) {
        imports.push("\"math\"");
    }
    if schema_has_primitive_array(schema) {
        imports.push("\"unsafe\"");
    }
    imports.sort_unstable();
    let _ = writeln!(out, "import (");
    for imp in &imports {
        let _ = writeln!(out, "\t{imp}");
    }
    out.push_str(")\n\n");
    out.push_str(&format!(
        "const MaxFrameBytes = {}\nconst MaxArrayElements = {}\nconst MaxCumulativeElements = {}\n\n",
        wire::MAX_FRAME_BYTES,
        wire::MAX_ARRAY_ELEMENTS,
        wire::MAX_CUMULATIVE_ELEMENTS
    ));
    out.push_str(
        r#"// DecodeContext tracks the cumulative array-element budget against
// MaxCumulativeElements for one decode (spec §3 "Decode context").
type DecodeContext struct {
	CumulativeElements uint64
}

"#,
    );

    for record in &schema.records {
        let name = pascal_case(&record.name);

        let _ = writeln!(out, "// Decode{name} decodes a byte-mode {name} frame.");
        let _ = writeln!(out, "func Decode{name}(buf []byte) (*{name}, error) {{");
        out.push_str("\tif uint64(len(buf)) > MaxFrameBytes {\n\t\treturn nil, ErrDataTooLarge\n\t}\n");
        out.push_str("\tctx := &DecodeContext{}\n\tcursor := 0\n");
        let _ = writeln!(out, "\treturn decode{name}At(buf, &cursor, ctx)");
        out.push_str("}\n\n");

        let _ = writeln!(
            out,
            "func decode{name}At(buf []byte, cursor *int, ctx *DecodeContext) (*{name}, error) {{"
        );
        out.push_str("\tv := &{name}{{}}\n".replace("{name}", &name));
        for field in &record.fields {
            let fname = pascal_case(&field.name);
            go_decode_stmt(&field.ty, &format!("v.{fname}"), "\t", &mut out);
        }
        out.push_str("\treturn v, nil\n}\n\n");

        let _ = writeln!(out, "// DecodeFromStream{name} reads the input fully, then decodes it.");
        let _ = writeln!(out, "func DecodeFromStream{name}(r io.Reader) (*{name}, error) {{");
        out.push_str("\tbuf, err := io.ReadAll(r)\n\tif err != nil {\n\t\treturn nil, ErrUnexpectedEOF\n\t}\n");
        let _ = writeln!(out, "\treturn Decode{name}(buf)");
        out.push_str("}\n\n");

        if let RecordKind::Message = record.kind {
            let _ = writeln!(
                out,
                "// DecodeMessage{name} parses the envelope, checks the type id and payload size, then decodes the payload."
            );
            let _ = writeln!(out, "func DecodeMessage{name}(buf []byte) (*{name}, error) {{");
            out.push_str("\tif uint64(len(buf)) > MaxFrameBytes {\n\t\treturn nil, ErrDataTooLarge\n\t}\n");
            out.push_str("\tif len(buf) < 12 {\n\t\treturn nil, ErrUnexpectedEOF\n\t}\n");
            out.push_str("\ttypeID := binary.LittleEndian.Uint64(buf[0:8])\n");
            let _ = writeln!(out, "\tif typeID != TypeID{name} {{\n\t\treturn nil, ErrUnknownMessageType\n\t}}");
            out.push_str("\tpayloadSize := int(binary.LittleEndian.Uint32(buf[8:12]))\n");
            out.push_str("\tif 12+payloadSize != len(buf) {\n\t\treturn nil, ErrMessageSizeMismatch\n\t}\n");
            out.push_str("\tctx := &DecodeContext{}\n\tcursor := 12\n");
            let _ = writeln!(out, "\treturn decode{name}At(buf, &cursor, ctx)");
            out.push_str("}\n\n");
        }
    }

    let msgs = messages(schema);
    if !msgs.is_empty() {
        out.push_str("// DispatchMessage parses the envelope and looks the type id up in the\n");
        out.push_str("// schema's message records, returning a freshly decoded, tagged variant.\n");
        out.push_str("func DispatchMessage(buf []byte) (*MessageVariant, error) {\n");
        out.push_str("\tif len(buf) < 12 {\n\t\treturn nil, ErrUnexpectedEOF\n\t}\n");
        out.push_str("\ttypeID := binary.LittleEndian.Uint64(buf[0:8])\n");
        out.push_str("\tswitch typeID {\n");
        for m in &msgs {
            let name = pascal_case(&m.name);
            let _ = writeln!(out, "\tcase TypeID{name}:");
            let _ = writeln!(out, "\t\tv, err := DecodeMessage{name}(buf)");
            out.push_str("\t\tif err != nil {\n\t\t\treturn nil, err\n\t\t}\n");
            let _ = writeln!(out, "\t\treturn &MessageVariant{{{name}: v}}, nil");
        }
        out.push_str("\tdefault:\n\t\treturn nil, ErrUnknownMessageType\n\t}\n}\n");
    }

    out
}

fn go_decode_stmt(ty: &TypeExpr, var: &str, indent: &str, out: &mut String) {
    match ty {
        TypeExpr::Primitive(p) => match p {
            PrimitiveKind::Bool => {
                let _ = writeln!(out, "{indent}if *cursor+1 > len(buf) {{ return nil, ErrUnexpectedEOF }}");
                let _ = writeln!(out, "{indent}{var} = buf[*cursor] != 0");
                let _ = writeln!(out, "{indent}*cursor++");
            }
            PrimitiveKind::F32 => {
                let _ = writeln!(out, "{indent}if *cursor+4 > len(buf) {{ return nil, ErrUnexpectedEOF }}");
                let _ = writeln!(
                    out,
                    "{indent}{var} = math.Float32frombits(binary.LittleEndian.Uint32(buf[*cursor:*cursor+4]))"
                );
                let _ = writeln!(out, "{indent}*cursor += 4");
            }
            PrimitiveKind::F64 => {
                let _ = writeln!(out, "{indent}if *cursor+8 > len(buf) {{ return nil, ErrUnexpectedEOF }}");
                let _ = writeln!(
                    out,
                    "{indent}{var} = math.Float64frombits(binary.LittleEndian.Uint64(buf[*cursor:*cursor+8]))"
                );
                let _ = writeln!(out, "{indent}*cursor += 8");
            }
            PrimitiveKind::String => {
                let _ = writeln!(out, "{indent}if *cursor+4 > len(buf) {{ return nil, ErrUnexpectedEOF }}");
                let _ = writeln!(out, "{indent}strLen := int(binary.LittleEndian.Uint32(buf[*cursor:*cursor+4]))");
                let _ = writeln!(out, "{indent}*cursor += 4");
                let _ = writeln!(out, "{indent}if *cursor+strLen > len(buf) {{ return nil, ErrUnexpectedEOF }}");
                let _ = writeln!(out, "{indent}{var} = string(buf[*cursor : *cursor+strLen])");
                let _ = writeln!(out, "{indent}*cursor += strLen");
            }
            _ => {
                let w = wire::fixed_width(*p).unwrap();
                let gty = go_primitive(*p);
                let _ = writeln!(out, "{indent}if *cursor+{w} > len(buf) {{ return nil, ErrUnexpectedEOF }}");
                let bits = w * 8;
                let _ = writeln!(
                    out,
                    "{indent}{var} = {gty}(binary.LittleEndian.Uint{bits}(buf[*cursor:*cursor+{w}]))"
                );
                let _ = writeln!(out, "{indent}*cursor += {w}");
            }
        },
        TypeExpr::Named(name) => {
            let _ = writeln!(out, "{indent}{{");
            let _ = writeln!(out, "{indent}\tval, err := decode{}At(buf, cursor, ctx)", pascal_case(name));
            let _ = writeln!(out, "{indent}\tif err != nil {{ return nil, err }}");
            let _ = writeln!(out, "{indent}\t{var} = *val");
            let _ = writeln!(out, "{indent}}}");
        }
        TypeExpr::Array(inner) => {
            let count_var = format!("{}Count", var.replace('.', "_"));
            let _ = writeln!(out, "{indent}if *cursor+4 > len(buf) {{ return nil, ErrUnexpectedEOF }}");
            let _ = writeln!(
                out,
                "{indent}{count_var} := int(binary.LittleEndian.Uint32(buf[*cursor:*cursor+4]))"
            );
            let _ = writeln!(out, "{indent}*cursor += 4");
            let _ = writeln!(
                out,
                "{indent}if uint64({count_var}) > MaxArrayElements {{ return nil, ErrArrayTooLarge }}"
            );
            let _ = writeln!(out, "{indent}ctx.CumulativeElements += uint64({count_var})");
            let _ = writeln!(
                out,
                "{indent}if ctx.CumulativeElements > MaxCumulativeElements {{ return nil, ErrTooManyElements }}"
            );
            match inner.as_ref() {
                TypeExpr::Primitive(p) if p.is_trivial_layout() => {
                    let w = wire::fixed_width(*p).unwrap();
                    let gty = go_primitive(*p);
                    let byte_len_var = format!("{}ByteLen", var.replace('.', "_"));
                    let _ = writeln!(out, "{indent}{byte_len_var} := {count_var} * {w}");
                    let _ = writeln!(
                        out,
                        "{indent}if *cursor+{byte_len_var} > len(buf) {{ return nil, ErrUnexpectedEOF }}"
                    );
                    let _ = writeln!(out, "{indent}{var} = make([]{gty}, {count_var})");
                    let _ = writeln!(out, "{indent}if nativeLittleEndian {{");
                    let _ = writeln!(out, "{indent}\tif {count_var} > 0 {{");
                    let _ = writeln!(
                        out,
                        "{indent}\t\tdst := unsafe.Slice((*byte)(unsafe.Pointer(&{var}[0])), {byte_len_var})"
                    );
                    let _ = writeln!(out, "{indent}\t\tcopy(dst, buf[*cursor:*cursor+{byte_len_var}])");
                    let _ = writeln!(out, "{indent}\t}}");
                    let _ = writeln!(out, "{indent}\t*cursor += {byte_len_var}");
                    let _ = writeln!(out, "{indent}}} else {{");
                    let _ = writeln!(out, "{indent}\tfor i := 0; i < {count_var}; i++ {{");
                    go_decode_stmt(&TypeExpr::Primitive(*p), &format!("{var}[i]"), &format!("{indent}\t\t"), out);
                    let _ = writeln!(out, "{indent}\t}}");
                    let _ = writeln!(out, "{indent}}}");
                }
                _ => {
                    let _ = writeln!(out, "{indent}{var} = make([]{}, 0, {count_var})", go_field_type(inner));
                    let _ = writeln!(out, "{indent}for i := 0; i < {count_var}; i++ {{");
                    let item_var = format!("{}Item", var.replace('.', "_"));
                    go_decode_item_stmt(inner, &item_var, &format!("{indent}\t"), out);
                    let _ = writeln!(out, "{indent}\t{var} = append({var}, {item_var})");
                    let _ = writeln!(out, "{indent}}}");
                }
            }
        }
        TypeExpr::Optional(name) => {
            let _ = writeln!(out, "{indent}if *cursor+1 > len(buf) {{ return nil, ErrUnexpectedEOF }}");
            let presence_var = format!("{}Presence", var.replace('.', "_"));
            let _ = writeln!(out, "{indent}{presence_var} := buf[*cursor]");
            let _ = writeln!(out, "{indent}*cursor++");
            let _ = writeln!(out, "{indent}if {presence_var} != 0 {{");
            let _ = writeln!(
                out,
                "{indent}\tval, err := decode{}At(buf, cursor, ctx)",
                pascal_case(name)
            );
            let _ = writeln!(out, "{indent}\tif err != nil {{ return nil, err }}");
            let _ = writeln!(out, "{indent}\t{var} = val");
            let _ = writeln!(out, "{indent}}}");
        }
    }
}

/// Declares and decodes one array element into a fresh local `var`
/// (used for arrays of `string`/named-record, which can't be decoded
/// in place the way a bulk-copy primitive array is).
fn go_decode_item_stmt(ty: &TypeExpr, var: &str, indent: &str, out: &mut String) {
    match ty {
        TypeExpr::Named(name) => {
            let _ = writeln!(out, "{indent}var {var} {}", pascal_case(name));
            let _ = writeln!(out, "{indent}{{");
            let _ = writeln!(out, "{indent}\tval, err := decode{}At(buf, cursor, ctx)", pascal_case(name));
            let _ = writeln!(out, "{indent}\tif err != nil {{ return nil, err }}");
            let _ = writeln!(out, "{indent}\t{var} = *val");
            let _ = writeln!(out, "{indent}}}");
        }
        TypeExpr::Primitive(PrimitiveKind::String) => {
            let _ = writeln!(out, "{indent}var {var} string");
            let _ = writeln!(out, "{indent}if *cursor+4 > len(buf) {{ return nil, ErrUnexpectedEOF }}");
            let _ = writeln!(out, "{indent}itemLen := int(binary.LittleEndian.Uint32(buf[*cursor:*cursor+4]))");
            let _ = writeln!(out, "{indent}*cursor += 4");
            let _ = writeln!(out, "{indent}if *cursor+itemLen > len(buf) {{ return nil, ErrUnexpectedEOF }}");
            let _ = writeln!(out, "{indent}{var} = string(buf[*cursor : *cursor+itemLen])");
            let _ = writeln!(out, "{indent}*cursor += itemLen");
        }
        _ => {
            let _ = writeln!(out, "{indent}var {var} {}", go_field_type(ty));
            go_decode_stmt(ty, var, indent, out);
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
        let files = generate(&schema, "sdp");
        assert!(files["types.go"].contains("type P struct {"));
        assert!(files["encode.go"].contains("func SizeOfP(v *P) int"));
        assert!(files["decode.go"].contains("func DecodeP(buf []byte) (*P, error)"));
    }

    #[test]
    fn message_gets_type_id_constant_and_dispatch() {
        let schema = schema("message Err { code: u32, text: string }");
        let files = generate(&schema, "sdp");
        assert!(files["types.go"].contains("const TypeIDErr uint64"));
        assert!(files["decode.go"].contains("func DispatchMessage"));
    }

    #[test]
    fn bulk_copy_path_is_gated_on_native_endianness() {
        let schema = schema("struct L { xs: []u32 }");
        let files = generate(&schema, "sdp");
        assert!(files["encode.go"].contains("if nativeLittleEndian {"));
        assert!(files["decode.go"].contains("if nativeLittleEndian {"));
    }

    #[test]
    fn generation_is_deterministic() {
        let schema = schema("struct A { x: u32 }\nmessage B { y: []u64, z: ?A }");
        assert_eq!(generate(&schema, "sdp"), generate(&schema, "sdp"));
    }
}
