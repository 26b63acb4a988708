//! The wire-format contract (spec §4.4, §6 "Wire format").
//!
//! This module is a pure specification: constants and the FNV-1a type-ID
//! algorithm that every target's generated encoder/decoder must conform
//! to. Per spec §2 ("no runtime library is linked"), nothing here
//! encodes or decodes a value — that code is emitted by `sdp-codegen`
//! into the target language, not executed by this crate.

use crate::ast::PrimitiveKind;

/// FNV-1a 64-bit offset basis (spec §6 "Type ID algorithm").
pub const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
/// FNV-1a 64-bit prime (spec §6 "Type ID algorithm").
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

/// Maximum total input length accepted by a decode, in bytes (spec §4.4).
pub const MAX_FRAME_BYTES: u64 = 128 * 1024 * 1024;
/// Maximum element count of any single array (spec §4.4).
pub const MAX_ARRAY_ELEMENTS: u64 = 1_000_000;
/// Maximum cumulative array element count across one decode (spec §4.4).
pub const MAX_CUMULATIVE_ELEMENTS: u64 = 10_000_000;

/// Size in bytes of the message envelope: `[u64 type_id][u32 payload_size]`
/// (spec §4.4).
pub const MESSAGE_ENVELOPE_BYTES: u32 = 12;

/// 64-bit FNV-1a over the UTF-8 bytes of a record's *schema* name (never
/// its target-language-translated name), used as a message's wire type
/// identity (spec §6).
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Type ID of a record given its schema-declared name.
pub fn type_id(record_name: &str) -> u64 {
    fnv1a64(record_name.as_bytes())
}

/// Fixed wire width in bytes of a primitive, or `None` for `string`
/// (length-prefixed). Thin wrapper over [`PrimitiveKind::fixed_width`]
/// kept here because it is part of the wire contract, not the type model.
pub const fn fixed_width(prim: PrimitiveKind) -> Option<u32> {
    match prim {
        PrimitiveKind::U8 | PrimitiveKind::I8 | PrimitiveKind::Bool => Some(1),
        PrimitiveKind::U16 | PrimitiveKind::I16 => Some(2),
        PrimitiveKind::U32 | PrimitiveKind::I32 | PrimitiveKind::F32 => Some(4),
        PrimitiveKind::U64 | PrimitiveKind::I64 | PrimitiveKind::F64 => Some(8),
        PrimitiveKind::String => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a64_matches_known_vectors() {
        // FNV-1a 64-bit test vectors for the empty string and "a" are
        // well known constants independent of this implementation.
        assert_eq!(fnv1a64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a64(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn type_id_is_stable_across_calls() {
        assert_eq!(type_id("Err"), type_id("Err"));
        assert_ne!(type_id("Err"), type_id("Ok"));
    }

    #[test]
    fn fixed_widths_match_spec_table() {
        assert_eq!(fixed_width(PrimitiveKind::U8), Some(1));
        assert_eq!(fixed_width(PrimitiveKind::I64), Some(8));
        assert_eq!(fixed_width(PrimitiveKind::F32), Some(4));
        assert_eq!(fixed_width(PrimitiveKind::String), None);
    }
}
