//! Property tests over schema-level shape invariants (spec §8's
//! "quantified invariants" restated at the schema-model layer, since this
//! crate emits no encode/decode routines of its own — those live in
//! `sdp-codegen`'s *generated* source, per spec §2 "no runtime library is
//! linked"). Mirrors the teacher's `doc` crate, which drives `quickcheck`
//! over generated shapes rather than over encoded bytes.

use quickcheck::{quickcheck, TestResult};
use sdp_core::{compile, validate::ValidationError};

const PRIMITIVES: &[&str] = &[
    "u8", "u16", "u32", "u64", "i8", "i16", "i32", "i64", "f32", "f64", "bool", "string",
];

/// Builds a schema of `n` structs (`R0..Rn`), each with one field per
/// primitive plus a field naming the next record (non-optional, so the
/// chain R0 -> R1 -> ... -> R(n-1) -> R0 is a strong-edge cycle whenever
/// `n >= 1`), and returns the source text alongside whether any field
/// name collides (it never does, by construction).
fn chain_schema(n: u8, optional_back_edge: bool) -> String {
    let n = n as usize;
    let mut src = String::new();
    for i in 0..n {
        let next = (i + 1) % n;
        src.push_str(&format!("struct R{i} {{\n"));
        for (j, prim) in PRIMITIVES.iter().enumerate() {
            src.push_str(&format!("    f{j}: {prim},\n"));
        }
        if optional_back_edge {
            src.push_str(&format!("    next: ?R{next},\n"));
        } else {
            src.push_str(&format!("    next: R{next},\n"));
        }
        src.push_str("}\n");
    }
    src
}

quickcheck! {
    /// Any acyclic-by-construction chain of 2..=8 records, each holding
    /// one field of every primitive type plus a strong edge to the next
    /// record in the chain, is rejected for exactly the cycle it forms
    /// (spec §4.3 pass 4, §8 "S6 cycle rejection").
    fn strong_cycle_is_always_rejected(n: u8) -> TestResult {
        let n = 1 + (n % 8); // 1..=8
        let src = chain_schema(n, false);
        let pipeline = compile(&src);
        if !pipeline.lex_errors.is_empty() || !pipeline.parse_errors.is_empty() {
            return TestResult::failed();
        }
        TestResult::from_bool(
            pipeline
                .validated
                .errors
                .iter()
                .any(|e| matches!(e, ValidationError::Cycle { .. })),
        )
    }

    /// The same chain shape, but with the back-edge routed through `?`,
    /// always validates clean (spec §4.3 pass 4's weak-edge exception).
    fn weak_cycle_is_always_accepted(n: u8) -> TestResult {
        let n = 1 + (n % 8);
        let src = chain_schema(n, true);
        let pipeline = compile(&src);
        if !pipeline.lex_errors.is_empty() || !pipeline.parse_errors.is_empty() {
            return TestResult::failed();
        }
        TestResult::from_bool(pipeline.validated.is_ok())
    }

    /// A single record with every primitive field and no references at
    /// all always validates: primitive-only records can never trip the
    /// type-resolution, cycle, or arity passes.
    fn single_record_all_primitives_always_validates(seed: u8) -> TestResult {
        let mut src = String::from("struct P {\n");
        for (j, prim) in PRIMITIVES.iter().enumerate() {
            src.push_str(&format!("    f{j}_{seed}: {prim},\n"));
        }
        src.push_str("}\n");
        let pipeline = compile(&src);
        if !pipeline.lex_errors.is_empty() || !pipeline.parse_errors.is_empty() {
            return TestResult::failed();
        }
        TestResult::from_bool(pipeline.validated.is_ok())
    }
}

#[test]
fn chain_schema_sanity_check_n1_is_direct_self_cycle() {
    let src = chain_schema(1, false);
    assert!(src.contains("next: R0"));
}
