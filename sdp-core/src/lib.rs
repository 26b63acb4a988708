//! `sdp-core`: lexer, parser, semantic validator, type model, and
//! wire-format contract for the Serial Data Protocol schema language.
//!
//! This crate is the front end plus the wire contract. It has no notion
//! of any code-generation target; see `sdp-codegen` for that.
//!
//! The pipeline is strictly one-way and deterministic (spec §2):
//!
//! ```text
//! source text -> tokenize() -> parse() -> validate() -> Validated schema
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod reserved;
pub mod span;
pub mod token;
pub mod validate;
pub mod wire;

pub use ast::{Field, PrimitiveKind, Record, RecordKind, Schema, TypeExpr};
pub use span::Span;
pub use validate::{validate, ValidationError, Validated};

/// Runs the full front-end pipeline (spec §2) and returns the validated
/// schema alongside every error collected along the way. A non-empty
/// `lex_errors` or `parse_errors` means `validated` may be built from an
/// incomplete tree (the parser resynchronizes past errors and keeps
/// going, per spec §4.2); `validated.errors` is only meaningful once
/// `lex_errors` and `parse_errors` are both empty.
pub struct Pipeline {
    pub lex_errors: Vec<lexer::LexError>,
    pub parse_errors: Vec<parser::ParseError>,
    pub parse_warnings: Vec<parser::FloatingDocComment>,
    pub schema: Schema,
    pub validated: Validated,
}

impl Pipeline {
    /// True when every stage produced zero errors.
    pub fn is_ok(&self) -> bool {
        self.lex_errors.is_empty() && self.parse_errors.is_empty() && self.validated.is_ok()
    }
}

/// Runs lex, parse, and validate over `source` in one call.
pub fn compile(source: &str) -> Pipeline {
    let (tokens, lex_errors) = lexer::tokenize(source);
    let outcome = parser::parse(&tokens);
    let validated = validate::validate(&outcome.schema);
    Pipeline {
        lex_errors,
        parse_errors: outcome.errors,
        parse_warnings: outcome.warnings,
        schema: outcome.schema,
        validated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_accepts_a_valid_schema() {
        let pipeline = compile("struct P { a: u32, b: bool, c: string }");
        assert!(pipeline.is_ok(), "{:?}", pipeline.validated.errors);
        assert_eq!(pipeline.schema.records.len(), 1);
    }

    #[test]
    fn compile_surfaces_validation_errors() {
        let pipeline = compile("struct A { x: A }");
        assert!(pipeline.lex_errors.is_empty());
        assert!(pipeline.parse_errors.is_empty());
        assert!(!pipeline.validated.is_ok());
    }
}
