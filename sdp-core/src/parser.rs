//! Token stream to abstract schema tree (spec §4.2).
//!
//! A hand-written recursive-descent parser over the token slice — no
//! parser-generator dependency, so the grammar in spec §4.2 is the only
//! source of truth for what parses.

use crate::ast::{Field, PrimitiveKind, Record, RecordKind, Schema, TypeExpr};
use crate::span::Span;
use crate::token::{Token, TokenKind};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{span}: {kind}")]
pub struct ParseError {
    pub span: Span,
    pub kind: ParseErrorKind,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("missing {0}")]
    MissingPunct(&'static str),
    #[error("malformed type expression: {0}")]
    MalformedType(String),
}

/// A floating doc comment not immediately followed by a declaration or
/// field is discarded, but noted here rather than silently dropped (spec
/// §4.2: "floating doc comments are discarded with a warning").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingDocComment {
    pub span: Span,
}

pub struct ParseOutcome {
    pub schema: Schema,
    pub errors: Vec<ParseError>,
    pub warnings: Vec<FloatingDocComment>,
}

pub fn parse(tokens: &[Token]) -> ParseOutcome {
    let mut p = Parser {
        tokens,
        pos: 0,
        errors: Vec::new(),
        warnings: Vec::new(),
    };
    let schema = p.parse_schema();
    ParseOutcome {
        schema,
        errors: p.errors,
        warnings: p.warnings,
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    errors: Vec<ParseError>,
    warnings: Vec<FloatingDocComment>,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn bump(&mut self) -> Token {
        let t = self.peek().clone();
        if !self.at_eof() {
            self.pos += 1;
        }
        t
    }

    fn error(&mut self, span: Span, kind: ParseErrorKind) {
        self.errors.push(ParseError { span, kind });
    }

    fn describe(kind: &TokenKind) -> String {
        match kind {
            TokenKind::Ident(s) => format!("identifier `{s}`"),
            TokenKind::KwStruct => "`struct`".to_string(),
            TokenKind::KwMessage => "`message`".to_string(),
            TokenKind::LBrace => "`{`".to_string(),
            TokenKind::RBrace => "`}`".to_string(),
            TokenKind::LBracket => "`[`".to_string(),
            TokenKind::RBracket => "`]`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Colon => "`:`".to_string(),
            TokenKind::Question => "`?`".to_string(),
            TokenKind::Int(n) => format!("integer `{n}`"),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::DocComment(_) => "doc comment".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }

    /// Consumes a leading doc-comment token, if present, returning its text.
    fn take_doc(&mut self) -> Option<String> {
        if let TokenKind::DocComment(text) = self.peek_kind().clone() {
            self.bump();
            Some(text)
        } else {
            None
        }
    }

    /// Skips forward to the next token that could plausibly start a new
    /// top-level declaration, swallowing everything up to and including
    /// the next `}` if one appears first (spec §4.2 resynchronization).
    fn resync(&mut self) {
        loop {
            match self.peek_kind() {
                TokenKind::RBrace => {
                    self.bump();
                    return;
                }
                TokenKind::KwStruct | TokenKind::KwMessage | TokenKind::Eof => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn parse_schema(&mut self) -> Schema {
        let mut records = Vec::new();
        loop {
            // A doc comment may precede a declaration; if what follows
            // isn't a declaration, it is floating and gets reported.
            let doc_span = self.peek().span;
            let doc = self.take_doc();

            if self.at_eof() {
                if let Some(_) = doc {
                    self.warnings.push(FloatingDocComment { span: doc_span });
                }
                break;
            }

            match self.peek_kind() {
                TokenKind::KwStruct | TokenKind::KwMessage => {
                    if let Some(record) = self.parse_record(doc) {
                        records.push(record);
                    }
                }
                _ => {
                    if doc.is_some() {
                        self.warnings.push(FloatingDocComment { span: doc_span });
                    }
                    let found = Self::describe(self.peek_kind());
                    let span = self.peek().span;
                    self.error(
                        span,
                        ParseErrorKind::UnexpectedToken {
                            expected: "`struct` or `message`".to_string(),
                            found,
                        },
                    );
                    self.resync();
                }
            }
        }
        Schema { records }
    }

    fn parse_record(&mut self, doc: Option<String>) -> Option<Record> {
        let kind = match self.peek_kind() {
            TokenKind::KwStruct => RecordKind::Struct,
            TokenKind::KwMessage => RecordKind::Message,
            _ => unreachable!("caller only invokes on struct/message"),
        };
        self.bump();

        let name = match self.expect_ident("record name") {
            Some(n) => n,
            None => {
                self.resync();
                return None;
            }
        };

        if !self.expect_punct(&TokenKind::LBrace, "`{`") {
            self.resync();
            return None;
        }

        let mut fields = Vec::new();
        loop {
            if matches!(self.peek_kind(), TokenKind::RBrace) {
                self.bump();
                break;
            }
            if self.at_eof() {
                self.error(self.peek().span, ParseErrorKind::MissingPunct("`}`"));
                break;
            }
            if let Some(field) = self.parse_field() {
                fields.push(field);
            } else {
                self.resync();
                break;
            }
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::RBrace => {
                    self.bump();
                    break;
                }
                _ => {
                    let found = Self::describe(self.peek_kind());
                    let span = self.peek().span;
                    self.error(
                        span,
                        ParseErrorKind::UnexpectedToken {
                            expected: "`,` or `}`".to_string(),
                            found,
                        },
                    );
                    self.resync();
                    break;
                }
            }
        }

        Some(Record {
            name,
            kind,
            fields,
            doc,
        })
    }

    fn parse_field(&mut self) -> Option<Field> {
        let doc = self.take_doc();
        let name = self.expect_ident("field name")?;
        if !self.expect_punct(&TokenKind::Colon, "`:`") {
            return None;
        }
        let ty = self.parse_type()?;
        Some(Field { name, ty, doc })
    }

    fn parse_type(&mut self) -> Option<TypeExpr> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                if let Some(prim) = PrimitiveKind::from_keyword(&name) {
                    self.bump();
                    Some(TypeExpr::Primitive(prim))
                } else {
                    self.bump();
                    Some(TypeExpr::Named(name))
                }
            }
            TokenKind::LBracket => {
                self.bump();
                let inner = self.parse_type()?;
                if inner.is_array() {
                    self.error(
                        self.peek().span,
                        ParseErrorKind::MalformedType(
                            "arrays of arrays are not permitted".to_string(),
                        ),
                    );
                    return None;
                }
                if !self.expect_punct(&TokenKind::RBracket, "`]`") {
                    return None;
                }
                Some(TypeExpr::Array(Box::new(inner)))
            }
            TokenKind::Question => {
                let q_span = self.peek().span;
                self.bump();
                match self.peek_kind().clone() {
                    TokenKind::Ident(name) if PrimitiveKind::from_keyword(&name).is_none() => {
                        self.bump();
                        Some(TypeExpr::Optional(name))
                    }
                    other => {
                        self.error(
                            q_span,
                            ParseErrorKind::MalformedType(format!(
                                "`?` must be followed by a record name, found {}",
                                Self::describe(&other)
                            )),
                        );
                        None
                    }
                }
            }
            other => {
                let span = self.peek().span;
                self.error(
                    span,
                    ParseErrorKind::UnexpectedToken {
                        expected: "a type".to_string(),
                        found: Self::describe(&other),
                    },
                );
                None
            }
        }
    }

    fn expect_ident(&mut self, what: &str) -> Option<String> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.bump();
                Some(name)
            }
            other => {
                let span = self.peek().span;
                self.error(
                    span,
                    ParseErrorKind::UnexpectedToken {
                        expected: what.to_string(),
                        found: Self::describe(&other),
                    },
                );
                None
            }
        }
    }

    fn expect_punct(&mut self, want: &TokenKind, label: &'static str) -> bool {
        if self.peek_kind() == want {
            self.bump();
            true
        } else {
            let span = self.peek().span;
            self.error(span, ParseErrorKind::MissingPunct(label));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_src(src: &str) -> ParseOutcome {
        let (tokens, lex_errors) = tokenize(src);
        assert!(lex_errors.is_empty(), "lex errors: {lex_errors:?}");
        parse(&tokens)
    }

    #[test]
    fn parses_simple_struct() {
        let out = parse_src("struct P { a: u32, b: bool, c: string }");
        assert!(out.errors.is_empty());
        assert_eq!(out.schema.records.len(), 1);
        let rec = &out.schema.records[0];
        assert_eq!(rec.name, "P");
        assert_eq!(rec.kind, RecordKind::Struct);
        assert_eq!(rec.fields.len(), 3);
    }

    #[test]
    fn parses_message_and_array_and_optional() {
        let out = parse_src(
            "message Err { code: u32, text: string }\nstruct Node { v: u32, next: ?Node, xs: []u32 }",
        );
        assert!(out.errors.is_empty(), "errors: {:?}", out.errors);
        assert_eq!(out.schema.records.len(), 2);
        assert_eq!(out.schema.records[0].kind, RecordKind::Message);
        let node = &out.schema.records[1];
        assert_eq!(node.fields[1].ty, TypeExpr::Optional("Node".to_string()));
        assert_eq!(
            node.fields[2].ty,
            TypeExpr::Array(Box::new(TypeExpr::Primitive(PrimitiveKind::U32)))
        );
    }

    #[test]
    fn rejects_optional_primitive() {
        let out = parse_src("struct P { a: ?u32 }");
        assert!(!out.errors.is_empty());
    }

    #[test]
    fn rejects_array_of_array() {
        let out = parse_src("struct P { a: [][]u32 }");
        assert!(!out.errors.is_empty());
    }

    #[test]
    fn trailing_comma_allowed() {
        let out = parse_src("struct P { a: u32, }");
        assert!(out.errors.is_empty());
        assert_eq!(out.schema.records[0].fields.len(), 1);
    }

    #[test]
    fn recovers_after_error_and_keeps_parsing_next_decl() {
        let out = parse_src("struct Bad { a: }\nstruct Good { x: u32 }");
        assert!(!out.errors.is_empty());
        assert!(out.schema.records.iter().any(|r| r.name == "Good"));
    }

    #[test]
    fn doc_comment_attaches_to_record_and_field() {
        let out =
            parse_src("/// about P\nstruct P {\n  /// about a\n  a: u32\n}");
        assert!(out.errors.is_empty());
        let rec = &out.schema.records[0];
        assert_eq!(rec.doc.as_deref(), Some("about P"));
        assert_eq!(rec.fields[0].doc.as_deref(), Some("about a"));
    }

    #[test]
    fn floating_doc_comment_is_a_warning_not_an_error() {
        let out = parse_src("/// floating\n");
        assert!(out.errors.is_empty());
        assert_eq!(out.warnings.len(), 1);
    }
}
