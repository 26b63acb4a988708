//! Byte stream to token stream (spec §4.1).
//!
//! A single forward pass: CRLF is normalized to LF up front, then the
//! source is walked once, character by character, with no backtracking.

use crate::span::Span;
use crate::token::{Token, TokenKind};
use std::borrow::Cow;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{span}: {kind}")]
pub struct LexError {
    pub span: Span,
    pub kind: LexErrorKind,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unknown character {0:?}")]
    UnknownByte(char),
    #[error("identifier may not start with a digit")]
    BadIdentifier,
}

/// Normalizes CRLF to LF, then tokenizes. Never aborts on the first error:
/// every recognized error is collected and lexing continues from the next
/// character, the same resynchronization discipline the parser applies at
/// the declaration level (spec §4.2).
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let normalized: Cow<str> = if source.contains('\r') {
        Cow::Owned(source.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(source)
    };

    let mut lexer = Lexer {
        chars: normalized.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
        tokens: Vec::new(),
        errors: Vec::new(),
    };
    lexer.run();
    (lexer.tokens, lexer.errors)
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn run(&mut self) {
        loop {
            match self.peek() {
                None => break,
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    self.lex_comment_or_doc();
                }
                Some(c) if c.is_ascii_digit() => self.lex_number(),
                Some(c) if is_ident_start(c) => self.lex_ident(),
                Some('"') => self.lex_string(),
                Some(c) => self.lex_punct(c),
            }
        }
        self.tokens.push(Token::new(TokenKind::Eof, self.span()));
    }

    /// Consumes one `//`-prefixed line. If it is a `///` doc-comment line,
    /// keeps consuming contiguous doc-comment lines (blank/whitespace-only
    /// lines between them break the run) and emits a single merged
    /// `DocComment` token, per spec §4.1.
    fn lex_comment_or_doc(&mut self) {
        let start = self.span();
        let mut doc_lines = Vec::new();
        let mut saw_doc = false;

        loop {
            if self.peek() != Some('/') || self.peek_at(1) != Some('/') {
                break;
            }
            let is_doc = self.peek_at(2) == Some('/');
            self.advance();
            self.advance();
            if is_doc {
                self.advance();
                saw_doc = true;
                // Strip one optional leading space after `///`.
                if self.peek() == Some(' ') {
                    self.advance();
                }
                let mut line = String::new();
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    line.push(c);
                    self.advance();
                }
                doc_lines.push(line);
            } else {
                // Plain `//` comment: discard the rest of the line.
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
                if saw_doc {
                    // A plain comment ends a doc-comment run.
                    break;
                }
            }

            // Skip the newline and any following blank lines; a blank line
            // (or anything that is not another `//`) ends the run.
            if self.peek() == Some('\n') {
                self.advance();
            } else {
                break;
            }
            while matches!(self.peek(), Some(c) if c.is_whitespace() && c != '\n') {
                self.advance();
            }
        }

        if saw_doc {
            self.tokens
                .push(Token::new(TokenKind::DocComment(doc_lines.join("\n")), start));
        }
    }

    fn lex_ident(&mut self) {
        let start = self.span();
        let mut s = String::new();
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            s.push(self.advance().unwrap());
        }
        let kind = match s.as_str() {
            "struct" => TokenKind::KwStruct,
            "message" => TokenKind::KwMessage,
            _ => TokenKind::Ident(s),
        };
        self.tokens.push(Token::new(kind, start));
    }

    fn lex_number(&mut self) {
        let start = self.span();
        let mut s = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            s.push(self.advance().unwrap());
        }
        if matches!(self.peek(), Some(c) if is_ident_start(c)) {
            // A digit run immediately followed by identifier characters,
            // e.g. `3abc`, is never valid.
            while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
                self.advance();
            }
            self.errors.push(LexError {
                span: start,
                kind: LexErrorKind::BadIdentifier,
            });
            return;
        }
        let value: i64 = s.parse().unwrap_or(0);
        self.tokens.push(Token::new(TokenKind::Int(value), start));
    }

    fn lex_string(&mut self) {
        let start = self.span();
        self.advance(); // opening quote
        let mut s = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.errors.push(LexError {
                        span: start,
                        kind: LexErrorKind::UnterminatedString,
                    });
                    return;
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => s.push('\n'),
                        Some('t') => s.push('\t'),
                        Some(c) => s.push(c),
                        None => {
                            self.errors.push(LexError {
                                span: start,
                                kind: LexErrorKind::UnterminatedString,
                            });
                            return;
                        }
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
        self.tokens.push(Token::new(TokenKind::Str(s), start));
    }

    fn lex_punct(&mut self, c: char) {
        let start = self.span();
        let kind = match c {
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,
            other => {
                self.advance();
                self.errors.push(LexError {
                    span: start,
                    kind: LexErrorKind::UnknownByte(other),
                });
                return;
            }
        };
        self.advance();
        self.tokens.push(Token::new(kind, start));
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, errors) = tokenize(src);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn punctuation_and_keywords() {
        let kinds = kinds("struct message { } [ ] , : ?");
        assert_eq!(
            kinds,
            vec![
                TokenKind::KwStruct,
                TokenKind::KwMessage,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Question,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn doc_comment_run_is_merged() {
        let (tokens, errors) = tokenize("/// line one\n/// line two\nstruct P { a: u32 }");
        assert!(errors.is_empty());
        match &tokens[0].kind {
            TokenKind::DocComment(text) => assert_eq!(text, "line one\nline two"),
            other => panic!("expected doc comment, got {other:?}"),
        }
    }

    #[test]
    fn plain_comment_is_discarded() {
        let kinds = kinds("// not kept\nstruct P { a: u32 }");
        assert!(!kinds
            .iter()
            .any(|k| matches!(k, TokenKind::DocComment(_))));
    }

    #[test]
    fn crlf_is_normalized() {
        let (tokens, errors) = tokenize("struct P {\r\n a: u32\r\n}");
        assert!(errors.is_empty());
        assert!(tokens.iter().any(|t| t.kind == TokenKind::KwStruct));
    }

    #[test]
    fn unterminated_string_errors() {
        let (_, errors) = tokenize("\"abc");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, LexErrorKind::UnterminatedString);
    }

    #[test]
    fn unknown_byte_errors() {
        let (_, errors) = tokenize("struct P { a: u32 } $");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, LexErrorKind::UnknownByte('$'));
    }

    #[test]
    fn digit_led_identifier_errors() {
        let (_, errors) = tokenize("3abc");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, LexErrorKind::BadIdentifier);
    }

    #[test]
    fn doc_comment_attaches_before_field() {
        let (tokens, _) = tokenize("struct P {\n  /// the value\n  a: u32\n}");
        let doc_idx = tokens
            .iter()
            .position(|t| matches!(t.kind, TokenKind::DocComment(_)))
            .unwrap();
        assert!(matches!(tokens[doc_idx + 1].kind, TokenKind::Ident(ref s) if s == "a"));
    }
}
