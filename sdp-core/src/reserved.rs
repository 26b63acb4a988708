//! The reserved-identifier denylist used by the naming validation pass
//! (spec §4.3 rule 1, §4.3 rule 5, §9 "Reserved-keyword denylist").
//!
//! A conservative union of every target language's reserved words plus a
//! handful of standard-library identifiers that would collide with
//! generated helper names. The generator never silently renames a
//! colliding identifier — schemas that hit this list must be rewritten by
//! their author.

use lazy_static::lazy_static;
use std::collections::HashSet;

const GO_KEYWORDS: &[&str] = &[
    "break", "default", "func", "interface", "select", "case", "defer", "go", "map", "struct",
    "chan", "else", "goto", "package", "switch", "const", "fallthrough", "if", "range", "type",
    "continue", "for", "import", "return", "var", "error", "string", "int", "byte", "nil",
];

const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "asm", "auto", "bool", "break", "case", "catch", "char",
    "class", "const", "constexpr", "continue", "decltype", "default", "delete", "do", "double",
    "else", "enum", "explicit", "export", "extern", "false", "float", "for", "friend", "goto",
    "if", "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "nullptr",
    "operator", "private", "protected", "public", "register", "return", "short", "signed",
    "sizeof", "static", "struct", "switch", "template", "this", "throw", "true", "try",
    "typedef", "typeid", "typename", "union", "unsigned", "using", "virtual", "void",
    "volatile", "while", "std", "size_t",
];

const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern", "false", "fn",
    "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe",
    "use", "where", "while", "async", "await", "try", "Vec", "String", "Option", "Result",
];

const SWIFT_KEYWORDS: &[&str] = &[
    "associatedtype", "class", "deinit", "enum", "extension", "fileprivate", "func", "import",
    "init", "inout", "internal", "let", "open", "operator", "private", "protocol", "public",
    "rethrows", "static", "struct", "subscript", "typealias", "var", "break", "case", "continue",
    "default", "defer", "do", "else", "fallthrough", "for", "guard", "if", "in", "repeat",
    "return", "switch", "where", "while", "as", "false", "is", "nil", "self", "Self", "super",
    "throw", "throws", "true", "try",
];

lazy_static! {
    static ref RESERVED: HashSet<&'static str> = GO_KEYWORDS
        .iter()
        .chain(CPP_KEYWORDS)
        .chain(RUST_KEYWORDS)
        .chain(SWIFT_KEYWORDS)
        .copied()
        .collect();
}

/// True if `ident` collides with a reserved word in any target language
/// the generator supports.
pub fn is_reserved(ident: &str) -> bool {
    RESERVED.contains(ident)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_known_collisions() {
        assert!(is_reserved("struct"));
        assert!(is_reserved("type"));
        assert!(is_reserved("func"));
        assert!(is_reserved("class"));
    }

    #[test]
    fn allows_ordinary_names() {
        assert!(!is_reserved("user_id"));
        assert!(!is_reserved("Widget"));
    }
}
