//! Deterministic name transliteration shared by every target backend
//! (spec §4.5 "Name transliteration"). Schema identifiers are
//! `snake_case` or arbitrary identifier text; each target wants its own
//! conventional case. Centralizing this here mirrors the teacher's
//! `derive-typescript::codegen::mod::camel_case`, which the TypeScript
//! backend uses for its own method/type names — generalized here into
//! the three case conventions the four SDP targets actually need.

/// Splits an identifier into its constituent words: a run of alphanumeric
/// characters between separators (`_`, digit/letter case transitions are
/// *not* treated as separators, matching the schema convention that
/// record/field names are already `snake_case` or a single bare word).
fn words(name: &str) -> Vec<&str> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `PascalCase`: used for record/type names in every target, and for
/// Go's field names.
pub fn pascal_case(name: &str) -> String {
    words(name).iter().map(|w| capitalize(w)).collect()
}

/// `camelCase`: used for Swift field names and TypeScript-style method
/// names elsewhere in the corpus.
pub fn camel_case(name: &str) -> String {
    let mut out = String::new();
    for (i, w) in words(name).iter().enumerate() {
        if i == 0 {
            out.push_str(&w.to_lowercase());
        } else {
            out.push_str(&capitalize(w));
        }
    }
    out
}

/// `snake_case`: used for C++ and Rust field names. Schema field names
/// are already conventionally `snake_case`; this normalizes any other
/// input (e.g. a record name reused as a field) to the same convention.
pub fn snake_case(name: &str) -> String {
    words(name)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascal_case_splits_on_underscore() {
        assert_eq!(pascal_case("node_id"), "NodeId");
        assert_eq!(pascal_case("P"), "P");
    }

    #[test]
    fn camel_case_lowercases_first_word_only() {
        assert_eq!(camel_case("node_id"), "nodeId");
        assert_eq!(camel_case("Err"), "err");
    }

    #[test]
    fn snake_case_is_idempotent_on_schema_names() {
        assert_eq!(snake_case("node_id"), "node_id");
        assert_eq!(snake_case("NodeId"), "nodeid");
    }
}
