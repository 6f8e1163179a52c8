use super::node::SchemaNode;

/// Language every schema is expected to carry.
pub const FALLBACK_LANGUAGE: &str = "english";

/// Resolve a display string from a localized schema node.
///
/// Tries the requested language, then English, then the node's own value
/// (some schemas store a bare string instead of a language table), and finally
/// `fallback`. Missing nodes resolve like empty strings.
pub fn resolve_localized(node: &SchemaNode, language: &str, fallback: &str) -> String {
    let localized = node.get(language).as_string("");
    if !localized.is_empty() {
        return localized;
    }

    if language != FALLBACK_LANGUAGE {
        let english = node.get(FALLBACK_LANGUAGE).as_string("");
        if !english.is_empty() {
            return english;
        }
    }

    let bare = node.as_string("");
    if !bare.is_empty() {
        return bare;
    }

    fallback.to_string()
}
