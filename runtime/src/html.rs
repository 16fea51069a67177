//! HTML text primitives for the lite path.
//!
//! These three helpers are the only HTML utilities the scriptless renderer
//! uses; no DOM is built. Malformed markup under-extracts rather than
//! failing, and the browser path covers those pages.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("TAG regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE regex"));
static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z][A-Za-z0-9_:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("ATTR regex")
});

/// Decode the entity set used in extracted text, in one pass.
///
/// Output is never re-scanned, so `&amp;lt;` becomes `&lt;` and stays there.
pub fn decode_entities(s: &str) -> String {
    const ENTITIES: &[(&str, &str)] = &[
        ("&amp;", "&"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&nbsp;", " "),
    ];

    let mut out = String::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    'outer: while i < bytes.len() {
        if bytes[i] == b'&' {
            for (entity, literal) in ENTITIES {
                if s[i..].starts_with(entity) {
                    out.push_str(literal);
                    i += entity.len();
                    continue 'outer;
                }
            }
        }
        let ch = s[i..].chars().next().expect("char at byte boundary");
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Replace every tag with a space, collapse whitespace runs, and trim.
pub fn strip_tags(s: &str) -> String {
    let no_tags = TAG.replace_all(s, " ");
    WHITESPACE.replace_all(&no_tags, " ").trim().to_string()
}

/// Parse `name="value"` / `name='value'` pairs out of an attribute list.
///
/// Keys are lowercased. Unquoted values are ignored.
pub fn parse_attributes(attrs: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for caps in ATTR.captures_iter(attrs) {
        let name = caps[1].to_ascii_lowercase();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        map.insert(name, value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_entities() {
        assert_eq!(decode_entities("&amp;"), "&");
        assert_eq!(decode_entities("&lt;b&gt;"), "<b>");
        assert_eq!(decode_entities("a&nbsp;b"), "a b");
        assert_eq!(decode_entities("it&#39;s &quot;fine&quot;"), "it's \"fine\"");
    }

    #[test]
    fn test_decode_is_single_pass() {
        // The & produced by decoding &amp; must not start a second decode.
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_entities("&amp;amp;"), "&amp;");
    }

    #[test]
    fn test_decode_leaves_unknown_entities() {
        assert_eq!(decode_entities("&copy; 2026"), "&copy; 2026");
    }

    #[test]
    fn test_strip_tags_collapses_whitespace() {
        assert_eq!(strip_tags("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_tags("a\n\n  <br/>   b"), "a b");
        assert_eq!(strip_tags("<div></div>"), "");
    }

    #[test]
    fn test_parse_attributes_quoted_pairs() {
        let attrs = parse_attributes(r#"NAME="q" placeholder='Search here' required"#);
        assert_eq!(attrs.get("name").map(String::as_str), Some("q"));
        assert_eq!(
            attrs.get("placeholder").map(String::as_str),
            Some("Search here")
        );
        // Bare attributes carry no value and are not captured.
        assert!(!attrs.contains_key("required"));
    }

    #[test]
    fn test_parse_attributes_lowercases_keys() {
        let attrs = parse_attributes(r#"Content="abc" HTTP-Equiv="refresh""#);
        assert!(attrs.contains_key("content"));
        assert!(attrs.contains_key("http-equiv"));
    }
}
