//! Response decoding for the Felicity local monitor protocol
//!
//! The device answers with free-form text: nominally JSON, but single-quoted,
//! occasionally containing Python-style `None`, and sometimes several objects
//! glued back to back with no separator. This module normalizes the text and
//! extracts every decodable object fragment; one bad fragment never poisons
//! the rest of the response.

use crate::logging::get_logger;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

#[allow(clippy::unwrap_used)]
static BARE_NONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bNone\b").unwrap());

#[allow(clippy::unwrap_used)]
static OBJECT_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{.*?\}").unwrap());

/// Rewrite device quirks into standard JSON text
pub fn normalize_payload(text: &str) -> String {
    let stripped: String = text
        .trim()
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .collect();
    let quoted = stripped.replace('\'', "\"");
    // Word-boundary match only; must not corrupt substrings like "NoneSuch"
    BARE_NONE.replace_all(&quoted, "null").into_owned()
}

/// Decode every object fragment in a raw response, in order of appearance.
///
/// Fast path: the whole normalized payload is one JSON document. Otherwise a
/// brace-depth scan splits off each top-level `{...}` span; if that finds
/// nothing balanced, a non-greedy regex is the best-effort fallback.
/// Fragments that fail to decode are logged at debug level and skipped.
pub fn parse_fragments(text: &str) -> Vec<Value> {
    let norm = normalize_payload(text);

    if let Ok(value) = serde_json::from_str::<Value>(&norm) {
        return vec![value];
    }

    let mut spans = scan_object_spans(&norm);
    if spans.is_empty() {
        spans = OBJECT_SPAN
            .find_iter(&norm)
            .map(|m| m.as_str().to_string())
            .collect();
    }

    let logger = get_logger("protocol");
    let mut parsed = Vec::with_capacity(spans.len());
    for span in spans {
        match serde_json::from_str::<Value>(&span) {
            Ok(value) => parsed.push(value),
            Err(err) => {
                logger.debug(&format!("Skipping undecodable fragment {:?}: {}", span, err));
            }
        }
    }
    parsed
}

/// The first fragment of a response, required to be object-shaped.
///
/// A non-object first fragment (a whole-payload array, for instance) yields
/// `None` rather than falling through to a later fragment.
pub fn parse_first_object(text: &str) -> Option<Map<String, Value>> {
    match parse_fragments(text).into_iter().next() {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Merge every object-shaped fragment into one map; later fragments win on
/// key conflicts. Returns `None` when nothing object-shaped decoded.
pub fn merge_object_fragments(fragments: Vec<Value>) -> Option<Map<String, Value>> {
    let mut merged = Map::new();
    for fragment in fragments {
        if let Value::Object(map) = fragment {
            merged.extend(map);
        }
    }
    if merged.is_empty() { None } else { Some(merged) }
}

/// Split top-level `{...}` spans by tracking brace nesting depth
fn scan_object_spans(norm: &str) -> Vec<String> {
    let mut spans = Vec::new();
    let mut depth: u32 = 0;
    let mut start: Option<usize> = None;

    for (i, ch) in norm.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start.take() {
                            spans.push(norm[s..=i].to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_quotes_and_none() {
        let raw = "{'a': None, 'b': 'NoneSuch'}\r\n";
        let norm = normalize_payload(raw);
        assert_eq!(norm, "{\"a\": null, \"b\": \"NoneSuch\"}");
    }

    #[test]
    fn test_single_fragment_fast_path() {
        let parsed = parse_fragments("{\"x\": 1}");
        assert_eq!(parsed, vec![json!({"x": 1})]);
    }

    #[test]
    fn test_quirky_encoding_decodes_like_standard() {
        let quirky = parse_fragments("{'v': None, 'n': 42}");
        let standard = parse_fragments("{\"v\": null, \"n\": 42}");
        assert_eq!(quirky, standard);
    }

    #[test]
    fn test_back_to_back_fragments_in_order() {
        let parsed = parse_fragments("{\"a\": 1}{\"b\": 2}{\"c\": 3}");
        assert_eq!(
            parsed,
            vec![json!({"a": 1}), json!({"b": 2}), json!({"c": 3})]
        );
    }

    #[test]
    fn test_two_fragments() {
        let parsed = parse_fragments("{'a': {'nested': 1}}{'b': 2}");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], json!({"a": {"nested": 1}}));
    }

    #[test]
    fn test_malformed_fragment_is_isolated() {
        let parsed = parse_fragments("{\"good\": 1}{\"broken\": ");
        assert_eq!(parsed, vec![json!({"good": 1})]);
    }

    #[test]
    fn test_garbage_only_yields_nothing() {
        assert!(parse_fragments("####").is_empty());
        assert!(parse_first_object("####").is_none());
    }

    #[test]
    fn test_regex_fallback_on_unbalanced_braces() {
        // Trailing unmatched '{' keeps the depth scan from closing anything
        // after it, but the first span still decodes either way.
        let parsed = parse_fragments("{\"a\": 1}{");
        assert_eq!(parsed, vec![json!({"a": 1})]);
    }

    #[test]
    fn test_parse_first_object_requires_object_shape() {
        let first = parse_first_object("{\"k\": 9}").unwrap();
        assert_eq!(first.get("k"), Some(&json!(9)));

        // Whole-payload non-object decodes as fragment 0 and is rejected
        assert!(parse_first_object("[1, 2]").is_none());
        assert!(parse_first_object("42").is_none());
    }

    #[test]
    fn test_merge_later_fragment_wins() {
        let fragments = vec![json!({"A": 1, "B": 2}), json!({"B": 3, "C": 4})];
        let merged = merge_object_fragments(fragments).unwrap();
        assert_eq!(Value::Object(merged), json!({"A": 1, "B": 3, "C": 4}));
    }

    #[test]
    fn test_merge_ignores_non_object_fragments() {
        assert!(merge_object_fragments(vec![json!(5), json!("x")]).is_none());
    }
}
