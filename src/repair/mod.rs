//! Parameter repair — tolerant normalization of LLM-issued arguments.
//!
//! LLM callers produce valid JSON on good days and quoted pseudo-JSON,
//! Python literals, or `key=value` free text on bad ones. `parse_lenient`
//! recovers a mapping from a malformed blob; `repair` normalizes every
//! value into the clean string form handlers expect, with null-like
//! spellings collapsed to the `"target"` sentinel. `repair` never fails
//! and is idempotent.

use crate::types::{Error, Result};
use crate::units::TARGET;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// A repaired parameter value. Lists appear in batch-mode calls where
/// every parameter carries one value per solve request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RepairedValue {
    Scalar(String),
    List(Vec<String>),
}

impl RepairedValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            RepairedValue::Scalar(s) => Some(s),
            RepairedValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            RepairedValue::Scalar(_) => None,
            RepairedValue::List(items) => Some(items),
        }
    }
}

/// Null-like spellings that all mean "solve for this one".
const TARGET_SPELLINGS: &[&str] = &["target", "TARGET", "Target", "null", "None", "undefined"];

/// Normalize one scalar: render to text, strip surrounding quotes, collapse
/// whitespace, map null-like spellings to the sentinel.
fn repair_scalar(value: &Value) -> String {
    let text = match value {
        Value::Null => return TARGET.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    normalize_text(&text)
}

fn normalize_text(text: &str) -> String {
    let mut s = text.trim().to_string();

    // Strip surrounding quote pairs until none remain, so the result is a
    // fixed point of this function.
    loop {
        let stripped = strip_quote_pair(&s);
        if stripped == s {
            break;
        }
        s = stripped.trim().to_string();
    }

    let collapsed: String = s.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() || TARGET_SPELLINGS.contains(&collapsed.as_str()) {
        return TARGET.to_string();
    }
    collapsed
}

fn strip_quote_pair(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() >= 2 {
        let (first, last) = (chars[0], chars[chars.len() - 1]);
        let pair = matches!(
            (first, last),
            ('"', '"') | ('\'', '\'') | ('`', '`') | ('„', '“') | ('“', '”')
        );
        if pair {
            return chars[1..chars.len() - 1].iter().collect();
        }
    }
    s.to_string()
}

/// Best-effort normalization of a raw argument mapping.
///
/// Array values are repaired element-wise (batch mode); everything else
/// becomes a scalar. Never fails.
pub fn repair(raw: &Map<String, Value>) -> BTreeMap<String, RepairedValue> {
    let mut repaired = BTreeMap::new();
    for (name, value) in raw {
        let key = normalize_key(name);
        let repaired_value = match value {
            Value::Array(items) => {
                RepairedValue::List(items.iter().map(repair_scalar).collect())
            }
            other => RepairedValue::Scalar(repair_scalar(other)),
        };
        repaired.insert(key, repaired_value);
    }
    repaired
}

fn normalize_key(name: &str) -> String {
    let trimmed = normalize_text(name);
    // A key is never the sentinel; undo the null-mapping if it fired.
    if trimmed == TARGET && !name.trim().eq_ignore_ascii_case(TARGET) {
        name.trim().to_string()
    } else {
        trimmed
    }
}

fn key_value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        let re = Regex::new(
            r#"(?m)["'`]?([A-Za-z_][A-Za-z0-9_]*)["'`]?\s*[:=]\s*("[^"]*"|'[^']*'|[^,}{\n]+)"#,
        )
        .unwrap();
        re
    })
}

fn unquoted_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        let re = Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*[:=]"#).unwrap();
        re
    })
}

fn trailing_comma_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        let re = Regex::new(r#",\s*([}\]])"#).unwrap();
        re
    })
}

/// Lenient structured-text-to-mapping parsing with graceful degradation.
///
/// Fallback chain: strict JSON, relaxed JSON (code fences, single quotes,
/// Python literals, unquoted keys, `=` for `:`, trailing commas), then raw
/// key/value extraction. Fails only when nothing key/value-shaped remains.
pub fn parse_lenient(input: &str) -> Result<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(input) {
        return Ok(map);
    }

    let relaxed = relax(input);
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&relaxed) {
        return Ok(map);
    }

    let mut map = Map::new();
    for caps in key_value_regex().captures_iter(input) {
        let key = caps[1].to_string();
        let value = caps[2].trim().to_string();
        map.insert(key, Value::String(value));
    }
    if map.is_empty() {
        return Err(Error::validation(format!(
            "could not extract any parameters from '{}'",
            input.trim()
        )));
    }
    Ok(map)
}

/// Rewrite common LLM format drift into parseable JSON.
fn relax(input: &str) -> String {
    let mut s = input.trim().to_string();

    // Code fences
    if s.starts_with("```") {
        s = s
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
            .to_string();
    }

    // Python literals
    s = s.replace(": True", ": true").replace(": False", ": false");
    s = s.replace("=True", "=true").replace("=False", "=false");
    s = s.replace(": None", ": null").replace("=None", "=null");

    // Quote unquoted keys and turn assignment-style `=` into `:`
    s = unquoted_key_regex()
        .replace_all(&s, "$1\"$2\":")
        .to_string();

    // Remaining single-quoted strings
    s = s.replace('\'', "\"");

    // Trailing commas
    s = trailing_comma_regex().replace_all(&s, "$1").to_string();

    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn repair_map(value: Value) -> BTreeMap<String, RepairedValue> {
        match value {
            Value::Object(map) => repair(&map),
            _ => panic!("test input must be an object"),
        }
    }

    #[test]
    fn scalars_become_clean_strings() {
        let repaired = repair_map(json!({
            "radius": "  5.2   mm ",
            "count": 3,
            "flag": true,
        }));
        assert_eq!(repaired["radius"], RepairedValue::Scalar("5.2 mm".into()));
        assert_eq!(repaired["count"], RepairedValue::Scalar("3".into()));
        assert_eq!(repaired["flag"], RepairedValue::Scalar("true".into()));
    }

    #[test]
    fn null_like_spellings_collapse_to_sentinel() {
        for spelling in [
            json!("target"),
            json!("TARGET"),
            json!("Target"),
            json!("null"),
            json!("None"),
            json!("undefined"),
            json!(""),
            Value::Null,
        ] {
            let repaired = repair_map(json!({ "x": spelling }));
            assert_eq!(repaired["x"], RepairedValue::Scalar("target".into()));
        }
    }

    #[test]
    fn surrounding_quotes_are_stripped_to_fixed_point() {
        let repaired = repair_map(json!({
            "a": "'5 cm'",
            "b": "\"\"target\"\"",
            "c": "`10 bar`",
        }));
        assert_eq!(repaired["a"], RepairedValue::Scalar("5 cm".into()));
        assert_eq!(repaired["b"], RepairedValue::Scalar("target".into()));
        assert_eq!(repaired["c"], RepairedValue::Scalar("10 bar".into()));
    }

    #[test]
    fn arrays_repair_element_wise() {
        let repaired = repair_map(json!({
            "p": ["10 bar", "12 bar"],
            "sigma": ["target", null],
        }));
        assert_eq!(
            repaired["p"],
            RepairedValue::List(vec!["10 bar".into(), "12 bar".into()])
        );
        assert_eq!(
            repaired["sigma"],
            RepairedValue::List(vec!["target".into(), "target".into()])
        );
    }

    #[test]
    fn repair_is_idempotent() {
        let once = repair_map(json!({
            "radius": " '5.2  mm' ",
            "perimeter": "None",
            "batch": ["  '1 cm'", "undefined"],
        }));

        let as_json: Map<String, Value> = once
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    RepairedValue::Scalar(s) => Value::String(s.clone()),
                    RepairedValue::List(items) => {
                        Value::Array(items.iter().cloned().map(Value::String).collect())
                    }
                };
                (k.clone(), value)
            })
            .collect();
        let twice = repair(&as_json);
        assert_eq!(once, twice);
    }

    #[test]
    fn lenient_strict_json_passes_through() {
        let map = parse_lenient(r#"{"radius": "5 cm"}"#).unwrap();
        assert_eq!(map["radius"], json!("5 cm"));
    }

    #[test]
    fn lenient_assignment_style_free_text() {
        let map = parse_lenient("{p=10, d=100, sigma=160}").unwrap();
        assert_eq!(map.len(), 3);
        for key in ["p", "d", "sigma"] {
            assert!(map.contains_key(key), "missing {}", key);
        }
    }

    #[test]
    fn lenient_single_quotes_python_literals_code_fence() {
        let map =
            parse_lenient("```json\n{'radius': '5 cm', 'solve': True, 'extra': None,}\n```")
                .unwrap();
        assert_eq!(map["radius"], json!("5 cm"));
        assert_eq!(map["solve"], json!(true));
        assert_eq!(map["extra"], json!(null));
    }

    #[test]
    fn lenient_plain_key_value_lines() {
        let map = parse_lenient("radius: 5 cm\nperimeter: target").unwrap();
        assert_eq!(map["radius"], json!("5 cm"));
        assert_eq!(map["perimeter"], json!("target"));
    }

    #[test]
    fn lenient_hopeless_input_fails() {
        assert!(parse_lenient("!!!").is_err());
        assert!(parse_lenient("").is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn repair_twice_is_repair_once(values in proptest::collection::btree_map(
                "[a-z_]{1,8}",
                "[ -~]{0,24}",
                0..6,
            )) {
                let raw: Map<String, Value> = values
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                let once = repair(&raw);

                let reinput: Map<String, Value> = once
                    .iter()
                    .map(|(k, v)| {
                        (k.clone(), Value::String(v.as_scalar().unwrap_or_default().to_string()))
                    })
                    .collect();
                let twice = repair(&reinput);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
