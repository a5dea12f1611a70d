// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The textual (YAML-ish) payload grammar (C2): a small line-structured
//! subset, not a general parser. Three keys are recognized, each on its own
//! line, in any order: `method`, `args`, `trigger`.

/// Hard arity cap shared with the dispatcher (spec §3, §4.5).
pub const MAX_ARITY: usize = 10;

/// The parsed form of a payload: `{method, args[], trigger?}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPayload {
    pub method: Option<String>,
    pub args: Vec<String>,
    pub trigger: Option<String>,
}

/// Parse a payload string into `{method, args[], trigger?}`.
///
/// Lines that do not contain a recognized key are skipped. If `args` cannot
/// be parsed (missing `{…}` or a malformed pair), `args` is set to `[]` and
/// parsing continues — the caller still dispatches, possibly failing the
/// arity check.
pub fn parse_payload(text: &str) -> ParsedPayload {
    let mut parsed = ParsedPayload::default();
    for line in text.lines() {
        if line.contains("method") {
            parsed.method = extract_scalar(line);
        } else if line.contains("args") {
            parsed.args = parse_args(line);
        } else if line.contains("trigger") {
            parsed.trigger = extract_scalar(line);
        }
    }
    parsed
}

/// Extract a `key: VALUE` scalar: trimmed of whitespace and quotes, cut at
/// the next comma if present.
fn extract_scalar(line: &str) -> Option<String> {
    let idx = line.find(':')?;
    let rest = &line[idx + 1..];
    let value = rest.split(',').next().unwrap_or("").trim();
    let value = strip_quotes(value);
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn strip_quotes(s: &str) -> String {
    s.trim_matches(|c| c == '\'' || c == '"').trim().to_string()
}

/// Extract `args: { K1: V1, K2: V2, … }` values, positionally, discarding
/// keys. Returns `[]` for `{}` and for anything malformed (missing braces,
/// or a pair without a `:`), per spec §4.2.
fn parse_args(line: &str) -> Vec<String> {
    let Some(colon) = line.find(':') else {
        return Vec::new();
    };
    let rest = &line[colon + 1..];
    let Some(open) = rest.find('{') else {
        return Vec::new();
    };
    let inner_start = open + 1;
    let Some(close_rel) = rest[inner_start..].find('}') else {
        return Vec::new();
    };
    let inner = &rest[inner_start..inner_start + close_rel];
    let inner = inner.replace(['\'', '"'], " ");
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut values = Vec::new();
    for pair in trimmed.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        match pair.find(':') {
            Some(i) => values.push(pair[i + 1..].trim().to_string()),
            None => return Vec::new(),
        }
    }

    if values.len() > MAX_ARITY {
        tracing::warn!(count = values.len(), "args exceed hard arity cap of 10, truncating");
        values.truncate(MAX_ARITY);
    }
    values
}

/// Render a dictionary return value into the flat grammar fragment used
/// inside `{event: E, <fragment>, nodes: H}` (spec §4.2).
pub fn render_dict(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_method_args_trigger() {
        let payload = "method: echo\nargs: { x: '42' }\ntrigger: echoed\n";
        let parsed = parse_payload(payload);
        assert_eq!(parsed.method.as_deref(), Some("echo"));
        assert_eq!(parsed.args, vec!["42".to_string()]);
        assert_eq!(parsed.trigger.as_deref(), Some("echoed"));
    }

    #[test]
    fn empty_args_is_zero_arity() {
        let parsed = parse_payload("method: stop\nargs: {}\n");
        assert_eq!(parsed.method.as_deref(), Some("stop"));
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn multiple_positional_args_keys_discarded() {
        let parsed = parse_payload("method: stats\nargs: { a: \"one\", b: 2, c: 'three' }\n");
        assert_eq!(parsed.args, vec!["one", "2", "three"]);
    }

    #[test]
    fn missing_braces_resets_args_but_still_dispatches() {
        let parsed = parse_payload("method: foo\nargs: not-a-dict\n");
        assert_eq!(parsed.method.as_deref(), Some("foo"));
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn malformed_pair_resets_whole_args() {
        let parsed = parse_payload("method: foo\nargs: { a: 1, justakey }\n");
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn trigger_is_optional() {
        let parsed = parse_payload("method: foo\nargs: {}\n");
        assert!(parsed.trigger.is_none());
    }

    #[test]
    fn unrelated_lines_are_skipped() {
        let parsed = parse_payload("# a comment\nmethod: foo\nsomething: else\nargs: {}\n");
        assert_eq!(parsed.method.as_deref(), Some("foo"));
    }

    #[test]
    fn args_capped_at_ten() {
        let line = "args: { a:0, b:1, c:2, d:3, e:4, f:5, g:6, h:7, i:8, j:9, k:10 }";
        let parsed = parse_payload(&format!("method: m\n{line}\n"));
        assert_eq!(parsed.args.len(), MAX_ARITY);
    }

    #[test]
    fn render_dict_matches_grammar_fragment() {
        let pairs = vec![
            ("mean".to_string(), "3.5".to_string()),
            ("count".to_string(), "2".to_string()),
        ];
        assert_eq!(render_dict(&pairs), "mean: 3.5, count: 2");
    }

    #[test]
    fn render_dict_empty() {
        assert_eq!(render_dict(&[]), "");
    }
}
