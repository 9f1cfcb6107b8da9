//! `.env` files: a flat list of `KEY=value` assignments.
//!
//! Quoting follows the usual dotenv conventions. Double quotes strip and
//! process `\n \r \t \" \\ \$` escapes and may span lines, single quotes are
//! literal, and an unquoted value ends at a ` #` comment marker.

use super::{scalar_text, unrepresentable};
use crate::error::{ParseError, SerializeError};
use crate::serializer::Style;
use crate::types::{MergeNode, ObjectMap, PathSegment};

const FORMAT: &str = "env";

pub fn parse(text: &str) -> Result<MergeNode, ParseError> {
    let mut map = ObjectMap::new();
    let mut lines = text.lines().enumerate();

    while let Some((idx, raw)) = lines.next() {
        let line_no = idx + 1;
        let line = raw.trim_start();
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line
            .strip_prefix("export ")
            .map(str::trim_start)
            .unwrap_or(line);

        let (key, rest) = line
            .split_once('=')
            .ok_or_else(|| ParseError::syntax(line_no, "expected `KEY=value`"))?;
        let key = key.trim();
        if !is_valid_key(key) {
            return Err(ParseError::syntax(line_no, format!("invalid key `{}`", key)));
        }

        let trimmed = rest.trim_start();
        let value = if let Some(body) = trimmed.strip_prefix('"') {
            let mut buf = body.to_string();
            let end = loop {
                if let Some(end) = closing_quote(&buf) {
                    break end;
                }
                let (_, next) = lines.next().ok_or_else(|| {
                    ParseError::syntax(line_no, "unterminated double-quoted value")
                })?;
                buf.push('\n');
                buf.push_str(next);
            };
            check_trailing(&buf[end + 1..], line_no)?;
            unescape(&buf[..end])
        } else if let Some(body) = trimmed.strip_prefix('\'') {
            let end = body.find('\'').ok_or_else(|| {
                ParseError::syntax(line_no, "unterminated single-quoted value")
            })?;
            check_trailing(&body[end + 1..], line_no)?;
            body[..end].to_string()
        } else {
            strip_comment(rest).trim().to_string()
        };

        map.insert(key.to_string(), MergeNode::String(value));
    }
    Ok(MergeNode::Object(map))
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Byte offset of the first unescaped `"`.
fn closing_quote(body: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }
    None
}

/// After a closing quote only whitespace or a comment may follow.
fn check_trailing(rest: &str, line_no: usize) -> Result<(), ParseError> {
    let rest = rest.trim();
    if rest.is_empty() || rest.starts_with('#') {
        Ok(())
    } else {
        Err(ParseError::syntax(line_no, "unexpected text after closing quote"))
    }
}

/// Cut an unquoted value at a `#` that follows whitespace. A value that
/// starts with `#` directly after `=` keeps it.
fn strip_comment(value: &str) -> &str {
    let mut prev_ws = false;
    for (i, c) in value.char_indices() {
        if c == '#' && prev_ws {
            return &value[..i];
        }
        prev_ws = c.is_whitespace();
    }
    value
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('$') => out.push('$'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

pub fn serialize(node: &MergeNode, style: &Style) -> Result<String, SerializeError> {
    let MergeNode::Object(map) = node else {
        return Err(unrepresentable(&[], FORMAT, "top level must be a flat table"));
    };

    let prefix = if style.env_export { "export " } else { "" };
    let mut lines = Vec::with_capacity(map.len());
    for (key, value) in map {
        let path = [PathSegment::Key(key.clone())];
        if !is_valid_key(key) {
            return Err(unrepresentable(&path, FORMAT, "not a valid variable name"));
        }
        let text = scalar_text(value)
            .ok_or_else(|| unrepresentable(&path, FORMAT, "env files cannot nest"))?;
        lines.push(format!("{}{}={}", prefix, key, quote_if_needed(&text)));
    }

    if lines.is_empty() {
        return Ok(String::new());
    }
    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

fn quote_if_needed(value: &str) -> String {
    let bare = value
        .chars()
        .all(|c| !c.is_whitespace() && !matches!(c, '#' | '"' | '\'' | '\\'));
    if bare {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: serde_json::Value) -> MergeNode {
        MergeNode::from_json_value(value)
    }

    #[test]
    fn test_parse_quoting_rules() {
        let text = r#"
# database
DB_HOST=localhost
DB_PASS='p@ss "word" \n'
GREETING="hello\nworld" # trailing comment
export API_URL = https://example.com/a#frag
EMPTY=
HASH=#notacomment
PORT=5432 # default port
"#;
        let expected = node(json!({
            "DB_HOST": "localhost",
            "DB_PASS": "p@ss \"word\" \\n",
            "GREETING": "hello\nworld",
            "API_URL": "https://example.com/a#frag",
            "EMPTY": "",
            "HASH": "#notacomment",
            "PORT": "5432"
        }));
        assert_eq!(parse(text).unwrap(), expected);
    }

    #[test]
    fn test_multiline_double_quoted_value() {
        let text = "KEY=\"-----BEGIN KEY-----\nabc\n-----END KEY-----\"\nNEXT=1\n";
        let parsed = parse(text).unwrap();
        assert_eq!(
            parsed,
            node(json!({"KEY": "-----BEGIN KEY-----\nabc\n-----END KEY-----", "NEXT": "1"}))
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            parse("A=1\nnot an assignment\n").unwrap_err(),
            ParseError::Syntax { line: 2, .. }
        ));
        assert!(parse("1BAD=x\n").is_err());
        assert!(parse("A=\"open\n").is_err());
        assert!(parse("A='x' junk\n").is_err());
    }

    #[test]
    fn test_serialize_quotes_when_needed() {
        let tree = node(json!({
            "PLAIN": "abc",
            "SPACED": "a b",
            "QUOTE": "say \"hi\"",
            "MULTI": "one\ntwo",
            "NUM": 3,
            "NOTHING": null
        }));
        let out = serialize(&tree, &Style::default()).unwrap();
        assert_eq!(
            out,
            "PLAIN=abc\nSPACED=\"a b\"\nQUOTE=\"say \\\"hi\\\"\"\nMULTI=\"one\\ntwo\"\nNUM=3\nNOTHING=\n"
        );
    }

    #[test]
    fn test_serialize_export_style() {
        let style = Style {
            env_export: true,
            ..Style::default()
        };
        let out = serialize(&node(json!({"A": "1"})), &style).unwrap();
        assert_eq!(out, "export A=1\n");
    }

    #[test]
    fn test_serialize_rejects_nesting() {
        let err = serialize(&node(json!({"A": {"B": "1"}})), &Style::default()).unwrap_err();
        assert!(matches!(err, SerializeError::Unrepresentable { .. }));
    }

    #[test]
    fn test_round_trip() {
        let text = "A=1\nB='lit $x \\ y'\nC=\"esc \\\" \\\\ \\t\"\nD=has#hash\n";
        let first = parse(text).unwrap();
        let written = serialize(&first, &Style::default()).unwrap();
        assert_eq!(parse(&written).unwrap(), first);
    }
}
