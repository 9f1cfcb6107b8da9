//! YAML via the tree-sitter YAML grammar.
//!
//! The document is parsed into a concrete syntax tree and lowered into a
//! [`MergeNode`]. Only the data-model subset of YAML is accepted: block and
//! flow collections plus scalars. Anchors, aliases, tags and multi-document
//! streams are rejected up front with [`ParseError::Unsupported`] rather than
//! being flattened, since writing the merged tree back would silently drop
//! them.
//!
//! Plain scalars are resolved with the YAML 1.2 core schema (`null`, `~`,
//! booleans, decimal integers and floats). Hex/octal integers and `.inf` /
//! `.nan` stay strings.

use serde_json::Number;
use tree_sitter::{Node, Parser};

use crate::error::{ParseError, SerializeError};
use crate::serializer::Style;
use crate::types::{MergeNode, ObjectMap};

pub fn parse(text: &str) -> Result<MergeNode, ParseError> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_yaml::LANGUAGE.into();
    parser
        .set_language(&language)
        .map_err(|e| ParseError::Grammar(e.to_string()))?;

    let tree = parser
        .parse(text, None)
        .ok_or_else(|| ParseError::syntax(1, "parser produced no tree"))?;
    let root = tree.root_node();

    reject_unsupported(root)?;
    if root.has_error() {
        return Err(first_error(root));
    }

    Lowering {
        source: text.as_bytes(),
    }
    .stream(root)
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// Fail on the first construct the tree model cannot carry.
fn reject_unsupported(node: Node<'_>) -> Result<(), ParseError> {
    let construct = match node.kind() {
        "anchor" => Some("anchor"),
        "alias" => Some("alias"),
        "tag" => Some("tag"),
        "tag_directive" => Some("tag directive"),
        _ => None,
    };
    if let Some(construct) = construct {
        return Err(ParseError::Unsupported {
            construct,
            line: line_of(node),
        });
    }

    if node.kind() == "stream" {
        let documents: Vec<Node<'_>> = named_children(node)
            .into_iter()
            .filter(|n| n.kind() == "document")
            .collect();
        if let Some(second) = documents.get(1) {
            return Err(ParseError::Unsupported {
                construct: "multi-document stream",
                line: line_of(*second),
            });
        }
    }

    for child in named_children(node) {
        reject_unsupported(child)?;
    }
    Ok(())
}

fn first_error(node: Node<'_>) -> ParseError {
    if node.is_missing() {
        return ParseError::syntax(line_of(node), format!("missing `{}`", node.kind()));
    }
    if node.is_error() {
        return ParseError::syntax(line_of(node), "unexpected input");
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .find(|c| c.has_error())
        .map(first_error)
        .unwrap_or_else(|| ParseError::syntax(line_of(node), "unexpected input"))
}

struct Lowering<'s> {
    source: &'s [u8],
}

impl Lowering<'_> {
    fn text(&self, node: Node<'_>) -> Result<&str, ParseError> {
        node.utf8_text(self.source)
            .map_err(|_| ParseError::InvalidUtf8)
    }

    /// Line breaks after the last non-blank byte of `node`, up to the next
    /// line with content. Keep chomping needs them and the grammar leaves
    /// trailing blank lines outside the scalar.
    fn trailing_breaks(&self, node: Node<'_>) -> usize {
        let body = &self.source[node.start_byte()..node.end_byte()];
        let last = body
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(node.start_byte(), |p| node.start_byte() + p + 1);
        self.source[last..]
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .filter(|b| **b == b'\n')
            .count()
    }

    fn stream(&self, stream: Node<'_>) -> Result<MergeNode, ParseError> {
        let children = named_children(stream);
        match children.iter().find(|n| n.kind() == "document") {
            Some(document) => self.document(*document),
            None => self.document(stream),
        }
    }

    /// An empty document is an empty mapping: a config file with nothing in
    /// it yet.
    fn document(&self, document: Node<'_>) -> Result<MergeNode, ParseError> {
        let content = named_children(document)
            .into_iter()
            .find(|n| matches!(n.kind(), "block_node" | "flow_node"));
        match content {
            Some(node) => self.node(node),
            None => Ok(MergeNode::empty_object()),
        }
    }

    fn node(&self, node: Node<'_>) -> Result<MergeNode, ParseError> {
        match node.kind() {
            "block_node" | "flow_node" => match content_child(node) {
                Some(inner) => self.node(inner),
                None => Ok(MergeNode::Null),
            },
            "block_mapping" => self.block_mapping(node),
            "flow_mapping" => self.flow_mapping(node),
            "block_sequence" => self.block_sequence(node),
            "flow_sequence" => self.flow_sequence(node),
            "plain_scalar" => Ok(resolve_plain(&fold_lines(self.text(node)?.trim()))),
            "single_quote_scalar" => Ok(MergeNode::String(self.single_quoted(node)?)),
            "double_quote_scalar" => Ok(MergeNode::String(self.double_quoted(node)?)),
            "block_scalar" => Ok(MergeNode::String(block_scalar(
                self.text(node)?,
                self.trailing_breaks(node),
            ))),
            "ERROR" => Err(ParseError::syntax(line_of(node), "unexpected input")),
            other => Err(ParseError::syntax(
                line_of(node),
                format!("unexpected `{}` node", other),
            )),
        }
    }

    fn block_mapping(&self, node: Node<'_>) -> Result<MergeNode, ParseError> {
        let mut map = ObjectMap::new();
        for pair in named_children(node) {
            if pair.kind() == "block_mapping_pair" {
                self.insert_pair(&mut map, pair)?;
            }
        }
        Ok(MergeNode::Object(map))
    }

    fn flow_mapping(&self, node: Node<'_>) -> Result<MergeNode, ParseError> {
        let mut map = ObjectMap::new();
        for child in named_children(node) {
            match child.kind() {
                "flow_pair" => self.insert_pair(&mut map, child)?,
                // `{ a, b }` shorthand: keys with null values
                "flow_node" => insert_unique(&mut map, self.key(child)?, MergeNode::Null, child)?,
                _ => {}
            }
        }
        Ok(MergeNode::Object(map))
    }

    fn insert_pair(&self, map: &mut ObjectMap, pair: Node<'_>) -> Result<(), ParseError> {
        let key = match pair.child_by_field_name("key") {
            Some(key) => self.key(key)?,
            None => String::new(),
        };
        let value = match pair.child_by_field_name("value") {
            Some(value) => self.node(value)?,
            None => MergeNode::Null,
        };
        insert_unique(map, key, value, pair)
    }

    fn block_sequence(&self, node: Node<'_>) -> Result<MergeNode, ParseError> {
        let mut items = Vec::new();
        for item in named_children(node) {
            if item.kind() != "block_sequence_item" {
                continue;
            }
            let value = match content_child(item) {
                Some(inner) => self.node(inner)?,
                None => MergeNode::Null,
            };
            items.push(value);
        }
        Ok(MergeNode::Array(items))
    }

    fn flow_sequence(&self, node: Node<'_>) -> Result<MergeNode, ParseError> {
        let mut items = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "flow_node" => items.push(self.node(child)?),
                // `[a: 1]` is a sequence holding a single-pair mapping
                "flow_pair" => {
                    let mut map = ObjectMap::new();
                    self.insert_pair(&mut map, child)?;
                    items.push(MergeNode::Object(map));
                }
                _ => {}
            }
        }
        Ok(MergeNode::Array(items))
    }

    /// Mapping keys are read verbatim, without type resolution, so `1.0:`
    /// and `true:` keep their spelling.
    fn key(&self, node: Node<'_>) -> Result<String, ParseError> {
        match node.kind() {
            "block_node" | "flow_node" => match content_child(node) {
                Some(inner) => self.key(inner),
                None => Ok(String::new()),
            },
            "plain_scalar" => Ok(fold_lines(self.text(node)?.trim())),
            "single_quote_scalar" => self.single_quoted(node),
            "double_quote_scalar" => self.double_quoted(node),
            _ => Err(ParseError::Unsupported {
                construct: "complex mapping key",
                line: line_of(node),
            }),
        }
    }

    fn single_quoted(&self, node: Node<'_>) -> Result<String, ParseError> {
        let raw = strip_quotes(self.text(node)?, '\'');
        Ok(fold_lines(raw).replace("''", "'"))
    }

    fn double_quoted(&self, node: Node<'_>) -> Result<String, ParseError> {
        let raw = strip_quotes(self.text(node)?, '"');
        unescape_double(&fold_lines(raw), line_of(node))
    }
}

/// The single value-bearing child of a node wrapper, skipping comments.
fn insert_unique(
    map: &mut ObjectMap,
    key: String,
    value: MergeNode,
    at: Node<'_>,
) -> Result<(), ParseError> {
    if map.contains_key(&key) {
        return Err(ParseError::syntax(
            line_of(at),
            format!("duplicate mapping key `{}`", key),
        ));
    }
    map.insert(key, value);
    Ok(())
}

fn content_child(node: Node<'_>) -> Option<Node<'_>> {
    named_children(node)
        .into_iter()
        .find(|n| n.kind() != "comment")
}

fn strip_quotes(text: &str, quote: char) -> &str {
    let text = text.strip_prefix(quote).unwrap_or(text);
    text.strip_suffix(quote).unwrap_or(text)
}

/// Resolve a plain scalar with the core schema.
fn resolve_plain(text: &str) -> MergeNode {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return MergeNode::Null,
        "true" | "True" | "TRUE" => return MergeNode::Bool(true),
        "false" | "False" | "FALSE" => return MergeNode::Bool(false),
        _ => {}
    }
    match parse_number(text) {
        Some(n) => MergeNode::Number(n),
        None => MergeNode::String(text.to_string()),
    }
}

fn parse_number(text: &str) -> Option<Number> {
    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    if unsigned.is_empty() {
        return None;
    }

    if unsigned.bytes().all(|b| b.is_ascii_digit()) {
        if !text.starts_with('-') {
            if let Ok(n) = text.parse::<u64>() {
                return Some(Number::from(n));
            }
        } else if let Ok(n) = text.parse::<i64>() {
            return Some(Number::from(n));
        }
        return json_number(text);
    }

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(pos) => (&unsigned[..pos], Some(&unsigned[pos + 1..])),
        None => (unsigned, None),
    };
    let mantissa_ok = mantissa.bytes().filter(|b| *b == b'.').count() <= 1
        && mantissa.bytes().any(|b| b.is_ascii_digit())
        && mantissa.bytes().all(|b| b.is_ascii_digit() || b == b'.');
    let exponent_ok = exponent.is_none_or(|exp| {
        let digits = exp.strip_prefix(['-', '+']).unwrap_or(exp);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    });
    if !mantissa_ok || !exponent_ok || (exponent.is_none() && !mantissa.contains('.')) {
        return None;
    }
    json_number(text).or_else(|| text.parse::<f64>().ok().and_then(Number::from_f64))
}

/// The literal itself when it is also a JSON number, so big or very precise
/// values keep every digit.
fn json_number(text: &str) -> Option<Number> {
    serde_json::from_str(text).ok()
}

/// Flow scalar line folding: a single line break becomes a space, each
/// blank line becomes a newline.
fn fold_lines(raw: &str) -> String {
    let lines: Vec<&str> = raw.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    if lines.len() == 1 {
        return raw.to_string();
    }
    let last = lines.len() - 1;
    let mut out = String::new();
    let mut blank_lines = 0;
    for (i, line) in lines.iter().enumerate() {
        let mut line = *line;
        if i > 0 {
            line = line.trim_start();
        }
        if i < last {
            line = line.trim_end();
        }
        if i > 0 && i < last && line.is_empty() {
            blank_lines += 1;
            continue;
        }
        if i > 0 {
            if blank_lines == 0 {
                out.push(' ');
            }
            for _ in 0..blank_lines {
                out.push('\n');
            }
            blank_lines = 0;
        }
        out.push_str(line);
    }
    out
}

fn unescape_double(raw: &str, line: usize) -> Result<String, ParseError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = chars
            .next()
            .ok_or_else(|| ParseError::syntax(line, "dangling escape"))?;
        match escaped {
            '0' => out.push('\0'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            't' | '\t' => out.push('\t'),
            'n' => out.push('\n'),
            'v' => out.push('\u{0B}'),
            'f' => out.push('\u{0C}'),
            'r' => out.push('\r'),
            'e' => out.push('\u{1B}'),
            ' ' => out.push(' '),
            '"' => out.push('"'),
            '/' => out.push('/'),
            '\\' => out.push('\\'),
            'N' => out.push('\u{85}'),
            '_' => out.push('\u{A0}'),
            'L' => out.push('\u{2028}'),
            'P' => out.push('\u{2029}'),
            'x' => out.push(hex_char(&mut chars, 2, line)?),
            'u' => out.push(hex_char(&mut chars, 4, line)?),
            'U' => out.push(hex_char(&mut chars, 8, line)?),
            other => {
                return Err(ParseError::syntax(
                    line,
                    format!("unknown escape `\\{}`", other),
                ));
            }
        }
    }
    Ok(out)
}

fn hex_char(chars: &mut std::str::Chars<'_>, len: usize, line: usize) -> Result<char, ParseError> {
    let digits: String = chars.take(len).collect();
    u32::from_str_radix(&digits, 16)
        .ok()
        .filter(|_| digits.len() == len)
        .and_then(char::from_u32)
        .ok_or_else(|| ParseError::syntax(line, format!("invalid escape digits `{}`", digits)))
}

/// Literal (`|`) and folded (`>`) block scalars. The node text starts at the
/// indicator and runs to the end of the last content line; `trailing_breaks`
/// counts the line breaks from there to the next token.
fn block_scalar(text: &str, trailing_breaks: usize) -> String {
    let (header, body) = text.split_once('\n').unwrap_or((text, ""));
    let header = header.split('#').next().unwrap_or_default().trim();
    let folded = header.starts_with('>');
    let chomp = if header.contains('-') {
        Chomp::Strip
    } else if header.contains('+') {
        Chomp::Keep
    } else {
        Chomp::Clip
    };

    let lines: Vec<&str> = body.lines().map(|l| l.trim_end_matches('\r')).collect();
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);
    let dedented: Vec<&str> = lines
        .iter()
        .map(|l| if l.trim().is_empty() { "" } else { &l[indent..] })
        .collect();

    let mut content = if folded {
        fold_block(&dedented)
    } else {
        dedented.join("\n")
    };

    let trimmed_len = content.trim_end_matches('\n').len();
    content.truncate(trimmed_len);
    match chomp {
        Chomp::Strip => {}
        Chomp::Clip if content.is_empty() => {}
        Chomp::Clip => content.push('\n'),
        Chomp::Keep => {
            // with no content the header's own break is not part of the value
            let breaks = if content.is_empty() {
                trailing_breaks.saturating_sub(1)
            } else {
                trailing_breaks
            };
            content.push_str(&"\n".repeat(breaks));
        }
    }
    content
}

enum Chomp {
    Strip,
    Clip,
    Keep,
}

/// Folding for `>` scalars: adjacent lines join with a space, blank lines
/// and more-indented lines keep their breaks.
fn fold_block(lines: &[&str]) -> String {
    let mut out = String::new();
    let mut prev_plain = false;
    for line in lines {
        if line.is_empty() {
            out.push('\n');
            prev_plain = false;
            continue;
        }
        let more_indented = line.starts_with([' ', '\t']);
        if prev_plain && !more_indented {
            out.push(' ');
        } else if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(line);
        prev_plain = !more_indented;
    }
    out
}

// ── Serialization ──

pub fn serialize(node: &MergeNode, style: &Style) -> Result<String, SerializeError> {
    let indent = style.yaml_indent();
    let lines = match node {
        MergeNode::Array(items) if !items.is_empty() => block_lines(node, indent),
        MergeNode::Object(map) if !map.is_empty() => block_lines(node, indent),
        other => vec![inline(other)],
    };
    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

/// Block-style lines for a non-empty container, relative to column 0.
fn block_lines(node: &MergeNode, indent: usize) -> Vec<String> {
    let pad = " ".repeat(indent);
    let mut lines = Vec::new();
    match node {
        MergeNode::Object(map) => {
            for (key, value) in map {
                let key = scalar_string(key);
                if is_nonempty_container(value) {
                    lines.push(format!("{}:", key));
                    for line in block_lines(value, indent) {
                        lines.push(format!("{}{}", pad, line));
                    }
                } else {
                    lines.push(format!("{}: {}", key, inline(value)));
                }
            }
        }
        MergeNode::Array(items) => {
            for item in items {
                if is_nonempty_container(item) {
                    for (i, line) in block_lines(item, indent).into_iter().enumerate() {
                        let prefix = if i == 0 { "- " } else { "  " };
                        lines.push(format!("{}{}", prefix, line));
                    }
                } else {
                    lines.push(format!("- {}", inline(item)));
                }
            }
        }
        scalar => lines.push(inline(scalar)),
    }
    lines
}

fn is_nonempty_container(node: &MergeNode) -> bool {
    match node {
        MergeNode::Array(items) => !items.is_empty(),
        MergeNode::Object(map) => !map.is_empty(),
        _ => false,
    }
}

fn inline(node: &MergeNode) -> String {
    match node {
        MergeNode::Null => "null".to_string(),
        MergeNode::Bool(b) => b.to_string(),
        MergeNode::Number(n) => n.to_string(),
        MergeNode::String(s) => scalar_string(s),
        MergeNode::Array(_) => "[]".to_string(),
        MergeNode::Object(_) => "{}".to_string(),
    }
}

/// A string as a plain scalar when it reads back unchanged, otherwise
/// double-quoted.
fn scalar_string(s: &str) -> String {
    if needs_quotes(s) {
        quote_double(s)
    } else {
        s.to_string()
    }
}

fn needs_quotes(s: &str) -> bool {
    const LEADING_INDICATORS: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@',
        '`', '.',
    ];
    s.is_empty()
        || resolve_plain(s) != MergeNode::String(s.to_string())
        || s.starts_with(LEADING_INDICATORS)
        || s.starts_with(char::is_whitespace)
        || s.ends_with(char::is_whitespace)
        || s.ends_with(':')
        || s.contains(": ")
        || s.contains(" #")
        || s.chars().any(char::is_control)
}

fn quote_double(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
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
    fn test_parse_block_mapping_and_sequence() {
        let text = "\
name: ci
on:
  push:
    branches:
      - main
      - 'release/*'
jobs:
  build:
    runs-on: ubuntu-latest
    timeout-minutes: 30
    steps:
      - uses: actions/checkout@v4
      - run: npm test
        env:
          CI: true
";
        let expected = node(json!({
            "name": "ci",
            "on": {"push": {"branches": ["main", "release/*"]}},
            "jobs": {"build": {
                "runs-on": "ubuntu-latest",
                "timeout-minutes": 30,
                "steps": [
                    {"uses": "actions/checkout@v4"},
                    {"run": "npm test", "env": {"CI": true}}
                ]
            }}
        }));
        assert_eq!(parse(text).unwrap(), expected);
    }

    #[test]
    fn test_parse_flow_collections_and_comments() {
        let text = "# tooling\nextends: [base, strict] # inline\nrules: {semi: off, quotes: \"double\"}\n";
        let expected = node(json!({
            "extends": ["base", "strict"],
            "rules": {"semi": "off", "quotes": "double"}
        }));
        assert_eq!(parse(text).unwrap(), expected);
    }

    #[test]
    fn test_core_schema_resolution() {
        let text = "a: ~\nb: TRUE\nc: -12\nd: 1.5\ne: 0x1F\nf: 1.0.0\ng:\nh: '42'\n";
        let parsed = parse(text).unwrap();
        let map = parsed.as_object().unwrap();
        assert_eq!(map["a"], MergeNode::Null);
        assert_eq!(map["b"], MergeNode::Bool(true));
        assert_eq!(map["c"], node(json!(-12)));
        assert_eq!(map["d"], node(json!(1.5)));
        assert_eq!(map["e"], MergeNode::String("0x1F".into()));
        assert_eq!(map["f"], MergeNode::String("1.0.0".into()));
        assert_eq!(map["g"], MergeNode::Null);
        assert_eq!(map["h"], MergeNode::String("42".into()));
    }

    #[test]
    fn test_block_scalars() {
        let text = "script: |\n  echo one\n  echo two\nsummary: >-\n  folded\n  text\n";
        let parsed = parse(text).unwrap();
        let map = parsed.as_object().unwrap();
        assert_eq!(map["script"].as_str(), Some("echo one\necho two\n"));
        assert_eq!(map["summary"].as_str(), Some("folded text"));
    }

    #[test]
    fn test_keep_chomping_keeps_trailing_blank_lines() {
        let parsed = parse("a: |+\n  line\n\n\nb: 1\n").unwrap();
        let map = parsed.as_object().unwrap();
        assert_eq!(map["a"].as_str(), Some("line\n\n\n"));
        assert_eq!(map["b"], node(json!(1)));

        let folded = parse("a: >+\n  one\n  two\n\n").unwrap();
        assert_eq!(folded.as_object().unwrap()["a"].as_str(), Some("one two\n\n"));

        let clip = parse("a: |\n  line\n\n\nb: 1\n").unwrap();
        assert_eq!(clip.as_object().unwrap()["a"].as_str(), Some("line\n"));
    }

    #[test]
    fn test_large_numbers_keep_their_digits() {
        let parsed = parse("id: 123456789012345678901234567890\nexp: 1e400\n").unwrap();
        let out = serialize(&parsed, &Style::default()).unwrap();
        assert_eq!(out, "id: 123456789012345678901234567890\nexp: 1e400\n");
        assert!(matches!(parsed.as_object().unwrap()["id"], MergeNode::Number(_)));
    }

    #[test]
    fn test_duplicate_keys_are_syntax_errors() {
        let err = parse("a: b\na: c\n").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 2, .. }));

        let err = parse("rules: {semi: off, semi: on}\n").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_double_quoted_escapes() {
        let parsed = parse("msg: \"tab\\there \\u00e9 \\\"q\\\"\"\n").unwrap();
        assert_eq!(parsed.as_object().unwrap()["msg"].as_str(), Some("tab\there é \"q\""));
    }

    #[test]
    fn test_empty_document_is_empty_mapping() {
        assert_eq!(parse("# only a comment\n").unwrap(), MergeNode::empty_object());
    }

    #[test]
    fn test_anchors_and_aliases_are_rejected() {
        let text = "base: &base\n  a: 1\nchild:\n  <<: *base\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Unsupported { construct: "anchor", line: 1 }
        ));
    }

    #[test]
    fn test_tags_are_rejected() {
        let err = parse("value: !!str 12\n").unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_multi_document_stream_is_rejected() {
        let err = parse("a: 1\n---\nb: 2\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Unsupported { construct: "multi-document stream", .. }
        ));
    }

    #[test]
    fn test_unclosed_flow_mapping_is_syntax_error() {
        let err = parse("rules: {semi: off\n").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_serialize_block_style() {
        let tree = node(json!({
            "name": "ci",
            "steps": [{"uses": "a", "with": {"x": 1}}, "plain"],
            "empty": {},
            "none": []
        }));
        let out = serialize(&tree, &Style::default()).unwrap();
        let expected = "\
name: ci
steps:
  - uses: a
    with:
      x: 1
  - plain
empty: {}
none: []
";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_serialize_quotes_ambiguous_strings() {
        let tree = node(json!({
            "version": "3.10",
            "flag": "true",
            "empty": "",
            "nul": "null",
            "colon": "a: b",
            "comment": "x #y",
            "lead": "*star",
            "multi": "one\ntwo",
        }));
        let out = serialize(&tree, &Style::default()).unwrap();
        assert!(out.contains("version: \"3.10\""));
        assert!(out.contains("flag: \"true\""));
        assert!(out.contains("multi: \"one\\ntwo\""));
        assert_eq!(parse(&out).unwrap(), tree);
    }

    #[test]
    fn test_round_trip() {
        let text = "\
version: 2
updates:
  - package-ecosystem: npm
    directory: /
    schedule: {interval: weekly}
    ignore:
      - dependency-name: 'left-pad'
        versions: [\"1.x\", \"2.x\"]
    labels: []
ratio: 0.25
nested:
  - - a
    - b
  - []
";
        let first = parse(text).unwrap();
        let written = serialize(&first, &Style::default()).unwrap();
        assert_eq!(parse(&written).unwrap(), first);
    }

    #[test]
    fn test_fold_lines() {
        assert_eq!(fold_lines("a\n  b"), "a b");
        assert_eq!(fold_lines("a\n\n  b"), "a\nb");
        assert_eq!(fold_lines("single"), "single");
    }
}
