//! INI / properties files.
//!
//! Shape: keys before the first `[section]` sit at the root; each section is
//! one nested object. Values are always strings. A key with an empty value
//! followed by lines indented deeper than the key takes those lines as a
//! multi-line value, the way `setup.cfg` lists dependencies; the value then
//! starts with `\n`. Lines at the key's own indent are keys, as in git config.

use indexmap::IndexMap;

use super::{scalar_text, unrepresentable};
use crate::error::{ParseError, SerializeError};
use crate::serializer::Style;
use crate::types::{MergeNode, ObjectMap, PathSegment};

const FORMAT: &str = "ini";

pub fn parse(text: &str) -> Result<MergeNode, ParseError> {
    let mut root = ObjectMap::new();
    let mut sections: IndexMap<String, ObjectMap> = IndexMap::new();
    let mut current: Option<String> = None;
    // key whose value is still accepting continuation lines, with its indent
    let mut open_key: Option<(String, usize)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() {
            continue;
        }
        if line.starts_with([';', '#']) {
            open_key = None;
            continue;
        }

        let entries = match &current {
            Some(name) => sections.entry(name.clone()).or_default(),
            None => &mut root,
        };

        let indent = raw.len() - raw.trim_start().len();
        if let Some((key, key_indent)) = &open_key {
            if indent > *key_indent {
                if let Some(MergeNode::String(value)) = entries.get_mut(key) {
                    value.push('\n');
                    value.push_str(line);
                    continue;
                }
            }
        }

        if line.starts_with('[') {
            let name = section_name(line).ok_or_else(|| {
                ParseError::syntax(line_no, format!("malformed section header `{}`", line))
            })?;
            sections.entry(name.to_string()).or_default();
            current = Some(name.to_string());
            open_key = None;
            continue;
        }

        let (key, value) = split_key_value(line)
            .ok_or_else(|| ParseError::syntax(line_no, "expected `key = value`"))?;
        entries.insert(key.to_string(), MergeNode::String(value.to_string()));
        open_key = value.is_empty().then(|| (key.to_string(), indent));
    }

    for (name, entries) in sections {
        root.insert(name, MergeNode::Object(entries));
    }
    Ok(MergeNode::Object(root))
}

/// `[name]`, optionally followed by a comment.
fn section_name(line: &str) -> Option<&str> {
    let close = line.find(']')?;
    let rest = line[close + 1..].trim();
    if !rest.is_empty() && !rest.starts_with([';', '#']) {
        return None;
    }
    let name = line[1..close].trim();
    (!name.is_empty()).then_some(name)
}

/// Split at the first `=` or `:`, whichever comes first.
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let pos = line.find(['=', ':'])?;
    let key = line[..pos].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, line[pos + 1..].trim()))
}

pub fn serialize(node: &MergeNode, style: &Style) -> Result<String, SerializeError> {
    let MergeNode::Object(root) = node else {
        return Err(unrepresentable(&[], FORMAT, "top level must be a table"));
    };

    let mut out = String::new();
    for (key, value) in root {
        if !matches!(value, MergeNode::Object(_)) {
            let path = [PathSegment::Key(key.clone())];
            write_entry(&mut out, &path, key, value, style)?;
        }
    }

    for (name, value) in root {
        let MergeNode::Object(entries) = value else {
            continue;
        };
        let section_path = [PathSegment::Key(name.clone())];
        if name.contains([']', '\n', '\r']) || name.trim() != name || name.is_empty() {
            return Err(unrepresentable(&section_path, FORMAT, "invalid section name"));
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("[{}]\n", name));
        for (key, value) in entries {
            let path = [PathSegment::Key(name.clone()), PathSegment::Key(key.clone())];
            if matches!(value, MergeNode::Object(_)) {
                return Err(unrepresentable(&path, FORMAT, "sections cannot nest"));
            }
            write_entry(&mut out, &path, key, value, style)?;
        }
    }
    Ok(out)
}

fn write_entry(
    out: &mut String,
    path: &[PathSegment],
    key: &str,
    value: &MergeNode,
    style: &Style,
) -> Result<(), SerializeError> {
    let text = scalar_text(value)
        .ok_or_else(|| unrepresentable(path, FORMAT, "arrays have no INI form"))?;

    let bad_key = key.is_empty()
        || key.trim() != key
        || key.contains(['=', ':', '\n', '\r'])
        || key.starts_with(['[', ';', '#']);
    if bad_key {
        return Err(unrepresentable(path, FORMAT, "key cannot be written as an INI key"));
    }

    let mut lines = text.split('\n');
    let first = lines.next().unwrap_or_default();
    let rest: Vec<&str> = lines.collect();
    let first_ok = first.trim() == first && (rest.is_empty() || first.is_empty());
    let rest_ok = rest
        .iter()
        .all(|l| !l.trim().is_empty() && l.trim() == *l && !l.starts_with([';', '#']));
    if !first_ok || !rest_ok {
        return Err(unrepresentable(path, FORMAT, "value does not survive INI whitespace rules"));
    }

    out.push_str(key);
    if first.is_empty() {
        out.push_str(style.ini_separator.trim_end());
    } else {
        out.push_str(style.ini_separator);
        out.push_str(first);
    }
    out.push('\n');
    for line in rest {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: serde_json::Value) -> MergeNode {
        MergeNode::from_json_value(value)
    }

    #[test]
    fn test_parse_sections_and_root_keys() {
        let text = "\
; generated
root = yes

[core]
editor = vim
autocrlf: false

[alias]
co = checkout -b
";
        let expected = node(json!({
            "root": "yes",
            "core": {"editor": "vim", "autocrlf": "false"},
            "alias": {"co": "checkout -b"}
        }));
        assert_eq!(parse(text).unwrap(), expected);
    }

    #[test]
    fn test_values_are_never_typed() {
        let parsed = parse("[server]\nport = 8080\ndebug = true\n").unwrap();
        assert_eq!(parsed, node(json!({"server": {"port": "8080", "debug": "true"}})));
    }

    #[test]
    fn test_indented_keys_are_not_continuations() {
        let parsed = parse("[core]\n\tbare = false\n\tfilemode = true\n").unwrap();
        assert_eq!(parsed, node(json!({"core": {"bare": "false", "filemode": "true"}})));
    }

    #[test]
    fn test_empty_value_does_not_swallow_next_key_at_same_indent() {
        let parsed = parse("[core]\n\teditor =\n\tfilemode = true\n").unwrap();
        assert_eq!(parsed, node(json!({"core": {"editor": "", "filemode": "true"}})));

        let deeper = parse("[core]\n\tpaths =\n\t\tsrc\n\tbare = false\n").unwrap();
        assert_eq!(deeper, node(json!({"core": {"paths": "\nsrc", "bare": "false"}})));
    }

    #[test]
    fn test_multiline_values() {
        let text = "[options]\ninstall_requires =\n    requests\n    click>=8\nzip_safe = false\n";
        let parsed = parse(text).unwrap();
        assert_eq!(
            parsed,
            node(json!({"options": {"install_requires": "\nrequests\nclick>=8", "zip_safe": "false"}}))
        );
        let written = serialize(&parsed, &Style::default()).unwrap();
        assert_eq!(parse(&written).unwrap(), parsed);
    }

    #[test]
    fn test_repeated_sections_merge_and_last_key_wins() {
        let parsed = parse("[a]\nx = 1\n[b]\ny = 2\n[a]\nx = 3\nz = 4\n").unwrap();
        assert_eq!(parsed, node(json!({"a": {"x": "3", "z": "4"}, "b": {"y": "2"}})));
    }

    #[test]
    fn test_malformed_lines() {
        assert!(matches!(
            parse("[core\n").unwrap_err(),
            ParseError::Syntax { line: 1, .. }
        ));
        assert!(matches!(
            parse("[a]\njust words\n").unwrap_err(),
            ParseError::Syntax { line: 2, .. }
        ));
    }

    #[test]
    fn test_serialize_root_keys_first_with_style() {
        let tree = node(json!({"section": {"k": "v"}, "top": "1"}));
        let style = Style {
            ini_separator: "=",
            ..Style::default()
        };
        assert_eq!(serialize(&tree, &style).unwrap(), "top=1\n\n[section]\nk=v\n");
    }

    #[test]
    fn test_serialize_rejects_unrepresentable_trees() {
        let arrays = node(json!({"a": {"list": [1, 2]}}));
        assert!(serialize(&arrays, &Style::default()).is_err());

        let deep = node(json!({"a": {"b": {"c": "d"}}}));
        assert!(serialize(&deep, &Style::default()).is_err());

        assert!(serialize(&node(json!([1])), &Style::default()).is_err());
    }

    #[test]
    fn test_round_trip() {
        let text = "name = demo\n\n[tool:pytest]\naddopts = -ra -q\ntestpaths = tests\n\n[flake8]\nmax-line-length = 100\n";
        let first = parse(text).unwrap();
        let written = serialize(&first, &Style::default()).unwrap();
        assert_eq!(parse(&written).unwrap(), first);
    }
}
