//! Tree → text, per format.
//!
//! The merged tree is written back over the user's existing file, so the
//! serializer reuses whatever layout it can sniff from that file (see
//! [`Style::detect`]). Comments and exact whitespace are not carried over
//! for YAML and INI; the output is guaranteed to parse back to the same tree.

use crate::detect::Format;
use crate::error::SerializeError;
use crate::formats::{env, ini, json, yaml};
use crate::types::MergeNode;

/// One level of indentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indent {
    Spaces(usize),
    Tab,
}

/// Layout facts taken from an existing file and reused when rewriting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    /// JSON and YAML nesting. YAML always falls back to spaces.
    pub indent: Indent,
    /// Between key and value in INI files: `" = "`, `"="` or `": "`.
    pub ini_separator: &'static str,
    /// Prefix every ENV line with `export `.
    pub env_export: bool,
    /// End lines with `\r\n`.
    pub crlf: bool,
    /// Start the file with a UTF-8 byte order mark.
    pub bom: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            indent: Indent::Spaces(2),
            ini_separator: " = ",
            env_export: false,
            crlf: false,
            bom: false,
        }
    }
}

impl Style {
    /// Sniff the style of `existing`, keeping defaults for anything that
    /// cannot be inferred.
    pub fn detect(format: Format, existing: &str) -> Self {
        let mut style = Style {
            bom: existing.starts_with('\u{FEFF}'),
            crlf: existing
                .find('\n')
                .is_some_and(|pos| existing[..pos].ends_with('\r')),
            ..Style::default()
        };
        match format {
            Format::Json | Format::Yaml => {
                if let Some(indent) = detect_indent(existing, format == Format::Json) {
                    style.indent = indent;
                }
            }
            Format::Ini => {
                if let Some(sep) = detect_ini_separator(existing) {
                    style.ini_separator = sep;
                }
            }
            Format::Env => {
                let mut assignments = existing
                    .lines()
                    .map(str::trim_start)
                    .filter(|l| !l.is_empty() && !l.starts_with('#') && l.contains('='))
                    .peekable();
                style.env_export = assignments.peek().is_some()
                    && assignments.all(|l| l.starts_with("export "));
            }
            Format::Opaque => {}
        }
        style
    }

    pub fn indent_unit(&self) -> String {
        match self.indent {
            Indent::Spaces(n) => " ".repeat(n),
            Indent::Tab => "\t".to_string(),
        }
    }

    /// Put back the line endings and byte order mark of the existing file.
    fn finish(&self, text: String) -> String {
        let text = if self.crlf {
            text.replace('\n', "\r\n")
        } else {
            text
        };
        if self.bom {
            format!("\u{FEFF}{}", text)
        } else {
            text
        }
    }

    /// YAML forbids tabs for indentation.
    pub fn yaml_indent(&self) -> usize {
        match self.indent {
            Indent::Spaces(n) => n,
            Indent::Tab => 2,
        }
    }
}

fn detect_indent(text: &str, allow_tab: bool) -> Option<Indent> {
    let line = text.lines().find(|l| {
        let trimmed = l.trim_start();
        !trimmed.is_empty() && !trimmed.starts_with('#') && trimmed.len() < l.len()
    })?;
    if line.starts_with('\t') {
        return allow_tab.then_some(Indent::Tab);
    }
    let width = line.len() - line.trim_start_matches(' ').len();
    (1..=8).contains(&width).then_some(Indent::Spaces(width))
}

fn detect_ini_separator(text: &str) -> Option<&'static str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with(['#', ';', '[']))
        .find_map(|l| {
            if l.contains(" = ") {
                Some(" = ")
            } else if l.contains('=') {
                Some("=")
            } else if l.contains(": ") {
                Some(": ")
            } else {
                None
            }
        })
}

/// Serialize `node` in `format`.
pub fn serialize(node: &MergeNode, format: Format, style: &Style) -> Result<String, SerializeError> {
    let text = match format {
        Format::Json => json::serialize(node, style)?,
        Format::Yaml => yaml::serialize(node, style)?,
        Format::Ini => ini::serialize(node, style)?,
        Format::Env => env::serialize(node, style)?,
        Format::Opaque => {
            return Err(SerializeError::Unrepresentable {
                path: "(root)".to_string(),
                format: "opaque",
                reason: "opaque files have no tree form",
            });
        }
    };
    Ok(style.finish(text))
}
