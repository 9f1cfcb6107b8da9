//! File format detection.
//!
//! Classification goes by file name first and only falls back to sniffing the
//! content when the name carries no extension at all (`.prettierrc`,
//! `.gitconfig`, ...). Detection never fails: anything that is not
//! recognised is [`Format::Opaque`] and only ever handled as whole bytes.

use std::fmt;
use std::path::Path;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Yaml,
    Ini,
    Env,
    Opaque,
}

impl Format {
    /// Whether the format has a parser and serializer.
    pub fn is_structured(self) -> bool {
        !matches!(self, Format::Opaque)
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Ini => "ini",
            Format::Env => "env",
            Format::Opaque => "opaque",
        }
    }

    /// Infer a format from a file extension alone.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "yml" | "yaml" => Some(Format::Yaml),
            "ini" | "conf" | "cfg" | "properties" => Some(Format::Ini),
            "env" => Some(Format::Env),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Classify a file from its path and, optionally, its content.
pub fn detect_format(path: &Path, content: Option<&[u8]>) -> Format {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    // `.env`, `.env.local`, `.env.production`
    if file_name == ".env" || file_name.starts_with(".env.") {
        return Format::Env;
    }

    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        return Format::from_extension(ext).unwrap_or(Format::Opaque);
    }

    content.map(probe_content).unwrap_or(Format::Opaque)
}

/// Cheap look at the first meaningful line of an extensionless file.
fn probe_content(content: &[u8]) -> Format {
    if content.contains(&0) {
        return Format::Opaque;
    }
    let Ok(text) = std::str::from_utf8(content) else {
        return Format::Opaque;
    };

    let first_line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with(';'));
    let Some(first_line) = first_line else {
        return Format::Opaque;
    };

    if is_section_header(first_line) {
        return Format::Ini;
    }
    if first_line.starts_with('{') || first_line.starts_with('[') {
        return Format::Json;
    }
    if first_line == "---" {
        return Format::Yaml;
    }
    Format::Opaque
}

/// Matches `[core]`-style section headers. A JSON array on one line carries a
/// quote, comma or bracket and falls through to the JSON probe.
fn is_section_header(line: &str) -> bool {
    line.len() > 2
        && line.starts_with('[')
        && line.ends_with(']')
        && !line[1..line.len() - 1].contains(['"', '[', ']', ',', '{'])
}
