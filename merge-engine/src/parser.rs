//! Text → tree, per format.
//!
//! A blank file (empty or whitespace only) is an empty object in every
//! structured format, so an existing-but-empty config merges like one that
//! simply has no keys yet.

use crate::detect::Format;
use crate::error::ParseError;
use crate::formats::{env, ini, json, yaml};
use crate::types::MergeNode;

/// Parse `text` as `format`.
///
/// [`Format::Opaque`] has no tree form and is rejected; callers route opaque
/// files to [`crate::file_merger`] before getting here.
pub fn parse(text: &str, format: Format) -> Result<MergeNode, ParseError> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    if text.trim().is_empty() && format.is_structured() {
        return Ok(MergeNode::empty_object());
    }
    match format {
        Format::Json => json::parse(text),
        Format::Yaml => yaml::parse(text),
        Format::Ini => ini::parse(text),
        Format::Env => env::parse(text),
        Format::Opaque => Err(ParseError::Unsupported {
            construct: "opaque file",
            line: 1,
        }),
    }
}

/// Parse raw file bytes, rejecting anything that is not UTF-8.
pub fn parse_bytes(bytes: &[u8], format: Format) -> Result<MergeNode, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8)?;
    parse(text, format)
}
