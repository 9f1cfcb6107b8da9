//! JSON via `serde_json` with `preserve_order`, so object keys come back in
//! the order they were written, and `arbitrary_precision`, so numbers come
//! back with the digits they were written with.

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

use crate::error::{ParseError, SerializeError};
use crate::serializer::Style;
use crate::types::MergeNode;

pub fn parse(text: &str) -> Result<MergeNode, ParseError> {
    let value: Value = serde_json::from_str(text)?;
    Ok(MergeNode::from_json_value(value))
}

/// Pretty-print with the indent unit sniffed from the existing file.
pub fn serialize(node: &MergeNode, style: &Style) -> Result<String, SerializeError> {
    let indent = style.indent_unit();
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    node.to_json_value().serialize(&mut serializer)?;

    let mut out = String::from_utf8_lossy(&buf).into_owned();
    out.push('\n');
    Ok(out)
}
