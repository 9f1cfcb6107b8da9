//! Per-format parsers and serializers.
//!
//! Each submodule exposes a `parse(&str) -> Result<MergeNode, ParseError>` and
//! a `serialize(&MergeNode, &Style) -> Result<String, SerializeError>` pair.
//! Callers go through [`crate::parser`] and [`crate::serializer`], which
//! dispatch on [`crate::detect::Format`].

pub mod env;
pub mod ini;
pub mod json;
pub mod yaml;

use crate::error::SerializeError;
use crate::types::{MergeNode, PathSegment, render_path};

/// Text form of a scalar for the line-oriented formats (INI, ENV), which
/// have no native types.
pub(crate) fn scalar_text(node: &MergeNode) -> Option<String> {
    match node {
        MergeNode::Null => Some(String::new()),
        MergeNode::Bool(b) => Some(b.to_string()),
        MergeNode::Number(n) => Some(n.to_string()),
        MergeNode::String(s) => Some(s.clone()),
        MergeNode::Array(_) | MergeNode::Object(_) => None,
    }
}

pub(crate) fn unrepresentable(
    path: &[PathSegment],
    format: &'static str,
    reason: &'static str,
) -> SerializeError {
    SerializeError::Unrepresentable {
        path: render_path(path),
        format,
        reason,
    }
}
