//! Core types for the merge engine.
//!
//! Every structured format is lowered into the same tree shape, a
//! [`MergeNode`], so that merging and conflict handling never look at the
//! source format. Conflicts are addressed by a path of [`PathSegment`]s from
//! the document root, which is also how a chosen resolution is written back
//! into the merged tree.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::detect::Format;
use crate::error::MergeError;

/// Ordered key/value fields of an object node.
pub type ObjectMap = IndexMap<String, MergeNode>;

/// A parsed configuration value, independent of the format it came from.
///
/// Equality is structural. Object comparison ignores key order, which keeps
/// array de-duplication and conflict detection stable when the two files list
/// the same keys in a different order.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeNode {
    Null,
    Bool(bool),
    /// The literal digits as written, so values of any size or precision
    /// survive a rewrite. Two numbers are equal when their text is.
    Number(Number),
    String(String),
    Array(Vec<MergeNode>),
    Object(ObjectMap),
}

impl MergeNode {
    pub fn empty_object() -> Self {
        MergeNode::Object(ObjectMap::new())
    }

    /// Short name of the node's tag, used in conflict reports.
    pub fn kind(&self) -> &'static str {
        match self {
            MergeNode::Null => "null",
            MergeNode::Bool(_) => "bool",
            MergeNode::Number(_) => "number",
            MergeNode::String(_) => "string",
            MergeNode::Array(_) => "array",
            MergeNode::Object(_) => "object",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, MergeNode::Array(_) | MergeNode::Object(_))
    }

    pub fn as_object(&self) -> Option<&ObjectMap> {
        match self {
            MergeNode::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MergeNode::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up the node at `path`, if every segment exists.
    pub fn get_path(&self, path: &[PathSegment]) -> Option<&MergeNode> {
        let mut current = self;
        for segment in path {
            current = match (current, segment) {
                (MergeNode::Object(map), PathSegment::Key(key)) => map.get(key)?,
                (MergeNode::Array(items), PathSegment::Index(idx)) => items.get(*idx)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn get_path_mut(&mut self, path: &[PathSegment]) -> Option<&mut MergeNode> {
        let mut current = self;
        for segment in path {
            current = match (current, segment) {
                (MergeNode::Object(map), PathSegment::Key(key)) => map.get_mut(key)?,
                (MergeNode::Array(items), PathSegment::Index(idx)) => items.get_mut(*idx)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Replace the node at `path`. Returns `false` when the path does not
    /// exist in this tree; an empty path replaces the whole tree.
    pub fn set_path(&mut self, path: &[PathSegment], value: MergeNode) -> bool {
        match self.get_path_mut(path) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn from_json_value(value: Value) -> Self {
        match value {
            Value::Null => MergeNode::Null,
            Value::Bool(b) => MergeNode::Bool(b),
            Value::Number(n) => MergeNode::Number(n),
            Value::String(s) => MergeNode::String(s),
            Value::Array(items) => {
                MergeNode::Array(items.into_iter().map(MergeNode::from_json_value).collect())
            }
            Value::Object(map) => MergeNode::Object(
                map.into_iter()
                    .map(|(k, v)| (k, MergeNode::from_json_value(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json_value(&self) -> Value {
        match self {
            MergeNode::Null => Value::Null,
            MergeNode::Bool(b) => Value::Bool(*b),
            MergeNode::Number(n) => Value::Number(n.clone()),
            MergeNode::String(s) => Value::String(s.clone()),
            MergeNode::Array(items) => {
                Value::Array(items.iter().map(MergeNode::to_json_value).collect())
            }
            MergeNode::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for MergeNode {
    fn from(value: Value) -> Self {
        MergeNode::from_json_value(value)
    }
}

/// Compact JSON rendering, used when a value is shown to a user.
impl fmt::Display for MergeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json_value())
    }
}

/// One step from a parent node to a child.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

/// Render a path as `servers[0].host`, bracket-quoting keys that contain
/// path punctuation. The root renders as `(root)`.
pub fn render_path(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return "(root)".to_string();
    }
    let mut out = String::new();
    for segment in path {
        match segment {
            PathSegment::Index(idx) => out.push_str(&format!("[{}]", idx)),
            PathSegment::Key(key) => {
                let plain = !key.is_empty()
                    && !key.contains(['.', '[', ']', '"'])
                    && !key.chars().any(char::is_whitespace);
                if plain {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(key);
                } else {
                    out.push_str(&format!("[{:?}]", key));
                }
            }
        }
    }
    out
}

/// User-facing resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    UseSource,
    UseTarget,
    #[default]
    Merge,
    Manual,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::UseSource => write!(f, "USE_SOURCE"),
            Strategy::UseTarget => write!(f, "USE_TARGET"),
            Strategy::Merge => write!(f, "MERGE"),
            Strategy::Manual => write!(f, "MANUAL"),
        }
    }
}

/// How a single conflict was settled.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    UseSource,
    UseTarget,
    /// A value that is neither side verbatim, e.g. typed in by a reviewer.
    MergedValue(MergeNode),
    /// Left for someone outside the engine to decide.
    Deferred,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::UseSource => write!(f, "use-source"),
            Resolution::UseTarget => write!(f, "use-target"),
            Resolution::MergedValue(_) => write!(f, "merged-value"),
            Resolution::Deferred => write!(f, "deferred"),
        }
    }
}

/// A point where source and target disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictRecord {
    pub path: Vec<PathSegment>,
    pub source: MergeNode,
    pub target: MergeNode,
    /// Unset until the resolver runs.
    pub resolution: Option<Resolution>,
}

impl ConflictRecord {
    pub fn new(path: Vec<PathSegment>, source: MergeNode, target: MergeNode) -> Self {
        Self {
            path,
            source,
            target,
            resolution: None,
        }
    }

    pub fn path_display(&self) -> String {
        render_path(&self.path)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.resolution, Some(Resolution::Deferred))
    }

    /// The value the resolution selects, or `None` while unresolved or
    /// deferred.
    pub fn resolved_value(&self) -> Option<&MergeNode> {
        match self.resolution.as_ref()? {
            Resolution::UseSource => Some(&self.source),
            Resolution::UseTarget => Some(&self.target),
            Resolution::MergedValue(node) => Some(node),
            Resolution::Deferred => None,
        }
    }
}

/// Final state of one file pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// New bytes were written to the target (or would be, in a dry run).
    Written,
    /// The target was not touched; [`SkipReason`] says why. This includes a
    /// merge or forced `UseSource` whose output equals the target byte for
    /// byte ([`SkipReason::Unchanged`]), so `written` counts only files that
    /// actually changed.
    Skipped,
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Outcome::Written => "written",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "failed",
        })
    }
}

/// Why a pair was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// At least one conflict, or the whole file, awaits manual resolution.
    Deferred,
    /// The existing target was kept as is.
    KeptTarget,
    /// The merged output is byte-identical to the existing target.
    Unchanged,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Deferred => write!(f, "deferred for manual resolution"),
            SkipReason::KeptTarget => write!(f, "kept existing file"),
            SkipReason::Unchanged => write!(f, "already up to date"),
        }
    }
}

/// The merged payload of a pair.
#[derive(Debug, Clone, PartialEq)]
pub enum MergedContent {
    Tree(MergeNode),
    /// Whole-file result: new files, forced overwrites and opaque files.
    Raw(Vec<u8>),
}

/// Result of merging one source file into one target file.
#[derive(Debug)]
pub struct MergeResult {
    pub source: PathBuf,
    pub target: PathBuf,
    pub format: Option<Format>,
    pub merged: Option<MergedContent>,
    pub conflicts: Vec<ConflictRecord>,
    pub outcome: Outcome,
    pub skip_reason: Option<SkipReason>,
    pub error: Option<MergeError>,
    /// Nothing was written because the merger ran in dry-run mode.
    pub dry_run: bool,
}

impl MergeResult {
    pub(crate) fn pending(source: PathBuf, target: PathBuf, dry_run: bool) -> Self {
        Self {
            source,
            target,
            format: None,
            merged: None,
            conflicts: Vec::new(),
            outcome: Outcome::Skipped,
            skip_reason: None,
            error: None,
            dry_run,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }

    pub fn deferred_conflicts(&self) -> impl Iterator<Item = &ConflictRecord> {
        self.conflicts.iter().filter(|c| c.is_deferred())
    }
}

/// Aggregate counts over a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub conflicts: usize,
}

/// Per-pair results of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<MergeResult>,
    /// The batch stopped early; pairs after the last result were not touched.
    pub cancelled: bool,
}

impl BatchReport {
    pub fn summary(&self) -> BatchSummary {
        self.results
            .iter()
            .fold(BatchSummary::default(), |mut acc, result| {
                match result.outcome {
                    Outcome::Written => acc.written += 1,
                    Outcome::Skipped => acc.skipped += 1,
                    Outcome::Failed => acc.failed += 1,
                }
                acc.conflicts += result.conflicts.len();
                acc
            })
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(MergeResult::is_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(k: &str) -> PathSegment {
        PathSegment::Key(k.into())
    }

    #[test]
    fn test_json_conversion_keeps_key_order() {
        let node = MergeNode::from_json_value(json!({"z": 1, "a": [true, null], "m": "x"}));
        let keys: Vec<&str> = node.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(
            node.to_json_value(),
            json!({"z": 1, "a": [true, null], "m": "x"})
        );
    }

    #[test]
    fn test_path_lookup_and_set() {
        let mut node = MergeNode::from_json_value(json!({"servers": [{"host": "a"}]}));
        let path = vec![key("servers"), PathSegment::Index(0), key("host")];
        assert_eq!(node.get_path(&path), Some(&MergeNode::String("a".into())));

        assert!(node.set_path(&path, MergeNode::String("b".into())));
        assert_eq!(node.to_json_value(), json!({"servers": [{"host": "b"}]}));

        assert!(!node.set_path(&[key("missing"), key("x")], MergeNode::Null));
    }

    #[test]
    fn test_empty_path_replaces_root() {
        let mut node = MergeNode::Bool(true);
        assert!(node.set_path(&[], MergeNode::Null));
        assert_eq!(node, MergeNode::Null);
    }

    #[test]
    fn test_render_path() {
        assert_eq!(render_path(&[]), "(root)");
        assert_eq!(
            render_path(&[key("servers"), PathSegment::Index(2), key("host")]),
            "servers[2].host"
        );
        assert_eq!(render_path(&[key("a"), key("x.y")]), "a[\"x.y\"]");
    }

    #[test]
    fn test_resolved_value() {
        let mut conflict = ConflictRecord::new(
            vec![key("port")],
            MergeNode::from_json_value(json!(8080)),
            MergeNode::from_json_value(json!(3000)),
        );
        assert_eq!(conflict.resolved_value(), None);

        conflict.resolution = Some(Resolution::UseTarget);
        assert_eq!(conflict.resolved_value(), Some(&conflict.target));

        conflict.resolution = Some(Resolution::Deferred);
        assert!(conflict.is_deferred());
        assert_eq!(conflict.resolved_value(), None);
    }

    #[test]
    fn test_strategy_serde_names() {
        assert_eq!(
            serde_json::to_string(&Strategy::UseSource).unwrap(),
            "\"USE_SOURCE\""
        );
        let parsed: Strategy = serde_json::from_str("\"MANUAL\"").unwrap();
        assert_eq!(parsed, Strategy::Manual);
        assert_eq!(Strategy::default(), Strategy::Merge);
    }
}
