//! Two-way structural merge of a template (source) tree into an existing
//! (target) tree.
//!
//! The merge is type-directed:
//! - **Object / Object**: key union. Target keys keep their order and come
//!   first, source-only keys are appended in source order, shared keys
//!   recurse.
//! - **Array / Array**: target items then source items, with structural
//!   duplicates dropped (first occurrence wins). Arrays never conflict.
//! - **Scalar / Scalar**: equal values settle; unequal values conflict.
//! - **Mismatched shapes**: always a conflict, no partial reconciliation.
//!
//! The merger never picks a winner for a conflict. The merged tree holds the
//! target value at each conflict path as a placeholder until
//! [`crate::resolver`] folds the chosen resolutions back in.

use crate::types::{ConflictRecord, MergeNode, ObjectMap, PathSegment};

/// Merged tree plus every conflict found, in traversal order.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutput {
    pub merged: MergeNode,
    pub conflicts: Vec<ConflictRecord>,
}

impl MergeOutput {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Merge `source` into `target`.
pub fn deep_merge(source: &MergeNode, target: &MergeNode) -> MergeOutput {
    let mut conflicts = Vec::new();
    let mut path = Vec::new();
    let merged = merge_node(source, target, &mut path, &mut conflicts);
    MergeOutput { merged, conflicts }
}

fn merge_node(
    source: &MergeNode,
    target: &MergeNode,
    path: &mut Vec<PathSegment>,
    conflicts: &mut Vec<ConflictRecord>,
) -> MergeNode {
    match (source, target) {
        (MergeNode::Object(src), MergeNode::Object(tgt)) => {
            MergeNode::Object(merge_objects(src, tgt, path, conflicts))
        }
        (MergeNode::Array(src), MergeNode::Array(tgt)) => MergeNode::Array(merge_arrays(src, tgt)),
        _ if source == target => target.clone(),
        // Unequal scalars or mismatched shapes
        _ => {
            conflicts.push(ConflictRecord::new(
                path.clone(),
                source.clone(),
                target.clone(),
            ));
            target.clone()
        }
    }
}

fn merge_objects(
    source: &ObjectMap,
    target: &ObjectMap,
    path: &mut Vec<PathSegment>,
    conflicts: &mut Vec<ConflictRecord>,
) -> ObjectMap {
    let mut merged = ObjectMap::with_capacity(target.len() + source.len());

    for (key, target_value) in target {
        let value = match source.get(key) {
            Some(source_value) => {
                path.push(PathSegment::Key(key.clone()));
                let value = merge_node(source_value, target_value, path, conflicts);
                path.pop();
                value
            }
            None => target_value.clone(),
        };
        merged.insert(key.clone(), value);
    }

    for (key, source_value) in source {
        if !target.contains_key(key) {
            merged.insert(key.clone(), source_value.clone());
        }
    }

    merged
}

/// Order-preserving union: target first, then new source items.
fn merge_arrays(source: &[MergeNode], target: &[MergeNode]) -> Vec<MergeNode> {
    let mut merged: Vec<MergeNode> = Vec::with_capacity(target.len() + source.len());
    for item in target.iter().chain(source) {
        if !merged.contains(item) {
            merged.push(item.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: serde_json::Value) -> MergeNode {
        MergeNode::from_json_value(value)
    }

    fn key(k: &str) -> PathSegment {
        PathSegment::Key(k.into())
    }

    #[test]
    fn test_array_dedup_order() {
        let out = deep_merge(&node(json!([1, 2, 3])), &node(json!([3, 4, 5])));
        assert!(out.is_clean());
        assert_eq!(out.merged, node(json!([3, 4, 5, 1, 2])));
    }

    #[test]
    fn test_array_dedup_is_structural() {
        let out = deep_merge(
            &node(json!([{"a": 1, "b": 2}, {"c": 3}])),
            &node(json!([{"b": 2, "a": 1}])),
        );
        assert_eq!(out.merged, node(json!([{"a": 1, "b": 2}, {"c": 3}])));
    }

    #[test]
    fn test_object_union() {
        let out = deep_merge(&node(json!({"a": 1})), &node(json!({"b": 2})));
        assert!(out.is_clean());
        let keys: Vec<&str> = out
            .merged
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(out.merged, node(json!({"b": 2, "a": 1})));
    }

    #[test]
    fn test_scalar_conflict_detection() {
        let out = deep_merge(&node(json!({"port": 8080})), &node(json!({"port": 3000})));
        assert_eq!(out.conflicts.len(), 1);
        let conflict = &out.conflicts[0];
        assert_eq!(conflict.path, vec![key("port")]);
        assert_eq!(conflict.source, node(json!(8080)));
        assert_eq!(conflict.target, node(json!(3000)));
        assert!(conflict.resolution.is_none());
        // target value is the placeholder
        assert_eq!(out.merged, node(json!({"port": 3000})));
    }

    #[test]
    fn test_equal_scalars_settle() {
        let out = deep_merge(&node(json!({"a": "x", "b": null})), &node(json!({"a": "x", "b": null})));
        assert!(out.is_clean());
    }

    #[test]
    fn test_shape_mismatch_conflicts_without_partial_merge() {
        let out = deep_merge(
            &node(json!({"plugins": {"a": true}, "env": ["x"]})),
            &node(json!({"plugins": ["a"], "env": "x"})),
        );
        assert_eq!(out.conflicts.len(), 2);
        assert_eq!(out.conflicts[0].path, vec![key("plugins")]);
        assert_eq!(out.conflicts[1].path, vec![key("env")]);
        assert_eq!(out.merged, node(json!({"plugins": ["a"], "env": "x"})));
    }

    #[test]
    fn test_nested_conflicts_in_document_order() {
        let source = node(json!({
            "compilerOptions": {"target": "es2022", "strict": true, "outDir": "dist"},
            "include": ["src"]
        }));
        let target = node(json!({
            "compilerOptions": {"strict": false, "target": "es2017"},
            "include": ["lib"]
        }));
        let out = deep_merge(&source, &target);
        let paths: Vec<String> = out.conflicts.iter().map(|c| c.path_display()).collect();
        assert_eq!(paths, vec!["compilerOptions.strict", "compilerOptions.target"]);
        assert_eq!(
            out.merged,
            node(json!({
                "compilerOptions": {"strict": false, "target": "es2017", "outDir": "dist"},
                "include": ["lib", "src"]
            }))
        );
    }

    #[test]
    fn test_root_scalar_conflict_has_empty_path() {
        let out = deep_merge(&node(json!(1)), &node(json!(2)));
        assert_eq!(out.conflicts.len(), 1);
        assert!(out.conflicts[0].path.is_empty());
    }

    #[test]
    fn test_merge_then_merge_is_idempotent() {
        let source = node(json!({"a": [1, 2], "b": {"c": 1}, "d": "new"}));
        let target = node(json!({"a": [2, 3], "b": {"c": 2, "e": 5}}));
        let first = deep_merge(&source, &target);
        let second = deep_merge(&first.merged, &first.merged);
        assert!(second.is_clean());
        assert_eq!(second.merged, first.merged);
    }
}
