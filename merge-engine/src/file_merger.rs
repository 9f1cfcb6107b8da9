//! Whole-file strategies for files the engine cannot parse.
//!
//! Opaque files are never turned into a tree: the only choices are to take
//! the template, keep the existing file, or leave the decision to a person.

use std::path::Path;

use similar::TextDiff;

use crate::error::MergeError;
use crate::resolver::ResolutionMode;
use crate::types::Strategy;

/// What to do with an opaque target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpaqueDecision {
    /// Replace the target with the source bytes.
    Overwrite,
    KeepTarget,
    /// Both files already hold the same bytes.
    Unchanged,
    Defer,
}

/// Decide the fate of an opaque `target` given the template `source`.
///
/// Identical files short-circuit to [`OpaqueDecision::Unchanged`] without
/// asking anyone. `Merge` has no meaning for bytes it cannot read, so it
/// defers like `Manual`.
pub fn merge_opaque(
    source: &[u8],
    target: &[u8],
    mode: &mut ResolutionMode<'_>,
    target_path: &Path,
) -> Result<OpaqueDecision, MergeError> {
    if source == target {
        return Ok(OpaqueDecision::Unchanged);
    }

    let strategy = match mode {
        ResolutionMode::Force(strategy) => Some(*strategy),
        ResolutionMode::Manual => None,
        ResolutionMode::Interactive(handler) => {
            let diff = diff_preview(source, target, "template", &target_path.display().to_string());
            handler
                .choose_file(target_path, &diff)
                .map_err(MergeError::Prompt)?
        }
    };

    let decision = match strategy {
        Some(Strategy::UseSource) => OpaqueDecision::Overwrite,
        Some(Strategy::UseTarget) => OpaqueDecision::KeepTarget,
        Some(Strategy::Merge) | Some(Strategy::Manual) | None => OpaqueDecision::Defer,
    };
    tracing::debug!(path = %target_path.display(), ?decision, "opaque file decision");
    Ok(decision)
}

/// Unified diff that turns `target` into `source`.
///
/// Binary content (a NUL byte or invalid UTF-8 on either side) gets a one
/// line size note instead.
pub fn diff_preview(source: &[u8], target: &[u8], source_label: &str, target_label: &str) -> String {
    match (text_of(source), text_of(target)) {
        (Some(new), Some(old)) => TextDiff::from_lines(old, new)
            .unified_diff()
            .context_radius(3)
            .header(target_label, source_label)
            .to_string(),
        _ => format!(
            "binary files differ ({}: {} bytes, {}: {} bytes)\n",
            target_label,
            target.len(),
            source_label,
            source.len()
        ),
    }
}

fn text_of(bytes: &[u8]) -> Option<&str> {
    if bytes.contains(&0) {
        return None;
    }
    std::str::from_utf8(bytes).ok()
}
