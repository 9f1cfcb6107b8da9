//! Conflict resolution.
//!
//! Settles every [`ConflictRecord`] produced by [`crate::merger::deep_merge`]
//! according to a [`ResolutionMode`] and writes the chosen values back into
//! the merged tree:
//!
//! - **Force**: one strategy for every conflict, no interaction.
//! - **Interactive**: a [`ConflictHandler`] is asked about each conflict, in
//!   discovery order, one at a time.
//! - **Manual**: every conflict is deferred and nothing is chosen.
//!
//! Deferred conflicts keep the target placeholder the merger left behind.

use std::io;
use std::path::Path;

use crate::error::MergeError;
use crate::types::{ConflictRecord, MergeNode, Resolution, Strategy};

/// Answer from a [`ConflictHandler`] for one conflict.
#[derive(Debug, Clone, PartialEq)]
pub enum Choice {
    Strategy(Strategy),
    /// A value entered by the user; recorded as [`Resolution::MergedValue`].
    Value(MergeNode),
}

/// Interactive decision maker, supplied by the host.
///
/// Implementations own all prompt state. Returning `Ok(None)` means "no
/// preference" and is treated as [`Strategy::Merge`].
pub trait ConflictHandler {
    fn choose(&mut self, conflict: &ConflictRecord) -> io::Result<Option<Choice>>;

    /// Whole-file decision for a file the engine cannot parse. `diff` is a
    /// unified diff from the existing file to the template. The default
    /// defers.
    fn choose_file(&mut self, _target: &Path, _diff: &str) -> io::Result<Option<Strategy>> {
        Ok(None)
    }
}

/// How conflicts are settled for a merge call.
pub enum ResolutionMode<'a> {
    Force(Strategy),
    Interactive(&'a mut dyn ConflictHandler),
    Manual,
}

impl ResolutionMode<'_> {
    /// Short label for logs.
    pub fn label(&self) -> String {
        match self {
            ResolutionMode::Force(strategy) => format!("force({})", strategy),
            ResolutionMode::Interactive(_) => "interactive".to_string(),
            ResolutionMode::Manual => "manual".to_string(),
        }
    }
}

/// Counts after a resolver pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub resolved: usize,
    pub deferred: usize,
}

impl ResolveSummary {
    pub fn has_deferred(&self) -> bool {
        self.deferred > 0
    }
}

/// Resolve `conflicts` in order and fold the results into `merged`.
///
/// Handler I/O errors abort the whole call; resolutions chosen before the
/// error are kept on the records but not applied.
pub fn resolve_conflicts(
    merged: &mut MergeNode,
    conflicts: &mut [ConflictRecord],
    mode: &mut ResolutionMode<'_>,
) -> Result<ResolveSummary, MergeError> {
    for conflict in conflicts.iter_mut() {
        let resolution = match mode {
            ResolutionMode::Force(strategy) => from_strategy(*strategy),
            ResolutionMode::Interactive(handler) => {
                let choice = handler.choose(conflict).map_err(MergeError::Prompt)?;
                match choice {
                    Some(Choice::Strategy(strategy)) => from_strategy(strategy),
                    Some(Choice::Value(value)) => Resolution::MergedValue(value),
                    None => from_strategy(Strategy::Merge),
                }
            }
            ResolutionMode::Manual => Resolution::Deferred,
        };
        tracing::debug!(
            path = %conflict.path_display(),
            resolution = %resolution,
            "conflict resolved"
        );
        conflict.resolution = Some(resolution);
    }

    Ok(apply_resolutions(merged, conflicts))
}

/// `Merge` has no structural answer left at a conflict point (two unequal
/// scalars or two different shapes), so it takes the template value.
fn from_strategy(strategy: Strategy) -> Resolution {
    match strategy {
        Strategy::UseSource | Strategy::Merge => Resolution::UseSource,
        Strategy::UseTarget => Resolution::UseTarget,
        Strategy::Manual => Resolution::Deferred,
    }
}

/// Write every settled value into the tree at its path.
pub fn apply_resolutions(merged: &mut MergeNode, conflicts: &[ConflictRecord]) -> ResolveSummary {
    let mut summary = ResolveSummary::default();
    for conflict in conflicts {
        if conflict.is_deferred() {
            summary.deferred += 1;
            continue;
        }
        let Some(value) = conflict.resolved_value() else {
            continue;
        };
        if merged.set_path(&conflict.path, value.clone()) {
            summary.resolved += 1;
        } else {
            tracing::warn!(path = %conflict.path_display(), "conflict path missing from merged tree");
        }
    }
    summary
}
