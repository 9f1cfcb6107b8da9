//! Orchestration of one file pair and of batches of pairs.
//!
//! `merge_one` walks a pair through read → detect → parse → merge → resolve
//! → serialize → write. Every error is caught at the pair boundary and
//! recorded on the pair's [`MergeResult`], so a batch always runs to the end
//! (or to cancellation).

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::detect::{Format, detect_format};
use crate::error::{BatchError, MergeError, ParseError};
use crate::file_merger::{OpaqueDecision, merge_opaque};
use crate::merger::deep_merge;
use crate::parser;
use crate::resolver::{ResolutionMode, resolve_conflicts};
use crate::serializer::{Style, serialize};
use crate::types::{BatchReport, MergeResult, MergedContent, Outcome, SkipReason};

/// Configuration for a [`ConfigMerger`].
#[derive(Debug, Clone, Default)]
pub struct MergerConfig {
    /// Copy every source over its target verbatim, without parsing.
    pub force_overwrite: bool,
    /// Run every step except the filesystem writes.
    pub dry_run: bool,
}

/// A template file and the project file it should be merged into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl FilePair {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Stateless merge driver; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct ConfigMerger {
    config: MergerConfig,
}

impl ConfigMerger {
    pub fn new(config: MergerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MergerConfig {
        &self.config
    }

    /// Merge `source` into `target`. Never panics and never returns an error:
    /// failures are reported through [`MergeResult::outcome`].
    pub fn merge_one(
        &self,
        source: &Path,
        target: &Path,
        mode: &mut ResolutionMode<'_>,
    ) -> MergeResult {
        let mut result =
            MergeResult::pending(source.to_path_buf(), target.to_path_buf(), self.config.dry_run);
        tracing::debug!(
            source = %source.display(),
            target_file = %target.display(),
            mode = %mode.label(),
            "merging pair"
        );

        match self.run(&mut result, mode) {
            Ok(()) => {
                tracing::info!(
                    target_file = %target.display(),
                    outcome = %result.outcome,
                    conflicts = result.conflicts.len(),
                    dry_run = self.config.dry_run,
                    "pair finished"
                );
            }
            Err(e) => {
                tracing::warn!(target_file = %target.display(), error = %e, "pair failed");
                result.outcome = Outcome::Failed;
                result.skip_reason = None;
                result.error = Some(e);
            }
        }
        result
    }

    fn run(&self, result: &mut MergeResult, mode: &mut ResolutionMode<'_>) -> Result<(), MergeError> {
        let source_bytes = read_file(&result.source)?;

        if self.config.force_overwrite {
            tracing::debug!("force overwrite, copying template verbatim");
            result.format = Some(detect_format(&result.target, Some(&source_bytes)));
            return self.write_raw(result, source_bytes);
        }

        let target_bytes = match fs::read(&result.target) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("target missing, copying template");
                result.format = Some(detect_format(&result.target, Some(&source_bytes)));
                return self.write_raw(result, source_bytes);
            }
            Err(source) => {
                return Err(MergeError::Read {
                    path: result.target.clone(),
                    source,
                });
            }
        };

        let format = detect_format(&result.target, Some(&target_bytes));
        result.format = Some(format);
        tracing::debug!(%format, "format detected");

        if format == Format::Opaque {
            return self.merge_opaque_pair(result, source_bytes, &target_bytes, mode);
        }

        let source_text = decode(&result.source, &source_bytes)?;
        let target_text = decode(&result.target, &target_bytes)?;
        let source_tree = parser::parse(source_text, format).map_err(|e| MergeError::Parse {
            path: result.source.clone(),
            source: e,
        })?;
        let target_tree = parser::parse(target_text, format).map_err(|e| MergeError::Parse {
            path: result.target.clone(),
            source: e,
        })?;

        let mut output = deep_merge(&source_tree, &target_tree);
        tracing::debug!(conflicts = output.conflicts.len(), "trees merged");
        let summary = resolve_conflicts(&mut output.merged, &mut output.conflicts, mode)?;
        result.conflicts = output.conflicts;

        if summary.has_deferred() {
            tracing::info!(deferred = summary.deferred, "conflicts deferred, target left untouched");
            result.merged = Some(MergedContent::Tree(output.merged));
            result.skip_reason = Some(SkipReason::Deferred);
            return Ok(());
        }

        let rendered = serialize(&output.merged, format, &Style::detect(format, target_text))?;
        result.merged = Some(MergedContent::Tree(output.merged));

        if rendered.as_bytes() == target_bytes.as_slice() {
            result.skip_reason = Some(SkipReason::Unchanged);
            return Ok(());
        }
        self.write_target(&result.target, rendered.as_bytes())?;
        result.outcome = Outcome::Written;
        Ok(())
    }

    fn merge_opaque_pair(
        &self,
        result: &mut MergeResult,
        source_bytes: Vec<u8>,
        target_bytes: &[u8],
        mode: &mut ResolutionMode<'_>,
    ) -> Result<(), MergeError> {
        match merge_opaque(&source_bytes, target_bytes, mode, &result.target)? {
            OpaqueDecision::Overwrite => return self.write_raw(result, source_bytes),
            OpaqueDecision::KeepTarget => result.skip_reason = Some(SkipReason::KeptTarget),
            OpaqueDecision::Unchanged => result.skip_reason = Some(SkipReason::Unchanged),
            OpaqueDecision::Defer => result.skip_reason = Some(SkipReason::Deferred),
        }
        Ok(())
    }

    fn write_raw(&self, result: &mut MergeResult, bytes: Vec<u8>) -> Result<(), MergeError> {
        self.write_target(&result.target, &bytes)?;
        result.merged = Some(MergedContent::Raw(bytes));
        result.outcome = Outcome::Written;
        Ok(())
    }

    fn write_target(&self, path: &Path, bytes: &[u8]) -> Result<(), MergeError> {
        if self.config.dry_run {
            tracing::debug!(path = %path.display(), bytes = bytes.len(), "dry run, skipping write");
            return Ok(());
        }
        let to_write_error = |source| MergeError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(to_write_error)?;
        }
        fs::write(path, bytes).map_err(to_write_error)
    }

    /// Merge every pair in order.
    pub fn merge_batch(
        &self,
        pairs: &[FilePair],
        mode: &mut ResolutionMode<'_>,
    ) -> Result<BatchReport, BatchError> {
        self.merge_batch_until(pairs, mode, &AtomicBool::new(false))
    }

    /// Like [`merge_batch`](Self::merge_batch), but checks `cancel` before
    /// each pair and stops once it is set. Pairs already written stay written.
    pub fn merge_batch_until(
        &self,
        pairs: &[FilePair],
        mode: &mut ResolutionMode<'_>,
        cancel: &AtomicBool,
    ) -> Result<BatchReport, BatchError> {
        check_pairs(pairs)?;
        let mut report = BatchReport::default();
        for pair in pairs {
            if cancel.load(Ordering::SeqCst) {
                tracing::warn!(remaining = pairs.len() - report.results.len(), "batch cancelled");
                report.cancelled = true;
                break;
            }
            report
                .results
                .push(self.merge_one(&pair.source, &pair.target, mode));
        }
        Ok(report)
    }
}

/// Reject a pair list that names the same target twice.
pub fn check_pairs(pairs: &[FilePair]) -> Result<(), BatchError> {
    let mut seen = HashSet::with_capacity(pairs.len());
    for pair in pairs {
        if !seen.insert(pair.target.as_path()) {
            return Err(BatchError::DuplicateTarget(pair.target.clone()));
        }
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>, MergeError> {
    fs::read(path).map_err(|source| MergeError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn decode<'a>(path: &Path, bytes: &'a [u8]) -> Result<&'a str, MergeError> {
    std::str::from_utf8(bytes).map_err(|_| MergeError::Parse {
        path: path.to_path_buf(),
        source: ParseError::InvalidUtf8,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Strategy;
    use tempfile::TempDir;

    fn force(strategy: Strategy) -> ResolutionMode<'static> {
        ResolutionMode::Force(strategy)
    }

    #[test]
    fn test_merger_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConfigMerger>();
    }

    #[test]
    fn test_missing_source_fails_pair() {
        let dir = TempDir::new().unwrap();
        let merger = ConfigMerger::default();
        let result = merger.merge_one(
            &dir.path().join("nope.json"),
            &dir.path().join("out.json"),
            &mut force(Strategy::Merge),
        );
        assert!(result.is_failed());
        assert!(matches!(result.error, Some(MergeError::Read { .. })));
    }

    #[test]
    fn test_clean_merge_writes_target() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("tpl.json");
        let target = dir.path().join("app.json");
        fs::write(&source, "{\"a\": 1, \"b\": [1]}").unwrap();
        fs::write(&target, "{\n  \"b\": [2],\n  \"c\": true\n}\n").unwrap();

        let result = ConfigMerger::default().merge_one(&source, &target, &mut force(Strategy::Merge));
        assert_eq!(result.outcome, Outcome::Written);
        assert_eq!(result.format, Some(Format::Json));
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "{\n  \"b\": [\n    2,\n    1\n  ],\n  \"c\": true,\n  \"a\": 1\n}\n"
        );
    }

    #[test]
    fn test_second_run_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("tpl.yaml");
        let target = dir.path().join("app.yaml");
        fs::write(&source, "a: 1\nlist: [x]\n").unwrap();
        fs::write(&target, "b: 2\n").unwrap();

        let merger = ConfigMerger::default();
        let first = merger.merge_one(&source, &target, &mut force(Strategy::Merge));
        assert_eq!(first.outcome, Outcome::Written);
        let second = merger.merge_one(&source, &target, &mut force(Strategy::Merge));
        assert_eq!(second.outcome, Outcome::Skipped);
        assert_eq!(second.skip_reason, Some(SkipReason::Unchanged));
    }

    #[test]
    fn test_duplicate_targets_rejected() {
        let pairs = vec![FilePair::new("a.json", "out.json"), FilePair::new("b.json", "out.json")];
        let err = ConfigMerger::default()
            .merge_batch(&pairs, &mut force(Strategy::Merge))
            .unwrap_err();
        assert!(matches!(err, BatchError::DuplicateTarget(p) if p == Path::new("out.json")));
    }

    #[test]
    fn test_cancel_before_start() {
        let pairs = vec![FilePair::new("a.json", "x.json")];
        let cancel = AtomicBool::new(true);
        let report = ConfigMerger::default()
            .merge_batch_until(&pairs, &mut force(Strategy::Merge), &cancel)
            .unwrap();
        assert!(report.cancelled);
        assert!(report.results.is_empty());
    }
}
