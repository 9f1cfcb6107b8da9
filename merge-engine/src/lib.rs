//! # merge-engine
//!
//! Format-aware merging of template configuration files into the files a
//! project already has, without silently dropping either side's content.
//!
//! ## Pipeline
//!
//! 1. **Detection**: classify a file as JSON, YAML, INI, ENV or opaque from
//!    its name, falling back to a content probe ([`detect`]).
//! 2. **Parsing**: lower the text into a format-agnostic [`MergeNode`] tree
//!    ([`parser`]). YAML goes through a tree-sitter concrete syntax tree.
//! 3. **Deep merge**: union objects key by key, union arrays with
//!    de-duplication, and record a [`ConflictRecord`] wherever two scalars or
//!    two shapes disagree ([`merger`]).
//! 4. **Resolution**: settle conflicts by a forced strategy, an interactive
//!    [`ConflictHandler`], or defer them all ([`resolver`]).
//! 5. **Serialization**: write the tree back in the target's format, reusing
//!    the target's indentation and separators ([`serializer`]).
//!
//! Files that cannot be parsed take the whole-file path in [`file_merger`].
//! [`ConfigMerger`] drives one pair or a batch through all of this.
//!
//! ## Example
//!
//! ```no_run
//! use merge_engine::{ConfigMerger, FilePair, MergerConfig, ResolutionMode, Strategy};
//!
//! let merger = ConfigMerger::new(MergerConfig::default());
//! let pairs = vec![FilePair::new("templates/tsconfig.json", "tsconfig.json")];
//! let report = merger
//!     .merge_batch(&pairs, &mut ResolutionMode::Force(Strategy::UseTarget))
//!     .expect("distinct targets");
//!
//! for result in &report.results {
//!     println!("{}: {}", result.target.display(), result.outcome);
//! }
//! ```

pub mod config_merger;
pub mod detect;
pub mod error;
pub mod file_merger;
pub mod formats;
pub mod merger;
pub mod parser;
pub mod resolver;
pub mod serializer;
pub mod types;

// Re-export primary public API
pub use config_merger::{ConfigMerger, FilePair, MergerConfig, check_pairs};
pub use detect::{Format, detect_format};
pub use error::{BatchError, MergeError, ParseError, SerializeError};
pub use file_merger::{OpaqueDecision, diff_preview};
pub use merger::{MergeOutput, deep_merge};
pub use resolver::{Choice, ConflictHandler, ResolutionMode, ResolveSummary, resolve_conflicts};
pub use serializer::{Style, serialize};
pub use types::{
    BatchReport, BatchSummary, ConflictRecord, MergeNode, MergeResult, MergedContent, Outcome,
    PathSegment, Resolution, SkipReason, Strategy, render_path,
};
