//! Error types for parsing, serializing and merging.
//!
//! Every error here is scoped to a single file pair: `ConfigMerger` catches
//! them at the pair boundary and records them on the pair's `MergeResult`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A structured file could not be turned into a tree.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A recognised feature of the format that the engine does not model.
    #[error("unsupported {construct} on line {line}")]
    Unsupported { construct: &'static str, line: usize },

    #[error("file is not valid UTF-8")]
    InvalidUtf8,

    #[error("grammar setup failed: {0}")]
    Grammar(String),
}

impl ParseError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            line,
            message: message.into(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, ParseError::Unsupported { .. })
    }
}

/// A tree could not be written in the requested format.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("cannot represent value at {path} as {format}: {reason}")]
    Unrepresentable {
        path: String,
        format: &'static str,
        reason: &'static str,
    },

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of one file pair.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error("conflict prompt failed: {0}")]
    Prompt(#[source] io::Error),
}

/// Invalid input to the batch API.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("target {} appears in more than one pair", .0.display())]
    DuplicateTarget(PathBuf),
}
