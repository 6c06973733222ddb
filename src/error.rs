//! Crate-level error taxonomy.
//!
//! Per-file failures (read, parse) are isolated and reported through
//! [`IndexStats`](crate::indexing::IndexStats) rather than aborting a run;
//! the variants here surface only when a whole operation cannot proceed.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Parser initialization failed: {0}")]
    ParserInit(String),

    #[error("Workspace root {} is not a directory", path.display())]
    InvalidWorkspace { path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type IndexResult<T> = Result<T, IndexError>;
