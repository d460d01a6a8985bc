//! Error types for graph documents and results tables.

use std::path::PathBuf;

use meme_core::SimError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    /// File system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A results line that does not parse as the expected row
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    /// A graph document that does not describe a valid social graph
    #[error("invalid graph document: {0}")]
    InvalidGraph(String),

    /// Another writer held the lock for every retry
    #[error("timed out waiting for lock {} after {attempts} attempts", path.display())]
    LockTimeout { path: PathBuf, attempts: u32 },

    #[error(transparent)]
    Sim(#[from] SimError),
}

pub type IoResult<T> = Result<T, IoError>;
