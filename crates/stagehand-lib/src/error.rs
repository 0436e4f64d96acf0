//! Crate-wide error type.

use crate::record::RecordError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// An entity directory has no marker record
    #[error("Not a valid {kind}: {} does not exist", path.display())]
    NotFound { kind: &'static str, path: PathBuf },

    /// A referenced body name does not resolve in any collection root
    #[error("Not a valid body: {0}")]
    BodyNotFound(String),

    #[error("Body already exists: {}", .0.display())]
    BodyExists(PathBuf),

    #[error("File does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    /// Symbolic cache source outside the project root
    #[error("Attempted reference is not in the project directory: {}", .0.display())]
    InvalidReference(PathBuf),

    /// A directory source would be copied into its own subtree
    #[error("Cannot copy {} into itself", .0.display())]
    CopyIntoSelf(PathBuf),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
