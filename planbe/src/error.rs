use std::{io, path::PathBuf};

use thiserror::Error;

use crate::tools::ToolKind;

/// Failures while producing files. They fail the target being built and
/// everything that depends on it, nothing else.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO failure on {path:?}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unable to write JSON to {path:?}: {source}")]
    JsonError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("No command configured for the {0}")]
    NoCommand(ToolKind),
    #[error("Unable to find {program} for the {tool}, is it on PATH?")]
    ToolNotFound { tool: ToolKind, program: String },
    #[error("Unable to start {program} for the {tool}: {source}")]
    SpawnFailed {
        tool: ToolKind,
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("The {tool} failed ({status}): {stderr}")]
    ToolFailed {
        tool: ToolKind,
        status: String,
        stderr: String,
    },
    #[error("The {tool} exited successfully but did not write {path:?}")]
    MissingOutput { tool: ToolKind, path: PathBuf },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Error {
        let path = path.into();
        move |source| Error::IoError { path, source }
    }
}
