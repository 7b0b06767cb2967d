use std::{io, path::PathBuf, sync::Arc};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Plan(#[from] planir::Error),
    #[error(transparent)]
    Build(#[from] planbe::Error),
    #[error("Dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    /// A failure of something this node needed, shared with every other depender
    #[error("{0}")]
    Dependency(Arc<Error>),
    #[error("Unknown target '{0}'")]
    UnknownTarget(String),
    #[error("Rule produced an unexpected value, expected {0}")]
    UnexpectedValue(&'static str),
    #[error("A task panicked: '{0}'")]
    Panic(String),
    #[error("'{0}' exists but is not a directory")]
    ExpectedDirectory(PathBuf),
    #[error("io failed for '{path}': '{source}'")]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    YamlSerError(#[from] serde_yaml::Error),
    #[error(transparent)]
    Bincode(#[from] bincode::Error),
    #[error("{failed} of {total} targets failed")]
    TargetsFailed { failed: usize, total: usize },
}

impl Error {
    /// Fatal errors stop the whole build, not just the nodes that depend on them.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Plan(..) | Error::Cycle(..) | Error::Panic(..) | Error::UnknownTarget(..) => {
                true
            }
            Error::Dependency(inner) => inner.is_fatal(),
            _ => false,
        }
    }

    /// The error at the root of a chain of shared dependency failures.
    pub fn root(&self) -> &Error {
        match self {
            Error::Dependency(inner) => inner.root(),
            _ => self,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Error {
        let path = path.into();
        move |source| Error::FileIo { path, source }
    }
}
