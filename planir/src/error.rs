use std::path::PathBuf;

use thiserror::Error;

/// Problems with the build configuration.
///
/// Every variant is fatal: plans must resolve completely before anything is built.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing config file '{0}'")]
    FileExpected(PathBuf),
    #[error("Unable to read '{path}': {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to parse '{path}': {message}")]
    ParseError { path: PathBuf, message: String },
    #[error("Build plan for {0} does not have a family name")]
    MissingFamily(String),
    #[error("{key} = {value} is not a valid {expected}.")]
    InvalidAxisValue {
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error("Build plan for {prefix} references unknown {axis} '{name}'")]
    UnknownAxisName {
        prefix: String,
        axis: &'static str,
        name: String,
    },
    #[error("Suffix '{suffix}' is produced by both {first} and {second}")]
    SuffixCollision {
        suffix: String,
        first: String,
        second: String,
    },
    #[error("Build plan for '{target}' not found.{hint}")]
    PlanNotFound { target: String, hint: String },
    #[error("Collection {collection} draws from '{source_prefix}' which has no build plan.{hint}")]
    UnknownCollectionSource {
        collection: String,
        source_prefix: String,
        hint: String,
    },
}
