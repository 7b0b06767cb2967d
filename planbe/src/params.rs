//! Parameter files: the metadata of one font, as JSON, for the generator.

use std::{fs, path::Path};

use planir::metadata::FontMetadata;
use serde::Serialize;

use crate::{error::Error, paths::ensure_parent_dir};

/// Write `value` as pretty printed JSON.
pub(crate) fn write_json(path: &Path, value: &impl Serialize) -> Result<(), Error> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|source| Error::JsonError {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(Error::io(path))
}

pub fn write_params(path: &Path, metadata: &FontMetadata) -> Result<(), Error> {
    write_json(path, metadata)
}
