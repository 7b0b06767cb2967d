//! Release archives.

use std::{fs, path::Path};

use crate::{error::Error, tools::ToolCommand};

/// `archiver <out.zip> <file...>`
///
/// Any previous archive is removed first so archivers that update in place
/// don't keep stale members.
pub fn archive(archiver: &ToolCommand, out: &Path, files: &[&Path]) -> Result<(), Error> {
    if out.exists() {
        fs::remove_file(out).map_err(Error::io(out))?;
    }
    let mut args = vec![out];
    args.extend(files);
    archiver.run(args, &[out])
}
