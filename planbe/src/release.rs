//! The release manifest file.

use std::path::Path;

use planir::release::ReleasePackages;

use crate::{error::Error, params::write_json};

pub fn write_release_packages(path: &Path, packages: &ReleasePackages) -> Result<(), Error> {
    write_json(path, packages)
}
