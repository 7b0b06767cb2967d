//! Where build outputs land on the filesystem

use std::{
    fs,
    path::{Path, PathBuf},
};

use planir::plans::TargetRef;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Directory of unhinted fonts within a plan's dist directory
pub const TTF_UNHINTED_DIR: &str = "TTF-Unhinted";
pub const TTF_DIR: &str = "TTF";
pub const WOFF2_DIR: &str = "WOFF2";
const TTC_DIR: &str = ".ttc";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Paths {
    build_dir: PathBuf,
    dist_dir: PathBuf,
    archive_dir: PathBuf,
}

impl Paths {
    pub fn new(build_dir: &Path, dist_dir: &Path, archive_dir: &Path) -> Paths {
        Paths {
            build_dir: build_dir.to_path_buf(),
            dist_dir: dist_dir.to_path_buf(),
            archive_dir: archive_dir.to_path_buf(),
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub fn params_file(&self, target: &TargetRef) -> PathBuf {
        self.build_dir
            .join("params")
            .join(&target.prefix)
            .join(format!("{}.json", target.name()))
    }

    fn plan_dist_dir(&self, prefix: &str) -> PathBuf {
        self.dist_dir.join(prefix)
    }

    pub fn unhinted_ttf_file(&self, target: &TargetRef) -> PathBuf {
        self.plan_dist_dir(&target.prefix)
            .join(TTF_UNHINTED_DIR)
            .join(format!("{}.ttf", target.name()))
    }

    pub fn ttf_file(&self, target: &TargetRef) -> PathBuf {
        self.plan_dist_dir(&target.prefix)
            .join(TTF_DIR)
            .join(format!("{}.ttf", target.name()))
    }

    pub fn woff2_file(&self, target: &TargetRef) -> PathBuf {
        self.plan_dist_dir(&target.prefix)
            .join(WOFF2_DIR)
            .join(format!("{}.woff2", target.name()))
    }

    pub fn webfont_css_file(&self, prefix: &str) -> PathBuf {
        self.plan_dist_dir(prefix).join(format!("{prefix}.css"))
    }

    pub fn glyf_ttc_file(&self, name: &str) -> PathBuf {
        self.build_dir.join("glyf-ttc").join(format!("{name}.ttc"))
    }

    pub fn ttc_file(&self, collection: &str, name: &str) -> PathBuf {
        self.dist_dir
            .join(TTC_DIR)
            .join(collection)
            .join(format!("{name}.ttc"))
    }

    pub fn ttf_archive_file(&self, prefix: &str, version: &str) -> PathBuf {
        self.archive_dir.join(format!("PkgTTF-{prefix}-{version}.zip"))
    }

    pub fn ttc_archive_file(&self, collection: &str, version: &str) -> PathBuf {
        self.archive_dir
            .join(format!("PkgTTC-{collection}-{version}.zip"))
    }

    pub fn release_packages_file(&self) -> PathBuf {
        self.build_dir.join("release-packages.json")
    }
}

/// Make sure the directory `path` will be written into exists.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(Error::io(parent))?;
    }
    Ok(())
}
