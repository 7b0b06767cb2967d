//! Turns declarative build plans into the set of fonts, containers and metadata to build.
//!
//! Data flows strictly in one direction: [config] is loaded, [axes] resolves
//! weight/width/slope tables into suffixes, [plans] expands every build plan
//! into named targets, [metadata] reconstructs the parameters of a single font
//! and [collect] composes fonts into merged containers.

pub mod axes;
pub mod collect;
pub mod config;
pub mod error;
pub mod metadata;
pub mod plans;
pub mod release;

pub use error::Error;

#[cfg(test)]
mod test {
    use std::path::{Path, PathBuf};

    pub(crate) fn testdata_dir() -> PathBuf {
        let dir = Path::new("../resources/testdata");
        assert!(dir.is_dir());
        dir.to_path_buf()
    }
}
