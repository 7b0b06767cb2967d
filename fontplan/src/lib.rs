//! Incremental builds of font families from declarative build plans.
//!
//! Plans are resolved by [planir], files are produced by [planbe] and this
//! crate ties them together in a lazily evaluated [graph::Graph] whose
//! [journal::Journal] lets the next run skip whatever is still up to date.

mod args;
mod config;
mod error;
pub mod graph;
pub mod journal;
pub mod rules;
pub mod targets;

pub use args::{Args, Cli, Command};
pub use config::Config;
pub use error::Error;

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use planbe::paths::Paths;

use crate::{
    graph::{BuildReport, Graph},
    rules::{BuildRules, Key},
    targets::parse_targets,
};

pub fn require_dir(dir: &Path) -> Result<PathBuf, Error> {
    if dir.exists() && !dir.is_dir() {
        return Err(Error::ExpectedDirectory(dir.to_path_buf()));
    }
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(Error::io(dir))?
    }
    debug!("require_dir {:?}", dir);
    Ok(dir.to_path_buf())
}

/// Build the targets named by `args`.
///
/// Configuration problems fail the whole run. Anything else fails only the
/// targets it affects and is reported in the result.
pub fn run(args: &Args) -> Result<BuildReport<Key>, Error> {
    let targets = parse_targets(&args.targets)?;
    require_dir(&args.build_dir)?;
    let config = Config::new(args)?;
    let previous = config.init()?;

    let paths = Paths::new(&args.build_dir, &args.dist_dir, &args.archive_dir);
    let rules = BuildRules::new(
        paths,
        &args.plans,
        &args.private_plans,
        args.font_version.clone(),
    );
    let graph = Graph::new(rules, previous, args.jobs());

    // Plans must resolve completely before anything is built
    graph.need(&[Key::Plans, Key::CollectionPlans])?;

    let keys: Vec<_> = targets.into_iter().map(Key::Group).collect();
    let report = graph.build(&keys);
    graph.journal().save(&args.journal_file())?;

    info!(
        "{} of {} targets built, {} steps run, {} reused",
        report.built.len(),
        keys.len(),
        report.executed.len(),
        report.reused
    );
    Ok(report)
}

/// Remove everything a build writes, the journal included.
pub fn clean(args: &Args) -> Result<(), Error> {
    for dir in args.build_dirs() {
        if dir.is_dir() {
            info!("Removing {dir:?}");
            fs::remove_dir_all(dir).map_err(Error::io(dir))?;
        }
    }
    Ok(())
}
