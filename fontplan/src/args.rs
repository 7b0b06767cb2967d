//! Command line arguments

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use planir::config::{BUILD_PLANS_FILE, PRIVATE_BUILD_PLANS_FILE};
use serde::{Deserialize, Serialize};

/// Which fonts shall we build today?
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Build targets, `release` if none are named
    Build(Args),
    /// Remove everything a build wrote
    Clean(Args),
}

#[derive(Serialize, Deserialize, clap::Args, Debug, Clone, PartialEq)]
pub struct Args {
    /// The build plans
    #[arg(long)]
    #[clap(default_value = BUILD_PLANS_FILE)]
    pub plans: PathBuf,

    /// Build plans merged over the public ones, if the file exists
    #[arg(long)]
    #[clap(default_value = PRIVATE_BUILD_PLANS_FILE)]
    pub private_plans: PathBuf,

    /// Working directory for intermediate files and the build journal
    #[arg(short, long)]
    #[clap(default_value = ".build")]
    pub build_dir: PathBuf,

    /// Where fonts, containers and stylesheets are written
    #[arg(short, long)]
    #[clap(default_value = "dist")]
    pub dist_dir: PathBuf,

    /// Where release archives are written
    #[arg(short, long)]
    #[clap(default_value = "release-archives")]
    pub archive_dir: PathBuf,

    /// How many external tools may run at once, defaults to the number of CPUs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Overrides the version from the build plans
    #[arg(long)]
    pub font_version: Option<String>,

    /// e.g. sans-bold, ttf::sans, webfont::sans, ttc::sans-all, archive-ttf::sans,
    /// archive-ttc::sans-all or release
    pub targets: Vec<String>,
}

impl Args {
    /// Everything under `dir`, with plans from `dir`.
    #[cfg(test)]
    pub fn for_test(dir: &Path) -> Args {
        Args {
            plans: dir.join(BUILD_PLANS_FILE),
            private_plans: dir.join(PRIVATE_BUILD_PLANS_FILE),
            build_dir: dir.join(".build"),
            dist_dir: dir.join("dist"),
            archive_dir: dir.join("release-archives"),
            jobs: Some(2),
            font_version: None,
            targets: Vec::new(),
        }
    }

    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1)
        })
    }

    pub fn journal_file(&self) -> PathBuf {
        self.build_dir.join("journal.yml")
    }

    pub fn build_dirs(&self) -> [&Path; 3] {
        [&self.build_dir, &self.dist_dir, &self.archive_dir]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["fontplan", "build"]);
        let Command::Build(args) = cli.command else {
            panic!("Expected build, got {cli:?}");
        };
        assert_eq!(Path::new(BUILD_PLANS_FILE), args.plans);
        assert_eq!(Path::new(".build"), args.build_dir);
        assert_eq!(Path::new("release-archives"), args.archive_dir);
        assert!(args.targets.is_empty());
        assert!(args.jobs() >= 1);
    }

    #[test]
    fn targets_and_options() {
        let cli = Cli::parse_from([
            "fontplan",
            "build",
            "-j",
            "3",
            "--font-version",
            "2.0.0",
            "ttf::sans",
            "sans-term-bold",
        ]);
        let Command::Build(args) = cli.command else {
            panic!("Expected build, got {cli:?}");
        };
        assert_eq!(3, args.jobs());
        assert_eq!(Some("2.0.0".to_string()), args.font_version);
        assert_eq!(vec!["ttf::sans", "sans-term-bold"], args.targets);
    }
}
