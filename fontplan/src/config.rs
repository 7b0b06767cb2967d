//! State for a (possibly incremental) build

use std::{fs, path::PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    journal::{FileState, Journal},
    rules::{Key, Value},
    Args, Error,
};

/// The arguments that decide where things live; a change means nothing on disk can be trusted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    pub plans: PathBuf,
    pub private_plans: PathBuf,
    pub build_dir: PathBuf,
    pub dist_dir: PathBuf,
    pub archive_dir: PathBuf,
}

impl From<&Args> for Settings {
    fn from(args: &Args) -> Self {
        Settings {
            plans: args.plans.clone(),
            private_plans: args.private_plans.clone(),
            build_dir: args.build_dir.clone(),
            dist_dir: args.dist_dir.clone(),
            archive_dir: args.archive_dir.clone(),
        }
    }
}

/// The settings and builder of a single run.
///
/// The builder itself is tracked so the journal of one build of fontplan is
/// never trusted by another.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub settings: Settings,
    builder: FileState,
}

impl Config {
    pub fn new(args: &Args) -> Result<Config, Error> {
        let exe = std::env::current_exe().map_err(Error::io("<current executable>"))?;
        Ok(Config {
            settings: args.into(),
            builder: FileState::of(&exe).map_err(Error::io(&exe))?,
        })
    }

    fn file(&self) -> PathBuf {
        self.settings.build_dir.join("fontplan.yml")
    }

    fn journal_file(&self) -> PathBuf {
        self.settings.build_dir.join("journal.yml")
    }

    /// Save this config if it changed and return the journal of the last run it still applies to.
    pub fn init(&self) -> Result<Journal<Key, Value>, Error> {
        let journal_file = self.journal_file();
        if self.has_changed() {
            info!("Config changed, starting a fresh journal");
            if journal_file.exists() {
                fs::remove_file(&journal_file).map_err(Error::io(&journal_file))?;
            }
            let config_file = self.file();
            fs::write(&config_file, serde_yaml::to_string(self)?)
                .map_err(Error::io(&config_file))?;
        }
        Ok(Journal::load(&journal_file))
    }

    fn has_changed(&self) -> bool {
        let config_file = self.file();
        if !config_file.is_file() {
            return true;
        }
        let yml = match fs::read_to_string(&config_file) {
            Ok(yml) => yml,
            Err(err) => {
                warn!("Unable to read prior config {config_file:?}: {err}");
                return true;
            }
        };
        match serde_yaml::from_str::<Config>(&yml) {
            Ok(prior_config) => self != &prior_config,
            Err(err) => {
                warn!("Unable to parse prior config {err:#?}");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{Record, Signature};
    use tempfile::tempdir;

    fn journal_with_one_record() -> Journal<Key, Value> {
        let mut journal = Journal::new();
        journal.insert(Record {
            key: Key::ReleasePackages,
            signature: Signature::of_value(&"whatever").unwrap(),
            volatile: true,
            value: Value::Files(Vec::new()),
            depends: Vec::new(),
        });
        journal
    }

    #[test]
    fn detect_builder_change() {
        let temp_dir = tempdir().unwrap();
        let args = Args::for_test(temp_dir.path());
        fs::create_dir_all(&args.build_dir).unwrap();
        let config = Config::new(&args).unwrap();
        config.init().unwrap();
        assert!(!config.has_changed());

        // size +1, I'd give it all up for just a little more
        let mut bigger = config.clone();
        bigger.builder.size += 1;
        assert!(bigger.has_changed());
    }

    #[test]
    fn detect_settings_change() {
        let temp_dir = tempdir().unwrap();
        let mut args = Args::for_test(temp_dir.path());
        fs::create_dir_all(&args.build_dir).unwrap();
        Config::new(&args).unwrap().init().unwrap();

        args.dist_dir = temp_dir.path().join("elsewhere");
        assert!(Config::new(&args).unwrap().has_changed());
        // Not a setting
        args.dist_dir = temp_dir.path().join("dist");
        args.jobs = Some(7);
        assert!(!Config::new(&args).unwrap().has_changed());
    }

    #[test]
    fn change_discards_journal() {
        let temp_dir = tempdir().unwrap();
        let mut args = Args::for_test(temp_dir.path());
        fs::create_dir_all(&args.build_dir).unwrap();
        Config::new(&args).unwrap().init().unwrap();
        journal_with_one_record()
            .save(&args.journal_file())
            .unwrap();

        // Unchanged, the journal survives
        assert_eq!(1, Config::new(&args).unwrap().init().unwrap().len());

        args.archive_dir = temp_dir.path().join("elsewhere");
        assert!(Config::new(&args).unwrap().init().unwrap().is_empty());
        assert!(!args.journal_file().exists());
    }

    #[test]
    fn garbage_config_is_a_change() {
        let temp_dir = tempdir().unwrap();
        let args = Args::for_test(temp_dir.path());
        fs::create_dir_all(&args.build_dir).unwrap();
        let config = Config::new(&args).unwrap();
        fs::write(config.file(), "][").unwrap();
        assert!(config.has_changed());
    }
}
