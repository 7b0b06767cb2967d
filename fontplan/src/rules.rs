//! What each build target is made from, and how.

use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, info};
use planbe::{
    archive::archive,
    css::write_webfont_css,
    fonts::{compress_woff2, generate, hint},
    params::write_params,
    paths::Paths,
    release::write_release_packages,
    tools::{self, ToolCommand, ToolKind},
    ttc::{merge_glyf_ttc, merge_ttc},
};
use planir::{
    axes::{AxisResolver, SuffixMapping},
    collect::CollectionPlans,
    config::{self, RawConfig},
    metadata::{self, FontMetadata},
    plans::{standard_suffixes, PlanSet, ResolvedPlan, TargetRef},
    release::release_packages,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    graph::{Rules, Task},
};

/// Targets named on the command line, each standing for a set of files.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Group {
    /// The hinted TTF of one font
    Font(String),
    Ttf(String),
    TtfUnhinted(String),
    /// WOFF2 files and the stylesheet of a plan
    Webfont(String),
    Ttc(String),
    ArchiveTtf(String),
    ArchiveTtc(String),
    Release,
}

impl Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Font(name) => write!(f, "{name}"),
            Group::Ttf(prefix) => write!(f, "ttf::{prefix}"),
            Group::TtfUnhinted(prefix) => write!(f, "ttf-unhinted::{prefix}"),
            Group::Webfont(prefix) => write!(f, "webfont::{prefix}"),
            Group::Ttc(collection) => write!(f, "ttc::{collection}"),
            Group::ArchiveTtf(prefix) => write!(f, "archive-ttf::{prefix}"),
            Group::ArchiveTtc(collection) => write!(f, "archive-ttc::{collection}"),
            Group::Release => write!(f, "release"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// The merged build plans, read fresh every run
    Config,
    Tool(ToolKind),
    Plans,
    /// Suffixes of the global axes
    StandardSuffixes,
    CollectionPlans,
    FontVersion,
    /// Metadata of a font, by target name
    Metadata(String),
    /// The fonts of one plan
    PlanTargets(String),
    /// The top level containers of one collection
    TtcContents(String),
    /// The glyf containers merged into a top level container
    TtcParts(String),
    /// The fonts merged into a glyf container
    GlyfTtcFonts(String),
    Params(TargetRef),
    UnhintedTtf(TargetRef),
    Ttf(TargetRef),
    Woff2(TargetRef),
    WebfontCss(String),
    GlyfTtc(String),
    Ttc { collection: String, name: String },
    ReleasePackages,
    TtfArchive { prefix: String, version: String },
    TtcArchive { collection: String, version: String },
    Group(Group),
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Config => write!(f, "config"),
            Key::Tool(kind) => write!(f, "tool:{kind:?}"),
            Key::Plans => write!(f, "plans"),
            Key::StandardSuffixes => write!(f, "standard-suffixes"),
            Key::CollectionPlans => write!(f, "collection-plans"),
            Key::FontVersion => write!(f, "font-version"),
            Key::Metadata(name) => write!(f, "metadata:{name}"),
            Key::PlanTargets(prefix) => write!(f, "plan-targets:{prefix}"),
            Key::TtcContents(collection) => write!(f, "ttc-contents:{collection}"),
            Key::TtcParts(name) => write!(f, "ttc-parts:{name}"),
            Key::GlyfTtcFonts(name) => write!(f, "glyf-ttc-fonts:{name}"),
            Key::Params(target) => write!(f, "params:{target}"),
            Key::UnhintedTtf(target) => write!(f, "ttf-unhinted:{target}"),
            Key::Ttf(target) => write!(f, "ttf:{target}"),
            Key::Woff2(target) => write!(f, "woff2:{target}"),
            Key::WebfontCss(prefix) => write!(f, "css:{prefix}"),
            Key::GlyfTtc(name) => write!(f, "glyf-ttc:{name}"),
            Key::Ttc { collection, name } => write!(f, "ttc:{collection}/{name}"),
            Key::ReleasePackages => write!(f, "release-packages"),
            Key::TtfArchive { prefix, version } => write!(f, "archive-ttf:{prefix}@{version}"),
            Key::TtcArchive {
                collection,
                version,
            } => write!(f, "archive-ttc:{collection}@{version}"),
            Key::Group(group) => write!(f, "group:{group}"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Value {
    Config(Arc<RawConfig>),
    Tool(Option<ToolCommand>),
    Plans(Arc<PlanSet>),
    Suffixes(Arc<SuffixMapping>),
    Collections(Arc<CollectionPlans>),
    Version(String),
    Metadata(Arc<FontMetadata>),
    Targets(Vec<TargetRef>),
    Names(Vec<String>),
    Files(Vec<PathBuf>),
}

impl Value {
    fn config(self) -> Result<Arc<RawConfig>, Error> {
        match self {
            Value::Config(config) => Ok(config),
            _ => Err(Error::UnexpectedValue("config")),
        }
    }

    fn tool(self) -> Result<Option<ToolCommand>, Error> {
        match self {
            Value::Tool(tool) => Ok(tool),
            _ => Err(Error::UnexpectedValue("tool")),
        }
    }

    /// A tool that must be available.
    fn required_tool(self, kind: ToolKind) -> Result<ToolCommand, Error> {
        self.tool()?
            .ok_or(Error::Build(planbe::Error::NoCommand(kind)))
    }

    pub fn plans(self) -> Result<Arc<PlanSet>, Error> {
        match self {
            Value::Plans(plans) => Ok(plans),
            _ => Err(Error::UnexpectedValue("plans")),
        }
    }

    fn suffixes(self) -> Result<Arc<SuffixMapping>, Error> {
        match self {
            Value::Suffixes(suffixes) => Ok(suffixes),
            _ => Err(Error::UnexpectedValue("suffixes")),
        }
    }

    pub fn collections(self) -> Result<Arc<CollectionPlans>, Error> {
        match self {
            Value::Collections(collections) => Ok(collections),
            _ => Err(Error::UnexpectedValue("collection plans")),
        }
    }

    fn version(self) -> Result<String, Error> {
        match self {
            Value::Version(version) => Ok(version),
            _ => Err(Error::UnexpectedValue("version")),
        }
    }

    fn metadata(self) -> Result<Arc<FontMetadata>, Error> {
        match self {
            Value::Metadata(metadata) => Ok(metadata),
            _ => Err(Error::UnexpectedValue("metadata")),
        }
    }

    fn targets(self) -> Result<Vec<TargetRef>, Error> {
        match self {
            Value::Targets(targets) => Ok(targets),
            _ => Err(Error::UnexpectedValue("targets")),
        }
    }

    fn names(self) -> Result<Vec<String>, Error> {
        match self {
            Value::Names(names) => Ok(names),
            _ => Err(Error::UnexpectedValue("names")),
        }
    }

    pub fn files(self) -> Result<Vec<PathBuf>, Error> {
        match self {
            Value::Files(files) => Ok(files),
            _ => Err(Error::UnexpectedValue("files")),
        }
    }
}

/// Values for exactly `N` keys.
fn take<const N: usize>(values: Vec<Value>) -> Result<[Value; N], Error> {
    values
        .try_into()
        .map_err(|_| Error::UnexpectedValue("one value per key"))
}

fn all_files(values: Vec<Value>) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for value in values {
        files.extend(value.files()?);
    }
    Ok(files)
}

fn as_paths(files: &[PathBuf]) -> Vec<&Path> {
    files.iter().map(PathBuf::as_path).collect()
}

/// The font another font is hinted against, from the same plan.
fn reference_target(target: &TargetRef, reference: &str) -> Option<TargetRef> {
    let suffix = reference
        .strip_prefix(target.prefix.as_str())?
        .strip_prefix('-')?;
    Some(TargetRef::new(target.prefix.as_str(), suffix))
}

fn plan<'a>(plans: &'a PlanSet, prefix: &str) -> Result<&'a ResolvedPlan, Error> {
    plans.get(prefix).ok_or_else(|| {
        Error::Plan(planir::Error::PlanNotFound {
            target: prefix.to_string(),
            hint: plans.missing_overlay_hint(),
        })
    })
}

pub struct BuildRules {
    paths: Paths,
    plans_file: PathBuf,
    private_file: PathBuf,
    version_override: Option<String>,
    resolver: AxisResolver,
}

impl BuildRules {
    pub fn new(
        paths: Paths,
        plans_file: &Path,
        private_file: &Path,
        version_override: Option<String>,
    ) -> BuildRules {
        BuildRules {
            paths,
            plans_file: plans_file.to_path_buf(),
            private_file: private_file.to_path_buf(),
            version_override,
            resolver: AxisResolver::new(),
        }
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    fn plan_targets(&self, prefix: &str, task: &Task<Self>) -> Result<Vec<TargetRef>, Error> {
        task.need_one(Key::PlanTargets(prefix.to_string()))?
            .targets()
    }

    fn ttc_keys(&self, collection: &str, task: &Task<Self>) -> Result<Vec<Key>, Error> {
        let contents = task
            .need_one(Key::TtcContents(collection.to_string()))?
            .names()?;
        Ok(contents
            .into_iter()
            .map(|name| Key::Ttc {
                collection: collection.to_string(),
                name,
            })
            .collect())
    }

    fn params(&self, target: &TargetRef, task: &Task<Self>) -> Result<Value, Error> {
        let metadata = task.need_one(Key::Metadata(target.name()))?.metadata()?;
        let out = self.paths.params_file(target);
        write_params(&out, &metadata)?;
        Ok(Value::Files(vec![out]))
    }

    fn unhinted_ttf(&self, target: &TargetRef, task: &Task<Self>) -> Result<Value, Error> {
        let [_params, generator] = take::<2>(task.need(&[
            Key::Params(target.clone()),
            Key::Tool(ToolKind::Generator),
        ])?)?;
        let generator = generator.required_tool(ToolKind::Generator)?;
        let params = self.paths.params_file(target);
        let out = self.paths.unhinted_ttf_file(target);
        info!("Generating {}", out.display());
        task.throttled(|| generate(&generator, &params, &out))?;
        Ok(Value::Files(vec![out]))
    }

    fn ttf(&self, target: &TargetRef, task: &Task<Self>) -> Result<Value, Error> {
        let [metadata, hinter, _unhinted] = take::<3>(task.need(&[
            Key::Metadata(target.name()),
            Key::Tool(ToolKind::Hinter),
            Key::UnhintedTtf(target.clone()),
        ])?)?;
        let metadata = metadata.metadata()?;
        let hinter = hinter.tool()?;
        let unhinted = self.paths.unhinted_ttf_file(target);

        let reference = match (&hinter, metadata.hint_reference.as_deref()) {
            (Some(..), Some(reference)) => reference_target(target, reference),
            _ => None,
        };
        let reference = match reference {
            Some(reference) => {
                task.order(&[Key::UnhintedTtf(reference.clone())])?;
                Some(self.paths.unhinted_ttf_file(&reference))
            }
            None => None,
        };

        let out = self.paths.ttf_file(target);
        info!("Hinting {}", out.display());
        task.throttled(|| {
            hint(
                hinter.as_ref(),
                &metadata.hint_params,
                reference.as_deref(),
                &unhinted,
                &out,
            )
        })?;
        Ok(Value::Files(vec![out]))
    }

    fn woff2(&self, target: &TargetRef, task: &Task<Self>) -> Result<Value, Error> {
        let [_ttf, compressor] = take::<2>(task.need(&[
            Key::Ttf(target.clone()),
            Key::Tool(ToolKind::Woff2),
        ])?)?;
        let compressor = compressor.required_tool(ToolKind::Woff2)?;
        let ttf = self.paths.ttf_file(target);
        let out = self.paths.woff2_file(target);
        info!("Compressing {}", out.display());
        task.throttled(|| compress_woff2(&compressor, &ttf, &out))?;
        Ok(Value::Files(vec![out]))
    }

    fn webfont_css(&self, prefix: &str, task: &Task<Self>) -> Result<Value, Error> {
        let keys: Vec<_> = self
            .plan_targets(prefix, task)?
            .iter()
            .map(|target| Key::Metadata(target.name()))
            .collect();
        let fonts = task
            .need(&keys)?
            .into_iter()
            .map(|value| value.metadata().map(|m| m.as_ref().clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let out = self.paths.webfont_css_file(prefix);
        info!("Writing {}", out.display());
        write_webfont_css(&out, &fonts)?;
        Ok(Value::Files(vec![out]))
    }

    fn glyf_ttc(&self, name: &str, task: &Task<Self>) -> Result<Value, Error> {
        let fonts = task
            .need_one(Key::GlyfTtcFonts(name.to_string()))?
            .targets()?;
        let mut keys = vec![Key::Tool(ToolKind::Merger)];
        keys.extend(fonts.into_iter().map(Key::Ttf));
        let mut values = task.need(&keys)?;
        let merger = values.remove(0).required_tool(ToolKind::Merger)?;
        let fonts = all_files(values)?;

        let out = self.paths.glyf_ttc_file(name);
        info!("Merging {}", out.display());
        task.throttled(|| merge_glyf_ttc(&merger, &out, &as_paths(&fonts)))?;
        Ok(Value::Files(vec![out]))
    }

    fn ttc(&self, collection: &str, name: &str, task: &Task<Self>) -> Result<Value, Error> {
        let parts = task.need_one(Key::TtcParts(name.to_string()))?.names()?;
        let mut keys = vec![Key::Tool(ToolKind::Merger)];
        keys.extend(parts.into_iter().map(Key::GlyfTtc));
        let mut values = task.need(&keys)?;
        let merger = values.remove(0).required_tool(ToolKind::Merger)?;
        let parts = all_files(values)?;

        let out = self.paths.ttc_file(collection, name);
        info!("Merging {}", out.display());
        task.throttled(|| merge_ttc(&merger, &out, &as_paths(&parts)))?;
        Ok(Value::Files(vec![out]))
    }

    fn release_packages(&self, task: &Task<Self>) -> Result<Value, Error> {
        // Always rewritten
        task.volatile();
        let [config, plans] = take::<2>(task.need(&[Key::Config, Key::Plans])?)?;
        let config = config.config()?;
        let plans = plans.plans()?;
        let packages = release_packages(&config, &plans)?;
        let out = self.paths.release_packages_file();
        write_release_packages(&out, &packages)?;
        Ok(Value::Files(vec![out]))
    }

    fn archive(&self, out: PathBuf, keys: Vec<Key>, task: &Task<Self>) -> Result<Value, Error> {
        let mut values = task.need(&[Key::Tool(ToolKind::Archiver)])?;
        let archiver = values.remove(0).required_tool(ToolKind::Archiver)?;
        let files = all_files(task.need(&keys)?)?;
        info!("Archiving {}", out.display());
        task.throttled(|| archive(&archiver, &out, &as_paths(&files)))?;
        Ok(Value::Files(vec![out]))
    }

    fn ttf_archive(&self, prefix: &str, version: &str, task: &Task<Self>) -> Result<Value, Error> {
        let keys = self
            .plan_targets(prefix, task)?
            .into_iter()
            .map(Key::Ttf)
            .collect();
        self.archive(self.paths.ttf_archive_file(prefix, version), keys, task)
    }

    fn ttc_archive(
        &self,
        collection: &str,
        version: &str,
        task: &Task<Self>,
    ) -> Result<Value, Error> {
        let keys = self.ttc_keys(collection, task)?;
        self.archive(self.paths.ttc_archive_file(collection, version), keys, task)
    }

    /// What a group stands for.
    fn group_keys(&self, group: &Group, task: &Task<Self>) -> Result<Vec<Key>, Error> {
        let keys = match group {
            Group::Font(name) => {
                let plans = task.need_one(Key::Plans)?.plans()?;
                vec![Key::Ttf(plans.target(name)?.clone())]
            }
            Group::Ttf(prefix) => self
                .plan_targets(prefix, task)?
                .into_iter()
                .map(Key::Ttf)
                .collect(),
            Group::TtfUnhinted(prefix) => self
                .plan_targets(prefix, task)?
                .into_iter()
                .map(Key::UnhintedTtf)
                .collect(),
            Group::Webfont(prefix) => {
                let mut keys = vec![Key::WebfontCss(prefix.clone())];
                keys.extend(self.plan_targets(prefix, task)?.into_iter().map(Key::Woff2));
                keys
            }
            Group::Ttc(collection) => self.ttc_keys(collection, task)?,
            Group::ArchiveTtf(prefix) => {
                let version = task.need_one(Key::FontVersion)?.version()?;
                vec![Key::TtfArchive {
                    prefix: prefix.clone(),
                    version,
                }]
            }
            Group::ArchiveTtc(collection) => {
                let version = task.need_one(Key::FontVersion)?.version()?;
                vec![Key::TtcArchive {
                    collection: collection.clone(),
                    version,
                }]
            }
            Group::Release => {
                let [config, version] = take::<2>(task.need(&[Key::Config, Key::FontVersion])?)?;
                let config = config.config()?;
                let version = version.version()?;
                let mut keys = vec![Key::ReleasePackages];
                for (collection, collect) in config.collect_plans.iter() {
                    if !collect.release || collect.from.is_empty() {
                        continue;
                    }
                    keys.push(Key::TtcArchive {
                        collection: collection.clone(),
                        version: version.clone(),
                    });
                    for prefix in collect.from.iter() {
                        let key = Key::TtfArchive {
                            prefix: prefix.clone(),
                            version: version.clone(),
                        };
                        if !keys.contains(&key) {
                            keys.push(key);
                        }
                    }
                }
                keys
            }
        };
        Ok(keys)
    }
}

impl Rules for BuildRules {
    type Key = Key;
    type Value = Value;

    fn outputs(&self, key: &Key) -> Vec<PathBuf> {
        let path = match key {
            Key::Params(target) => self.paths.params_file(target),
            Key::UnhintedTtf(target) => self.paths.unhinted_ttf_file(target),
            Key::Ttf(target) => self.paths.ttf_file(target),
            Key::Woff2(target) => self.paths.woff2_file(target),
            Key::WebfontCss(prefix) => self.paths.webfont_css_file(prefix),
            Key::GlyfTtc(name) => self.paths.glyf_ttc_file(name),
            Key::Ttc { collection, name } => self.paths.ttc_file(collection, name),
            Key::ReleasePackages => self.paths.release_packages_file(),
            Key::TtfArchive { prefix, version } => self.paths.ttf_archive_file(prefix, version),
            Key::TtcArchive {
                collection,
                version,
            } => self.paths.ttc_archive_file(collection, version),
            Key::Config
            | Key::Tool(..)
            | Key::Plans
            | Key::StandardSuffixes
            | Key::CollectionPlans
            | Key::FontVersion
            | Key::Metadata(..)
            | Key::PlanTargets(..)
            | Key::TtcContents(..)
            | Key::TtcParts(..)
            | Key::GlyfTtcFonts(..)
            | Key::Group(..) => return Vec::new(),
        };
        vec![path]
    }

    fn exec(&self, key: &Key, task: &Task<Self>) -> Result<Value, Error> {
        match key {
            Key::Config => {
                let config = config::load(&self.plans_file, &self.private_file)?;
                Ok(Value::Config(Arc::new(config)))
            }
            Key::Tool(kind) => {
                let config = task.need_one(Key::Config)?.config()?;
                Ok(Value::Tool(tools::resolve(*kind, &config.build_options)?))
            }
            Key::Plans => {
                let config = task.need_one(Key::Config)?.config()?;
                let plans = PlanSet::expand(&config, &self.resolver)?;
                Ok(Value::Plans(Arc::new(plans)))
            }
            Key::StandardSuffixes => {
                let config = task.need_one(Key::Config)?.config()?;
                let suffixes = standard_suffixes(&config, &self.resolver)?;
                Ok(Value::Suffixes(Arc::new(suffixes)))
            }
            Key::CollectionPlans => {
                let [config, plans, standard] = take::<3>(task.need(&[
                    Key::Config,
                    Key::Plans,
                    Key::StandardSuffixes,
                ])?)?;
                let config = config.config()?;
                let plans = plans.plans()?;
                let standard = standard.suffixes()?;
                let collections = CollectionPlans::plan(
                    &config.collect_plans,
                    &plans,
                    &standard,
                    &config.collect_config,
                )?;
                Ok(Value::Collections(Arc::new(collections)))
            }
            Key::FontVersion => {
                if let Some(version) = &self.version_override {
                    return Ok(Value::Version(version.clone()));
                }
                let config = task.need_one(Key::Config)?.config()?;
                Ok(Value::Version(config.version().to_string()))
            }
            Key::Metadata(name) => {
                let [plans, version] = take::<2>(task.need(&[Key::Plans, Key::FontVersion])?)?;
                let plans = plans.plans()?;
                let version = version.version()?;
                let metadata = metadata::resolve(&plans, name, &version)?;
                Ok(Value::Metadata(Arc::new(metadata)))
            }
            Key::PlanTargets(prefix) => {
                let plans = task.need_one(Key::Plans)?.plans()?;
                Ok(Value::Targets(plan(&plans, prefix)?.target_refs().collect()))
            }
            Key::TtcContents(collection) => {
                let collections = task.need_one(Key::CollectionPlans)?.collections()?;
                let contents = collections.ttc_contents.get(collection).ok_or_else(|| {
                    Error::UnknownTarget(Group::Ttc(collection.clone()).to_string())
                })?;
                Ok(Value::Names(contents.clone()))
            }
            Key::TtcParts(name) => {
                let collections = task.need_one(Key::CollectionPlans)?.collections()?;
                let parts = collections
                    .ttc_composition
                    .get(name)
                    .ok_or_else(|| Error::UnknownTarget(name.clone()))?;
                Ok(Value::Names(parts.clone()))
            }
            Key::GlyfTtcFonts(name) => {
                let collections = task.need_one(Key::CollectionPlans)?.collections()?;
                let fonts = collections
                    .glyf_ttc_composition
                    .get(name)
                    .ok_or_else(|| Error::UnknownTarget(name.clone()))?;
                Ok(Value::Targets(fonts.clone()))
            }
            Key::Params(target) => self.params(target, task),
            Key::UnhintedTtf(target) => self.unhinted_ttf(target, task),
            Key::Ttf(target) => self.ttf(target, task),
            Key::Woff2(target) => self.woff2(target, task),
            Key::WebfontCss(prefix) => self.webfont_css(prefix, task),
            Key::GlyfTtc(name) => self.glyf_ttc(name, task),
            Key::Ttc { collection, name } => self.ttc(collection, name, task),
            Key::ReleasePackages => self.release_packages(task),
            Key::TtfArchive { prefix, version } => self.ttf_archive(prefix, version, task),
            Key::TtcArchive {
                collection,
                version,
            } => self.ttc_archive(collection, version, task),
            Key::Group(group) => {
                let keys = self.group_keys(group, task)?;
                Ok(Value::Files(all_files(task.need(&keys)?)?))
            }
        }
    }

    fn obsolete(&self, key: &Key, task: &Task<Self>) -> bool {
        match self.is_obsolete(key, task) {
            Ok(obsolete) => obsolete,
            Err(e) => {
                debug!("Keeping {key} in the journal: {e}");
                false
            }
        }
    }
}

impl BuildRules {
    /// Files for fonts, plans, containers or versions the current plans no longer have.
    fn is_obsolete(&self, key: &Key, task: &Task<Self>) -> Result<bool, Error> {
        let obsolete = match key {
            Key::Params(target) | Key::UnhintedTtf(target) | Key::Ttf(target) | Key::Woff2(target) => {
                let plans = task.need_one(Key::Plans)?.plans()?;
                !plans
                    .get(&target.prefix)
                    .is_some_and(|plan| plan.produces(&target.suffix))
            }
            Key::WebfontCss(prefix) => {
                let plans = task.need_one(Key::Plans)?.plans()?;
                plans.get(prefix).is_none()
            }
            Key::GlyfTtc(name) => {
                let collections = task.need_one(Key::CollectionPlans)?.collections()?;
                !collections.glyf_ttc_composition.contains_key(name)
            }
            Key::Ttc { collection, name } => {
                let collections = task.need_one(Key::CollectionPlans)?.collections()?;
                !collections
                    .ttc_contents
                    .get(collection)
                    .is_some_and(|contents| contents.contains(name))
            }
            Key::TtfArchive { prefix, version } => {
                let [plans, current] = take::<2>(task.need(&[Key::Plans, Key::FontVersion])?)?;
                current.version()? != *version || plans.plans()?.get(prefix).is_none()
            }
            Key::TtcArchive {
                collection,
                version,
            } => {
                let [collections, current] =
                    take::<2>(task.need(&[Key::CollectionPlans, Key::FontVersion])?)?;
                current.version()? != *version
                    || !collections
                        .collections()?
                        .ttc_contents
                        .contains_key(collection)
            }
            _ => false,
        };
        Ok(obsolete)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn reference_from_same_plan() {
        let target = TargetRef::new("sans-term", "bold");
        assert_eq!(
            Some(TargetRef::new("sans-term", "regular")),
            reference_target(&target, "sans-term-regular")
        );
        assert_eq!(None, reference_target(&target, "sans-regular"));
        assert_eq!(None, reference_target(&target, "sans-termregular"));
    }

    #[test]
    fn only_file_nodes_have_outputs() {
        let rules = BuildRules::new(
            Paths::new(Path::new(".build"), Path::new("dist"), Path::new("out")),
            Path::new(config::BUILD_PLANS_FILE),
            Path::new(config::PRIVATE_BUILD_PLANS_FILE),
            None,
        );
        let target = TargetRef::new("sans", "bold");
        assert_eq!(
            vec![PathBuf::from("dist/sans/WOFF2/sans-bold.woff2")],
            rules.outputs(&Key::Woff2(target.clone()))
        );
        assert_eq!(
            vec![PathBuf::from("out/PkgTTC-sans-all-1.0.0.zip")],
            rules.outputs(&Key::TtcArchive {
                collection: "sans-all".to_string(),
                version: "1.0.0".to_string()
            })
        );
        assert!(rules.outputs(&Key::Metadata(target.name())).is_empty());
        assert!(rules.outputs(&Key::Group(Group::Release)).is_empty());
    }

    #[test]
    fn display() {
        assert_eq!(
            "ttf:sans-bold",
            Key::Ttf(TargetRef::new("sans", "bold")).to_string()
        );
        assert_eq!(
            "group:archive-ttc::sans-all",
            Key::Group(Group::ArchiveTtc("sans-all".to_string())).to_string()
        );
    }
}
