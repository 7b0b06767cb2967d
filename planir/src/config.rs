//! Raw build configuration as read from `build-plans.yml` and its private overlay.
//!
//! Nothing here is validated beyond its shape; [crate::axes] and [crate::plans]
//! decide whether values make sense.

use std::{
    fmt::{self, Display},
    fs,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Error;

pub const BUILD_PLANS_FILE: &str = "build-plans.yml";
pub const PRIVATE_BUILD_PLANS_FILE: &str = "private-build-plans.yml";
pub const DEFAULT_VERSION: &str = "0.0.0";
const DEFAULT_SERIFS: &str = "sans";
const DEFAULT_SPACING: &str = "type";

/// A leaf value that may be written as either a number or a string.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            Scalar::Number(_) => None,
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WeightDef {
    pub shape: Option<Scalar>,
    pub menu: Option<Scalar>,
    pub css: Option<Scalar>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WidthDef {
    pub shape: Option<Scalar>,
    pub menu: Option<Scalar>,
    pub css: Option<Scalar>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SlopeTable {
    pub angle: Option<Scalar>,
    pub shape: Option<Scalar>,
    pub menu: Option<Scalar>,
    pub css: Option<Scalar>,
}

/// A slope is either spelled out or given as just its css style.
///
/// `upright: normal` is the same as
/// `upright: { angle: 0, shape: upright, menu: upright, css: normal }`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SlopeDef {
    Table(SlopeTable),
    Css(String),
}

impl SlopeDef {
    /// The full table for the slope called `name`.
    pub fn table(&self, name: &str) -> SlopeTable {
        match self {
            SlopeDef::Table(table) => table.clone(),
            SlopeDef::Css(css) => SlopeTable {
                angle: Some(Scalar::Number(0.0)),
                shape: Some(name.into()),
                menu: Some(name.into()),
                css: Some(css.as_str().into()),
            },
        }
    }
}

/// How a build plan picks its weights, slopes or widths.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AxisSelection<T> {
    /// Names of globally defined entries, e.g. `weights: [regular, bold]`
    Names(Vec<String>),
    /// Entries private to the plan
    Defined(IndexMap<String, T>),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Ligations {
    pub inherits: Option<String>,
    #[serde(default)]
    pub enables: Vec<String>,
    #[serde(default)]
    pub disables: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExcludeChars {
    #[serde(default)]
    pub ranges: Vec<[u32; 2]>,
}

/// One entry of `buildPlans`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RawBuildPlan {
    pub family: Option<String>,
    pub desc: Option<String>,
    pub spacing: Option<String>,
    pub serifs: Option<String>,
    pub no_cv_ss: bool,
    pub no_ligation: bool,
    pub export_glyph_names: bool,
    pub variants: Option<JsonValue>,
    pub deriving_variants: Option<JsonValue>,
    pub ligations: Option<Ligations>,
    pub quasi_proportional_diversity: Option<f64>,
    pub hint_params: Option<Vec<String>>,
    pub compatibility_ligatures: Option<JsonValue>,
    pub metric_override: Option<JsonValue>,
    pub exclude_chars: Option<ExcludeChars>,
    pub weights: Option<AxisSelection<WeightDef>>,
    pub slopes: Option<AxisSelection<SlopeDef>>,
    /// Older spelling of `slopes`
    pub slants: Option<AxisSelection<SlopeDef>>,
    pub widths: Option<AxisSelection<WidthDef>>,
}

impl RawBuildPlan {
    pub fn serifs(&self) -> &str {
        self.serifs.as_deref().unwrap_or(DEFAULT_SERIFS)
    }

    pub fn spacing(&self) -> &str {
        self.spacing.as_deref().unwrap_or(DEFAULT_SPACING)
    }
}

/// One entry of `collectPlans`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RawCollectPlan {
    pub from: Vec<String>,
    pub release: bool,
}

/// Which axes get their own container when fonts are merged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectConfig {
    pub distinguish_weights: bool,
    pub distinguish_widths: bool,
    pub distinguish_slope: bool,
}

impl Default for CollectConfig {
    fn default() -> Self {
        CollectConfig {
            distinguish_weights: true,
            distinguish_widths: false,
            distinguish_slope: true,
        }
    }
}

/// Settings for the external tools. Each command is a program followed by
/// any fixed leading arguments.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildOptions {
    pub hint: Option<bool>,
    pub generate_command: Option<Vec<String>>,
    pub hint_command: Option<Vec<String>>,
    pub woff2_command: Option<Vec<String>>,
    pub merge_command: Option<Vec<String>>,
    pub archive_command: Option<Vec<String>>,
}

impl BuildOptions {
    pub fn hint_enabled(&self) -> bool {
        self.hint.unwrap_or(true)
    }

    /// Fields set in `other` replace ours.
    fn overlay(&mut self, other: BuildOptions) {
        let BuildOptions {
            hint,
            generate_command,
            hint_command,
            woff2_command,
            merge_command,
            archive_command,
        } = other;
        self.hint = hint.or(self.hint);
        self.generate_command = generate_command.or(self.generate_command.take());
        self.hint_command = hint_command.or(self.hint_command.take());
        self.woff2_command = woff2_command.or(self.woff2_command.take());
        self.merge_command = merge_command.or(self.merge_command.take());
        self.archive_command = archive_command.or(self.archive_command.take());
    }
}

/// The merged configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RawConfig {
    pub version: Option<String>,
    pub weights: IndexMap<String, WeightDef>,
    pub slopes: IndexMap<String, SlopeDef>,
    pub widths: IndexMap<String, WidthDef>,
    pub build_plans: IndexMap<String, RawBuildPlan>,
    pub collect_plans: IndexMap<String, RawCollectPlan>,
    pub collect_config: CollectConfig,
    pub build_options: BuildOptions,
    /// Set when a private overlay contributed to this config
    #[serde(skip)]
    pub private_overlay: Option<PathBuf>,
}

/// The parts of the config a private overlay may contribute.
#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct PrivateConfig {
    build_plans: IndexMap<String, RawBuildPlan>,
    build_options: BuildOptions,
}

impl RawConfig {
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_VERSION)
    }

    fn merge_private(&mut self, overlay: PrivateConfig) {
        // Replacing an existing key keeps its position, new keys go last
        for (prefix, plan) in overlay.build_plans {
            self.build_plans.insert(prefix, plan);
        }
        self.build_options.overlay(overlay.build_options);
    }
}

/// Load `base` and, if it exists, merge `private` over it.
pub fn load(base: &Path, private: &Path) -> Result<RawConfig, Error> {
    let mut config: RawConfig = parse(base)?;
    if private.is_file() {
        let overlay: PrivateConfig = parse(private)?;
        config.merge_private(overlay);
        config.private_overlay = Some(private.to_path_buf());
    } else {
        log::debug!("No private build plans at {private:?}");
    }
    Ok(config)
}

fn parse<T: DeserializeOwned + Default>(path: &Path) -> Result<T, Error> {
    if !path.is_file() {
        return Err(Error::FileExpected(path.to_path_buf()));
    }
    let yml = fs::read_to_string(path).map_err(|source| Error::FileIo {
        path: path.to_path_buf(),
        source,
    })?;
    if yml.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(&yml).map_err(|e| Error::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
