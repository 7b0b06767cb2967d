//! Expansion of build plans into named font targets.

use std::fmt::{self, Display};

use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    axes::{AxisResolver, SuffixMapping, SuffixMappingEntry},
    config::{AxisSelection, RawBuildPlan, RawConfig, PRIVATE_BUILD_PLANS_FILE},
    error::Error,
};

/// One font to build: the plan it comes from and its suffix within that plan.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetRef {
    pub prefix: String,
    pub suffix: String,
}

impl TargetRef {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> TargetRef {
        TargetRef {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// The target name, also the file stem of everything built for it
    pub fn name(&self) -> String {
        make_target_name(&self.prefix, &self.suffix)
    }
}

impl Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.suffix)
    }
}

pub fn make_target_name(prefix: &str, suffix: &str) -> String {
    format!("{prefix}-{suffix}")
}

/// A build plan with its axes resolved.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResolvedPlan {
    pub prefix: String,
    pub family: String,
    /// The plan as written, with `slants` folded into `slopes`
    pub raw: RawBuildPlan,
    /// Every suffix the plan's axes produce
    pub suffixes: SuffixMapping,
    /// The suffixes actually built, in enumeration order
    pub targets: Vec<String>,
}

impl ResolvedPlan {
    pub fn target_refs(&self) -> impl Iterator<Item = TargetRef> + '_ {
        self.targets
            .iter()
            .map(|suffix| TargetRef::new(self.prefix.as_str(), suffix.as_str()))
    }

    pub fn produces(&self, suffix: &str) -> bool {
        self.targets.iter().any(|s| s == suffix)
    }
}

/// Every plan, expanded, plus the index from target name back to its plan.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PlanSet {
    pub plans: IndexMap<String, ResolvedPlan>,
    pub index: IndexMap<String, TargetRef>,
    pub has_private_overlay: bool,
}

impl PlanSet {
    pub fn expand(config: &RawConfig, resolver: &AxisResolver) -> Result<PlanSet, Error> {
        let mut plan_set = PlanSet {
            has_private_overlay: config.private_overlay.is_some(),
            ..Default::default()
        };
        for (prefix, raw) in config.build_plans.iter() {
            let plan = expand_plan(prefix, raw, config, resolver)?;
            for target in plan.target_refs() {
                if let Some(previous) = plan_set.index.insert(target.name(), target.clone()) {
                    warn!(
                        "Target {} is produced by both {} and {}; using {}",
                        target.name(),
                        previous.prefix,
                        target.prefix,
                        target.prefix
                    );
                }
            }
            plan_set.plans.insert(prefix.clone(), plan);
        }
        Ok(plan_set)
    }

    pub fn get(&self, prefix: &str) -> Option<&ResolvedPlan> {
        self.plans.get(prefix)
    }

    /// The plan and axis values behind a target name.
    pub fn lookup(&self, name: &str) -> Result<(&ResolvedPlan, &SuffixMappingEntry), Error> {
        self.index
            .get(name)
            .and_then(|target| {
                let plan = self.plans.get(&target.prefix)?;
                let entry = plan.suffixes.get(&target.suffix)?;
                Some((plan, entry))
            })
            .ok_or_else(|| Error::PlanNotFound {
                target: name.to_string(),
                hint: self.missing_overlay_hint(),
            })
    }

    pub fn target(&self, name: &str) -> Result<&TargetRef, Error> {
        self.index.get(name).ok_or_else(|| Error::PlanNotFound {
            target: name.to_string(),
            hint: self.missing_overlay_hint(),
        })
    }

    /// Appended to lookup failures; custom plans usually live in the private overlay.
    pub fn missing_overlay_hint(&self) -> String {
        if self.has_private_overlay {
            String::new()
        } else {
            format!(
                "\n  -- Possible reason: config file '{PRIVATE_BUILD_PLANS_FILE}' does not exist."
            )
        }
    }
}

/// The suffixes of the global axes, the universe collections draw from.
pub fn standard_suffixes(
    config: &RawConfig,
    resolver: &AxisResolver,
) -> Result<SuffixMapping, Error> {
    resolver.suffix_mapping(&config.weights, &config.slopes, &config.widths)
}

fn select<T: Clone>(
    prefix: &str,
    axis: &'static str,
    selection: Option<&AxisSelection<T>>,
    globals: &IndexMap<String, T>,
) -> Result<IndexMap<String, T>, Error> {
    match selection {
        None => Ok(globals.clone()),
        Some(AxisSelection::Defined(defs)) => Ok(defs.clone()),
        Some(AxisSelection::Names(names)) => names
            .iter()
            .map(|name| {
                globals
                    .get(name)
                    .map(|def| (name.clone(), def.clone()))
                    .ok_or_else(|| Error::UnknownAxisName {
                        prefix: prefix.to_string(),
                        axis,
                        name: name.clone(),
                    })
            })
            .collect(),
    }
}

fn selected_names<T>(selection: Option<&AxisSelection<T>>) -> Option<Vec<&str>> {
    match selection? {
        AxisSelection::Names(names) => Some(names.iter().map(String::as_str).collect()),
        AxisSelection::Defined(defs) => Some(defs.keys().map(String::as_str).collect()),
    }
}

fn expand_plan(
    prefix: &str,
    raw: &RawBuildPlan,
    config: &RawConfig,
    resolver: &AxisResolver,
) -> Result<ResolvedPlan, Error> {
    let mut raw = raw.clone();
    let Some(family) = raw.family.clone() else {
        return Err(Error::MissingFamily(prefix.to_string()));
    };
    if let Some(slants) = raw.slants.take() {
        if raw.slopes.is_some() {
            warn!("Build plan for {prefix} has both slopes and slants; slants is ignored");
        } else {
            warn!("Build plan for {prefix} uses deprecated 'slants', rename it to 'slopes'");
            raw.slopes = Some(slants);
        }
    }

    let weights = select(prefix, "weight", raw.weights.as_ref(), &config.weights)?;
    let slopes = select(prefix, "slope", raw.slopes.as_ref(), &config.slopes)?;
    let widths = select(prefix, "width", raw.widths.as_ref(), &config.widths)?;
    let suffixes = resolver.suffix_mapping(&weights, &slopes, &widths)?;

    let only_weights = selected_names(raw.weights.as_ref());
    let only_slopes = selected_names(raw.slopes.as_ref());
    let targets = suffixes
        .iter()
        .filter(|(_, entry)| {
            only_weights
                .as_ref()
                .map_or(true, |names| names.contains(&entry.weight.as_str()))
                && only_slopes
                    .as_ref()
                    .map_or(true, |names| names.contains(&entry.slope.as_str()))
        })
        .map(|(suffix, _)| suffix.clone())
        .collect();

    Ok(ResolvedPlan {
        prefix: prefix.to_string(),
        family,
        raw,
        suffixes,
        targets,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        config::{load, BUILD_PLANS_FILE, PRIVATE_BUILD_PLANS_FILE},
        test::testdata_dir,
    };

    use super::*;

    fn config(private: &str) -> RawConfig {
        load(
            &testdata_dir().join(BUILD_PLANS_FILE),
            &testdata_dir().join(private),
        )
        .unwrap()
    }

    fn expand(config: &RawConfig) -> PlanSet {
        PlanSet::expand(config, &AxisResolver::new()).unwrap()
    }

    #[test]
    fn plan_order_and_target_order() {
        let plans = expand(&config("nope.yml"));
        assert_eq!(
            vec!["sans", "sans-term", "sans-slab"],
            plans.plans.keys().collect::<Vec<_>>()
        );
        assert_eq!(
            vec![
                "regular",
                "extended",
                "italic",
                "extendeditalic",
                "bold",
                "extendedbold",
                "bolditalic",
                "extendedbolditalic",
            ],
            plans.plans["sans"].targets
        );
    }

    #[test]
    fn sparse_slopes() {
        let plans = expand(&config("nope.yml"));
        assert_eq!(
            vec!["regular", "extended", "bold", "extendedbold"],
            plans.plans["sans-term"].targets
        );
        assert!(plans.target("sans-term-italic").is_err());
        assert!(plans.target("sans-italic").is_ok());
    }

    #[test]
    fn index_maps_names_to_targets() {
        let plans = expand(&config("nope.yml"));
        assert_eq!(
            &TargetRef::new("sans-slab", "bolditalic"),
            plans.target("sans-slab-bolditalic").unwrap()
        );
        assert_eq!(8 + 4 + 4, plans.index.len());
    }

    #[test]
    fn expansion_is_deterministic() {
        let config = config(PRIVATE_BUILD_PLANS_FILE);
        assert_eq!(expand(&config), expand(&config));
    }

    #[test]
    fn overlay_plans_are_expanded() {
        let plans = expand(&config(PRIVATE_BUILD_PLANS_FILE));
        assert_eq!(
            vec!["bold", "extendedbold", "bolditalic", "extendedbolditalic"],
            plans.plans["custom"].targets
        );
        assert_eq!("Sans Custom", plans.plans["sans"].family);
    }

    #[test]
    fn missing_family() {
        let mut config = config("nope.yml");
        config.build_plans["sans-term"].family = None;
        let result = PlanSet::expand(&config, &AxisResolver::new());
        assert!(
            matches!(&result, Err(Error::MissingFamily(p)) if p == "sans-term"),
            "{result:?}"
        );
    }

    #[test]
    fn unknown_axis_name() {
        let mut config = config("nope.yml");
        config.build_plans["sans"].weights = Some(AxisSelection::Names(vec!["black".to_string()]));
        let err = PlanSet::expand(&config, &AxisResolver::new()).unwrap_err();
        assert!(
            matches!(&err, Error::UnknownAxisName { axis: "weight", name, .. } if name == "black"),
            "{err:?}"
        );
    }

    #[test]
    fn slants_are_slopes() {
        let config = load(
            &testdata_dir().join("legacy-plans.yml"),
            &testdata_dir().join("nope.yml"),
        )
        .unwrap();
        let plans = expand(&config);
        let legacy = &plans.plans["legacy"];
        assert!(legacy.raw.slants.is_none());
        assert!(legacy.produces("italic"));
        assert!(legacy.produces("extendedheavyitalic"));
        assert_eq!(500.0, legacy.suffixes["regular"].shape_width);
    }

    #[test]
    fn later_prefix_wins_collision() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut config = config("nope.yml");
        let regular = config.weights["regular"].clone();
        config.weights.insert("term-regular".to_string(), regular);
        let plans = expand(&config);
        // sans + term-regular and sans-term + regular are both sans-term-regular
        assert!(plans.plans["sans"].produces("term-regular"));
        assert_eq!(
            &TargetRef::new("sans-term", "regular"),
            plans.target("sans-term-regular").unwrap()
        );
    }

    #[test]
    fn not_found_mentions_missing_overlay() {
        let plans = expand(&config("nope.yml"));
        let err = plans.lookup("custom-bold").unwrap_err();
        assert_eq!(
            "Build plan for 'custom-bold' not found.\n  -- Possible reason: config file 'private-build-plans.yml' does not exist.",
            err.to_string()
        );
    }

    #[test]
    fn not_found_with_overlay_has_no_hint() {
        let plans = expand(&config(PRIVATE_BUILD_PLANS_FILE));
        let err = plans.lookup("nothing-bold").unwrap_err();
        assert_eq!("Build plan for 'nothing-bold' not found.", err.to_string());
    }

    #[test]
    fn standard_suffixes_use_globals() {
        let config = config("nope.yml");
        let suffixes = standard_suffixes(&config, &AxisResolver::new()).unwrap();
        assert_eq!(8, suffixes.len());
    }
}
