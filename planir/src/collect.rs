//! Composition of fonts into merged containers.
//!
//! Merging happens in two tiers. Fonts of a collection are first merged into
//! width-specific glyf containers, where fonts from different plans can share
//! outlines, then glyf containers are merged into the top level containers
//! that get shipped.
//! Which axes split the top level is up to [CollectConfig].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    axes::{
        make_suffix, SuffixMapping, SuffixMappingEntry, SLOPE_NORMAL, WEIGHT_NORMAL, WIDTH_NORMAL,
    },
    config::{CollectConfig, RawCollectPlan},
    error::Error,
    plans::{make_target_name, PlanSet, TargetRef},
};

/// Every container to build, all in first-insertion order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPlans {
    /// Collection => the build plans it draws from
    pub group_decomposition: IndexMap<String, Vec<String>>,
    /// Collection => its top level containers
    pub ttc_contents: IndexMap<String, Vec<String>>,
    /// Top level container => the glyf containers merged into it
    pub ttc_composition: IndexMap<String, Vec<String>>,
    /// Glyf container => the fonts merged into it
    pub glyf_ttc_composition: IndexMap<String, Vec<TargetRef>>,
}

impl CollectionPlans {
    pub fn plan(
        collect_plans: &IndexMap<String, RawCollectPlan>,
        plans: &PlanSet,
        standard: &SuffixMapping,
        collect_config: &CollectConfig,
    ) -> Result<CollectionPlans, Error> {
        let glyf_config = CollectConfig {
            distinguish_widths: true,
            ..collect_config.clone()
        };
        let mut result = CollectionPlans::default();
        for (collection, raw) in collect_plans {
            if raw.from.is_empty() {
                log::debug!("Collection {collection} has no sources, skipping");
                continue;
            }
            let mut contents = Vec::new();
            for prefix in raw.from.iter() {
                let plan = plans
                    .get(prefix)
                    .ok_or_else(|| Error::UnknownCollectionSource {
                        collection: collection.clone(),
                        source_prefix: prefix.clone(),
                        hint: plans.missing_overlay_hint(),
                    })?;
                for (suffix, entry) in standard {
                    if !plan.produces(suffix) {
                        continue;
                    }
                    let glyf = container_name(collection, entry, &glyf_config);
                    let ttc = container_name(collection, entry, collect_config);
                    push_unique(
                        result.glyf_ttc_composition.entry(glyf.clone()).or_default(),
                        TargetRef::new(prefix.as_str(), suffix.as_str()),
                    );
                    push_unique(result.ttc_composition.entry(ttc.clone()).or_default(), glyf);
                    push_unique(&mut contents, ttc);
                }
            }
            result
                .group_decomposition
                .insert(collection.clone(), raw.from.clone());
            result.ttc_contents.insert(collection.clone(), contents);
        }
        Ok(result)
    }

    /// The collection a top level container belongs to.
    pub fn collection_of(&self, ttc: &str) -> Option<&str> {
        self.ttc_contents
            .iter()
            .find(|(_, contents)| contents.iter().any(|c| c == ttc))
            .map(|(collection, _)| collection.as_str())
    }
}

/// Name a container, normalizing away the axes the collection doesn't split on.
pub fn container_name(
    collection: &str,
    entry: &SuffixMappingEntry,
    config: &CollectConfig,
) -> String {
    let weight = if config.distinguish_weights {
        entry.weight.as_str()
    } else {
        WEIGHT_NORMAL
    };
    let width = if config.distinguish_widths {
        entry.width.as_str()
    } else {
        WIDTH_NORMAL
    };
    let slope = if config.distinguish_slope {
        entry.slope.as_str()
    } else {
        SLOPE_NORMAL
    };
    make_target_name(collection, &make_suffix(weight, width, slope))
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        axes::AxisResolver,
        config::{load, RawConfig, BUILD_PLANS_FILE},
        plans::standard_suffixes,
        test::testdata_dir,
    };

    use super::*;

    fn config() -> RawConfig {
        load(
            &testdata_dir().join(BUILD_PLANS_FILE),
            &testdata_dir().join("nope.yml"),
        )
        .unwrap()
    }

    fn collections(config: &RawConfig) -> Result<CollectionPlans, Error> {
        let resolver = AxisResolver::new();
        let plans = PlanSet::expand(config, &resolver)?;
        let standard = standard_suffixes(config, &resolver)?;
        CollectionPlans::plan(
            &config.collect_plans,
            &plans,
            &standard,
            &config.collect_config,
        )
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_collections_are_skipped() {
        let collections = collections(&config()).unwrap();
        assert_eq!(
            vec!["sans-all", "sans-slab"],
            collections.ttc_contents.keys().collect::<Vec<_>>()
        );
        assert_eq!(
            strings(&["sans", "sans-term"]),
            collections.group_decomposition["sans-all"]
        );
    }

    #[test]
    fn top_level_containers() {
        let collections = collections(&config()).unwrap();
        assert_eq!(
            strings(&[
                "sans-all-regular",
                "sans-all-italic",
                "sans-all-bold",
                "sans-all-bolditalic"
            ]),
            collections.ttc_contents["sans-all"]
        );
        assert_eq!(
            strings(&["sans-all-regular", "sans-all-extended"]),
            collections.ttc_composition["sans-all-regular"]
        );
        assert_eq!(
            strings(&["sans-all-bolditalic", "sans-all-extendedbolditalic"]),
            collections.ttc_composition["sans-all-bolditalic"]
        );
    }

    #[test]
    fn glyf_containers_tolerate_sparse_plans() {
        let collections = collections(&config()).unwrap();
        assert_eq!(
            vec![
                TargetRef::new("sans", "regular"),
                TargetRef::new("sans-term", "regular"),
            ],
            collections.glyf_ttc_composition["sans-all-regular"]
        );
        // sans-term has no italics
        assert_eq!(
            vec![TargetRef::new("sans", "extendeditalic")],
            collections.glyf_ttc_composition["sans-all-extendeditalic"]
        );
        assert_eq!(
            8,
            collections
                .glyf_ttc_composition
                .keys()
                .filter(|k| k.starts_with("sans-all-"))
                .count()
        );
    }

    #[test]
    fn single_width_collection() {
        let collections = collections(&config()).unwrap();
        assert_eq!(
            strings(&["sans-slab-regular"]),
            collections.ttc_composition["sans-slab-regular"]
        );
        assert!(!collections
            .glyf_ttc_composition
            .contains_key("sans-slab-extended"));
        assert_eq!(Some("sans-slab"), collections.collection_of("sans-slab-bold"));
    }

    #[test]
    fn no_duplicate_entries() {
        let mut config = config();
        config.collect_plans["sans-all"].from = strings(&["sans", "sans-term", "sans"]);
        let collections = collections(&config).unwrap();
        for composition in collections.ttc_composition.values() {
            let mut deduped = composition.clone();
            deduped.dedup();
            assert_eq!(&deduped, composition);
        }
        assert_eq!(
            2,
            collections.glyf_ttc_composition["sans-all-regular"].len()
        );
    }

    #[test]
    fn merged_weights() {
        let mut config = config();
        config.collect_config.distinguish_weights = false;
        let collections = collections(&config).unwrap();
        assert_eq!(
            strings(&["sans-all-regular", "sans-all-italic"]),
            collections.ttc_contents["sans-all"]
        );
        assert_eq!(
            strings(&["sans-all-regular", "sans-all-extended"]),
            collections.ttc_composition["sans-all-regular"]
        );
        assert_eq!(
            vec![
                TargetRef::new("sans", "regular"),
                TargetRef::new("sans", "bold"),
                TargetRef::new("sans-term", "regular"),
                TargetRef::new("sans-term", "bold"),
            ],
            collections.glyf_ttc_composition["sans-all-regular"]
        );
    }

    #[test]
    fn unknown_source() {
        let mut config = config();
        config.collect_plans["sans-slab"].from = strings(&["serif"]);
        let result = collections(&config);
        assert!(
            matches!(&result, Err(Error::UnknownCollectionSource { source_prefix, .. }) if source_prefix == "serif"),
            "{result:?}"
        );
    }

    #[test]
    fn deterministic() {
        assert_eq!(collections(&config()).unwrap(), collections(&config()).unwrap());
    }
}
