//! The release manifest: what each released collection contains.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{config::RawConfig, error::Error, plans::PlanSet};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReleaseGroup {
    pub family: String,
    pub desc: Option<String>,
    pub spacing: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleasePackage {
    pub sub_groups: IndexMap<String, ReleaseGroup>,
    pub serifs: String,
}

/// Collection => package, for collections marked for release.
pub type ReleasePackages = IndexMap<String, ReleasePackage>;

pub fn release_packages(config: &RawConfig, plans: &PlanSet) -> Result<ReleasePackages, Error> {
    let mut packages = ReleasePackages::new();
    for (collection, collect) in config.collect_plans.iter() {
        if !collect.release || collect.from.is_empty() {
            continue;
        }
        let mut sub_groups = IndexMap::new();
        let mut serifs = None;
        for prefix in collect.from.iter() {
            let plan = plans
                .get(prefix)
                .ok_or_else(|| Error::UnknownCollectionSource {
                    collection: collection.clone(),
                    source_prefix: prefix.clone(),
                    hint: plans.missing_overlay_hint(),
                })?;
            serifs.get_or_insert_with(|| plan.raw.serifs().to_string());
            sub_groups.insert(
                prefix.clone(),
                ReleaseGroup {
                    family: plan.family.clone(),
                    desc: plan.raw.desc.clone(),
                    spacing: plan.raw.spacing().to_string(),
                },
            );
        }
        packages.insert(
            collection.clone(),
            ReleasePackage {
                sub_groups,
                serifs: serifs.unwrap_or_default(),
            },
        );
    }
    Ok(packages)
}
