//! The parameter record of a single font, as handed to the generator.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{
    axes::{SuffixMappingEntry, DEFAULT_SUBFAMILY, SLOPE_NORMAL},
    config::Ligations,
    error::Error,
    plans::{make_target_name, PlanSet, ResolvedPlan},
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureControl {
    pub no_cv_ss: bool,
    pub no_ligation: bool,
    pub export_glyph_names: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShapeMetadata {
    pub serifs: String,
    pub spacing: String,
    pub weight: f64,
    pub slope: String,
    pub slope_angle: f64,
    pub width: f64,
    pub quasi_proportional_diversity: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MenuMetadata {
    pub family: String,
    pub version: String,
    pub width: u32,
    pub slope: String,
    pub weight: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CssMetadata {
    pub weight: f64,
    pub stretch: String,
    pub style: String,
}

/// Everything the generator needs to know about one font.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FontMetadata {
    pub name: String,
    pub variants: JsonValue,
    pub deriving_variants: JsonValue,
    pub feature_control: FeatureControl,
    pub ligations: Option<Ligations>,
    pub shape: ShapeMetadata,
    pub menu: MenuMetadata,
    pub css: CssMetadata,
    pub hint_params: Vec<String>,
    /// The font whose hinting this one should follow, if not itself
    pub hint_reference: Option<String>,
    pub compatibility_ligatures: JsonValue,
    pub metric_override: JsonValue,
    pub excluded_char_ranges: Option<Vec<[u32; 2]>>,
}

/// Rebuild the metadata of the font called `name`.
pub fn resolve(plans: &PlanSet, name: &str, version: &str) -> Result<FontMetadata, Error> {
    let (plan, entry) = plans.lookup(name)?;
    let raw = &plan.raw;
    let suffix = plans.target(name)?.suffix.as_str();
    Ok(FontMetadata {
        name: name.to_string(),
        variants: raw.variants.clone().unwrap_or_default(),
        deriving_variants: raw.deriving_variants.clone().unwrap_or_default(),
        feature_control: FeatureControl {
            no_cv_ss: raw.no_cv_ss,
            no_ligation: raw.no_ligation,
            export_glyph_names: raw.export_glyph_names,
        },
        ligations: raw.ligations.clone(),
        shape: ShapeMetadata {
            serifs: raw.serifs().to_string(),
            spacing: raw.spacing().to_string(),
            weight: entry.shape_weight,
            slope: entry.shape_slope.clone(),
            slope_angle: entry.slope_angle,
            width: entry.shape_width,
            quasi_proportional_diversity: raw.quasi_proportional_diversity.unwrap_or(0.0),
        },
        menu: MenuMetadata {
            family: plan.family.clone(),
            version: version.to_string(),
            width: entry.menu_width,
            slope: entry.menu_slope.clone(),
            weight: entry.menu_weight,
        },
        css: CssMetadata {
            weight: entry.css_weight,
            stretch: entry.css_stretch.clone(),
            style: entry.css_style.clone(),
        },
        hint_params: raw.hint_params.clone().unwrap_or_default(),
        hint_reference: hint_reference(plan, suffix),
        compatibility_ligatures: raw.compatibility_ligatures.clone().unwrap_or_default(),
        metric_override: raw.metric_override.clone().unwrap_or_default(),
        excluded_char_ranges: raw.exclude_chars.as_ref().map(|ex| ex.ranges.clone()),
    })
}

/// Pick the font of `plan` that the others are hinted against.
///
/// Plans with metric overrides are hinted independently.
fn hint_reference(plan: &ResolvedPlan, suffix: &str) -> Option<String> {
    if plan.raw.metric_override.is_some() {
        return None;
    }
    let reference = if plan.produces(DEFAULT_SUBFAMILY) {
        DEFAULT_SUBFAMILY
    } else {
        closest_upright(plan)?
    };
    (reference != suffix).then(|| make_target_name(&plan.prefix, reference))
}

fn closest_upright(plan: &ResolvedPlan) -> Option<&str> {
    let distance = |e: &SuffixMappingEntry| {
        (
            (e.shape_weight - 400.0).abs(),
            (e.shape_width - 500.0).abs(),
        )
    };
    let mut best: Option<(&str, (f64, f64))> = None;
    for suffix in plan.targets.iter() {
        let Some(entry) = plan.suffixes.get(suffix) else {
            continue;
        };
        if entry.slope != SLOPE_NORMAL {
            continue;
        }
        let d = distance(entry);
        if best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((suffix, d));
        }
    }
    best.map(|(suffix, _)| suffix)
        .or_else(|| plan.targets.first().map(String::as_str))
}
