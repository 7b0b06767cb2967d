//! Resolution of weight, width and slope tables into suffixes.
//!
//! Every combination of one weight, one slope and one width is validated and
//! named by a suffix such as `extendedbolditalic`; the resulting
//! [SuffixMapping] is the basis of every target name.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::warn;
use ordered_float::OrderedFloat;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    config::{Scalar, SlopeDef, WeightDef, WidthDef},
    error::Error,
};

pub const WEIGHT_NORMAL: &str = "regular";
pub const WIDTH_NORMAL: &str = "normal";
pub const SLOPE_NORMAL: &str = "upright";
pub const DEFAULT_SUBFAMILY: &str = "regular";

const RECOMMENDED_WEIGHTS: [(&str, f64); 10] = [
    ("thin", 100.0),
    ("extralight", 200.0),
    ("light", 300.0),
    ("semilight", 350.0),
    ("regular", 400.0),
    ("medium", 500.0),
    ("semibold", 600.0),
    ("bold", 700.0),
    ("extrabold", 800.0),
    ("heavy", 900.0),
];

const CSS_STRETCHES: [&str; 9] = [
    "ultra-condensed",
    "extra-condensed",
    "condensed",
    "semi-condensed",
    "normal",
    "semi-expanded",
    "expanded",
    "extra-expanded",
    "ultra-expanded",
];

const SLOPES: [&str; 3] = ["upright", "oblique", "italic"];
const CSS_STYLES: [&str; 3] = ["normal", "oblique", "italic"];

/// The name component for one (weight, width, slope) triple.
///
/// Normal values contribute nothing; if everything is normal the suffix is
/// [DEFAULT_SUBFAMILY].
pub fn make_suffix(weight: &str, width: &str, slope: &str) -> String {
    let mut suffix = String::new();
    if width != WIDTH_NORMAL {
        suffix.push_str(width);
    }
    if weight != WEIGHT_NORMAL {
        suffix.push_str(weight);
    }
    if slope != SLOPE_NORMAL {
        suffix.push_str(slope);
    }
    if suffix.is_empty() {
        DEFAULT_SUBFAMILY.to_string()
    } else {
        suffix
    }
}

/// The fully validated axis values of one suffix.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SuffixMappingEntry {
    pub weight: String,
    pub width: String,
    pub slope: String,
    pub shape_weight: f64,
    pub css_weight: f64,
    pub menu_weight: f64,
    pub shape_width: f64,
    pub css_stretch: String,
    pub menu_width: u32,
    pub shape_slope: String,
    pub slope_angle: f64,
    pub css_style: String,
    pub menu_slope: String,
}

/// Suffix => axis values, in enumeration order.
pub type SuffixMapping = IndexMap<String, SuffixMappingEntry>;

/// Validates axis tables and builds suffix mappings.
///
/// Holds the cache of legacy width grade conversions, so one resolver should be
/// shared by everything resolved in a single run.
#[derive(Debug, Default)]
pub struct AxisResolver {
    width_fixups: Mutex<HashMap<OrderedFloat<f64>, f64>>,
}

impl AxisResolver {
    pub fn new() -> AxisResolver {
        Default::default()
    }

    /// Every (weight, slope, width) combination, weights outermost and widths innermost.
    pub fn suffix_mapping(
        &self,
        weights: &IndexMap<String, WeightDef>,
        slopes: &IndexMap<String, SlopeDef>,
        widths: &IndexMap<String, WidthDef>,
    ) -> Result<SuffixMapping, Error> {
        let mut mapping = SuffixMapping::new();
        let mut origins: HashMap<String, String> = HashMap::new();
        for (weight, weight_def) in weights {
            check_recommended_weight(weight, "Menu", weight_def.menu.as_ref());
            check_recommended_weight(weight, "CSS", weight_def.css.as_ref());
            for (slope, slope_def) in slopes {
                for (width, width_def) in widths {
                    let suffix = make_suffix(weight, width, slope);
                    let origin = format!("weight {weight}, width {width}, slope {slope}");
                    if let Some(first) = origins.insert(suffix.clone(), origin.clone()) {
                        return Err(Error::SuffixCollision {
                            suffix,
                            first,
                            second: origin,
                        });
                    }
                    let entry = self.entry(
                        (weight.as_str(), weight_def),
                        (width.as_str(), width_def),
                        (slope.as_str(), slope_def),
                    )?;
                    mapping.insert(suffix, entry);
                }
            }
        }
        Ok(mapping)
    }

    fn entry(
        &self,
        (weight, weight_def): (&str, &WeightDef),
        (width, width_def): (&str, &WidthDef),
        (slope, slope_def): (&str, &SlopeDef),
    ) -> Result<SuffixMappingEntry, Error> {
        let slope_table = slope_def.table(slope);
        let shape_width = validate_number(
            "Shape width",
            width,
            width_def.shape.as_ref(),
            |x| self.fix_shape_width(x),
            |x| (433.0..=665.0).contains(&x),
        )?;
        let menu_width = validate_number(
            "Menu width",
            width,
            width_def.menu.as_ref(),
            |x| x,
            |x| x.fract() == 0.0 && (1.0..=9.0).contains(&x),
        )? as u32;
        Ok(SuffixMappingEntry {
            weight: weight.to_string(),
            width: width.to_string(),
            slope: slope.to_string(),
            shape_weight: validate_number(
                "Shape weight",
                weight,
                weight_def.shape.as_ref(),
                |x| x,
                |x| (100.0..=900.0).contains(&x),
            )?,
            css_weight: validate_number(
                "CSS weight",
                weight,
                weight_def.css.as_ref(),
                |x| x,
                |x| x > 0.0 && x < 1000.0,
            )?,
            menu_weight: validate_number(
                "Menu weight",
                weight,
                weight_def.menu.as_ref(),
                |x| x,
                |x| x > 0.0 && x < 1000.0,
            )?,
            shape_width,
            css_stretch: validate_string("CSS stretch", width, width_def.css.as_ref(), |s| {
                CSS_STRETCHES.contains(&s)
            })?,
            menu_width,
            shape_slope: validate_string("Shape slope", slope, slope_table.shape.as_ref(), |s| {
                SLOPES.contains(&s)
            })?,
            slope_angle: validate_number(
                "Slope angle",
                slope,
                slope_table.angle.as_ref(),
                |x| x,
                |x| (0.0..=15.0).contains(&x),
            )?,
            css_style: validate_string("CSS style", slope, slope_table.css.as_ref(), |s| {
                CSS_STYLES.contains(&s)
            })?,
            menu_slope: validate_string("Menu slope", slope, slope_table.menu.as_ref(), |s| {
                SLOPES.contains(&s)
            })?,
        })
    }

    /// Convert a legacy 3..=9 width grade to a shape width; anything else passes through.
    ///
    /// Each distinct grade is converted, and warned about, once per resolver.
    pub fn fix_shape_width(&self, x: f64) -> f64 {
        if x.fract() != 0.0 || !(3.0..=9.0).contains(&x) {
            return x;
        }
        *self
            .width_fixups
            .lock()
            .entry(OrderedFloat(x))
            .or_insert_with(|| {
                let fixed = (500.0 * (576.0f64 / 500.0).sqrt().powf(x - 5.0)).round();
                warn!("Shape width grade {x} is deprecated, use {fixed} instead");
                fixed
            })
    }

    #[cfg(test)]
    fn fixups_seen(&self) -> usize {
        self.width_fixups.lock().len()
    }
}

fn check_recommended_weight(name: &str, field: &str, value: Option<&Scalar>) {
    let Some(value) = value.and_then(Scalar::as_number) else {
        return;
    };
    if let Some((_, recommended)) = RECOMMENDED_WEIGHTS.iter().find(|(n, _)| *n == name) {
        if *recommended != value {
            warn!(
                "{field} weight of {name} is {value}, {recommended} is recommended for that name"
            );
        }
    }
}

fn invalid(field: &str, name: &str, value: Option<&Scalar>, expected: &'static str) -> Error {
    Error::InvalidAxisValue {
        key: format!("{field} of {name}"),
        value: value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(missing)".to_string()),
        expected,
    }
}

fn validate_number(
    field: &str,
    name: &str,
    value: Option<&Scalar>,
    fixup: impl FnOnce(f64) -> f64,
    valid: impl FnOnce(f64) -> bool,
) -> Result<f64, Error> {
    value
        .and_then(Scalar::as_number)
        .map(fixup)
        .filter(|x| valid(*x))
        .ok_or_else(|| invalid(field, name, value, "number"))
}

fn validate_string(
    field: &str,
    name: &str,
    value: Option<&Scalar>,
    valid: impl FnOnce(&str) -> bool,
) -> Result<String, Error> {
    value
        .and_then(Scalar::as_text)
        .filter(|s| valid(*s))
        .map(str::to_string)
        .ok_or_else(|| invalid(field, name, value, "string"))
}

#[cfg(test)]
mod tests {
    use more_asserts::assert_lt;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn weight(shape: f64) -> WeightDef {
        WeightDef {
            shape: Some(shape.into()),
            menu: Some(shape.into()),
            css: Some(shape.into()),
        }
    }

    fn width(shape: f64, menu: f64, css: &str) -> WidthDef {
        WidthDef {
            shape: Some(shape.into()),
            menu: Some(menu.into()),
            css: Some(css.into()),
        }
    }

    fn defs<T: Clone>(entries: &[(&str, T)]) -> IndexMap<String, T> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn upright_only() -> IndexMap<String, SlopeDef> {
        defs(&[("upright", SlopeDef::Css("normal".to_string()))])
    }

    #[rstest]
    #[case("regular", "normal", "upright", "regular")]
    #[case("bold", "normal", "upright", "bold")]
    #[case("regular", "normal", "italic", "italic")]
    #[case("bold", "extended", "italic", "extendedbolditalic")]
    #[case("regular", "condensed", "upright", "condensed")]
    fn suffixes(
        #[case] weight: &str,
        #[case] width: &str,
        #[case] slope: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(expected, make_suffix(weight, width, slope));
    }

    #[test]
    fn all_normal_is_regular() {
        let mapping = AxisResolver::new()
            .suffix_mapping(
                &defs(&[("regular", weight(400.0))]),
                &upright_only(),
                &defs(&[("normal", width(500.0, 5.0, "normal"))]),
            )
            .unwrap();
        assert_eq!(vec!["regular"], mapping.keys().collect::<Vec<_>>());
        let entry = &mapping["regular"];
        assert_eq!(400.0, entry.shape_weight);
        assert_eq!("normal", entry.css_style);
        assert_eq!("upright", entry.shape_slope);
        assert_eq!(0.0, entry.slope_angle);
    }

    #[test]
    fn enumeration_order() {
        let slopes = defs(&[
            ("upright", SlopeDef::Css("normal".to_string())),
            ("italic", SlopeDef::Css("italic".to_string())),
        ]);
        let mapping = AxisResolver::new()
            .suffix_mapping(
                &defs(&[("regular", weight(400.0)), ("bold", weight(700.0))]),
                &slopes,
                &defs(&[
                    ("normal", width(500.0, 5.0, "normal")),
                    ("extended", width(600.0, 7.0, "expanded")),
                ]),
            )
            .unwrap();
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
            mapping.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn same_inputs_same_mapping() {
        let weights = defs(&[("regular", weight(400.0)), ("bold", weight(700.0))]);
        let widths = defs(&[("normal", width(5.0, 5.0, "normal"))]);
        let first = AxisResolver::new()
            .suffix_mapping(&weights, &upright_only(), &widths)
            .unwrap();
        let second = AxisResolver::new()
            .suffix_mapping(&weights, &upright_only(), &widths)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_shape_weight() {
        let err = AxisResolver::new()
            .suffix_mapping(
                &defs(&[("heavy", weight(950.0))]),
                &upright_only(),
                &defs(&[("normal", width(500.0, 5.0, "normal"))]),
            )
            .unwrap_err();
        assert_eq!(
            "Shape weight of heavy = 950 is not a valid number.",
            err.to_string()
        );
    }

    #[test]
    fn missing_css_stretch() {
        let widths = defs(&[(
            "normal",
            WidthDef {
                shape: Some(500.0.into()),
                menu: Some(5.0.into()),
                css: None,
            },
        )]);
        let err = AxisResolver::new()
            .suffix_mapping(&defs(&[("regular", weight(400.0))]), &upright_only(), &widths)
            .unwrap_err();
        assert_eq!(
            "CSS stretch of normal = (missing) is not a valid string.",
            err.to_string()
        );
    }

    #[test]
    fn slope_angle_out_of_range() {
        let slopes = defs(&[(
            "italic",
            SlopeDef::Table(crate::config::SlopeTable {
                angle: Some(20.0.into()),
                shape: Some("italic".into()),
                menu: Some("italic".into()),
                css: Some("italic".into()),
            }),
        )]);
        let err = AxisResolver::new()
            .suffix_mapping(
                &defs(&[("regular", weight(400.0))]),
                &slopes,
                &defs(&[("normal", width(500.0, 5.0, "normal"))]),
            )
            .unwrap_err();
        assert_eq!(
            "Slope angle of italic = 20 is not a valid number.",
            err.to_string()
        );
    }

    #[test]
    fn suffix_collision() {
        // A weight named after a width produces the same suffix as that width
        let widths = defs(&[
            ("normal", width(500.0, 5.0, "normal")),
            ("bold", width(600.0, 7.0, "expanded")),
        ]);
        let result = AxisResolver::new().suffix_mapping(
            &defs(&[("regular", weight(400.0)), ("bold", weight(700.0))]),
            &upright_only(),
            &widths,
        );
        assert!(
            matches!(&result, Err(Error::SuffixCollision { suffix, .. }) if suffix == "bold"),
            "{result:?}"
        );
    }

    #[test]
    fn width_fixup_is_identity_at_five() {
        assert_eq!(500.0, AxisResolver::new().fix_shape_width(5.0));
    }

    #[rstest]
    #[case(3.0, 434.0)]
    #[case(9.0, 664.0)]
    fn width_fixup_extremes(#[case] grade: f64, #[case] expected: f64) {
        assert_eq!(expected, AxisResolver::new().fix_shape_width(grade));
    }

    #[test]
    fn width_fixup_is_monotonic() {
        let resolver = AxisResolver::new();
        let fixed: Vec<_> = (3..=9)
            .map(|grade| resolver.fix_shape_width(grade as f64))
            .collect();
        for pair in fixed.windows(2) {
            assert_lt!(pair[0], pair[1]);
        }
    }

    #[test]
    fn width_fixup_passes_through_real_widths() {
        let resolver = AxisResolver::new();
        assert_eq!(500.0, resolver.fix_shape_width(500.0));
        assert_eq!(5.5, resolver.fix_shape_width(5.5));
        assert_eq!(0, resolver.fixups_seen());
    }

    #[test]
    fn width_fixup_is_memoized() {
        let resolver = AxisResolver::new();
        let first = resolver.fix_shape_width(7.0);
        assert_eq!(first, resolver.fix_shape_width(7.0));
        assert_eq!(1, resolver.fixups_seen());
        resolver.fix_shape_width(4.0);
        assert_eq!(2, resolver.fixups_seen());
    }

    #[test]
    fn legacy_width_grades_resolve() {
        let resolver = AxisResolver::new();
        let mapping = resolver
            .suffix_mapping(
                &defs(&[("regular", weight(400.0))]),
                &upright_only(),
                &defs(&[("normal", width(5.0, 5.0, "normal"))]),
            )
            .unwrap();
        assert_eq!(500.0, mapping["regular"].shape_width);
        assert_eq!(5, mapping["regular"].menu_width);
    }

    #[test]
    fn unrecommended_weight_is_accepted() {
        let _ = env_logger::builder().is_test(true).try_init();
        let heavy = WeightDef {
            shape: Some(900.0.into()),
            menu: Some(850.0.into()),
            css: Some(900.0.into()),
        };
        let mapping = AxisResolver::new()
            .suffix_mapping(
                &defs(&[("heavy", heavy)]),
                &upright_only(),
                &defs(&[("normal", width(500.0, 5.0, "normal"))]),
            )
            .unwrap();
        assert_eq!(850.0, mapping["heavy"].menu_weight);
    }
}
