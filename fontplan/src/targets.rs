//! Parsing of target names given on the command line.

use crate::{error::Error, rules::Group};

/// The target built when none is named
pub const DEFAULT_TARGET: &str = "release";

/// Parse `kind::name` targets, `release`, or a bare font name.
pub fn parse_target(target: &str) -> Result<Group, Error> {
    if target == DEFAULT_TARGET {
        return Ok(Group::Release);
    }
    let Some((kind, name)) = target.split_once("::") else {
        return Ok(Group::Font(target.to_string()));
    };
    if name.is_empty() {
        return Err(Error::UnknownTarget(target.to_string()));
    }
    let name = name.to_string();
    let group = match kind {
        "ttf" => Group::Ttf(name),
        "ttf-unhinted" => Group::TtfUnhinted(name),
        "webfont" => Group::Webfont(name),
        "ttc" => Group::Ttc(name),
        "archive-ttf" => Group::ArchiveTtf(name),
        "archive-ttc" => Group::ArchiveTtc(name),
        _ => return Err(Error::UnknownTarget(target.to_string())),
    };
    Ok(group)
}

/// Every target to build, `release` if none are given.
pub fn parse_targets(targets: &[String]) -> Result<Vec<Group>, Error> {
    if targets.is_empty() {
        return Ok(vec![Group::Release]);
    }
    let mut groups = Vec::with_capacity(targets.len());
    for target in targets {
        let group = parse_target(target)?;
        if !groups.contains(&group) {
            groups.push(group);
        }
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("release", Group::Release)]
    #[case("sans-bold", Group::Font("sans-bold".to_string()))]
    #[case("ttf::sans", Group::Ttf("sans".to_string()))]
    #[case("ttf-unhinted::sans", Group::TtfUnhinted("sans".to_string()))]
    #[case("webfont::sans-term", Group::Webfont("sans-term".to_string()))]
    #[case("ttc::sans-all", Group::Ttc("sans-all".to_string()))]
    #[case("archive-ttf::sans", Group::ArchiveTtf("sans".to_string()))]
    #[case("archive-ttc::sans-all", Group::ArchiveTtc("sans-all".to_string()))]
    fn parses(#[case] target: &str, #[case] expected: Group) {
        assert_eq!(expected, parse_target(target).unwrap());
        // Round trips through the display name
        assert_eq!(target, expected.to_string());
    }

    #[rstest]
    #[case("otf::sans")]
    #[case("ttf::")]
    fn rejects(#[case] target: &str) {
        let result = parse_target(target);
        assert!(
            matches!(&result, Err(Error::UnknownTarget(t)) if t == target),
            "{result:?}"
        );
    }

    #[test]
    fn defaults_to_release() {
        assert_eq!(vec![Group::Release], parse_targets(&[]).unwrap());
    }

    #[test]
    fn repeated_targets_build_once() {
        let targets = vec!["ttf::sans".to_string(), "ttf::sans".to_string()];
        assert_eq!(
            vec![Group::Ttf("sans".to_string())],
            parse_targets(&targets).unwrap()
        );
    }
}
