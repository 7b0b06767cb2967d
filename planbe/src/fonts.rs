//! Producing individual font files: generation, hinting and WOFF2 compression.

use std::{ffi::OsStr, fs, path::Path};

use log::debug;

use crate::{error::Error, paths::ensure_parent_dir, tools::ToolCommand};

/// `generator <params.json> <out.ttf>`
pub fn generate(generator: &ToolCommand, params: &Path, out: &Path) -> Result<(), Error> {
    generator.run([params, out], &[out])
}

/// `hinter [--reference <ref.ttf>] <hint params...> <in.ttf> <out.ttf>`
///
/// Without a hinter the unhinted font is copied as is.
pub fn hint(
    hinter: Option<&ToolCommand>,
    hint_params: &[String],
    reference: Option<&Path>,
    input: &Path,
    out: &Path,
) -> Result<(), Error> {
    let Some(hinter) = hinter else {
        debug!("No hinter, copying {input:?} to {out:?}");
        ensure_parent_dir(out)?;
        fs::copy(input, out).map_err(Error::io(out))?;
        return Ok(());
    };
    let mut args: Vec<&OsStr> = Vec::new();
    if let Some(reference) = reference {
        args.push(OsStr::new("--reference"));
        args.push(reference.as_os_str());
    }
    args.extend(hint_params.iter().map(OsStr::new));
    args.push(input.as_os_str());
    args.push(out.as_os_str());
    hinter.run(args, &[out])
}

/// `compressor <in.ttf> <out.woff2>`
pub fn compress_woff2(compressor: &ToolCommand, input: &Path, out: &Path) -> Result<(), Error> {
    compressor.run([input, out], &[out])
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use crate::tools::{tests::sh_tool, ToolKind};

    use super::*;

    #[test]
    fn copies_without_hinter() {
        let temp_dir = tempdir().unwrap();
        let input = temp_dir.path().join("TTF-Unhinted/a.ttf");
        let out = temp_dir.path().join("TTF/a.ttf");
        fs::create_dir_all(input.parent().unwrap()).unwrap();
        fs::write(&input, "glyphs").unwrap();

        hint(None, &["-a".to_string()], None, &input, &out).unwrap();
        assert_eq!("glyphs", fs::read_to_string(out).unwrap());
    }

    #[test]
    fn hinter_arguments() {
        let temp_dir = tempdir().unwrap();
        let input = temp_dir.path().join("in.ttf");
        let reference = temp_dir.path().join("ref.ttf");
        let out = temp_dir.path().join("out.ttf");
        fs::write(&input, "glyphs").unwrap();

        // Record the arguments, then write the last one
        let hinter = sh_tool(
            ToolKind::Hinter,
            r#"for a in "$@"; do last="$a"; done; echo "$@" > "$last""#,
        );
        hint(
            Some(&hinter),
            &["-a".to_string(), "sss".to_string()],
            Some(&reference),
            &input,
            &out,
        )
        .unwrap();
        assert_eq!(
            format!(
                "--reference {} -a sss {} {}",
                reference.display(),
                input.display(),
                out.display()
            ),
            fs::read_to_string(&out).unwrap().trim()
        );
    }

    #[test]
    fn generator_arguments() {
        let temp_dir = tempdir().unwrap();
        let params = temp_dir.path().join("a.json");
        let out = temp_dir.path().join("dist/a.ttf");
        fs::write(&params, "{}").unwrap();

        let generator = sh_tool(ToolKind::Generator, r#"cp "$1" "$2""#);
        generate(&generator, &params, &out).unwrap();
        assert_eq!("{}", fs::read_to_string(out).unwrap());
    }
}
