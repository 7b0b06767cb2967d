//! Webfont stylesheets.

use std::{fs, path::Path};

use planir::metadata::FontMetadata;

use crate::{error::Error, paths::ensure_parent_dir, paths::WOFF2_DIR};

/// One `@font-face` rule per font, in the order given.
///
/// Font files are referenced relative to the stylesheet.
pub fn webfont_css(fonts: &[FontMetadata]) -> String {
    fonts.iter().map(font_face).collect()
}

fn font_face(font: &FontMetadata) -> String {
    format!(
        "@font-face {{\n\
         \tfont-family: '{family} Web';\n\
         \tfont-display: swap;\n\
         \tfont-weight: {weight};\n\
         \tfont-stretch: {stretch};\n\
         \tfont-style: {style};\n\
         \tsrc: url('{WOFF2_DIR}/{name}.woff2') format('woff2');\n\
         }}\n\n",
        family = font.menu.family,
        weight = font.css.weight,
        stretch = font.css.stretch,
        style = font.css.style,
        name = font.name,
    )
}

pub fn write_webfont_css(path: &Path, fonts: &[FontMetadata]) -> Result<(), Error> {
    ensure_parent_dir(path)?;
    fs::write(path, webfont_css(fonts)).map_err(Error::io(path))
}
