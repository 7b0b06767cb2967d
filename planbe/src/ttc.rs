//! Merging fonts into font collections.

use std::path::Path;

use crate::{error::Error, tools::ToolCommand};

/// `merger --share-glyf <out.ttc> <font.ttf...>`
///
/// The fonts of a glyf container have compatible outlines, so the merger is
/// asked to share the glyf table between them.
pub fn merge_glyf_ttc(merger: &ToolCommand, out: &Path, fonts: &[&Path]) -> Result<(), Error> {
    let mut args = vec![Path::new("--share-glyf"), out];
    args.extend(fonts);
    merger.run(args, &[out])
}

/// `merger <out.ttc> <glyf.ttc...>`
pub fn merge_ttc(merger: &ToolCommand, out: &Path, parts: &[&Path]) -> Result<(), Error> {
    let mut args = vec![out];
    args.extend(parts);
    merger.run(args, &[out])
}
