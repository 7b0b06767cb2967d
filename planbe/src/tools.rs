//! External tools: locating them and running them.
//!
//! Every tool is configured as a command vector, a program followed by fixed
//! leading arguments, to which the per-invocation arguments are appended.

use std::{
    env,
    ffi::OsStr,
    fmt::{self, Display},
    path::{Path, PathBuf},
    process::Command,
};

use log::{debug, trace};
use planir::config::BuildOptions;
use serde::{Deserialize, Serialize};

use crate::{error::Error, paths::ensure_parent_dir};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolKind {
    Generator,
    Hinter,
    Woff2,
    Merger,
    Archiver,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Generator,
        ToolKind::Hinter,
        ToolKind::Woff2,
        ToolKind::Merger,
        ToolKind::Archiver,
    ];

    fn default_command(&self) -> &'static [&'static str] {
        match self {
            ToolKind::Generator => &["fontgen"],
            ToolKind::Hinter => &["ttfautohint"],
            ToolKind::Woff2 => &["woff2-compress"],
            ToolKind::Merger => &["ttc-merge"],
            ToolKind::Archiver => &["zip", "-q", "-j"],
        }
    }

    fn configured<'a>(&self, options: &'a BuildOptions) -> Option<&'a Vec<String>> {
        match self {
            ToolKind::Generator => options.generate_command.as_ref(),
            ToolKind::Hinter => options.hint_command.as_ref(),
            ToolKind::Woff2 => options.woff2_command.as_ref(),
            ToolKind::Merger => options.merge_command.as_ref(),
            ToolKind::Archiver => options.archive_command.as_ref(),
        }
    }
}

impl Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolKind::Generator => "font generator",
            ToolKind::Hinter => "hinter",
            ToolKind::Woff2 => "woff2 compressor",
            ToolKind::Merger => "container merger",
            ToolKind::Archiver => "archiver",
        };
        f.write_str(name)
    }
}

/// A tool located on this machine, ready to run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolCommand {
    pub kind: ToolKind,
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Locate the tool of `kind`.
///
/// Resolves to `None` for the hinter when hinting is switched off.
pub fn resolve(kind: ToolKind, options: &BuildOptions) -> Result<Option<ToolCommand>, Error> {
    if kind == ToolKind::Hinter && !options.hint_enabled() {
        debug!("Hinting is disabled");
        return Ok(None);
    }
    let command: Vec<String> = match kind.configured(options) {
        Some(command) => command.clone(),
        None => kind
            .default_command()
            .iter()
            .map(|s| s.to_string())
            .collect(),
    };
    let Some((program, args)) = command.split_first() else {
        return Err(Error::NoCommand(kind));
    };
    let resolved = find_program(program).ok_or_else(|| Error::ToolNotFound {
        tool: kind,
        program: program.clone(),
    })?;
    debug!("The {kind} is {resolved:?}");
    Ok(Some(ToolCommand {
        kind,
        program: resolved,
        args: args.to_vec(),
    }))
}

/// Programs given with a directory are taken as is, bare names are looked up on PATH.
fn find_program(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }
    let search = env::var_os("PATH")?;
    env::split_paths(&search)
        .flat_map(|dir| candidates(&dir, program))
        .find(|candidate| candidate.is_file())
}

#[cfg(windows)]
fn candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    vec![dir.join(program), dir.join(format!("{program}.exe"))]
}

#[cfg(not(windows))]
fn candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    vec![dir.join(program)]
}

impl ToolCommand {
    /// Run with `args` appended and check that every one of `outputs` was written.
    pub fn run<I, S>(&self, args: I, outputs: &[&Path]) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for output in outputs {
            ensure_parent_dir(output)?;
        }
        let mut command = Command::new(&self.program);
        command.args(&self.args).args(args);
        trace!("Running {command:?}");

        let output = command.output().map_err(|source| Error::SpawnFailed {
            tool: self.kind,
            program: self.program.display().to_string(),
            source,
        })?;
        if !output.status.success() {
            return Err(Error::ToolFailed {
                tool: self.kind,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if let Some(missing) = outputs.iter().find(|output| !output.is_file()) {
            return Err(Error::MissingOutput {
                tool: self.kind,
                path: missing.to_path_buf(),
            });
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    /// A tool that runs `script` under sh, with the appended arguments as $1, $2...
    pub(crate) fn sh_tool(kind: ToolKind, script: &str) -> ToolCommand {
        let options = BuildOptions {
            generate_command: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                script.to_string(),
                "tool".to_string(),
            ]),
            ..Default::default()
        };
        let mut tool = resolve(ToolKind::Generator, &options).unwrap().unwrap();
        tool.kind = kind;
        tool
    }

    #[test]
    fn hinter_off() {
        let options = BuildOptions {
            hint: Some(false),
            ..Default::default()
        };
        assert_eq!(None, resolve(ToolKind::Hinter, &options).unwrap());
    }

    #[test]
    fn tool_not_on_path() {
        let options = BuildOptions {
            woff2_command: Some(vec!["definitely-not-a-font-tool-0451".to_string()]),
            ..Default::default()
        };
        let result = resolve(ToolKind::Woff2, &options);
        assert!(
            matches!(&result, Err(Error::ToolNotFound { tool: ToolKind::Woff2, .. })),
            "{result:?}"
        );
    }

    #[test]
    fn empty_command() {
        let options = BuildOptions {
            merge_command: Some(Vec::new()),
            ..Default::default()
        };
        let result = resolve(ToolKind::Merger, &options);
        assert!(
            matches!(&result, Err(Error::NoCommand(ToolKind::Merger))),
            "{result:?}"
        );
    }

    #[test]
    fn keeps_leading_args() {
        let tool = sh_tool(ToolKind::Generator, "true");
        assert_eq!(vec!["-c", "true", "tool"], tool.args);
        assert!(tool.program.is_absolute());
    }

    #[test]
    fn run_writes_output() {
        let temp_dir = tempdir().unwrap();
        let input = temp_dir.path().join("in.txt");
        let output = temp_dir.path().join("nested/out.txt");
        fs::write(&input, "hello").unwrap();

        let tool = sh_tool(ToolKind::Woff2, r#"cp "$1" "$2""#);
        tool.run([&input, &output], &[&output]).unwrap();
        assert_eq!("hello", fs::read_to_string(output).unwrap());
    }

    #[test]
    fn failure_reports_stderr() {
        let tool = sh_tool(ToolKind::Hinter, "echo broken >&2; exit 3");
        let err = tool.run(Vec::<String>::new(), &[]).unwrap_err();
        let Error::ToolFailed { tool, stderr, .. } = &err else {
            panic!("Expected a tool failure, got {err:?}");
        };
        assert_eq!(&ToolKind::Hinter, tool);
        assert_eq!("broken", stderr);
    }

    #[test]
    fn success_without_output() {
        let temp_dir = tempdir().unwrap();
        let output = temp_dir.path().join("never.ttf");
        let tool = sh_tool(ToolKind::Generator, "true");
        let result = tool.run(Vec::<String>::new(), &[&output]);
        assert!(
            matches!(&result, Err(Error::MissingOutput { path, .. }) if path == &output),
            "{result:?}"
        );
    }
}
