//! Filesystem side of generation: output names, cleanup, placeholder
//! sources and the formatter run.

use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{Context, Result, bail};

use crate::core::{loader::is_source_file, printer::GENERATED_HEADER};

/// File name of the placeholder written into new unit directories.
pub const PLACEHOLDER_FILE: &str = "index.ts";

/// Default output file name of a plugin: `zz_generated.<plugin>.ts`, with
/// `-` replaced by `_`.
pub fn default_file_name(plugin: &str) -> String {
    format!("zz_generated.{}.ts", plugin.replace('-', "_"))
}

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Delete the files of `dir` whose name is one of `names`. Returns the
/// deleted paths; missing files are not an error.
pub fn clean_dir(dir: &Path, names: &[String]) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for name in names {
        let path = dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to remove {}", path.display()));
            }
        }
    }
    Ok(removed)
}

/// Whether `dir` holds at least one source file.
pub fn has_source_files(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .any(|entry| entry.path().is_file() && is_source_file(&entry.path()))
        })
        .unwrap_or(false)
}

/// Make sure `dir` exists and holds a source file, so that the unit it
/// declares can be imported. Returns the placeholder path when one was
/// written.
pub fn ensure_unit_dir(dir: &Path, unit_name: &str) -> Result<Option<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {}", dir.display()))?;
    if has_source_files(dir) {
        return Ok(None);
    }
    let path = dir.join(PLACEHOLDER_FILE);
    let content = format!("{}\n\n// Unit {}.\nexport {{}};\n", GENERATED_HEADER, unit_name);
    write_file(&path, &content)?;
    Ok(Some(path))
}

/// Run the formatter command over the generated files.
///
/// `command` is the program followed by its arguments; the files are
/// appended. A non-zero exit is an error carrying the tool's output.
pub fn run_formatter(command: &[String], files: &[PathBuf], cwd: &Path) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        return Ok(());
    };
    if files.is_empty() {
        return Ok(());
    }

    let output = Command::new(program)
        .args(args)
        .args(files)
        .current_dir(cwd)
        .output()
        .with_context(|| format!("Failed to run formatter {}", program))?;

    if !output.status.success() {
        bail!(
            "formatter {} failed ({}):\n{}{}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(())
}
