use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

use anyhow::{Context, Result};
use regex::Regex;
use swc_common::SourceMap;
use walkdir::{DirEntry, WalkDir};

use super::{
    BuildTags, LoadedUnit, Overlay, UnitFiles, UnitLoader, lower::lower_module,
    patterns::matches_pattern,
};
use crate::{
    core::{
        parsers::ts::parse_ts_source,
        syntax::{FileId, SyntaxFile},
    },
    utils::normalize_path,
};

pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

const SKIPPED_DIRS: &[&str] = &["node_modules"];

static IMPORT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:import|export)\b[^'";]*?\bfrom\s*['"]([^'"]+)['"]|^\s*import\s*['"]([^'"]+)['"]"#)
        .unwrap()
});

/// Loads units from a directory tree of TypeScript/JavaScript sources.
///
/// Every directory holding at least one source file is a unit. Its path is
/// the module name followed by the directory relative to the root.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    root: PathBuf,
    module: String,
    tags: BuildTags,
}

impl SourceLoader {
    pub fn new(root: impl Into<PathBuf>, module: impl Into<String>, tags: BuildTags) -> Self {
        Self {
            root: normalize_path(&root.into()),
            module: module.into(),
            tags,
        }
    }

    /// Directories with their source files, sorted by directory.
    fn source_dirs(&self) -> BTreeMap<PathBuf, Vec<PathBuf>> {
        let mut dirs: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));
        for entry in walker.flatten() {
            let path = entry.path();
            if entry.file_type().is_file()
                && is_source_file(path)
                && let Some(dir) = path.parent()
            {
                dirs.entry(dir.to_path_buf())
                    .or_default()
                    .push(path.to_path_buf());
            }
        }
        dirs
    }

    /// Source of a file, lossily decoded. `None` when the file vanished.
    fn read(&self, path: &Path, overlay: &Overlay) -> Result<Option<String>> {
        if let Some(bytes) = overlay.get(path) {
            return Ok(Some(String::from_utf8_lossy(bytes).into_owned()));
        }
        match fs::read(path) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Resolve a module specifier written in a file of `dir` to a unit path.
    fn resolve_specifier(&self, dir: &Path, spec: &str) -> Option<String> {
        if spec.starts_with('.') {
            let target = normalize_path(&dir.join(spec));
            let unit_dir = if target.is_dir() {
                target
            } else {
                target.parent()?.to_path_buf()
            };
            return self.unit_path(&unit_dir);
        }
        if spec == self.module || spec.starts_with(&format!("{}/", self.module)) {
            return Some(spec.trim_end_matches('/').to_string());
        }
        None
    }

    fn imports_of(&self, dir: &Path, source: &str) -> BTreeSet<String> {
        IMPORT_REGEX
            .captures_iter(source)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str())
            .filter_map(|spec| {
                if spec.starts_with('.') {
                    self.resolve_specifier(dir, spec)
                } else {
                    Some(self.resolve_specifier(dir, spec).unwrap_or_else(|| spec.to_string()))
                }
            })
            .collect()
    }
}

impl UnitLoader for SourceLoader {
    fn root(&self) -> &Path {
        &self.root
    }

    fn module(&self) -> &str {
        &self.module
    }

    fn unit_path(&self, dir: &Path) -> Option<String> {
        let rel = normalize_path(dir).strip_prefix(&self.root).ok()?.to_path_buf();
        let rel = rel.to_string_lossy().replace('\\', "/");
        if rel.is_empty() {
            Some(self.module.clone())
        } else {
            Some(format!("{}/{}", self.module, rel))
        }
    }

    fn list(&self, patterns: &[String]) -> Result<Vec<UnitFiles>> {
        let mut units = Vec::new();
        for (dir, files) in self.source_dirs() {
            let Some(path) = self.unit_path(&dir) else {
                continue;
            };
            if !patterns
                .iter()
                .any(|pattern| matches_pattern(pattern, &self.module, &path))
            {
                continue;
            }

            units.push(UnitFiles {
                path,
                dir,
                files,
                imports: BTreeSet::new(),
            });
        }
        units.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(units)
    }

    fn scan_file(&self, dir: &Path, source: &str) -> Option<BTreeSet<String>> {
        self.tags
            .allows(source)
            .then(|| self.imports_of(dir, source))
    }

    fn load(&self, patterns: &[String], overlay: &Overlay) -> Result<Vec<LoadedUnit>> {
        let source_map: Arc<SourceMap> = Arc::default();
        let mut file_ids: BTreeMap<PathBuf, FileId> = BTreeMap::new();
        let mut loaded = Vec::new();

        for unit in self.list(patterns)? {
            let mut files = Vec::new();
            let mut imports = BTreeSet::new();
            for path in &unit.files {
                let Some(source) = self.read(path, overlay)? else {
                    continue;
                };
                let Some(file_imports) = self.scan_file(&unit.dir, &source) else {
                    continue;
                };
                imports.extend(file_imports);
                let next_id = FileId(file_ids.len() as u32);
                let id = *file_ids.entry(path.clone()).or_insert(next_id);
                let parsed = parse_ts_source(
                    source.clone(),
                    &path.to_string_lossy(),
                    source_map.clone(),
                )?;
                let resolve = |spec: &str| self.resolve_specifier(&unit.dir, spec);
                files.push(SyntaxFile {
                    id,
                    path: path.clone(),
                    nodes: lower_module(&parsed, &source, id, &resolve),
                });
            }
            imports.remove(&unit.path);
            loaded.push(LoadedUnit {
                path: unit.path,
                dir: unit.dir,
                files,
                imports,
            });
        }
        Ok(loaded)
    }
}

pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_dir() && (name.starts_with('.') || SKIPPED_DIRS.contains(&&*name))
}
