//! Loading units from the host toolchain.
//!
//! The engine only talks to the loader through [`UnitLoader`]: a listing
//! that only enumerates files, a per-file hook the metadata scan calls with
//! the bytes it read, and a full load that produces syntax trees for the
//! cross-reference builder.
//!
//! [`SourceLoader`] is the default implementation for TypeScript projects.

mod build_tags;
mod lower;
mod patterns;
mod source;

use std::{
    collections::{BTreeSet, HashMap},
    path::{Path, PathBuf},
};

use anyhow::Result;

pub use build_tags::BuildTags;
pub use patterns::matches_pattern;
pub use source::{SourceLoader, is_source_file};

use crate::core::syntax::SyntaxFile;

/// File contents read during the metadata scan, reused by the full load.
pub type Overlay = HashMap<PathBuf, Vec<u8>>;

/// A unit as listed by the loader, before anything is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFiles {
    /// Unit path, `<module>/<relative dir>`.
    pub path: String,
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
    /// Imported unit paths, or bare module specifiers for external packages.
    /// Empty until the files are read.
    pub imports: BTreeSet<String>,
}

/// A fully loaded unit.
#[derive(Debug, Clone)]
pub struct LoadedUnit {
    pub path: String,
    pub dir: PathBuf,
    pub files: Vec<SyntaxFile>,
    pub imports: BTreeSet<String>,
}

pub trait UnitLoader: Sync {
    /// Directory all unit paths are relative to.
    fn root(&self) -> &Path;

    /// Module name, the path of the root unit.
    fn module(&self) -> &str;

    /// Unit path for a directory under the root.
    fn unit_path(&self, dir: &Path) -> Option<String>;

    /// List units matching the patterns, sorted by path. Files are only
    /// enumerated, never read.
    fn list(&self, patterns: &[String]) -> Result<Vec<UnitFiles>>;

    /// Inspect the source of a file in `dir` read by the metadata scan.
    /// Returns the units it imports, or `None` when the file is excluded
    /// from the build.
    fn scan_file(&self, _dir: &Path, _source: &str) -> Option<BTreeSet<String>> {
        Some(BTreeSet::new())
    }

    /// Parse units matching the patterns. Files present in `overlay` are
    /// taken from there instead of the filesystem.
    fn load(&self, patterns: &[String], overlay: &Overlay) -> Result<Vec<LoadedUnit>>;
}
