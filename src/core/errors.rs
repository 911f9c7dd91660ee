//! Typed errors for the failures callers may want to tell apart.
//!
//! Everything else travels as `anyhow::Error` with context attached.

use std::{fmt, path::PathBuf};

use thiserror::Error;

/// Configuration problems, reported before any scanning begins.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("plugin has an empty name")]
    EmptyPluginName,
    #[error("duplicated plugin name: {0}")]
    DuplicatePlugin(String),
    #[error("plugin {0} not found")]
    UnknownPlugin(String),
    #[error("no registered plugins")]
    NoPlugins,
    #[error("no patterns")]
    NoPatterns,
}

/// One file that could not be read during the metadata scan.
#[derive(Debug, Error)]
#[error("{}: {source}", path.display())]
pub struct FileError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// All read failures of a metadata scan, reported once the scan has drained.
#[derive(Debug, Error)]
pub struct ScanErrors {
    pub errors: Vec<FileError>,
}

impl fmt::Display for ScanErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "can not scan units: ")?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}
