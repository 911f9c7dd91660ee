//! Buffered output sessions.
//!
//! A [`Printer`] collects the body of one generated file together with the
//! imports it needs. Nothing touches the filesystem until the session is
//! closed, and a session that never received any bytes is dropped silently.

use std::{
    collections::BTreeMap,
    fmt::Write as _,
    io,
    path::{Path, PathBuf},
};

use anyhow::Result;

use crate::core::output::write_file;

pub const GENERATED_HEADER: &str = "// Code generated by tsgen. DO NOT EDIT.";

/// Handle to a printer session owned by the generation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrinterId(pub(crate) usize);

#[derive(Debug, Clone)]
pub struct Printer {
    unit: String,
    path: PathBuf,
    body: Vec<u8>,
    spec_by_alias: BTreeMap<String, String>,
    alias_by_spec: BTreeMap<String, String>,
    closed: bool,
}

impl Printer {
    pub fn new(unit: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            unit: unit.into(),
            path: path.into(),
            body: Vec::new(),
            spec_by_alias: BTreeMap::new(),
            alias_by_spec: BTreeMap::new(),
            closed: false,
        }
    }

    /// Unit the output file belongs to.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Import `spec` under `alias`, returning the alias to use in the body.
    ///
    /// A spec already imported keeps its alias. When the alias is taken by
    /// another spec, `alias1`, `alias2`, ... are tried in turn.
    pub fn import(&mut self, alias: &str, spec: &str) -> String {
        if let Some(existing) = self.alias_by_spec.get(spec) {
            return existing.clone();
        }

        let mut candidate = alias.to_string();
        let mut n = 1;
        while self.spec_by_alias.contains_key(&candidate) {
            candidate = format!("{}{}", alias, n);
            n += 1;
        }
        self.spec_by_alias
            .insert(candidate.clone(), spec.to_string());
        self.alias_by_spec
            .insert(spec.to_string(), candidate.clone());
        candidate
    }

    /// Imports as `(alias, spec)` pairs, sorted by alias.
    pub fn imports(&self) -> impl Iterator<Item = (&str, &str)> {
        self.spec_by_alias
            .iter()
            .map(|(alias, spec)| (alias.as_str(), spec.as_str()))
    }

    /// Full file content: header, imports, body.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(GENERATED_HEADER);
        out.push_str("\n\n");
        if !self.spec_by_alias.is_empty() {
            for (alias, spec) in self.imports() {
                let _ = writeln!(out, "import * as {} from \"{}\";", alias, spec);
            }
            out.push('\n');
        }
        out.push_str(&String::from_utf8_lossy(&self.body));
        out
    }

    /// Write the session to disk. Returns the written path, or `None` when
    /// the session is empty. Closing twice is a no-op.
    pub(crate) fn close(&mut self) -> Result<Option<PathBuf>> {
        if self.closed {
            return Ok(None);
        }
        self.closed = true;
        if self.body.is_empty() {
            return Ok(None);
        }
        write_file(&self.path, &self.render())?;
        Ok(Some(self.path.clone()))
    }
}

impl io::Write for Printer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::other(format!(
                "write to closed printer {}",
                self.path.display()
            )));
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
