//! What a plugin's generate callback can see and do.
//!
//! [`GenContext`] is a read-only view over the analyzed units plus the output
//! sessions of one plugin. Sessions are addressed through [`PrinterId`]
//! handles so that a plugin can hold one while asking the context to qualify
//! imports into it.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::{Path, PathBuf},
};

use anyhow::{Result, anyhow, bail};

use crate::{
    core::{
        config::FileNameFn,
        directive::Directives,
        filter::ScannedUnit,
        loader::{LoadedUnit, UnitLoader},
        logging::Logger,
        output::ensure_unit_dir,
        plugin::PluginEntry,
        printer::{Printer, PrinterId},
        xref::{Comment, Declaration, Object, Occurrence, OccurrenceId, XrefIndex},
    },
    utils::{normalize_path, relative_specifier},
};

/// A unit the current plugin generates code for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratingUnit {
    pub path: String,
    pub dir: PathBuf,
    pub directives: Directives,
    pub inline_directives: Directives,
    pub imports: BTreeSet<String>,
}

pub struct GenContext<'a> {
    plugin: &'a PluginEntry,
    file_name: &'a FileNameFn,
    loader: &'a dyn UnitLoader,
    loaded: &'a BTreeMap<String, LoadedUnit>,
    scanned: &'a BTreeMap<String, ScannedUnit>,
    generating: Vec<String>,
    xref: &'a XrefIndex,
    sessions: Vec<Printer>,
    by_path: HashMap<PathBuf, PrinterId>,
    generated: Vec<PathBuf>,
    logger: Logger,
}

impl<'a> GenContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        plugin: &'a PluginEntry,
        file_name: &'a FileNameFn,
        loader: &'a dyn UnitLoader,
        loaded: &'a BTreeMap<String, LoadedUnit>,
        scanned: &'a BTreeMap<String, ScannedUnit>,
        generating: Vec<String>,
        xref: &'a XrefIndex,
        logger: &Logger,
    ) -> Self {
        Self {
            plugin,
            file_name,
            loader,
            loaded,
            scanned,
            generating,
            xref,
            sessions: Vec::new(),
            by_path: HashMap::new(),
            generated: Vec::new(),
            logger: logger.with("plugin", &plugin.name),
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin.name
    }

    /// Default output file name of this plugin.
    pub fn file_name(&self) -> String {
        (self.file_name)(&self.plugin.name)
    }

    /// Units this plugin included, sorted by path.
    pub fn generating_units(&self) -> Vec<GeneratingUnit> {
        self.generating
            .iter()
            .filter_map(|path| self.generating_unit(path))
            .collect()
    }

    fn generating_unit(&self, path: &str) -> Option<GeneratingUnit> {
        let loaded = self.loaded.get(path)?;
        let scanned = self.scanned.get(path);
        Some(GeneratingUnit {
            path: loaded.path.clone(),
            dir: loaded.dir.clone(),
            directives: scanned.map(|s| s.directives.clone()).unwrap_or_default(),
            inline_directives: scanned
                .map(|s| s.inline_directives.clone())
                .unwrap_or_default(),
            imports: loaded.imports.clone(),
        })
    }

    /// Call `f` for every generating unit, stopping at the first error.
    pub fn for_each_unit<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut GenContext<'a>, &GeneratingUnit) -> Result<()>,
    {
        for unit in self.generating_units() {
            f(self, &unit)?;
        }
        Ok(())
    }

    /// Session for the plugin's default file in a unit, created on first use.
    pub fn printer(&mut self, unit: &str) -> Result<PrinterId> {
        self.generate_unit_file(unit, "")
    }

    /// Session for `file_name` inside a unit directory. An empty name uses
    /// the plugin's default file name.
    pub fn generate_unit_file(&mut self, unit: &str, file_name: &str) -> Result<PrinterId> {
        if file_name.contains(['/', '\\']) {
            bail!("file name {} must not contain a path separator", file_name);
        }
        let dir = self
            .unit_dir(unit)
            .ok_or_else(|| anyhow!("unit {} not found", unit))?;
        let name = if file_name.is_empty() {
            self.file_name()
        } else {
            file_name.to_string()
        };
        Ok(self.session(unit, dir.join(name)))
    }

    /// Session for an arbitrary file, relative paths being taken from the
    /// loader root. A path ending with a separator gets the default file name.
    ///
    /// When the directory does not belong to a loaded unit, `unit_name`
    /// names the unit it will declare. The directory is created and receives
    /// a placeholder source if it has none.
    pub fn generate_file(&mut self, unit_name: &str, path: &str) -> Result<PrinterId> {
        if path.is_empty() {
            bail!("empty output path");
        }
        let mut file = self.loader.root().join(path);
        if path.ends_with(['/', '\\']) {
            file = file.join(self.file_name());
        }
        let file = normalize_path(&file);
        let dir = file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("invalid output path {}", path))?;

        let known = self
            .loaded
            .values()
            .find(|unit| normalize_path(&unit.dir) == dir)
            .map(|unit| unit.path.clone());
        let unit = match known {
            Some(unit) => unit,
            None if unit_name.is_empty() => {
                bail!("{} is not a unit directory, a unit name is required", dir.display())
            }
            None => {
                if let Some(placeholder) = ensure_unit_dir(&dir, unit_name)? {
                    self.logger
                        .debug(format!("created placeholder {}", placeholder.display()));
                    self.generated.push(placeholder);
                }
                self.loader
                    .unit_path(&dir)
                    .unwrap_or_else(|| unit_name.to_string())
            }
        };
        Ok(self.session(&unit, file))
    }

    fn session(&mut self, unit: &str, path: PathBuf) -> PrinterId {
        if let Some(id) = self.by_path.get(&path) {
            return *id;
        }
        let id = PrinterId(self.sessions.len());
        self.sessions.push(Printer::new(unit, path.clone()));
        self.by_path.insert(path, id);
        id
    }

    /// Mutable access to a session, for writing.
    pub fn out(&mut self, id: PrinterId) -> Result<&mut Printer> {
        self.sessions
            .get_mut(id.0)
            .ok_or_else(|| anyhow!("unknown printer {}", id.0))
    }

    pub fn session_of(&self, id: PrinterId) -> Option<&Printer> {
        self.sessions.get(id.0)
    }

    /// Flush a session now instead of at the end of the plugin run.
    pub fn close(&mut self, id: PrinterId) -> Result<()> {
        if let Some(path) = self.out(id)?.close()? {
            self.generated.push(path);
        }
        Ok(())
    }

    /// Import `unit` into a session and return the alias to reference it by,
    /// or an empty string when the session lives in that unit.
    ///
    /// The alias comes from the plugin's qualifier, or else from the last
    /// segment of the unit path. Paths that are not units of the module are
    /// imported verbatim as package specifiers.
    pub fn qualify(&mut self, id: PrinterId, unit: &str) -> Result<String> {
        let alias = match &self.plugin.qualifier {
            Some(qualifier) => qualifier(unit),
            None => sanitize_alias(last_segment(unit)),
        };
        let target = self.unit_dir(unit).map(|dir| normalize_path(&dir));
        let printer = self
            .sessions
            .get_mut(id.0)
            .ok_or_else(|| anyhow!("unknown printer {}", id.0))?;

        let spec = match target {
            Some(dir) => {
                let from = normalize_path(printer.dir());
                if from == dir {
                    return Ok(String::new());
                }
                relative_specifier(&from, &dir)
            }
            None => unit.to_string(),
        };
        Ok(printer.import(&alias, &spec))
    }

    fn unit_dir(&self, unit: &str) -> Option<PathBuf> {
        if let Some(loaded) = self.loaded.get(unit) {
            return Some(loaded.dir.clone());
        }
        if let Some(scanned) = self.scanned.get(unit) {
            return Some(scanned.dir.clone());
        }
        let module = self.loader.module();
        if unit == module {
            return Some(self.loader.root().to_path_buf());
        }
        unit.strip_prefix(module)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|rest| self.loader.root().join(rest))
    }

    pub fn unit(&self, path: &str) -> Option<&LoadedUnit> {
        self.loaded.get(path)
    }

    pub fn xref(&self) -> &XrefIndex {
        self.xref
    }

    pub fn objects(&self, unit: &str) -> &[Object] {
        self.xref.objects(unit)
    }

    pub fn object_by_name(&self, unit: &str, name: &str) -> Option<&Object> {
        self.xref.object_by_name(unit, name)
    }

    pub fn occurrence(&self, id: OccurrenceId) -> Option<&Occurrence> {
        self.xref.occurrence(id)
    }

    pub fn declaration(&self, id: OccurrenceId) -> Option<&Declaration> {
        self.xref.declaration(id)
    }

    pub fn comment(&self, id: OccurrenceId) -> Option<&Comment> {
        self.xref.comment(id)
    }

    pub fn directives(&self, id: OccurrenceId) -> Directives {
        self.xref.directives(id)
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Close every remaining session and return the files written by this
    /// plugin. Sessions that never received bytes leave no file behind.
    pub(crate) fn close_all(mut self) -> Result<Vec<PathBuf>> {
        for printer in &mut self.sessions {
            if let Some(path) = printer.close()? {
                self.generated.push(path);
            }
        }
        Ok(self.generated)
    }
}

fn last_segment(unit: &str) -> &str {
    unit.trim_end_matches('/').rsplit('/').next().unwrap_or(unit)
}

/// Turn a path segment into a valid identifier.
fn sanitize_alias(segment: &str) -> String {
    let mut alias: String = segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if alias.is_empty() || alias.starts_with(|c: char| c.is_ascii_digit()) {
        alias.insert(0, '_');
    }
    alias
}
