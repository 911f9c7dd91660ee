//! Two-phase unit filtering.
//!
//! **Phase A** ([`scan_units`]) reads the source files of every listed unit
//! on a bounded thread pool, applies the loader's build constraints, and
//! extracts import edges and directives. No parsing happens here; the file
//! bytes are kept as an overlay for the full load.
//!
//! **Phase B** ([`run_filters`]) hands the scanned units to each plugin's
//! filter callback. Every plugin owns one bit per unit and marks the units it
//! wants; the union of all bits is the set of units that get fully analyzed.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::PathBuf,
    sync::mpsc::{self, Sender},
    thread,
};

use anyhow::{Context, Result, anyhow, bail};
use rayon::prelude::*;

use crate::core::{
    directive::{Directives, matches_command, parse_directives_from_body},
    errors::{FileError, ScanErrors},
    loader::{Overlay, UnitFiles, UnitLoader, matches_pattern},
    logging::Logger,
    plugin::PluginEntry,
};

/// Upper bound on concurrent file reads during the metadata scan.
pub const SCAN_THREADS: usize = 16;

/// A unit as seen by filter callbacks: files, import edges and directives,
/// without any syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedUnit {
    pub path: String,
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub imports: BTreeSet<String>,
    /// Directive blocks followed by a blank line.
    pub directives: Directives,
    /// Directive blocks attached to the code right below them.
    pub inline_directives: Directives,
}

#[derive(Debug, Default)]
pub struct ScanResult {
    pub units: Vec<ScannedUnit>,
    pub overlay: Overlay,
}

/// Phase A: read every file of every unit and collect its imports and
/// directives.
///
/// Files whose name satisfies `is_generated` are skipped, as are files the
/// loader excludes from the build. Contents are decoded lossily. A file that
/// vanished since listing is logged and skipped; other read errors are
/// collected and reported together once every worker has finished.
pub fn scan_units(
    units: &[UnitFiles],
    loader: &dyn UnitLoader,
    is_generated: &(dyn Fn(&str) -> bool + Sync),
    logger: &Logger,
) -> Result<ScanResult> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(SCAN_THREADS)
        .build()
        .context("Failed to build scan thread pool")?;

    let (mut scanned, overlay, mut errors) = thread::scope(|scope| -> Result<_> {
        let (file_tx, file_rx) = mpsc::channel::<(PathBuf, Vec<u8>)>();
        let (err_tx, err_rx) = mpsc::channel::<FileError>();

        let overlay_aggregator = scope.spawn(move || file_rx.into_iter().collect::<Overlay>());
        let error_aggregator = scope.spawn(move || err_rx.into_iter().collect::<Vec<_>>());

        // Every sender clone lives inside the pool; the aggregators finish
        // once the last worker is done with them.
        let scanned: Vec<ScannedUnit> = pool.install(|| {
            units
                .par_iter()
                .map_with((file_tx, err_tx), |(file_tx, err_tx), unit| {
                    scan_unit(unit, loader, is_generated, file_tx, err_tx, logger)
                })
                .collect()
        });

        let overlay = overlay_aggregator
            .join()
            .map_err(|_| anyhow!("overlay aggregator panicked"))?;
        let errors = error_aggregator
            .join()
            .map_err(|_| anyhow!("error aggregator panicked"))?;
        Ok((scanned, overlay, errors))
    })?;

    if !errors.is_empty() {
        errors.sort_by(|a, b| a.path.cmp(&b.path));
        return Err(ScanErrors { errors }.into());
    }

    scanned.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(ScanResult {
        units: scanned,
        overlay,
    })
}

fn scan_unit(
    unit: &UnitFiles,
    loader: &dyn UnitLoader,
    is_generated: &(dyn Fn(&str) -> bool + Sync),
    file_tx: &Sender<(PathBuf, Vec<u8>)>,
    err_tx: &Sender<FileError>,
    logger: &Logger,
) -> ScannedUnit {
    let mut scanned = ScannedUnit {
        path: unit.path.clone(),
        dir: unit.dir.clone(),
        files: Vec::new(),
        imports: unit.imports.clone(),
        directives: Directives::new(),
        inline_directives: Directives::new(),
    };

    for file in &unit.files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if is_generated(&name) {
            continue;
        }

        let bytes = match fs::read(file) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                logger.info(format!("skipping vanished file {}", file.display()));
                continue;
            }
            Err(err) => {
                // the receiver outlives every worker
                let _ = err_tx.send(FileError {
                    path: file.clone(),
                    source: err,
                });
                continue;
            }
        };

        let source = String::from_utf8_lossy(&bytes);
        let Some(imports) = loader.scan_file(&unit.dir, &source) else {
            logger.debug(format!("{} excluded by build constraints", file.display()));
            continue;
        };
        scanned.imports.extend(imports);

        let body = parse_directives_from_body(&source);
        for err in &body.errors {
            logger.warn(format!("{}: {}", file.display(), err));
        }
        scanned.directives.extend(body.directives);
        scanned.inline_directives.extend(body.inline);
        scanned.files.push(file.clone());
        let _ = file_tx.send((file.clone(), bytes));
    }
    scanned.imports.remove(&unit.path);
    scanned
}

/// Per-plugin inclusion bits, one row per unit path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inclusion {
    width: usize,
    rows: BTreeMap<String, Vec<bool>>,
}

impl Inclusion {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            rows: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, path: &str, bit: usize) {
        let width = self.width;
        let row = self
            .rows
            .entry(path.to_string())
            .or_insert_with(|| vec![false; width]);
        if let Some(slot) = row.get_mut(bit) {
            *slot = true;
        }
    }

    pub fn is_set(&self, path: &str, bit: usize) -> bool {
        self.rows
            .get(path)
            .and_then(|row| row.get(bit))
            .copied()
            .unwrap_or(false)
    }

    /// Paths with at least one bit set, sorted.
    pub fn included_paths(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|(_, row)| row.iter().any(|bit| *bit))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Paths whose bit for one plugin is set, sorted.
    pub fn paths_for(&self, bit: usize) -> Vec<String> {
        self.rows
            .iter()
            .filter(|(_, row)| row.get(bit).copied().unwrap_or(false))
            .map(|(path, _)| path.clone())
            .collect()
    }
}

/// What a plugin's filter callback can see and do.
pub struct FilterContext<'a> {
    plugin: &'a str,
    bit: usize,
    module: &'a str,
    units: &'a [ScannedUnit],
    inclusion: &'a mut Inclusion,
    parse_targets: &'a mut BTreeSet<String>,
    logger: Logger,
}

impl<'a> FilterContext<'a> {
    pub fn plugin_name(&self) -> &str {
        self.plugin
    }

    /// Cloned records of every scanned unit, sorted by path.
    pub fn scanned_units(&self) -> Vec<ScannedUnit> {
        self.units.to_vec()
    }

    pub fn unit(&self, path: &str) -> Option<ScannedUnit> {
        self.units.iter().find(|u| u.path == path).cloned()
    }

    /// Mark a unit for generation by this plugin. The unit does not have to
    /// be one of the scanned units.
    pub fn include_unit(&mut self, path: &str) -> Result<()> {
        if path.is_empty() {
            bail!("empty unit path");
        }
        self.inclusion.set(path, self.bit);
        Ok(())
    }

    pub fn is_included(&self, path: &str) -> bool {
        self.inclusion.is_set(path, self.bit)
    }

    /// Request a unit to be analyzed without generating code for it. Its
    /// declarations become visible through the cross-reference queries.
    pub fn parse_unit(&mut self, path: &str) -> Result<()> {
        if path.is_empty() {
            bail!("empty unit path");
        }
        self.parse_targets.insert(path.to_string());
        Ok(())
    }

    /// [`parse_unit`](Self::parse_unit) for load patterns such as `app/...`.
    pub fn parse_units(&mut self, patterns: &[&str]) -> Result<()> {
        for pattern in patterns {
            self.parse_unit(pattern)?;
        }
        Ok(())
    }

    /// Scanned units matching a load pattern.
    pub fn units_matching(&self, pattern: &str) -> Vec<ScannedUnit> {
        self.units
            .iter()
            .filter(|u| matches_pattern(pattern, self.module, &u.path))
            .cloned()
            .collect()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

/// Outcome of Phase B.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub inclusion: Inclusion,
    /// Extra load patterns requested through `parse_unit`.
    pub parse_targets: BTreeSet<String>,
}

impl FilterOutcome {
    /// Paths needing full analysis for generation, sorted.
    pub fn included_paths(&self) -> Vec<String> {
        self.inclusion.included_paths()
    }
}

/// Phase B: run every plugin's filter callback in registration order.
pub fn run_filters(
    plugins: &[PluginEntry],
    module: &str,
    units: &[ScannedUnit],
    logger: &Logger,
) -> Result<FilterOutcome> {
    let mut outcome = FilterOutcome {
        inclusion: Inclusion::new(plugins.len()),
        parse_targets: BTreeSet::new(),
    };
    for entry in plugins {
        let mut ctx = FilterContext {
            plugin: &entry.name,
            bit: entry.index,
            module,
            units,
            inclusion: &mut outcome.inclusion,
            parse_targets: &mut outcome.parse_targets,
            logger: logger.with("plugin", &entry.name),
        };
        entry
            .plugin
            .filter(&mut ctx)
            .with_context(|| format!("plugin {}", entry.name))?;
    }
    Ok(outcome)
}

/// The usual filter: include units carrying a directive command.
///
/// `+gen:sample` and its sub-commands such as `+gen:sample:field` both match
/// the command `gen:sample`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFilter {
    command: String,
}

impl CommandFilter {
    pub fn new(command: &str) -> Self {
        let command = command.strip_prefix('+').unwrap_or(command);
        Self {
            command: command.trim_end_matches(':').to_string(),
        }
    }

    /// Whether a unit carries the command, in its unit-level directives or
    /// also in its inline ones.
    pub fn include(&self, unit: &ScannedUnit, with_inline: bool) -> bool {
        let matches = |directives: &Directives| {
            directives
                .iter()
                .any(|d| matches_command(&d.cmd, &self.command))
        };
        matches(&unit.directives) || (with_inline && matches(&unit.inline_directives))
    }

    /// Include units whose unit-level directives carry the command.
    pub fn filter(&self, ctx: &mut FilterContext) -> Result<()> {
        self.apply(ctx, false)
    }

    /// Include units whose unit-level or inline directives carry the command.
    pub fn filter_all(&self, ctx: &mut FilterContext) -> Result<()> {
        self.apply(ctx, true)
    }

    fn apply(&self, ctx: &mut FilterContext, with_inline: bool) -> Result<()> {
        let paths: Vec<String> = ctx
            .units
            .iter()
            .filter(|unit| self.include(unit, with_inline))
            .map(|unit| unit.path.clone())
            .collect();
        for path in paths {
            ctx.include_unit(&path)?;
        }
        Ok(())
    }
}
