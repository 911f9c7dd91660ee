//! The generation run.
//!
//! [`Engine::run`] wires the pieces together: plugin registration, cleanup of
//! previous output, the metadata scan and filter callbacks, the full load of
//! the units that need it, the cross-reference index, and finally each
//! plugin's generate callback.

use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{Context, Result};

use crate::{
    core::{
        config::EngineConfig,
        errors::ConfigError,
        filter::{run_filters, scan_units},
        generate::GenContext,
        loader::UnitLoader,
        logging::Logger,
        output::{clean_dir, run_formatter},
        plugin::{PluginEntry, register, select},
        xref::XrefIndex,
    },
    utils::display_relative,
};

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Written files, sorted.
    pub generated: Vec<PathBuf>,
    /// Previously generated files that were deleted.
    pub cleaned: Vec<PathBuf>,
    /// Units included by at least one plugin, sorted.
    pub included: Vec<String>,
}

pub struct Engine<'a> {
    config: EngineConfig,
    loader: &'a dyn UnitLoader,
    logger: Logger,
}

impl<'a> Engine<'a> {
    pub fn new(config: EngineConfig, loader: &'a dyn UnitLoader, logger: Logger) -> Self {
        Self {
            config,
            loader,
            logger,
        }
    }

    /// Enabled plugins, in registration order.
    pub fn plugins(&self) -> Result<Vec<PluginEntry>, ConfigError> {
        let entries = register(&self.config.plugins)?;
        select(
            entries,
            self.config.enabled.as_deref(),
            &self.config.ignored,
        )
    }

    pub fn run(&self, patterns: &[String]) -> Result<RunReport> {
        let plugins = self.plugins()?;
        if patterns.is_empty() {
            return Err(ConfigError::NoPatterns.into());
        }
        let mut report = RunReport::default();

        let output_names: Vec<String> = plugins
            .iter()
            .map(|entry| (self.config.file_name)(&entry.name))
            .collect();
        let is_generated = |name: &str| output_names.iter().any(|n| n == name);

        let listed = self.loader.list(patterns)?;
        for unit in &listed {
            for path in clean_dir(&unit.dir, &output_names)? {
                self.logger.debug(format!("removed {}", path.display()));
                report.cleaned.push(path);
            }
        }
        if self.config.clean_only {
            return Ok(report);
        }

        let mut scan = scan_units(&listed, self.loader, &is_generated, &self.logger)?;
        scan.units.retain(|unit| {
            if unit.files.is_empty() {
                self.logger
                    .info(format!("skipping unit {} without source files", unit.path));
            }
            !unit.files.is_empty()
        });
        let outcome = run_filters(&plugins, self.loader.module(), &scan.units, &self.logger)?;
        report.included = outcome.included_paths();

        let mut load_patterns: Vec<String> = outcome.parse_targets.iter().cloned().collect();
        for path in &report.included {
            if !load_patterns.contains(path) {
                load_patterns.push(path.clone());
            }
        }
        if load_patterns.is_empty() {
            self.logger.info("no units for generating");
            return Ok(report);
        }

        let units = self.loader.load(&load_patterns, &scan.overlay)?;
        let xref = XrefIndex::build(&units, &self.config.namespace, &self.logger);
        self.logger.debug(format!(
            "loaded {} units with {} occurrences",
            units.len(),
            xref.len()
        ));

        let loaded: BTreeMap<_, _> = units.into_iter().map(|u| (u.path.clone(), u)).collect();
        let scanned: BTreeMap<_, _> = scan
            .units
            .into_iter()
            .map(|u| (u.path.clone(), u))
            .collect();

        for entry in &plugins {
            let generating: Vec<String> = outcome
                .inclusion
                .paths_for(entry.index)
                .into_iter()
                .filter(|path| {
                    let found = loaded.contains_key(path);
                    if !found {
                        self.logger
                            .warn(format!("unit {} included by {} not found", path, entry.name));
                    }
                    found
                })
                .collect();

            let mut ctx = GenContext::new(
                entry,
                &self.config.file_name,
                self.loader,
                &loaded,
                &scanned,
                generating,
                &xref,
                &self.logger,
            );
            entry
                .plugin
                .generate(&mut ctx)
                .with_context(|| format!("plugin {}", entry.name))?;
            let written = ctx
                .close_all()
                .with_context(|| format!("plugin {}", entry.name))?;
            report.generated.extend(written);
        }

        report.generated.sort();
        report.generated.dedup();
        if !report.generated.is_empty() {
            self.logger.print("Generated files:");
            for path in &report.generated {
                self.logger
                    .print(format!("\t{}", display_relative(path, self.loader.root())));
            }
        }

        if let Some(formatter) = &self.config.formatter {
            run_formatter(formatter, &report.generated, self.loader.root())?;
        }
        Ok(report)
    }
}
