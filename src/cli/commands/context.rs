use std::{env, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};

use crate::{
    cli::args::CommonArgs,
    config::{CONFIG_FILE_NAME, load_config},
    core::{
        config::EngineConfig,
        loader::SourceLoader,
        logging::{LogLevel, Logger},
    },
    plugins::builtin_plugins,
    utils::normalize_path,
};

/// Settings of one `generate` or `clean` run: the config file merged with
/// the command line overrides.
pub struct RunContext {
    pub root: PathBuf,
    pub module: String,
    pub patterns: Vec<String>,
    pub engine: EngineConfig,
    pub logger: Logger,
}

impl RunContext {
    pub fn new(args: &CommonArgs, patterns: Vec<String>) -> Result<Self> {
        let cwd = env::current_dir().context("Failed to read current directory")?;
        let start = args
            .source_root
            .as_ref()
            .map(|root| cwd.join(root))
            .unwrap_or_else(|| cwd.clone());

        let logger = Logger::stderr(if args.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        });

        let loaded = load_config(&start)?;
        if !loaded.from_file {
            logger.info(format!(
                "no {} found, using default configuration",
                CONFIG_FILE_NAME
            ));
        }
        let config = loaded.config;

        let root = match &args.source_root {
            Some(root) => cwd.join(root),
            None => loaded.base_dir.join(&config.source_root),
        };
        let patterns = if patterns.is_empty() {
            config.patterns.clone()
        } else {
            patterns
        };
        let enabled = if args.plugins.is_empty() {
            config.plugins.clone()
        } else {
            Some(args.plugins.clone())
        };

        let mut ignored = config.ignored_plugins.clone();
        ignored.extend(args.ignored_plugins.iter().cloned());
        let mut tags = config.build_tags.clone();
        tags.extend(args.tags.iter().filter(|t| !t.is_empty()).cloned());

        let names = config.clone();
        let engine = EngineConfig::new(builtin_plugins())
            .with_enabled(enabled)
            .with_ignored(ignored)
            .with_file_name(Arc::new(move |plugin: &str| names.file_name(plugin)))
            .with_namespace(args.namespace.clone().unwrap_or(config.namespace))
            .with_build_tags(tags)
            .with_formatter(config.formatter);

        Ok(Self {
            root: normalize_path(&root),
            module: args.module.clone().unwrap_or(config.module),
            patterns,
            engine,
            logger,
        })
    }

    pub fn loader(&self) -> SourceLoader {
        self.engine.loader(self.root.clone(), self.module.clone())
    }
}
