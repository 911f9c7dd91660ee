use std::env;

use anyhow::{Context, Result};

use crate::{
    cli::exit_status::ExitStatus,
    config::load_config,
    plugins::builtin_plugins,
};

/// Print every built-in plugin with the file name it writes.
pub fn plugins() -> Result<ExitStatus> {
    let cwd = env::current_dir().context("Failed to read current directory")?;
    let config = load_config(&cwd)?.config;

    for plugin in builtin_plugins() {
        let name = plugin.name();
        let status = match &config.plugins {
            Some(enabled) if !enabled.iter().any(|n| n == name) => " (disabled)",
            _ if config.ignored_plugins.iter().any(|n| n == name) => " (ignored)",
            _ => "",
        };
        println!("{}\t{}{}", name, config.file_name(name), status);
    }
    Ok(ExitStatus::Success)
}
