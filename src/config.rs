use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::core::output::default_file_name;

pub const CONFIG_FILE_NAME: &str = ".tsgenrc.json";

/// Placeholder replaced by the plugin name in `fileNameTemplate`.
pub const PLUGIN_PLACEHOLDER: &str = "{plugin}";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Module name, the unit path of the source root.
    #[serde(default = "default_module")]
    pub module: String,
    #[serde(default = "default_source_root")]
    pub source_root: String,
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
    /// Plugins to run; all built-in plugins when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<String>>,
    #[serde(default)]
    pub ignored_plugins: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name_template: Option<String>,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub build_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<Vec<String>>,
}

fn default_module() -> String {
    "app".to_string()
}

fn default_source_root() -> String {
    "./".to_string()
}

fn default_patterns() -> Vec<String> {
    vec!["./...".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            module: default_module(),
            source_root: default_source_root(),
            patterns: default_patterns(),
            plugins: None,
            ignored_plugins: Vec::new(),
            file_name_template: None,
            namespace: String::new(),
            build_tags: Vec::new(),
            formatter: None,
        }
    }
}

impl Config {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.module.is_empty() || self.module.contains(char::is_whitespace) {
            bail!("Invalid 'module': \"{}\"", self.module);
        }

        // `...` is not glob syntax; check what is left once it is removed
        for pattern in &self.patterns {
            let glob = pattern.replace("...", "*");
            Pattern::new(&glob)
                .with_context(|| format!("Invalid pattern in 'patterns': \"{}\"", pattern))?;
        }

        if let Some(template) = &self.file_name_template {
            if !template.contains(PLUGIN_PLACEHOLDER) {
                bail!(
                    "'fileNameTemplate' must contain {}: \"{}\"",
                    PLUGIN_PLACEHOLDER,
                    template
                );
            }
            if template.contains(['/', '\\']) {
                bail!("'fileNameTemplate' must be a file name: \"{}\"", template);
            }
        }

        for tag in &self.build_tags {
            if tag.is_empty() || tag.contains([',', ' ', '!']) {
                bail!("Invalid tag in 'buildTags': \"{}\"", tag);
            }
        }

        if self.formatter.as_ref().is_some_and(Vec::is_empty) {
            bail!("'formatter' must name a program");
        }

        Ok(())
    }

    /// Output file name of a plugin, from the template or the default.
    pub fn file_name(&self, plugin: &str) -> String {
        match &self.file_name_template {
            Some(template) => template.replace(PLUGIN_PLACEHOLDER, &plugin.replace('-', "_")),
            None => default_file_name(plugin),
        }
    }
}

pub fn default_config_json() -> Result<String> {
    let config = Config::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub config: Config,
    /// Directory holding the config file; the start directory when using defaults.
    pub base_dir: PathBuf,
    pub from_file: bool,
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            config.validate()?;
            let base_dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| start_dir.to_path_buf());
            Ok(ConfigLoadResult {
                config,
                base_dir,
                from_file: true,
            })
        }
        None => Ok(ConfigLoadResult {
            config: Config::default(),
            base_dir: start_dir.to_path_buf(),
            from_file: false,
        }),
    }
}
