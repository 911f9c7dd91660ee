//! Plugin contract and registration.

use std::{collections::HashSet, fmt, sync::Arc};

use anyhow::Result;

use crate::core::{errors::ConfigError, filter::FilterContext, generate::GenContext};

/// Maps a unit path to the alias used when importing it from generated code.
pub type Qualifier = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// A code generator.
///
/// `filter` runs during the metadata phase and marks the units the plugin
/// wants; `generate` then runs over the analyzed units it marked.
pub trait Plugin {
    /// Unique, non-empty name. Also used to derive the default output file name.
    fn name(&self) -> &str;

    fn filter(&self, ctx: &mut FilterContext) -> Result<()>;

    fn generate(&self, ctx: &mut GenContext) -> Result<()>;

    /// Custom import alias for units referenced from generated code.
    fn qualifier(&self) -> Option<Qualifier> {
        None
    }
}

/// A registered plugin, with the position of its inclusion bit.
#[derive(Clone)]
pub struct PluginEntry {
    pub name: String,
    pub index: usize,
    pub plugin: Arc<dyn Plugin + Send + Sync>,
    pub qualifier: Option<Qualifier>,
}

impl fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginEntry")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("qualifier", &self.qualifier.is_some())
            .finish()
    }
}

/// Register plugins in order, rejecting empty and duplicate names.
pub fn register(plugins: &[Arc<dyn Plugin + Send + Sync>]) -> Result<Vec<PluginEntry>, ConfigError> {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(plugins.len());
    for plugin in plugins {
        let name = plugin.name();
        if name.is_empty() {
            return Err(ConfigError::EmptyPluginName);
        }
        if !seen.insert(name.to_string()) {
            return Err(ConfigError::DuplicatePlugin(name.to_string()));
        }
        entries.push(PluginEntry {
            name: name.to_string(),
            index: entries.len(),
            plugin: plugin.clone(),
            qualifier: plugin.qualifier(),
        });
    }
    Ok(entries)
}

/// Keep the enabled plugins, renumbering their bits.
///
/// `enabled` of `None` keeps every plugin. Names in either list that match no
/// registered plugin are errors.
pub fn select(
    entries: Vec<PluginEntry>,
    enabled: Option<&[String]>,
    ignored: &[String],
) -> Result<Vec<PluginEntry>, ConfigError> {
    let known: HashSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    for name in enabled.unwrap_or_default().iter().chain(ignored) {
        if !known.contains(name.as_str()) {
            return Err(ConfigError::UnknownPlugin(name.clone()));
        }
    }

    let selected: Vec<PluginEntry> = entries
        .into_iter()
        .filter(|e| enabled.is_none_or(|names| names.contains(&e.name)))
        .filter(|e| !ignored.contains(&e.name))
        .enumerate()
        .map(|(index, entry)| PluginEntry { index, ..entry })
        .collect();
    if selected.is_empty() {
        return Err(ConfigError::NoPlugins);
    }
    Ok(selected)
}
