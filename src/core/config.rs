use std::{fmt, path::PathBuf, sync::Arc};

use crate::core::{
    loader::{BuildTags, SourceLoader},
    output::default_file_name,
    plugin::Plugin,
};

/// Maps a plugin name to the file name it writes into each unit.
pub type FileNameFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Everything [`Engine`](crate::core::engine::Engine) needs to know about a run.
#[derive(Clone)]
pub struct EngineConfig {
    pub plugins: Vec<Arc<dyn Plugin + Send + Sync>>,
    /// Plugins to run. `None` runs every registered plugin.
    pub enabled: Option<Vec<String>>,
    pub ignored: Vec<String>,
    pub file_name: FileNameFn,
    /// Only delete previously generated files.
    pub clean_only: bool,
    /// Unit path prefix of the units indexed for cross-references.
    pub namespace: String,
    pub build_tags: Vec<String>,
    /// Formatter program and arguments; generated files are appended.
    pub formatter: Option<Vec<String>>,
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins: Vec<&str> = self.plugins.iter().map(|p| p.name()).collect();
        f.debug_struct("EngineConfig")
            .field("plugins", &plugins)
            .field("enabled", &self.enabled)
            .field("ignored", &self.ignored)
            .field("clean_only", &self.clean_only)
            .field("namespace", &self.namespace)
            .field("build_tags", &self.build_tags)
            .field("formatter", &self.formatter)
            .finish_non_exhaustive()
    }
}

impl EngineConfig {
    pub fn new(plugins: Vec<Arc<dyn Plugin + Send + Sync>>) -> Self {
        Self {
            plugins,
            enabled: None,
            ignored: Vec::new(),
            file_name: Arc::new(default_file_name),
            clean_only: false,
            namespace: String::new(),
            build_tags: Vec::new(),
            formatter: None,
        }
    }

    pub fn with_enabled(mut self, enabled: Option<Vec<String>>) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_ignored(mut self, ignored: Vec<String>) -> Self {
        self.ignored = ignored;
        self
    }

    pub fn with_file_name(mut self, file_name: FileNameFn) -> Self {
        self.file_name = file_name;
        self
    }

    pub fn with_clean_only(mut self, clean_only: bool) -> Self {
        self.clean_only = clean_only;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_build_tags(mut self, build_tags: Vec<String>) -> Self {
        self.build_tags = build_tags;
        self
    }

    pub fn with_formatter(mut self, formatter: Option<Vec<String>>) -> Self {
        self.formatter = formatter.filter(|cmd| !cmd.is_empty());
        self
    }

    /// Source loader for `root` honoring the configured build tags.
    pub fn loader(&self, root: impl Into<PathBuf>, module: impl Into<String>) -> SourceLoader {
        SourceLoader::new(root, module, BuildTags::new(&self.build_tags))
    }
}
