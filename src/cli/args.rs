//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `generate`: Run the enabled plugins over the matching units
//! - `clean`: Remove files previously generated by the enabled plugins
//! - `plugins`: List the available plugins
//! - `init`: Initialize a tsgen configuration file

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }
}

/// Common arguments shared by `generate` and `clean`.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Source root directory (overrides config file)
    #[arg(long)]
    pub source_root: Option<PathBuf>,

    /// Module name, the unit path of the source root (overrides config file)
    #[arg(long)]
    pub module: Option<String>,

    /// Run only this plugin; can be repeated
    #[arg(long = "plugin")]
    pub plugins: Vec<String>,

    /// Skip this plugin; can be repeated
    #[arg(long = "ignore-plugin")]
    pub ignored_plugins: Vec<String>,

    /// Active build tags, comma separated
    #[arg(long, value_delimiter = ',', env = "TSGEN_TAGS")]
    pub tags: Vec<String>,

    /// Only index units whose path starts with this prefix
    #[arg(long)]
    pub namespace: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct GenerateCommand {
    /// Unit patterns such as `./...`, `app/models` or `app/api/...` (default from config)
    pub patterns: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct CleanCommand {
    /// Unit patterns to clean (default from config)
    pub patterns: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate code for the units marked by plugin directives
    Generate(GenerateCommand),
    /// Remove previously generated files
    Clean(CleanCommand),
    /// List the available plugins
    Plugins,
    /// Initialize a new .tsgenrc.json configuration file
    Init,
}
