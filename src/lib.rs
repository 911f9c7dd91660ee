//! tsgen - directive-driven code generation for TypeScript projects
//!
//! Plugins mark the units (source directories) they care about through
//! directive comments such as `// +gen:sample`. A cheap metadata scan finds
//! those directives, only the marked units are parsed and cross-referenced,
//! and each plugin then writes derived source files next to them.
//!
//! ## Module Structure
//!
//! - `cli`: Command-line interface layer
//! - `config`: `.tsgenrc.json` loading and validation
//! - `core`: Directive parser, filtering engine, cross-reference index,
//!   generation orchestrator and output writer
//! - `plugins`: Built-in plugins
//! - `utils`: Shared path helpers

pub mod cli;
pub mod config;
pub mod core;
pub mod plugins;
pub mod utils;
