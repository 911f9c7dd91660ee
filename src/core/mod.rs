//! Generation core.
//!
//! Leaves first: [`directive`] parses comment annotations, [`loader`] lists
//! and parses units, [`filter`] runs the metadata scan and the plugins'
//! filter callbacks, [`xref`] indexes the analyzed units, and [`engine`]
//! drives plugins through [`generate`] into [`printer`] sessions.

pub mod config;
pub mod directive;
pub mod engine;
pub mod errors;
pub mod filter;
pub mod generate;
pub mod loader;
pub mod logging;
pub mod output;
pub mod parsers;
pub mod plugin;
pub mod printer;
pub mod syntax;
pub mod xref;
