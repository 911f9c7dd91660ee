//! Source parsers.
//!
//! - `ts`: TypeScript/JavaScript parser (uses swc for AST generation)

pub mod ts;
