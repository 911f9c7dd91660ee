//! Built-in plugins available from the command line.
//!
//! - `sample`: lists the declarations of units marked `+gen:sample`
//! - `inspect`: logs what the analysis found in units marked `+gen:inspect`

mod inspect;
mod sample;

use std::sync::Arc;

pub use inspect::InspectPlugin;
pub use sample::SamplePlugin;

use crate::core::plugin::Plugin;

pub fn builtin_plugins() -> Vec<Arc<dyn Plugin + Send + Sync>> {
    vec![Arc::new(SamplePlugin), Arc::new(InspectPlugin)]
}
