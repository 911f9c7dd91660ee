use anyhow::Result;

use crate::core::{
    filter::{CommandFilter, FilterContext},
    generate::GenContext,
    plugin::Plugin,
};

const COMMAND: &str = "gen:inspect";

/// Logs the directives and declarations of units marked `+gen:inspect`,
/// at debug level. Writes nothing.
pub struct InspectPlugin;

impl Plugin for InspectPlugin {
    fn name(&self) -> &str {
        "inspect"
    }

    fn filter(&self, ctx: &mut FilterContext) -> Result<()> {
        CommandFilter::new(COMMAND).filter_all(ctx)
    }

    fn generate(&self, ctx: &mut GenContext) -> Result<()> {
        for unit in ctx.generating_units() {
            let logger = ctx.logger().with("unit", &unit.path);
            for directive in unit.directives.iter().chain(unit.inline_directives.iter()) {
                logger.debug(format!("directive {}", directive));
            }
            for object in ctx.objects(&unit.path) {
                let directives = ctx.directives(object.occurrence);
                logger.debug(format!(
                    "{} {} ({} directives)",
                    object.kind.as_str(),
                    object.name,
                    directives.len()
                ));
            }
        }
        Ok(())
    }
}
