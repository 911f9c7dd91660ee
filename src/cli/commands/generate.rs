use anyhow::Result;

use super::context::RunContext;
use crate::{
    cli::{args::GenerateCommand, exit_status::ExitStatus},
    core::engine::Engine,
};

pub fn generate(cmd: GenerateCommand) -> Result<ExitStatus> {
    let ctx = RunContext::new(&cmd.common, cmd.patterns)?;
    let loader = ctx.loader();
    let report = Engine::new(ctx.engine, &loader, ctx.logger.clone()).run(&ctx.patterns)?;

    if report.generated.is_empty() {
        ctx.logger.info("no files generated");
    }
    Ok(ExitStatus::Success)
}
