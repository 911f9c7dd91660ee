use anyhow::Result;
use colored::Colorize;

use super::{SUCCESS_MARK, context::RunContext};
use crate::{
    cli::{args::CleanCommand, exit_status::ExitStatus},
    core::engine::Engine,
    utils::display_relative,
};

pub fn clean(cmd: CleanCommand) -> Result<ExitStatus> {
    let ctx = RunContext::new(&cmd.common, cmd.patterns)?;
    let loader = ctx.loader();
    let config = ctx.engine.clone().with_clean_only(true);
    let report = Engine::new(config, &loader, ctx.logger.clone()).run(&ctx.patterns)?;

    for path in &report.cleaned {
        println!("Removed {}", display_relative(path, &ctx.root));
    }
    let summary = match report.cleaned.len() {
        0 => "Nothing to clean".to_string(),
        1 => "Removed 1 generated file".to_string(),
        n => format!("Removed {} generated files", n),
    };
    println!("{} {}", SUCCESS_MARK.green(), summary.green());
    Ok(ExitStatus::Success)
}
