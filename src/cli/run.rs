use anyhow::Result;

use super::{
    args::{Arguments, Command},
    commands::{clean::clean, generate::generate, init::init, plugins::plugins},
    exit_status::ExitStatus,
};

/// Dispatch to the command handler.
pub fn run(Arguments { command }: Arguments) -> Result<ExitStatus> {
    match command {
        Some(Command::Generate(cmd)) => generate(cmd),
        Some(Command::Clean(cmd)) => clean(cmd),
        Some(Command::Plugins) => plugins(),
        Some(Command::Init) => init(),
        None => {
            anyhow::bail!("No command provided. Use --help to see available commands.")
        }
    }
}
