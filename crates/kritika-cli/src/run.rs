use crate::commands::Executor as _;
use crate::config::{CliConfig, Command};

pub async fn run(config: CliConfig) -> anyhow::Result<()> {
    match config.command {
        Command::CreateUser(cmd) => cmd.run().await,
    }
}
