use clap::{Parser, Subcommand};

use crate::commands::create_user::CreateUserCmd;

#[derive(Parser, Debug)]
#[command(about = "Operator tooling for the kritika service")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(about = "Create a user directly in the store, e.g. to bootstrap the first admin")]
    CreateUser(CreateUserCmd),
}
