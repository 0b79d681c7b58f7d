use clap::{Parser, Subcommand};

use crate::commands::{create_user::CreateUserCmd, load_data::LoadDataCmd};

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "CLI for YaMDb - administration tasks working directly with the database."
)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    CreateUser(CreateUserCmd),
    LoadData(LoadDataCmd),
}

impl crate::commands::Executor for Command {
    async fn run(self) -> anyhow::Result<()> {
        match self {
            Command::CreateUser(cmd) => cmd.run().await,
            Command::LoadData(cmd) => cmd.run().await,
        }
    }
}
