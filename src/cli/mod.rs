pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "ems")]
#[command(about = "EMS CLI - Operator tools for the elevator fleet backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Pull devices and telemetry from the provider into the database")]
    Sync {
        #[command(subcommand)]
        cmd: commands::sync::SyncCommands,
    },

    #[command(about = "Inspect the telemetry provider directly")]
    Provider {
        #[command(subcommand)]
        cmd: commands::provider::ProviderCommands,
    },

    #[command(about = "Query and export cached device logs")]
    Logs {
        #[command(subcommand)]
        cmd: commands::logs::LogsCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Sync { cmd } => commands::sync::handle(cmd, output_format).await,
        Commands::Provider { cmd } => commands::provider::handle(cmd, output_format).await,
        Commands::Logs { cmd } => commands::logs::handle(cmd, output_format).await,
    }
}
