use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_empty_collection, output_rows};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::provider::{TelemetryProvider, ThingsBoardClient};
use crate::services::directory::fleet_devices;
use crate::services::FleetFilter;

#[derive(Subcommand)]
pub enum ProviderCommands {
    #[command(about = "List devices in the provider directory")]
    Devices {
        #[arg(long, help = "Include devices outside the elevator fleet")]
        all: bool,
    },
}

pub async fn handle(cmd: ProviderCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let client = ThingsBoardClient::new(&config.provider)?;

    match cmd {
        ProviderCommands::Devices { all } => {
            let devices = if all {
                client.device_directory().await?
            } else {
                fleet_devices(&client, &FleetFilter::new(&config.provider.fleet_marker)).await?
            };

            if devices.is_empty() {
                return output_empty_collection(&output_format, "devices", "No devices found");
            }

            let rows = devices
                .iter()
                .map(|d| {
                    vec![
                        d.tb_device_id.clone(),
                        d.device_name.clone(),
                        if d.active { "active" } else { "inactive" }.to_string(),
                    ]
                })
                .collect();
            output_rows(&output_format, &["ID", "NAME", "STATE"], rows, json!(devices))
        }
    }
}
