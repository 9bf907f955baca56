use anyhow::Context;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{self, output_success};
use crate::cli::OutputFormat;
use crate::services::TickOutcome;

#[derive(Subcommand)]
pub enum SyncCommands {
    #[command(about = "Refresh cached metadata for every fleet device")]
    Devices,

    #[command(about = "Run one polling tick now, ignoring the auto-save switch")]
    Tick,
}

pub async fn handle(cmd: SyncCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let (db, state) = utils::connect().await?;

    let result = match cmd {
        SyncCommands::Devices => {
            let report = state.sync.sync_directory().await.context("directory sync failed")?;
            output_success(
                &output_format,
                &format!("Synced {} fleet devices", report.count),
                Some(serde_json::to_value(&report)?),
            )
        }
        SyncCommands::Tick => {
            // an operator-triggered tick runs even when auto-save is off
            state.scheduler.set_autosave(true);
            match state.scheduler.run_tick().await.context("polling tick failed")? {
                TickOutcome::Completed(report) => output_success(
                    &output_format,
                    &format!(
                        "Wrote {} samples ({} inactive, {} failed)",
                        report.written, report.inactive, report.failed
                    ),
                    Some(json!(report)),
                ),
                outcome => output_success(&output_format, "Tick did not run", Some(json!(outcome))),
            }
        }
    };

    db.close().await;
    result
}
