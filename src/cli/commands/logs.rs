use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::utils::{self, or_dash, output_empty_collection, output_rows, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum LogsCommands {
    #[command(about = "Show the most recent log of every device")]
    Latest {
        #[arg(long, help = "Only devices assigned to this supervisor")]
        supervisor: Option<String>,
    },

    #[command(about = "Export device logs in a date range to a file")]
    Export {
        #[arg(long, help = "Comma-separated device ids")]
        ids: String,

        #[arg(long, help = "Start date or timestamp")]
        from: String,

        #[arg(long, help = "End date or timestamp, whole day when a date")]
        to: String,

        #[arg(long, default_value = "csv", help = "csv or xlsx")]
        format: String,

        #[arg(long, help = "Output file path")]
        out: PathBuf,
    },
}

pub async fn handle(cmd: LogsCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let (db, state) = utils::connect().await?;

    let result = match cmd {
        LogsCommands::Latest { supervisor } => {
            let rows = match supervisor.as_deref() {
                Some(id) => state.reports.supervisor_latest(id).await?,
                None => state.reports.latest().await?,
            };

            if rows.is_empty() {
                output_empty_collection(&output_format, "logs", "No logs recorded yet")
            } else {
                let table = rows
                    .iter()
                    .map(|row| {
                        let sample = &row.entry.sample;
                        vec![
                            row.entry.tb_device_id.clone(),
                            or_dash(row.device_name.as_deref()),
                            or_dash(row.address.as_deref()),
                            row.entry.log_time.format("%Y-%m-%d %H:%M:%S").to_string(),
                            fmt_value(sample.speed),
                            fmt_value(sample.position),
                        ]
                    })
                    .collect();
                output_rows(
                    &output_format,
                    &["ID", "NAME", "ADDRESS", "TIME", "SPEED", "POSITION"],
                    table,
                    json!(rows),
                )
            }
        }
        LogsCommands::Export {
            ids,
            from,
            to,
            format,
            out,
        } => {
            let payload = state
                .reports
                .download_selected(Some(&ids), Some(&from), Some(&to), Some(&format))
                .await?;
            tokio::fs::write(&out, &payload.bytes)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            output_success(
                &output_format,
                &format!("Wrote {} ({} bytes) to {}", payload.file_name, payload.bytes.len(), out.display()),
                Some(json!({ "file_name": payload.file_name, "path": out, "bytes": payload.bytes.len() })),
            )
        }
    };

    db.close().await;
    result
}

fn fmt_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
