use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::state::{self, AppState};

/// Load config from the environment and connect everything a command needs
pub async fn connect() -> anyhow::Result<(DatabaseManager, AppState)> {
    let config = AppConfig::from_env();
    state::bootstrap(&config).await
}

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    collection_name: []
                }))?
            );
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Print rows as aligned columns, or the raw JSON array
pub fn output_rows(output_format: &OutputFormat, headers: &[&str], rows: Vec<Vec<String>>, json_rows: Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_rows)?);
        }
        OutputFormat::Text => {
            print!("{}", format_table(headers, &rows));
        }
    }
    Ok(())
}

pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let render = |cells: Vec<&str>| -> String {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        format!("{}\n", line.join("  ").trim_end())
    };

    let mut out = render(headers.to_vec());
    for row in rows {
        out.push_str(&render(row.iter().map(String::as_str).collect()));
    }
    out
}

pub fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_columns_align() {
        let rows = vec![
            vec!["dev-1".to_string(), "Lift-A".to_string()],
            vec!["device-long".to_string(), "B".to_string()],
        ];
        let table = format_table(&["ID", "NAME"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "ID           NAME");
        assert_eq!(lines[1], "dev-1        Lift-A");
        assert_eq!(lines[2], "device-long  B");
    }

    #[test]
    fn missing_values_render_as_dash() {
        assert_eq!(or_dash(None), "-");
        assert_eq!(or_dash(Some("x")), "x");
    }
}
