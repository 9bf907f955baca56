use std::sync::Arc;
use tracing::info;

use super::export::{self, DeviceExport, ExportFormat, ExportPayload};
use super::ServiceError;
use crate::database::models::LatestLogRow;
use crate::database::TelemetryStore;

/// Read side over the cached logs: latest values and file exports
pub struct ReportService {
    store: Arc<dyn TelemetryStore>,
    max_devices: usize,
}

impl ReportService {
    pub fn new(store: Arc<dyn TelemetryStore>, max_devices: usize) -> Self {
        Self { store, max_devices }
    }

    pub async fn latest(&self) -> Result<Vec<LatestLogRow>, ServiceError> {
        Ok(self.store.latest_per_device().await?)
    }

    pub async fn supervisor_latest(&self, supervisor_id: &str) -> Result<Vec<LatestLogRow>, ServiceError> {
        let supervisor_id = supervisor_id.trim();
        if supervisor_id.is_empty() {
            return Err(ServiceError::InvalidInput("Missing supervisor_id".to_string()));
        }
        Ok(self.store.latest_for_supervisor(supervisor_id).await?)
    }

    /// Export the selected devices' logs in `[from, to]`.
    ///
    /// One device comes back as its own file, several as a ZIP with one file each.
    /// Input is fully validated before anything is read.
    pub async fn download_selected(
        &self,
        ids: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
        format: Option<&str>,
    ) -> Result<ExportPayload, ServiceError> {
        let (Some(ids), Some(_), Some(_)) = (ids, from, to) else {
            return Err(ServiceError::InvalidInput("Missing ids, from, or to parameter".to_string()));
        };
        let device_ids = export::parse_device_ids(ids, self.max_devices)?;
        let range = export::parse_range(from, to)?;
        let format: ExportFormat = format.unwrap_or("csv").parse()?;

        let mut files = Vec::with_capacity(device_ids.len());
        for tb_device_id in device_ids {
            let rows = self.store.logs_in_range(&tb_device_id, &range).await?;
            let address = self
                .store
                .owner_address(&tb_device_id)
                .await?
                .unwrap_or_else(|| "-".to_string());
            let device = DeviceExport {
                tb_device_id,
                address,
                rows,
            };
            let bytes = export::render_device(&device, format, &range)?;
            files.push((device.file_name(format), bytes));
        }

        info!("Exporting {} device log files as {}", files.len(), format.extension());
        if files.len() == 1 {
            if let Some((file_name, bytes)) = files.pop() {
                return Ok(ExportPayload {
                    file_name,
                    content_type: format.content_type(),
                    bytes,
                });
            }
        }

        Ok(ExportPayload {
            file_name: "selected_logs.zip".to_string(),
            content_type: "application/zip",
            bytes: export::bundle_zip(&files)?,
        })
    }

    /// Every device's logs in `[from, to]` as one CSV, by device then time
    pub async fn download_all(&self, from: Option<&str>, to: Option<&str>) -> Result<ExportPayload, ServiceError> {
        let range = export::parse_range(from, to)?;
        let rows = self.store.all_logs_in_range(&range).await?;

        Ok(ExportPayload {
            file_name: "all_devices_logs.csv".to_string(),
            content_type: ExportFormat::Csv.content_type(),
            bytes: export::render_all_csv(&rows)?,
        })
    }
}
