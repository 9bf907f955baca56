use axum::extract::{Query, State};
use serde::Deserialize;

use crate::error::ApiError;
use crate::services::ExportPayload;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Comma-separated device ids
    pub ids: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    /// csv (default), xlsx or xls
    pub format: Option<String>,
}

/// GET /api/logs/download-selected - One file, or a ZIP for several devices
pub async fn selected(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<ExportPayload, ApiError> {
    let payload = state
        .reports
        .download_selected(
            query.ids.as_deref(),
            query.from.as_deref(),
            query.to.as_deref(),
            query.format.as_deref(),
        )
        .await?;
    Ok(payload)
}

/// GET /api/logs/download-all - Flat CSV of every device
pub async fn all(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<ExportPayload, ApiError> {
    let payload = state
        .reports
        .download_all(query.from.as_deref(), query.to.as_deref())
        .await?;
    Ok(payload)
}
