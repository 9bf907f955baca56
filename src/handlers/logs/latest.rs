use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::database::models::LatestLogRow;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SupervisorQuery {
    pub supervisor_id: Option<String>,
}

/// GET /api/logs/latest - Most recent log row of every device
pub async fn get(State(state): State<AppState>) -> Result<Json<Vec<LatestLogRow>>, ApiError> {
    Ok(Json(state.reports.latest().await?))
}

/// GET /api/logs/supervisor-latest?supervisor_id= - Latest rows for one supervisor's fleet
pub async fn supervisor(
    State(state): State<AppState>,
    Query(query): Query<SupervisorQuery>,
) -> Result<Json<Vec<LatestLogRow>>, ApiError> {
    let supervisor_id = query.supervisor_id.unwrap_or_default();
    Ok(Json(state.reports.supervisor_latest(&supervisor_id).await?))
}
