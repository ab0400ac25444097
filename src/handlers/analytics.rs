use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use std::sync::Arc;
use crate::analytics::generate_pet_report;
use crate::error::ApiError;
use crate::models::AnalyticsReport;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub owner_id: u32,
}

// GET /api/analytics
pub async fn analytics_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsReport>, ApiError> {
    let report = state.analytics.analyze_all().await?;
    Ok(Json(report))
}

// GET /api/pets/{pet_id}/report?ownerId=
pub async fn pet_report_handler(
    State(state): State<Arc<AppState>>,
    Path(pet_id): Path<u32>,
    Query(query): Query<ReportQuery>,
) -> Result<String, ApiError> {
    let owner = state
        .repository
        .find_by_id(query.owner_id)?
        .ok_or(ApiError::NotFound("owner"))?;

    let pet = owner.pet(pet_id).ok_or(ApiError::NotFound("pet"))?;

    Ok(generate_pet_report(pet))
}
