use axum::{
    Json,
    extract::{Extension, Path, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    export::CsvExport,
    models::{Role, Session},
    result::ApiResponse,
    routes::license::SchoolLicense,
    utils::success_to_api_response,
};

use super::model::{
    Assignment, AssignmentRequest, DistributionEntry, SchoolLicenseOverview, distribution,
    export_rows,
};

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub input: String,
}

#[derive(Debug, Serialize)]
pub struct AssignResponse {
    pub assigned: i64,
    pub name: String,
    pub message: String,
}

/// Licenses of the caller's school with their seats.
#[axum::debug_handler]
pub async fn list_school_licenses(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<Vec<SchoolLicenseOverview>>>, AppError> {
    session.require_role(Role::Schulleiter)?;
    let school_id = session.school()?;

    let overviews = SchoolLicenseOverview::list_for_school(&state.pool, school_id).await?;
    Ok(success_to_api_response(overviews))
}

#[axum::debug_handler]
pub async fn school_statistics(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<Vec<DistributionEntry>>>, AppError> {
    session.require_role(Role::Schulleiter)?;
    let school_id = session.school()?;

    let overviews = SchoolLicenseOverview::list_for_school(&state.pool, school_id).await?;
    Ok(success_to_api_response(distribution(&overviews)))
}

#[axum::debug_handler]
pub async fn assign_seats(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(school_license_id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<ApiResponse<AssignResponse>>, AppError> {
    session.require_role(Role::Schulleiter)?;
    let school_id = session.school()?;
    let request = AssignmentRequest::parse(&req.input)?;

    let school_license = SchoolLicense::find_by_id(&state.pool, school_license_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lizenz nicht gefunden".into()))?;
    if school_license.school_id != school_id {
        return Err(AppError::Forbidden);
    }

    let outcome = Assignment::claim(&state.pool, school_license.id, &request).await?;
    Ok(success_to_api_response(AssignResponse {
        message: format!(
            "{} Lizenz(en) an \"{}\" zugewiesen.",
            outcome.claimed, outcome.name
        ),
        assigned: outcome.claimed,
        name: outcome.name,
    }))
}

#[axum::debug_handler]
pub async fn export_assignments(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<CsvExport, AppError> {
    session.require_role(Role::Schulleiter)?;
    let school_id = session.school()?;

    let overviews = SchoolLicenseOverview::list_for_school(&state.pool, school_id).await?;
    CsvExport::from_rows("schulleiter-lizenzen.csv", &export_rows(&overviews))
}
