use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    export::CsvExport,
    models::{Role, Session},
    result::ApiResponse,
    routes::school::School,
    utils::success_to_api_response,
};

use super::model::{AttachToSchoolRequest, CreateLicenseRequest, License, SchoolLicense};

#[axum::debug_handler]
pub async fn create_license(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateLicenseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<License>>), AppError> {
    session.require_role(Role::Anbieter)?;
    let req = req.validate()?;

    let license = License::create(&state.pool, req, session.user_id).await?;
    Ok((StatusCode::CREATED, success_to_api_response(license)))
}

/// The provider's own licenses, latest expiry first.
#[axum::debug_handler]
pub async fn list_licenses(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<Vec<License>>>, AppError> {
    session.require_role(Role::Anbieter)?;

    let licenses = License::list_by_creator(&state.pool, session.user_id).await?;
    Ok(success_to_api_response(licenses))
}

#[axum::debug_handler]
pub async fn export_licenses(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<CsvExport, AppError> {
    session.require_role(Role::Anbieter)?;

    let licenses = License::list_by_creator(&state.pool, session.user_id).await?;
    CsvExport::from_rows("anbieter-lizenzen.csv", &licenses)
}

#[axum::debug_handler]
pub async fn attach_to_school(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(license_id): Path<Uuid>,
    Json(req): Json<AttachToSchoolRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SchoolLicense>>), AppError> {
    session.require_role(Role::Anbieter)?;
    req.validate()?;

    let license = License::find_by_id(&state.pool, license_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lizenz nicht gefunden".into()))?;
    if license.created_by != session.user_id {
        return Err(AppError::Forbidden);
    }

    School::find_by_id(&state.pool, req.school_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Schule nicht gefunden".into()))?;

    let school_license =
        SchoolLicense::attach(&state.pool, license.id, req.school_id, req.quantity).await?;
    Ok((StatusCode::CREATED, success_to_api_response(school_license)))
}
