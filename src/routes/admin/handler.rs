use axum::{
    Json,
    extract::{Extension, State},
};

use crate::{
    AppState,
    error::AppError,
    export::CsvExport,
    models::{Role, Session},
    result::ApiResponse,
    routes::{assignment::Assignment, license::License, school::School, user::User},
    utils::success_to_api_response,
};

use super::model::{AdminStats, AssignmentExportRow, LicenseExportRow, UserExportRow};

#[axum::debug_handler]
pub async fn stats(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<AdminStats>>, AppError> {
    session.require_role(Role::Admin)?;
    Ok(success_to_api_response(AdminStats::load(&state.pool).await?))
}

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<Vec<User>>>, AppError> {
    session.require_role(Role::Admin)?;
    Ok(success_to_api_response(User::list_all(&state.pool).await?))
}

#[axum::debug_handler]
pub async fn list_schools(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<Vec<School>>>, AppError> {
    session.require_role(Role::Admin)?;
    Ok(success_to_api_response(School::list_all(&state.pool).await?))
}

#[axum::debug_handler]
pub async fn list_licenses(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<Vec<License>>>, AppError> {
    session.require_role(Role::Admin)?;
    Ok(success_to_api_response(License::list_all(&state.pool).await?))
}

#[axum::debug_handler]
pub async fn export_assignments(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<CsvExport, AppError> {
    session.require_role(Role::Admin)?;

    let rows: Vec<AssignmentExportRow> = Assignment::list_all(&state.pool)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    CsvExport::from_rows("admin-zuweisungen.csv", &rows)
}

#[axum::debug_handler]
pub async fn export_users(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<CsvExport, AppError> {
    session.require_role(Role::Admin)?;

    let rows: Vec<UserExportRow> = User::list_all(&state.pool)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    CsvExport::from_rows("admin-nutzer.csv", &rows)
}

#[axum::debug_handler]
pub async fn export_licenses(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<CsvExport, AppError> {
    session.require_role(Role::Admin)?;

    let rows: Vec<LicenseExportRow> = License::list_all(&state.pool)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    CsvExport::from_rows("admin-lizenzen.csv", &rows)
}
