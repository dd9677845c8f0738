use axum::{
    Json,
    extract::{Extension, State},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    models::{Role, Session},
    result::ApiResponse,
    utils::success_to_api_response,
};

use super::model::School;

#[derive(Debug, Serialize)]
pub struct SchoolOption {
    pub id: Uuid,
    pub name: String,
}

/// Schools a provider can attach a license to.
#[axum::debug_handler]
pub async fn list_schools(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<Vec<SchoolOption>>>, AppError> {
    session.require_any(&[Role::Anbieter, Role::Admin])?;

    let schools = School::list_all(&state.pool)
        .await?
        .into_iter()
        .map(|s| SchoolOption {
            id: s.id,
            name: s.name,
        })
        .collect();

    Ok(success_to_api_response(schools))
}
