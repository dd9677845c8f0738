use axum::{
    Json,
    extract::{Extension, State},
};

use crate::{
    AppState,
    error::AppError,
    models::Session,
    result::ApiResponse,
    utils::success_to_api_response,
};

use super::model::{MeResponse, User};

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<MeResponse>>, AppError> {
    let user = User::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Nutzer nicht gefunden".into()))?;

    Ok(success_to_api_response(MeResponse {
        redirect_to: user.role.dashboard_path(),
        user,
    }))
}
