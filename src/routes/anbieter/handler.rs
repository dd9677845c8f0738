use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    models::{Role, Session, VerificationStatus},
    result::ApiResponse,
    utils::{generate_token, success_to_api_response},
};

use super::model::{AnbieterProfile, Decision, ProviderListing, RegisterRequest};

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub provider_id: Uuid,
    /// Shown once; only its digest is kept.
    pub api_key: String,
    pub verification_status: VerificationStatus,
    /// Session token carrying the new provider role.
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProviderQueues {
    pub pending: Vec<ProviderListing>,
    pub processed: Vec<ProviderListing>,
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    // An admin account would lose its role to the provider one.
    if session.role == Role::Admin {
        return Err(AppError::Forbidden);
    }
    let provider = req.validate()?;

    let (profile, api_key) =
        AnbieterProfile::register(&state.pool, session.user_id, provider).await?;
    let (token, expires_at) = generate_token(
        &Session {
            role: Role::Anbieter,
            ..session
        },
        &state.config,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Provider registration submitted successfully",
            provider_id: profile.id,
            api_key,
            verification_status: profile.verification_status,
            token,
            expires_at,
        }),
    ))
}

#[axum::debug_handler]
pub async fn list_providers(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<ProviderQueues>>, AppError> {
    session.require_role(Role::Admin)?;

    let (pending, processed) = futures_util::try_join!(
        AnbieterProfile::list_pending(&state.pool),
        AnbieterProfile::list_processed(&state.pool),
    )?;
    Ok(success_to_api_response(ProviderQueues { pending, processed }))
}

#[axum::debug_handler]
pub async fn verify_provider(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<ApiResponse<AnbieterProfile>>, AppError> {
    session.require_role(Role::Admin)?;

    let profile = AnbieterProfile::decide(&state.pool, provider_id, &Decision::Verify).await?;
    Ok(success_to_api_response(profile))
}

#[axum::debug_handler]
pub async fn reject_provider(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(provider_id): Path<Uuid>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<ApiResponse<AnbieterProfile>>, AppError> {
    session.require_role(Role::Admin)?;
    let decision = Decision::reject(req.reason)?;

    let profile = AnbieterProfile::decide(&state.pool, provider_id, &decision).await?;
    Ok(success_to_api_response(profile))
}
