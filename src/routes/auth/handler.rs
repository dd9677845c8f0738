use axum::{
    Json,
    extract::{Extension, Query, State},
    response::Redirect,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    cache::operations::{OidcStateOperations, PendingLogin},
    error::AppError,
    models::Session,
    result::ApiResponse,
    routes::user::User,
    utils::{generate_token, success_to_api_response},
};

use super::{
    client::{authorization_url, exchange_code, password_grant},
    model::{
        CallbackQuery, LoginRequest, LoginResponse, VidisLoginQuery, VidisProfile,
        decode_access_token, provider_error,
    },
};

fn issue_session(state: &AppState, user: &User) -> Result<LoginResponse, AppError> {
    let (token, expires_at) = generate_token(&user.session(), &state.config)?;
    Ok(LoginResponse {
        user_id: user.id,
        role: user.role,
        token,
        expires_at,
        redirect_to: user.role.dashboard_path(),
    })
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("Bitte E-Mail und Passwort angeben".into()));
    }

    let account_id = password_grant(&state.http, &state.config, email, &req.password).await?;
    let user = User::find_by_id(&state.pool, account_id)
        .await?
        .ok_or_else(|| AppError::InvalidCredentials("Unbekannte Rolle.".into()))?;

    tracing::info!("User {} logged in with password", user.id);
    Ok(success_to_api_response(issue_session(&state, &user)?))
}

/// Starts a VIDIS login: remembers a one-time `state` and sends the browser
/// to the identity provider.
#[axum::debug_handler]
pub async fn vidis_login(
    State(state): State<AppState>,
    Query(query): Query<VidisLoginQuery>,
) -> Result<Redirect, AppError> {
    let login_state = Uuid::new_v4().simple().to_string();
    let pending = PendingLogin {
        created_at: Utc::now().timestamp(),
        idp_hint: query.idp_hint(),
    };

    OidcStateOperations::store(&state.redis, &login_state, &pending).await?;

    let url = authorization_url(
        &state.config.vidis,
        &login_state,
        pending.idp_hint.as_deref(),
    )?;
    Ok(Redirect::to(url.as_str()))
}

#[axum::debug_handler]
pub async fn vidis_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    if let Some(error) = query.error.as_deref() {
        return Err(provider_error(error));
    }
    let code = query
        .code
        .as_deref()
        .ok_or_else(|| AppError::IdentityProvider("VIDIS Error: missing_code".into()))?;
    let login_state = query
        .state
        .as_deref()
        .ok_or_else(|| AppError::IdentityProvider("VIDIS Error: missing_state".into()))?;

    let pending = OidcStateOperations::take(&state.redis, login_state)
        .await?
        .ok_or_else(|| AppError::IdentityProvider("VIDIS Error: invalid_state".into()))?;

    let access_token = exchange_code(&state.http, &state.config.vidis, code).await?;
    let profile = VidisProfile::from(decode_access_token(&access_token)?);
    let user = profile.provision(&state.pool).await?;

    match pending.idp_hint.as_deref() {
        Some(hint) => tracing::info!("User {} logged in via VIDIS ({})", user.id, hint),
        None => tracing::info!("User {} logged in via VIDIS", user.id),
    }
    Ok(success_to_api_response(issue_session(&state, &user)?))
}

/// Reissues a session token; role and school are read fresh.
#[axum::debug_handler]
pub async fn refresh(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let user = User::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(success_to_api_response(issue_session(&state, &user)?))
}
