use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use reqwest::Url;

use crate::{AppState, error::AppError, middleware::ApiClient, utils::sso_signature};

use super::model::{
    CheckQuery, LicenseCheck, LicenseCheckResponse, SsoQuery, UserLicensesResponse, record_access,
};

#[axum::debug_handler]
pub async fn check_license(
    State(state): State<AppState>,
    Extension(client): Extension<ApiClient>,
    Query(query): Query<CheckQuery>,
) -> Result<(StatusCode, Json<LicenseCheckResponse>), AppError> {
    let today = Utc::now().date_naive();
    let check = LicenseCheck::run(&state.pool, &query.user, query.license, today).await?;

    let status = match check {
        LicenseCheck::UserNotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::OK,
    };
    record_access(
        &state.pool,
        "/api/licenses/check",
        client.provider_id,
        status.as_u16(),
    )
    .await;

    Ok((status, Json(check.into())))
}

#[axum::debug_handler]
pub async fn user_licenses(
    State(state): State<AppState>,
    Extension(client): Extension<ApiClient>,
    Path(pseudonym): Path<String>,
) -> Result<(StatusCode, Json<UserLicensesResponse>), AppError> {
    let today = Utc::now().date_naive();
    let response = UserLicensesResponse::load(&state.pool, &pseudonym, today).await?;

    let status = match response {
        UserLicensesResponse::Failure { .. } => StatusCode::NOT_FOUND,
        UserLicensesResponse::Found { .. } => StatusCode::OK,
    };
    record_access(
        &state.pool,
        "/api/licenses/user",
        client.provider_id,
        status.as_u16(),
    )
    .await;

    Ok((status, Json(response)))
}

/// Sends a licensed user on to the content with a signed hand-off.
#[axum::debug_handler]
pub async fn sso_redirect(
    State(state): State<AppState>,
    Extension(client): Extension<ApiClient>,
    Query(query): Query<SsoQuery>,
) -> Result<Response, AppError> {
    let today = Utc::now().date_naive();
    let check = LicenseCheck::run(&state.pool, &query.user, query.license_id, today).await?;

    if !check.is_granted() {
        record_access(
            &state.pool,
            "/api/sso/redirect",
            client.provider_id,
            StatusCode::FORBIDDEN.as_u16(),
        )
        .await;
        return Ok((StatusCode::FORBIDDEN, Json(LicenseCheckResponse::from(check))).into_response());
    }

    let target = query
        .return_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(&state.config.public_base_url);
    let mut url = Url::parse(target)
        .map_err(|_| AppError::Validation("Ungültige return_url".into()))?;

    let license_id = query.license_id.to_string();
    let timestamp = Utc::now().timestamp_millis();
    let signature = sso_signature(&state.config.sso_secret, &license_id, &query.user, timestamp);
    url.query_pairs_mut()
        .append_pair("license_id", &license_id)
        .append_pair("user", &query.user)
        .append_pair("timestamp", &timestamp.to_string())
        .append_pair("signature", &signature);

    record_access(
        &state.pool,
        "/api/sso/redirect",
        client.provider_id,
        StatusCode::FOUND.as_u16(),
    )
    .await;

    Ok((StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response())
}
