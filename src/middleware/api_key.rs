use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    routes::anbieter::AnbieterProfile,
    utils::{hash_api_key, is_well_formed_api_key},
};

/// A verified provider calling the external API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub provider_id: Uuid,
}

/// Accepts `Authorization: Bearer lc_...` keys of verified providers only.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::Unauthorized)?;

    let api_key = bearer.token();
    if !is_well_formed_api_key(api_key) {
        return Err(AppError::InvalidCredentials("Invalid API key".into()));
    }

    let profile = AnbieterProfile::find_verified_by_api_key(&state.pool, &hash_api_key(api_key))
        .await?
        .ok_or_else(|| AppError::InvalidCredentials("Invalid API key".into()))?;

    req.extensions_mut().insert(ApiClient {
        provider_id: profile.id,
    });

    Ok(next.run(req).await)
}
