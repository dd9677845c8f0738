use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::{AppState, error::AppError, models::Session, utils::verify_token};

/// Validates the session token and puts the caller's `Session` into the
/// request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::Unauthorized)?;

    let claims = verify_token(bearer.token(), &state.config).map_err(|e| {
        tracing::debug!("rejected session token: {}", e);
        AppError::Unauthorized
    })?;

    let session = Session::try_from(claims)?;
    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}
