use axum::{
    body::{Body, to_bytes},
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use tracing::error;

/// Upper bound of an error body copied into the log.
const LOGGED_BODY_LIMIT: usize = 4096;

/// Logs method, path, status and body of every 5xx response.
pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;

    if !response.status().is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, LOGGED_BODY_LIMIT).await {
        Ok(b) => b,
        Err(e) => {
            error!("{} {} failed with {}; body unreadable: {}", method, path, parts.status, e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    error!(
        "{} {} failed with {}: {}",
        method,
        path,
        parts.status,
        String::from_utf8_lossy(&bytes)
    );

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}
