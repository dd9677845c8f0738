use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::{
    AppState,
    middleware::{api_key_middleware, auth_middleware},
    routes::{admin, anbieter, assignment, auth, external, license, school, user},
};

/// Login endpoints; no session needed.
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/vidis/login", get(auth::vidis_login))
        .route("/auth/callback", get(auth::vidis_callback))
}

/// Dashboard endpoints behind the session token.
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users/me", get(user::me))
        .route("/auth/refresh", post(auth::refresh))
        .route("/schools", get(school::list_schools))
        // provider
        .route(
            "/anbieter/licenses",
            post(license::create_license).get(license::list_licenses),
        )
        .route("/anbieter/licenses/export", get(license::export_licenses))
        .route(
            "/anbieter/licenses/{license_id}/schools",
            post(license::attach_to_school),
        )
        .route("/api/anbieter/register", post(anbieter::register))
        // school
        .route("/schule/licenses", get(assignment::list_school_licenses))
        .route(
            "/schule/licenses/{school_license_id}/assign",
            post(assignment::assign_seats),
        )
        .route("/schule/statistics", get(assignment::school_statistics))
        .route("/schule/export", get(assignment::export_assignments))
        // admin
        .route("/admin/stats", get(admin::stats))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/schools", get(admin::list_schools))
        .route("/admin/licenses", get(admin::list_licenses))
        .route("/admin/export/assignments", get(admin::export_assignments))
        .route("/admin/export/users", get(admin::export_users))
        .route("/admin/export/licenses", get(admin::export_licenses))
        .route("/admin/anbieter", get(anbieter::list_providers))
        .route(
            "/admin/anbieter/{provider_id}/verify",
            post(anbieter::verify_provider),
        )
        .route(
            "/admin/anbieter/{provider_id}/reject",
            post(anbieter::reject_provider),
        )
        .layer(from_fn_with_state(state, auth_middleware))
}

/// The external API for content providers, behind their API key.
fn external_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/licenses/check", get(external::check_license))
        .route(
            "/api/licenses/user/{pseudonym}",
            get(external::user_licenses),
        )
        .route("/api/sso/redirect", get(external::sso_redirect))
        .layer(from_fn_with_state(state, api_key_middleware))
}

pub fn create_router(state: AppState) -> Router {
    let routes = Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(external_routes(state.clone()));

    let base = state.config.api_base_uri.trim_end_matches('/').to_string();
    let router = if base.is_empty() {
        routes
    } else {
        Router::new().nest(&base, routes)
    };

    router.with_state(state)
}
