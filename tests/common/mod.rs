#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use lizenzmanager::{
    AppState,
    config::{Config, Environment, VidisConfig},
    models::Role,
    router::create_router,
    routes::{
        anbieter::{AnbieterProfile, Decision, RegisterRequest},
        license::{CreateLicenseRequest, License, SchoolLicense},
        school::School,
        user::{NewUser, User},
    },
    utils::generate_token,
};
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;

pub const SSO_SECRET: &str = "sso-secret";

pub fn config() -> Config {
    Config {
        database_url: String::new(),
        redis_url: "redis://127.0.0.1/".into(),
        jwt_secret: "test-secret".into(),
        jwt_expiration_secs: 3600,
        rate_limit_window_secs: 60,
        rate_limit_requests: 100,
        server_host: "127.0.0.1".into(),
        server_port: 3000,
        api_base_uri: String::new(),
        environment: Environment::Development,
        public_base_url: "https://localhost:5173".into(),
        vidis: VidisConfig {
            issuer: "https://aai-test.vidis.schule/auth/realms/vidis".into(),
            client_id: "lc-kern-client".into(),
            client_secret: None,
            redirect_uri: "https://localhost:5173/auth/callback".into(),
            scope: "openid".into(),
        },
        auth_backend_url: "http://127.0.0.1:54321".into(),
        auth_backend_api_key: "anon".into(),
        sso_secret: SSO_SECRET.into(),
    }
}

pub fn app(pool: &PgPool) -> Router {
    let config = config();
    let redis = redis::Client::open(config.redis_url.clone()).unwrap();
    create_router(AppState {
        pool: pool.clone(),
        config,
        redis: Arc::new(redis),
        http: reqwest::Client::new(),
    })
}

/// Session token for `user` as issued at login.
pub fn bearer(user: &User) -> String {
    let (token, _) = generate_token(&user.session(), &config()).unwrap();
    format!("Bearer {}", token)
}

pub async fn send(pool: &PgPool, req: Request<Body>) -> Response<Body> {
    app(pool).oneshot(req).await.unwrap()
}

pub fn get(uri: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, authorization: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, authorization)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(resp: Response<Body>) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn school(pool: &PgPool, kennung: &str) -> School {
    School::find_or_create_by_external_id(pool, kennung, Some("DE-BY"))
        .await
        .unwrap()
}

pub async fn user(pool: &PgPool, email: &str, role: Role, school: Option<&School>) -> User {
    User::create(
        pool,
        NewUser {
            email: email.into(),
            name: None,
            role,
            school_id: school.map(|s| s.id),
            vidis_pseudonym: None,
        },
    )
    .await
    .unwrap()
}

pub async fn license(pool: &PgPool, provider: &User, valid_from: &str, valid_until: &str) -> License {
    let req: CreateLicenseRequest = serde_json::from_value(json!({
        "title": "Mathematik Klasse 9",
        "type": "klassenlizenz",
        "valid_from": valid_from,
        "valid_until": valid_until,
        "subject": "Mathematik",
    }))
    .unwrap();
    License::create(pool, req.validate().unwrap(), provider.id)
        .await
        .unwrap()
}

/// A user known to the external API by its VIDIS pseudonym.
pub async fn vidis_user(pool: &PgPool, pseudonym: &str, school: &School) -> User {
    User::create(
        pool,
        NewUser {
            email: format!("{}@vidis.local", pseudonym),
            name: None,
            role: Role::Lehrer,
            school_id: Some(school.id),
            vidis_pseudonym: Some(pseudonym.into()),
        },
    )
    .await
    .unwrap()
}

/// A verified provider account; returns the profile and its API key.
pub async fn verified_provider(pool: &PgPool, email: &str) -> (AnbieterProfile, String) {
    let owner = user(pool, email, Role::Lehrer, None).await;
    let registration: RegisterRequest = serde_json::from_value(json!({
        "company_name": "Lernmedien GmbH",
        "address": "Hauptstraße 1, 10115 Berlin",
        "contact_email": email,
        "specialization": "medien",
    }))
    .unwrap();
    let (profile, api_key) =
        AnbieterProfile::register(pool, owner.id, registration.validate().unwrap())
            .await
            .unwrap();
    let profile = AnbieterProfile::decide(pool, profile.id, &Decision::Verify)
        .await
        .unwrap();
    (profile, api_key)
}

pub async fn access_log(pool: &PgPool) -> Vec<(String, i32)> {
    sqlx::query_as("SELECT endpoint, response_status FROM api_access_logs ORDER BY id")
        .fetch_all(pool)
        .await
        .unwrap()
}

/// A school with `seats` seats of a currently valid license.
pub async fn seat_pool(pool: &PgPool, seats: i32) -> (School, SchoolLicense) {
    let school = school(pool, "DE-BY-0001").await;
    let provider = user(pool, "verlag@example.org", Role::Anbieter, None).await;
    let license = license(pool, &provider, "2000-01-01", "2099-12-31").await;
    let school_license = SchoolLicense::attach(pool, license.id, school.id, seats)
        .await
        .unwrap();
    (school, school_license)
}

pub async fn count_seats(pool: &PgPool, school_license: &SchoolLicense, assigned_to: Option<&str>) -> i64 {
    match assigned_to {
        Some(name) => sqlx::query_scalar(
            "SELECT COUNT(*) FROM assignments WHERE school_license_id = $1 AND assigned_to = $2",
        )
        .bind(school_license.id)
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap(),
        None => sqlx::query_scalar(
            "SELECT COUNT(*) FROM assignments WHERE school_license_id = $1 AND assigned_to IS NULL",
        )
        .bind(school_license.id)
        .fetch_one(pool)
        .await
        .unwrap(),
    }
}
