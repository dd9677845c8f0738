//! Validity checks and first-login provisioning against a real database.

mod common;

use axum::http::{StatusCode, header};
use chrono::Utc;
use lizenzmanager::{
    models::Role,
    routes::{
        assignment::{Assignment, AssignmentRequest},
        auth::{VidisClaims, VidisProfile},
        external::LicenseCheck,
        license::SchoolLicense,
    },
    utils::verify_sso_signature,
};
use reqwest::Url;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn future_license_is_not_valid_even_with_a_seat(pool: PgPool) {
    let school = common::school(&pool, "DE-NW-42").await;
    let provider = common::user(&pool, "verlag@example.org", Role::Anbieter, None).await;
    let license = common::license(&pool, &provider, "2098-08-01", "2099-07-31").await;
    let school_license = SchoolLicense::attach(&pool, license.id, school.id, 2)
        .await
        .unwrap();

    let lehrkraft = VidisProfile::from(VidisClaims {
        sub: "lehrkraft-1".into(),
        rolle: Some("LEHR".into()),
        schulkennung: Some("DE-NW-42".into()),
        ..Default::default()
    })
    .provision(&pool)
    .await
    .unwrap();
    let pseudonym = lehrkraft.vidis_pseudonym.clone().unwrap();

    Assignment::claim(
        &pool,
        school_license.id,
        &AssignmentRequest {
            name: pseudonym.clone(),
            count: 1,
        },
    )
    .await
    .unwrap();

    let check = LicenseCheck::run(&pool, &pseudonym, license.id, Utc::now().date_naive())
        .await
        .unwrap();
    assert!(matches!(check, LicenseCheck::NotCurrentlyValid));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn valid_license_reports_the_users_seat(pool: PgPool) {
    let (school, school_license) = common::seat_pool(&pool, 2).await;
    let external_id = school.external_id.clone().unwrap();

    let profile = VidisProfile::from(VidisClaims {
        sub: "abc".into(),
        schulkennung: Some(external_id),
        ..Default::default()
    });
    let user = profile.provision(&pool).await.unwrap();
    assert_eq!(user.school_id, Some(school.id));

    let check = LicenseCheck::run(&pool, "pseudo-abc", school_license.license_id, Utc::now().date_naive())
        .await
        .unwrap();
    match check {
        LicenseCheck::Granted { assignment, .. } => {
            let seat = assignment.unwrap();
            assert_eq!(seat.assigned_to, None);
        }
        other => panic!("expected a granted check, got {:?}", other),
    }

    let unknown = LicenseCheck::run(&pool, "pseudo-nobody", school_license.license_id, Utc::now().date_naive())
        .await
        .unwrap();
    assert!(matches!(unknown, LicenseCheck::UserNotFound));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn repeated_vidis_login_reuses_user_and_school(pool: PgPool) {
    let claims = VidisClaims {
        sub: "f:99/x".into(),
        rolle: Some("LEIT".into()),
        schulkennung: Some("DE-HE-7".into()),
        bundesland: Some("DE-HE".into()),
        ..Default::default()
    };

    let first = VidisProfile::from(claims.clone()).provision(&pool).await.unwrap();
    let second = VidisProfile::from(claims).provision(&pool).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.role, Role::Schulleiter);
    assert_eq!(first.email, "f:99/x@vidis.local");
    assert_eq!(first.vidis_pseudonym.as_deref(), Some("pseudo-f-99-x"));

    let schools: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schools WHERE external_id = 'DE-HE-7'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(schools, 1);

    let location: Option<String> =
        sqlx::query_scalar("SELECT location FROM schools WHERE external_id = 'DE-HE-7'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(location.as_deref(), Some("DE-HE"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn sso_redirect_hands_off_a_signed_link(pool: PgPool) {
    let (school, school_license) = common::seat_pool(&pool, 1).await;
    common::vidis_user(&pool, "pseudo-lena", &school).await;
    let (_, api_key) = common::verified_provider(&pool, "sso@lernmedien.example").await;

    let uri = format!(
        "/api/sso/redirect?license_id={}&user=pseudo-lena&return_url=https://inhalte.example.org/start",
        school_license.license_id
    );
    let resp = common::send(&pool, common::get(&uri, &format!("Bearer {}", api_key))).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let location = resp.headers()[header::LOCATION].to_str().unwrap();
    let url = Url::parse(location).unwrap();
    assert_eq!(url.host_str(), Some("inhalte.example.org"));
    assert_eq!(url.path(), "/start");

    let param = |key: &str| {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .unwrap()
    };
    let license_id = param("license_id");
    let timestamp: i64 = param("timestamp").parse().unwrap();
    assert_eq!(license_id, school_license.license_id.to_string());
    assert_eq!(param("user"), "pseudo-lena");
    assert!((Utc::now().timestamp_millis() - timestamp).abs() < 60_000);
    assert!(verify_sso_signature(
        common::SSO_SECRET,
        &license_id,
        "pseudo-lena",
        timestamp,
        &param("signature"),
    ));

    assert_eq!(
        common::access_log(&pool).await,
        vec![("/api/sso/redirect".to_string(), 302)]
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn sso_redirect_refuses_an_expired_license(pool: PgPool) {
    let school = common::school(&pool, "DE-SN-5").await;
    let provider = common::user(&pool, "verlag@example.org", Role::Anbieter, None).await;
    let license = common::license(&pool, &provider, "2020-08-01", "2021-07-31").await;
    SchoolLicense::attach(&pool, license.id, school.id, 1)
        .await
        .unwrap();
    common::vidis_user(&pool, "pseudo-tom", &school).await;
    let (_, api_key) = common::verified_provider(&pool, "sso@lernmedien.example").await;

    let uri = format!("/api/sso/redirect?license_id={}&user=pseudo-tom", license.id);
    let resp = common::send(&pool, common::get(&uri, &format!("Bearer {}", api_key))).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(resp.headers().get(header::LOCATION).is_none());

    let body = common::json_body(resp).await;
    assert_eq!(body["has_license"], false);
    assert_eq!(body["message"], "License expired or not yet valid");

    assert_eq!(
        common::access_log(&pool).await,
        vec![("/api/sso/redirect".to_string(), 403)]
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn license_check_is_logged_per_call(pool: PgPool) {
    let (school, school_license) = common::seat_pool(&pool, 1).await;
    common::vidis_user(&pool, "pseudo-ida", &school).await;
    let (provider, api_key) = common::verified_provider(&pool, "check@lernmedien.example").await;
    let auth = format!("Bearer {}", api_key);

    let uri = format!(
        "/api/licenses/check?user=pseudo-ida&license={}",
        school_license.license_id
    );
    let resp = common::send(&pool, common::get(&uri, &auth)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(common::json_body(resp).await["has_license"], true);

    let uri = format!(
        "/api/licenses/check?user=pseudo-unbekannt&license={}",
        school_license.license_id
    );
    let resp = common::send(&pool, common::get(&uri, &auth)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    assert_eq!(
        common::access_log(&pool).await,
        vec![
            ("/api/licenses/check".to_string(), 200),
            ("/api/licenses/check".to_string(), 404),
        ]
    );
    let logged_for: Vec<uuid::Uuid> =
        sqlx::query_scalar("SELECT provider_id FROM api_access_logs")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert!(logged_for.iter().all(|id| *id == provider.id));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn failed_access_logging_does_not_fail_the_request(pool: PgPool) {
    let (school, school_license) = common::seat_pool(&pool, 1).await;
    common::vidis_user(&pool, "pseudo-ida", &school).await;
    let (_, api_key) = common::verified_provider(&pool, "check@lernmedien.example").await;

    sqlx::query("DROP TABLE api_access_logs")
        .execute(&pool)
        .await
        .unwrap();

    let uri = format!(
        "/api/licenses/check?user=pseudo-ida&license={}",
        school_license.license_id
    );
    let resp = common::send(&pool, common::get(&uri, &format!("Bearer {}", api_key))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(common::json_body(resp).await["has_license"], true);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn only_the_creator_attaches_a_license(pool: PgPool) {
    let school = common::school(&pool, "DE-BW-3").await;
    let creator = common::user(&pool, "autor@verlag.example", Role::Anbieter, None).await;
    let stranger = common::user(&pool, "fremd@verlag.example", Role::Anbieter, None).await;
    let license = common::license(&pool, &creator, "2000-01-01", "2099-12-31").await;

    let uri = format!("/anbieter/licenses/{}/schools", license.id);
    let body = json!({ "school_id": school.id, "quantity": 4 });

    let resp = common::send(
        &pool,
        common::post_json(&uri, &common::bearer(&stranger), body.clone()),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let attached: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM school_licenses")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(attached, 0);

    let resp = common::send(&pool, common::post_json(&uri, &common::bearer(&creator), body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = common::json_body(resp).await;
    assert_eq!(body["resp_data"]["quantity"], 4);
    let seats: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assignments")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(seats, 4);
}
