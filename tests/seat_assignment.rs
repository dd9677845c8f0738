//! Seat pools against a real database. Needs `DATABASE_URL` pointing at a
//! Postgres server; run with `cargo test -- --ignored`.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use lizenzmanager::{
    error::AppError,
    models::Role,
    routes::assignment::{Assignment, AssignmentRequest},
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn attaching_creates_exactly_quantity_free_seats(pool: PgPool) {
    let (_, school_license) = common::seat_pool(&pool, 7).await;

    assert_eq!(school_license.quantity, 7);
    assert_eq!(common::count_seats(&pool, &school_license, None).await, 7);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn claim_assigns_the_requested_seats(pool: PgPool) {
    let (_, school_license) = common::seat_pool(&pool, 5).await;

    let outcome = Assignment::claim(
        &pool,
        school_license.id,
        &AssignmentRequest::parse("9a x 3").unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.claimed, 3);
    assert_eq!(common::count_seats(&pool, &school_license, Some("9a")).await, 3);
    assert_eq!(common::count_seats(&pool, &school_license, None).await, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn short_pool_fails_and_changes_nothing(pool: PgPool) {
    let (_, school_license) = common::seat_pool(&pool, 3).await;

    Assignment::claim(
        &pool,
        school_license.id,
        &AssignmentRequest::parse("9a x 2").unwrap(),
    )
    .await
    .unwrap();

    let err = Assignment::claim(
        &pool,
        school_license.id,
        &AssignmentRequest::parse("9b x 2").unwrap(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        AppError::InsufficientSeats {
            requested: 2,
            available: 1
        }
    ));
    assert_eq!(err.to_string(), "Nur 1 freie Plätze verfügbar.");
    assert_eq!(common::count_seats(&pool, &school_license, Some("9b")).await, 0);
    assert_eq!(common::count_seats(&pool, &school_license, None).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn concurrent_claims_never_overallocate(pool: PgPool) {
    let (_, school_license) = common::seat_pool(&pool, 5).await;

    let mut tasks = Vec::new();
    for i in 0..10 {
        let pool = pool.clone();
        let id = school_license.id;
        tasks.push(tokio::spawn(async move {
            let request = AssignmentRequest {
                name: format!("Lehrkraft {}", i),
                count: 1,
            };
            Assignment::claim(&pool, id, &request).await
        }));
    }

    let mut granted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(outcome) => granted += outcome.claimed,
            Err(AppError::InsufficientSeats { .. }) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    let taken: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM assignments WHERE school_license_id = $1 AND assigned_to IS NOT NULL",
    )
    .bind(school_license.id)
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(granted, taken);
    assert_eq!(taken, 5);
    assert_eq!(common::count_seats(&pool, &school_license, None).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn claim_waits_for_a_competing_claim_instead_of_undercounting(pool: PgPool) {
    let (_, school_license) = common::seat_pool(&pool, 3).await;

    // a claim for more seats than exist, still holding its locks
    let mut competing = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM school_licenses WHERE id = $1 FOR UPDATE")
        .bind(school_license.id)
        .execute(&mut *competing)
        .await
        .unwrap();
    sqlx::query(
        "SELECT id FROM assignments WHERE school_license_id = $1 AND assigned_to IS NULL LIMIT 5 FOR UPDATE",
    )
    .bind(school_license.id)
    .execute(&mut *competing)
    .await
    .unwrap();

    let claim = {
        let pool = pool.clone();
        let id = school_license.id;
        tokio::spawn(async move {
            let request = AssignmentRequest {
                name: "Frau Müller".into(),
                count: 1,
            };
            Assignment::claim(&pool, id, &request).await
        })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!claim.is_finished());

    competing.rollback().await.unwrap();

    let outcome = claim.await.unwrap().unwrap();
    assert_eq!(outcome.claimed, 1);
    assert_eq!(
        common::count_seats(&pool, &school_license, Some("Frau Müller")).await,
        1
    );
    assert_eq!(common::count_seats(&pool, &school_license, None).await, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn shortage_reports_the_seats_actually_free(pool: PgPool) {
    let (_, school_license) = common::seat_pool(&pool, 3).await;

    let claims: Vec<_> = ["9a x 5", "Frau Müller"]
        .into_iter()
        .map(|input| {
            let pool = pool.clone();
            let id = school_license.id;
            let request = AssignmentRequest::parse(input).unwrap();
            tokio::spawn(async move { Assignment::claim(&pool, id, &request).await })
        })
        .collect();

    let mut results = Vec::new();
    for claim in claims {
        results.push(claim.await.unwrap());
    }

    assert!(matches!(
        results[0],
        Err(AppError::InsufficientSeats {
            requested: 5,
            available
        }) if available == 3 || available == 2
    ));
    assert_eq!(results[1].as_ref().map(|o| o.claimed).ok(), Some(1));
    assert_eq!(common::count_seats(&pool, &school_license, None).await, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn schulleiter_of_another_school_cannot_claim(pool: PgPool) {
    let (school, school_license) = common::seat_pool(&pool, 2).await;
    let other_school = common::school(&pool, "DE-BY-0002").await;
    let own = common::user(&pool, "leitung@schule-1.example", Role::Schulleiter, Some(&school)).await;
    let other =
        common::user(&pool, "leitung@schule-2.example", Role::Schulleiter, Some(&other_school)).await;
    let uri = format!("/schule/licenses/{}/assign", school_license.id);

    let resp = common::send(
        &pool,
        common::post_json(&uri, &common::bearer(&other), json!({ "input": "9a x 1" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(common::count_seats(&pool, &school_license, None).await, 2);

    let resp = common::send(
        &pool,
        common::post_json(&uri, &common::bearer(&own), json!({ "input": "9a x 1" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = common::json_body(resp).await;
    assert_eq!(body["resp_data"]["assigned"], 1);
    assert_eq!(body["resp_data"]["message"], "1 Lizenz(en) an \"9a\" zugewiesen.");
    assert_eq!(common::count_seats(&pool, &school_license, Some("9a")).await, 1);
}
