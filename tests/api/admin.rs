use chrono::{Days, NaiveDate, Utc};

use reqwest::StatusCode;

use sqlx::PgPool;

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use enrollment_service::repo::EnrollmentRepo;

use crate::helpers::{seed_enrollment, TestApp, TestUser};

#[sqlx::test(migrations = "./migrations")]
async fn admin_endpoints_reject_regular_users(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::register(&pool, "alice", "password", false).await;

    let res = app
        .admin_statistics(Some(&user.credentials()))
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = app
        .admin_list_all(None)
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn statistics_report_service_wide_aggregates(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let admin = TestUser::register(&pool, "admin", "password", true).await;

    let due = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    seed_enrollment(&pool, "alice", 1, "10.00", due).await;
    seed_enrollment(&pool, "bob", 1, "20.00", due).await;
    let cancelled = seed_enrollment(&pool, "bob", 2, "5.00", due).await;
    EnrollmentRepo::deactivate(&pool, cancelled.id, "bob").await?;

    let res = app
        .admin_statistics(Some(&admin.credentials()))
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, res.status());

    let body: serde_json::Value = res.json().await.unwrap();
    let stats = &body["statistics"];
    assert_eq!(stats["activeSubscriptions"], 2);
    assert_eq!(stats["inactiveSubscriptions"], 1);
    assert_eq!(stats["totalSubscriptions"], 3);
    assert_eq!(stats["totalMonthlyRevenue"], "30.00");
    assert_eq!(stats["activeUsers"], 2);
    assert_eq!(stats["averageRevenuePerUser"], "15.00");

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn statistics_with_no_enrollments_are_all_zero(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let admin = TestUser::register(&pool, "admin", "password", true).await;

    let res = app
        .admin_statistics(Some(&admin.credentials()))
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, res.status());

    let body: serde_json::Value = res.json().await.unwrap();
    let stats = &body["statistics"];
    assert_eq!(stats["activeSubscriptions"], 0);
    assert_eq!(stats["totalMonthlyRevenue"], "0");
    assert_eq!(stats["averageRevenuePerUser"], "0");

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn list_all_includes_cancelled_enrollments(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let admin = TestUser::register(&pool, "admin", "password", true).await;

    app.mock_plan(1, "Streaming Basic", "9.99").await;
    app.mock_plan(2, "Cloud Storage", "4.99").await;

    let due = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    seed_enrollment(&pool, "alice", 1, "9.99", due).await;
    seed_enrollment(&pool, "bob", 1, "9.99", due).await;
    let cancelled = seed_enrollment(&pool, "bob", 2, "4.99", due).await;
    EnrollmentRepo::deactivate(&pool, cancelled.id, "bob").await?;

    let res = app
        .admin_list_all(Some(&admin.credentials()))
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, res.status());

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["count"], 3);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn list_for_user_is_scoped_and_active_only(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let admin = TestUser::register(&pool, "admin", "password", true).await;

    app.mock_plan(1, "Streaming Basic", "9.99").await;
    app.mock_plan(2, "Cloud Storage", "4.99").await;

    let due = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    seed_enrollment(&pool, "alice", 1, "9.99", due).await;
    seed_enrollment(&pool, "bob", 2, "4.99", due).await;
    let cancelled = seed_enrollment(&pool, "alice", 2, "4.99", due).await;
    EnrollmentRepo::deactivate(&pool, cancelled.id, "alice").await?;

    let res = app
        .admin_list_for_user(Some(&admin.credentials()), "alice")
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, res.status());

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["count"], 1);
    assert_eq!(body["subscriptions"][0]["planName"], "Streaming Basic");

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn admin_trigger_names_the_failing_enrollment(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let admin = TestUser::register(&pool, "admin", "password", true).await;

    // alice and bob resolve in the directory; ghost gets a 404
    app.mock_user("alice", "alice@test.com").await;
    app.mock_user("bob", "bob@test.com").await;
    app.mock_plan(1, "Streaming Basic", "9.99").await;
    app.mock_plan(2, "Cloud Storage", "4.99").await;
    app.mock_plan(3, "Music", "2.99").await;

    let due = Utc::now().date_naive() + Days::new(2);
    seed_enrollment(&pool, "alice", 1, "9.99", due).await;
    let ghost = seed_enrollment(&pool, "ghost", 2, "4.99", due).await;
    seed_enrollment(&pool, "bob", 3, "2.99", due).await;

    Mock::given(path("/api/email/subscription-reminder"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&app.email_server)
        .await;

    let res = app
        .admin_send_reminders(Some(&admin.credentials()))
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, res.status());

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["result"]["attempted"], 3);
    assert_eq!(body["result"]["succeeded"], 2);

    let failures = body["result"]["failures"].as_array().unwrap();
    assert_eq!(1, failures.len());
    assert_eq!(failures[0]["enrollmentId"], ghost.id.to_string());
    assert!(!failures[0]["reason"].as_str().unwrap().is_empty());

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn admin_trigger_returns_the_full_batch_result(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let admin = TestUser::register(&pool, "admin", "password", true).await;

    app.mock_user("alice", "alice@test.com").await;
    app.mock_plan(1, "Streaming Basic", "9.99").await;

    let due = Utc::now().date_naive() + Days::new(2);
    seed_enrollment(&pool, "alice", 1, "9.99", due).await;

    Mock::given(path("/api/email/subscription-reminder"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let res = app
        .admin_send_reminders(Some(&admin.credentials()))
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, res.status());

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["attempted"], 1);
    assert_eq!(body["result"]["succeeded"], 1);
    assert!(body["result"]["failures"].as_array().unwrap().is_empty());

    Ok(())
}
