use chrono::{Days, Utc};

use reqwest::StatusCode;

use sqlx::PgPool;

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{seed_enrollment, TestApp};

const REMINDER_PATH: &str = "/api/email/subscription-reminder";

#[sqlx::test(migrations = "./migrations")]
async fn reminders_cover_the_next_three_days_inclusive(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    app.mock_user("alice", "alice@test.com").await;
    for plan_id in 1..=4 {
        app.mock_plan(plan_id, "Streaming Basic", "9.99").await;
    }

    // Due today and due in four days fall outside the window
    let today = Utc::now().date_naive();
    seed_enrollment(&pool, "alice", 1, "9.99", today).await;
    seed_enrollment(&pool, "alice", 2, "9.99", today + Days::new(1)).await;
    seed_enrollment(&pool, "alice", 3, "9.99", today + Days::new(3)).await;
    seed_enrollment(&pool, "alice", 4, "9.99", today + Days::new(4)).await;

    Mock::given(path(REMINDER_PATH))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&app.email_server)
        .await;

    let res = app
        .trigger_reminders()
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, res.status());

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["attempted"], 2);
    assert_eq!(body["succeeded"], 2);
    assert_eq!(body["failed"], 0);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn one_failed_reminder_does_not_stop_the_batch(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    // alice and bob resolve in the directory; ghost gets a 404
    app.mock_user("alice", "alice@test.com").await;
    app.mock_user("bob", "bob@test.com").await;
    app.mock_plan(1, "Streaming Basic", "9.99").await;
    app.mock_plan(2, "Cloud Storage", "4.99").await;
    app.mock_plan(3, "Music", "2.99").await;

    let due = Utc::now().date_naive() + Days::new(2);
    seed_enrollment(&pool, "alice", 1, "9.99", due).await;
    seed_enrollment(&pool, "ghost", 2, "4.99", due).await;
    seed_enrollment(&pool, "bob", 3, "2.99", due).await;

    Mock::given(path(REMINDER_PATH))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&app.email_server)
        .await;

    let res = app
        .trigger_reminders()
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, res.status());

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["attempted"], 3);
    assert_eq!(body["succeeded"], 2);
    assert_eq!(body["failed"], 1);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn rerunning_the_batch_sends_reminders_again(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    app.mock_user("alice", "alice@test.com").await;
    app.mock_plan(1, "Streaming Basic", "9.99").await;

    let due = Utc::now().date_naive() + Days::new(2);
    seed_enrollment(&pool, "alice", 1, "9.99", due).await;

    // No dedup marker is kept; each run re-sends
    Mock::given(path(REMINDER_PATH))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&app.email_server)
        .await;

    for _ in 0..2 {
        let res = app
            .trigger_reminders()
            .await
            .expect("Failed to execute request");
        assert_eq!(StatusCode::OK, res.status());
    }

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn reminder_email_carries_the_price_snapshot(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    // Dotted local part and multi-label domain, as the directory
    // reports them
    app.mock_user("alice", "john.doe@mail.example.com").await;
    // The catalog price has since gone up; the email must carry the
    // enrollment's own snapshot
    app.mock_plan(1, "Streaming Basic", "19.99").await;

    let due = Utc::now().date_naive() + Days::new(2);
    seed_enrollment(&pool, "alice", 1, "9.99", due).await;

    Mock::given(path(REMINDER_PATH))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let res = app
        .trigger_reminders()
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, res.status());

    let email_request = &app.email_server.received_requests().await.unwrap()[0];
    let body: serde_json::Value = serde_json::from_slice(&email_request.body).unwrap();

    assert_eq!(body["to"], "john.doe@mail.example.com");
    assert_eq!(body["username"], "Test User");
    assert_eq!(body["subscriptionName"], "Streaming Basic");
    assert_eq!(body["amount"], "9.99");
    assert_eq!(body["currency"], "AZN");
    assert_eq!(body["nextBillingDate"], due.to_string());

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn failed_email_sends_are_counted_not_fatal(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    app.mock_user("alice", "alice@test.com").await;
    app.mock_plan(1, "Streaming Basic", "9.99").await;

    let due = Utc::now().date_naive() + Days::new(2);
    seed_enrollment(&pool, "alice", 1, "9.99", due).await;

    Mock::given(path(REMINDER_PATH))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let res = app
        .trigger_reminders()
        .await
        .expect("Failed to execute request");

    // The trigger itself still reports success
    assert_eq!(StatusCode::OK, res.status());

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["attempted"], 1);
    assert_eq!(body["succeeded"], 0);
    assert_eq!(body["failed"], 1);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn empty_window_sends_nothing(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .trigger_reminders()
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, res.status());

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["attempted"], 0);
    assert_eq!(body["succeeded"], 0);

    assert!(app
        .email_server
        .received_requests()
        .await
        .unwrap()
        .is_empty());

    Ok(())
}
