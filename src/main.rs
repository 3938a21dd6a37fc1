use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;

use sqlx::PgPool;

use enrollment_service::app::{self, DefaultCurrency};
use enrollment_service::client::{EmailClient, PlanCatalogClient, UserDirectoryClient};
use enrollment_service::reminder::{self, ReminderEngine};
use enrollment_service::settings::Settings;
use enrollment_service::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().expect("Failed to load settings");

    let subscriber = telemetry::create_subscriber("info".into(), std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let pool = PgPool::connect_with(settings.database.with_db()).await?;

    let user_directory = Arc::new(UserDirectoryClient::new(
        settings.services.user_directory.api_timeout(),
        settings.services.user_directory.base_url(),
    )?);
    let plan_catalog = Arc::new(PlanCatalogClient::new(
        settings.services.plan_catalog.api_timeout(),
        settings.services.plan_catalog.base_url(),
    )?);
    let email_client = Arc::new(EmailClient::new(
        settings.email.api_timeout(),
        settings.email.api_base_url(),
        settings.email.api_auth_token(),
    )?);

    let engine = Arc::new(ReminderEngine::new(
        pool.clone(),
        user_directory.clone(),
        plan_catalog.clone(),
        email_client,
    ));

    if settings.reminders.enabled {
        tokio::spawn(reminder::run_daily(
            engine.clone(),
            settings.reminders.fire_hour_utc,
        ));
    }

    let listener = TcpListener::bind(settings.app.addr())?;

    app::run(
        listener,
        pool,
        engine,
        user_directory,
        plan_catalog,
        DefaultCurrency(settings.app.default_currency().to_string()),
    )?
    .await
    .context("Failed to run app")
}
