use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use sqlx::PgPool;

use tracing_actix_web::TracingLogger;

use crate::client::{PlanCatalogClient, UserDirectoryClient};
use crate::controller::{admin, enrollments};
use crate::reminder::ReminderEngine;

/// Process-wide currency reported by cost summaries
#[derive(Debug, Clone)]
pub struct DefaultCurrency(pub String);

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("I am alive")
}

/// Run the application on a specified TCP listener
pub fn run(
    listener: TcpListener,
    pool: PgPool,
    engine: Arc<ReminderEngine>,
    user_directory: Arc<UserDirectoryClient>,
    plan_catalog: Arc<PlanCatalogClient>,
    default_currency: DefaultCurrency,
) -> anyhow::Result<Server> {
    // Wrap application data
    let pool = web::Data::new(pool);
    let engine = web::Data::from(engine);
    let user_directory = web::Data::from(user_directory);
    let plan_catalog = web::Data::from(plan_catalog);
    let default_currency = web::Data::new(default_currency);

    // Start the server; the admin scope is registered ahead of the user
    // scope so its paths are matched first
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(pool.clone())
            .app_data(engine.clone())
            .app_data(user_directory.clone())
            .app_data(plan_catalog.clone())
            .app_data(default_currency.clone())
            .service(health_check)
            .service(admin::scope())
            .service(enrollments::scope())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
