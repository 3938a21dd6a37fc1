use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpResponse, Responder};

use chrono::Utc;

use rust_decimal::{Decimal, RoundingStrategy};

use sqlx::PgPool;

use crate::auth::Administrator;
use crate::client::PlanCatalogClient;
use crate::controller::enrollments::enrich_all;
use crate::error::{RestError, RestResult};
use crate::reminder::ReminderEngine;
use crate::repo::EnrollmentRepo;

#[tracing::instrument(name = "List all enrollments", skip(_admin, pool, plan_catalog))]
#[get("/all")]
async fn list_all(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    plan_catalog: web::Data<PlanCatalogClient>,
) -> RestResult<impl Responder> {
    let enrollments = EnrollmentRepo::fetch_all(pool.get_ref()).await?;
    let views = enrich_all(plan_catalog.get_ref(), enrollments).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": views.len(),
        "subscriptions": views,
    })))
}

#[tracing::instrument(name = "List enrollments for a user", skip(_admin, pool, plan_catalog))]
#[get("/user/{username}")]
async fn list_for_user(
    _admin: Administrator,
    username: web::Path<String>,
    pool: web::Data<PgPool>,
    plan_catalog: web::Data<PlanCatalogClient>,
) -> RestResult<impl Responder> {
    let enrollments = EnrollmentRepo::fetch_active_by_owner(pool.get_ref(), &username).await?;
    let views = enrich_all(plan_catalog.get_ref(), enrollments).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "username": username.as_str(),
        "count": views.len(),
        "subscriptions": views,
    })))
}

/// Service-wide statistics. A single failed aggregate fails the whole
/// request; no partial statistics are returned.
#[tracing::instrument(name = "Get enrollment statistics", skip(_admin, pool))]
#[get("/statistics")]
async fn statistics(
    _admin: Administrator,
    pool: web::Data<PgPool>,
) -> RestResult<impl Responder> {
    let pool = pool.get_ref();

    let active = EnrollmentRepo::count_active(pool).await?;
    let inactive = EnrollmentRepo::count_inactive(pool).await?;
    let revenue = EnrollmentRepo::total_monthly_revenue(pool)
        .await?
        .unwrap_or(Decimal::ZERO);
    let active_users = EnrollmentRepo::count_active_owners(pool).await?;

    let average_revenue_per_user = if active_users > 0 {
        (revenue / Decimal::from(active_users))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    } else {
        Decimal::ZERO
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "statistics": {
            "activeSubscriptions": active,
            "inactiveSubscriptions": inactive,
            "totalSubscriptions": active + inactive,
            "totalMonthlyRevenue": revenue,
            "activeUsers": active_users,
            "averageRevenuePerUser": average_revenue_per_user,
        },
    })))
}

/// Manual reminder trigger; same engine run as the automated one
#[tracing::instrument(name = "Run billing reminders (admin trigger)", skip(_admin, engine))]
#[post("/send-reminders")]
async fn send_reminders(
    _admin: Administrator,
    engine: web::Data<ReminderEngine>,
) -> RestResult<impl Responder> {
    let result = engine
        .run(Utc::now().date_naive())
        .await
        .map_err(RestError::from)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Billing reminders sent successfully",
        "result": result,
    })))
}

/// Administrator endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/user-subscriptions/admin")
        .service(list_all)
        .service(list_for_user)
        .service(statistics)
        .service(send_reminders)
}
