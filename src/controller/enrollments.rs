use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};

use chrono::{NaiveDate, Utc};

use rust_decimal::Decimal;

use serde::{Deserialize, Serialize};

use sqlx::PgPool;

use uuid::Uuid;

use crate::app::DefaultCurrency;
use crate::auth::AuthenticatedUser;
use crate::client::{PlanCatalogClient, PlanDetails, UserDirectoryClient};
use crate::error::{Error, RestError, RestResult};
use crate::model::{
    BillingPeriod, Enrollment, EnrollmentChanges, MonthlyCostSummary, NewEnrollment,
};
use crate::reminder::ReminderEngine;
use crate::repo::EnrollmentRepo;

/// Creation/update request body. All fields optional so that missing
/// data surfaces as a validation failure instead of a decode error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentForm {
    plan_id: Option<i64>,
    start_date: Option<NaiveDate>,
    next_billing_date: Option<NaiveDate>,
    notes: Option<String>,
}

struct EnrollmentRequest {
    plan_id: i64,
    start_date: NaiveDate,
    next_billing_date: NaiveDate,
    notes: Option<String>,
}

impl TryFrom<EnrollmentForm> for EnrollmentRequest {
    type Error = Error;

    fn try_from(form: EnrollmentForm) -> Result<Self, Error> {
        let plan_id = form
            .plan_id
            .ok_or_else(|| Error::ValidationFailed("Plan id is required".into()))?;
        let start_date = form
            .start_date
            .ok_or_else(|| Error::ValidationFailed("Start date is required".into()))?;
        let next_billing_date = form
            .next_billing_date
            .ok_or_else(|| Error::ValidationFailed("Next billing date is required".into()))?;

        Ok(Self {
            plan_id,
            start_date,
            next_billing_date,
            notes: form.notes,
        })
    }
}

impl TryFrom<EnrollmentForm> for EnrollmentChanges {
    type Error = Error;

    fn try_from(form: EnrollmentForm) -> Result<Self, Error> {
        let start_date = form
            .start_date
            .ok_or_else(|| Error::ValidationFailed("Start date is required".into()))?;
        let next_billing_date = form
            .next_billing_date
            .ok_or_else(|| Error::ValidationFailed("Next billing date is required".into()))?;

        Ok(Self {
            start_date,
            next_billing_date,
            notes: form.notes,
        })
    }
}

/// Enrollment REST shape, enriched with live catalog fields
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    pub id: Uuid,
    pub username: String,
    pub plan_id: i64,
    pub plan_name: String,
    pub plan_category: Option<String>,
    pub start_date: NaiveDate,
    pub next_billing_date: NaiveDate,
    pub monthly_price: Decimal,
    pub currency: String,
    pub billing_period: String,
    pub notes: Option<String>,
    pub is_active: bool,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
}

impl EnrollmentView {
    pub fn new(enrollment: Enrollment, plan: &PlanDetails) -> Self {
        Self {
            id: enrollment.id,
            username: enrollment.username,
            plan_id: enrollment.plan_id,
            plan_name: plan.name.clone(),
            plan_category: plan.category.clone(),
            start_date: enrollment.start_date,
            next_billing_date: enrollment.next_billing_date,
            monthly_price: enrollment.monthly_price,
            currency: enrollment.currency,
            billing_period: enrollment.billing_period,
            notes: enrollment.notes,
            is_active: enrollment.is_active,
            logo_url: plan.logo_url.clone(),
            website_url: plan.website_url.clone(),
        }
    }
}

/// Enrich one enrollment with its current catalog details
pub async fn enrich(
    plan_catalog: &PlanCatalogClient,
    enrollment: Enrollment,
) -> RestResult<EnrollmentView> {
    let plan = plan_catalog.fetch_plan(enrollment.plan_id).await?;
    Ok(EnrollmentView::new(enrollment, &plan))
}

/// Enrich a batch of enrollments. Any catalog failure fails the whole
/// request; no partial list is returned.
pub async fn enrich_all(
    plan_catalog: &PlanCatalogClient,
    enrollments: Vec<Enrollment>,
) -> RestResult<Vec<EnrollmentView>> {
    let mut views = Vec::with_capacity(enrollments.len());
    for enrollment in enrollments {
        views.push(enrich(plan_catalog, enrollment).await?);
    }
    Ok(views)
}

#[tracing::instrument(
    name = "Create an enrollment",
    skip(form, pool, user_directory, plan_catalog),
    fields(username = %user.username)
)]
#[post("")]
async fn create(
    user: AuthenticatedUser,
    form: web::Json<EnrollmentForm>,
    pool: web::Data<PgPool>,
    user_directory: web::Data<UserDirectoryClient>,
    plan_catalog: web::Data<PlanCatalogClient>,
) -> RestResult<impl Responder> {
    let pool = pool.get_ref();

    let request: EnrollmentRequest = form.into_inner().try_into().map_err(RestError::from)?;

    // Duplicate-enrollment check: at most one active enrollment per
    // (owner, plan) pair
    if EnrollmentRepo::exists_active_by_owner_and_plan(pool, &user.username, request.plan_id)
        .await?
    {
        tracing::warn!(
            "User {} already has an active enrollment for plan {}",
            user.username,
            request.plan_id
        );
        return Err(Error::DuplicateEnrollment.into());
    }

    // The owner must exist in the user directory
    user_directory
        .fetch_identity(&user.username)
        .await
        .map_err(RestError::from)?;

    // Snapshot price/currency/period from the catalog
    let plan = plan_catalog
        .fetch_plan(request.plan_id)
        .await
        .map_err(RestError::from)?;
    if plan.price <= Decimal::ZERO {
        return Err(Error::ValidationFailed("Plan price must be positive".into()).into());
    }

    let new_enrollment = NewEnrollment {
        username: user.username.clone(),
        plan_id: request.plan_id,
        start_date: request.start_date,
        next_billing_date: request.next_billing_date,
        monthly_price: plan.price,
        currency: plan.currency.clone(),
        billing_period: BillingPeriod::from_string(&plan.billing_period),
        notes: request.notes,
    };
    let enrollment = EnrollmentRepo::insert(pool, &new_enrollment).await?;

    tracing::info!("Created enrollment {} for {}", enrollment.id, user.username);

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "message": "Subscription added successfully",
        "subscription": EnrollmentView::new(enrollment, &plan),
    })))
}

#[tracing::instrument(
    name = "List enrollments",
    skip(pool, plan_catalog),
    fields(username = %user.username)
)]
#[get("")]
async fn list(
    user: AuthenticatedUser,
    pool: web::Data<PgPool>,
    plan_catalog: web::Data<PlanCatalogClient>,
) -> RestResult<impl Responder> {
    let enrollments = EnrollmentRepo::fetch_active_by_owner(pool.get_ref(), &user.username).await?;
    let views = enrich_all(plan_catalog.get_ref(), enrollments).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": views.len(),
        "subscriptions": views,
    })))
}

#[tracing::instrument(
    name = "Get monthly cost summary",
    skip(pool, currency),
    fields(username = %user.username)
)]
#[get("/monthly-cost")]
async fn monthly_cost(
    user: AuthenticatedUser,
    pool: web::Data<PgPool>,
    currency: web::Data<DefaultCurrency>,
) -> RestResult<impl Responder> {
    let pool = pool.get_ref();

    let total = EnrollmentRepo::total_monthly_cost_by_owner(pool, &user.username).await?;
    let count = EnrollmentRepo::count_active_by_owner(pool, &user.username).await?;

    let summary = MonthlyCostSummary::compute(total, count, currency.0.clone());

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "summary": summary,
    })))
}

/// Unauthenticated trigger for automated callers (external cron).
/// Runs exactly the same engine logic as the admin trigger.
#[tracing::instrument(name = "Run billing reminders (automated trigger)", skip(engine))]
#[post("/send-reminders")]
async fn send_reminders(engine: web::Data<ReminderEngine>) -> RestResult<impl Responder> {
    let result = engine
        .run(Utc::now().date_naive())
        .await
        .map_err(RestError::from)?;

    // Best-effort semantics: individual failures are logged and counted,
    // the trigger itself still succeeds
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Billing reminders sent successfully",
        "attempted": result.attempted,
        "succeeded": result.succeeded,
        "failed": result.failures.len(),
    })))
}

#[tracing::instrument(
    name = "Get enrollment by id",
    skip(pool, plan_catalog),
    fields(username = %user.username)
)]
#[get("/{id}")]
async fn get_by_id(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    pool: web::Data<PgPool>,
    plan_catalog: web::Data<PlanCatalogClient>,
) -> RestResult<impl Responder> {
    let enrollment =
        EnrollmentRepo::fetch_by_id_and_owner(pool.get_ref(), *id, &user.username)
            .await?
            .ok_or(Error::EnrollmentNotFound)
            .map_err(RestError::from)?;

    let view = enrich(plan_catalog.get_ref(), enrollment).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "subscription": view,
    })))
}

#[tracing::instrument(
    name = "Update an enrollment",
    skip(form, pool, plan_catalog),
    fields(username = %user.username)
)]
#[put("/{id}")]
async fn update(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    form: web::Json<EnrollmentForm>,
    pool: web::Data<PgPool>,
    plan_catalog: web::Data<PlanCatalogClient>,
) -> RestResult<impl Responder> {
    let changes: EnrollmentChanges = form.into_inner().try_into().map_err(RestError::from)?;

    let enrollment = EnrollmentRepo::update(pool.get_ref(), *id, &user.username, &changes)
        .await?
        .ok_or(Error::EnrollmentNotFound)
        .map_err(RestError::from)?;

    let view = enrich(plan_catalog.get_ref(), enrollment).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Subscription updated successfully",
        "subscription": view,
    })))
}

#[tracing::instrument(
    name = "Cancel an enrollment",
    skip(pool),
    fields(username = %user.username)
)]
#[delete("/{id}")]
async fn delete(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> RestResult<impl Responder> {
    let deactivated = EnrollmentRepo::deactivate(pool.get_ref(), *id, &user.username).await?;
    if !deactivated {
        return Err(Error::EnrollmentNotFound.into());
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Subscription deleted successfully",
    })))
}

/// User-facing enrollment endpoints.
/// Literal paths are registered ahead of the `{id}` matcher.
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/user-subscriptions")
        .service(create)
        .service(list)
        .service(monthly_cost)
        .service(send_reminders)
        .service(get_by_id)
        .service(update)
        .service(delete)
}
