use chrono::NaiveDate;

use rust_decimal::Decimal;

use sqlx::PgExecutor;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{Enrollment, EnrollmentChanges, NewEnrollment};

const ENROLLMENT_COLUMNS: &str = "id, username, plan_id, start_date, next_billing_date, \
     monthly_price, currency, billing_period, is_active, notes, created_at, updated_at";

/// Postgres enrollment repository.
/// The store owns the enrollment rows exclusively; every mutation goes
/// through here.
#[derive(Debug)]
pub struct EnrollmentRepo;

impl EnrollmentRepo {
    /// Insert a new enrollment. The store assigns the id and the
    /// created/updated timestamps.
    ///
    /// A race that slips past the caller's duplicate check loses
    /// against the partial unique index and reports
    /// `DuplicateEnrollment` here.
    #[tracing::instrument(name = "Insert enrollment", skip(executor))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        new_enrollment: &NewEnrollment,
    ) -> Result<Enrollment> {
        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "insert into enrollments \
                 (username, plan_id, start_date, next_billing_date, \
                  monthly_price, currency, billing_period, notes) \
             values ($1, $2, $3, $4, $5, $6, $7, $8) \
             returning {}",
            ENROLLMENT_COLUMNS
        ))
        .bind(&new_enrollment.username)
        .bind(new_enrollment.plan_id)
        .bind(new_enrollment.start_date)
        .bind(new_enrollment.next_billing_date)
        .bind(new_enrollment.monthly_price)
        .bind(&new_enrollment.currency)
        .bind(new_enrollment.billing_period.as_str())
        .bind(&new_enrollment.notes)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return Error::DuplicateEnrollment;
                }
            }
            Error::DatabaseError(e)
        })?;

        Ok(enrollment)
    }

    /// Fetch one enrollment by id, scoped to its owner
    #[tracing::instrument(name = "Fetch enrollment by id and owner", skip(executor))]
    pub async fn fetch_by_id_and_owner<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        username: &str,
    ) -> sqlx::Result<Option<Enrollment>> {
        sqlx::query_as::<_, Enrollment>(&format!(
            "select {} from enrollments where id=$1 and username=$2",
            ENROLLMENT_COLUMNS
        ))
        .bind(id)
        .bind(username)
        .fetch_optional(executor)
        .await
    }

    /// Fetch all active enrollments for one owner.
    /// No ordering is promised.
    #[tracing::instrument(name = "Fetch active enrollments by owner", skip(executor))]
    pub async fn fetch_active_by_owner<'con>(
        executor: impl PgExecutor<'con>,
        username: &str,
    ) -> sqlx::Result<Vec<Enrollment>> {
        sqlx::query_as::<_, Enrollment>(&format!(
            "select {} from enrollments where username=$1 and is_active",
            ENROLLMENT_COLUMNS
        ))
        .bind(username)
        .fetch_all(executor)
        .await
    }

    /// Duplicate-enrollment check: is there an active enrollment for
    /// this (owner, plan) pair?
    #[tracing::instrument(name = "Check for active enrollment by owner and plan", skip(executor))]
    pub async fn exists_active_by_owner_and_plan<'con>(
        executor: impl PgExecutor<'con>,
        username: &str,
        plan_id: i64,
    ) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "select exists(\
                 select 1 from enrollments \
                 where username=$1 and plan_id=$2 and is_active)",
        )
        .bind(username)
        .bind(plan_id)
        .fetch_one(executor)
        .await
    }

    /// Active enrollments whose next billing date falls in the
    /// inclusive [start, end] range. Callers must not assume a stable
    /// order on the result.
    #[tracing::instrument(name = "Fetch active enrollments due in range", skip(executor))]
    pub async fn fetch_active_due_between<'con>(
        executor: impl PgExecutor<'con>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> sqlx::Result<Vec<Enrollment>> {
        sqlx::query_as::<_, Enrollment>(&format!(
            "select {} from enrollments \
             where next_billing_date between $1 and $2 and is_active",
            ENROLLMENT_COLUMNS
        ))
        .bind(start)
        .bind(end)
        .fetch_all(executor)
        .await
    }

    /// Update the owner-editable fields. Price, currency and billing
    /// period are immutable snapshots and stay untouched.
    #[tracing::instrument(name = "Update enrollment", skip(executor))]
    pub async fn update<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        username: &str,
        changes: &EnrollmentChanges,
    ) -> sqlx::Result<Option<Enrollment>> {
        sqlx::query_as::<_, Enrollment>(&format!(
            "update enrollments \
             set start_date=$3, next_billing_date=$4, notes=$5, updated_at=now() \
             where id=$1 and username=$2 \
             returning {}",
            ENROLLMENT_COLUMNS
        ))
        .bind(id)
        .bind(username)
        .bind(changes.start_date)
        .bind(changes.next_billing_date)
        .bind(&changes.notes)
        .fetch_optional(executor)
        .await
    }

    /// Soft delete: flip the active flag, keep the row
    #[tracing::instrument(name = "Deactivate enrollment", skip(executor))]
    pub async fn deactivate<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        username: &str,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "update enrollments set is_active=false, updated_at=now() \
             where id=$1 and username=$2",
        )
        .bind(id)
        .bind(username)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sum of monthly prices over one owner's active enrollments.
    /// `None` when the owner has no active rows.
    #[tracing::instrument(name = "Total monthly cost by owner", skip(executor))]
    pub async fn total_monthly_cost_by_owner<'con>(
        executor: impl PgExecutor<'con>,
        username: &str,
    ) -> sqlx::Result<Option<Decimal>> {
        sqlx::query_scalar::<_, Option<Decimal>>(
            "select sum(monthly_price) from enrollments where username=$1 and is_active",
        )
        .bind(username)
        .fetch_one(executor)
        .await
    }

    #[tracing::instrument(name = "Count active enrollments by owner", skip(executor))]
    pub async fn count_active_by_owner<'con>(
        executor: impl PgExecutor<'con>,
        username: &str,
    ) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "select count(*) from enrollments where username=$1 and is_active",
        )
        .bind(username)
        .fetch_one(executor)
        .await
    }

    /// Every enrollment row, active or not. Admin view.
    #[tracing::instrument(name = "Fetch all enrollments", skip(executor))]
    pub async fn fetch_all<'con>(
        executor: impl PgExecutor<'con>,
    ) -> sqlx::Result<Vec<Enrollment>> {
        sqlx::query_as::<_, Enrollment>(&format!(
            "select {} from enrollments",
            ENROLLMENT_COLUMNS
        ))
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument(name = "Count active enrollments", skip(executor))]
    pub async fn count_active<'con>(executor: impl PgExecutor<'con>) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>("select count(*) from enrollments where is_active")
            .fetch_one(executor)
            .await
    }

    #[tracing::instrument(name = "Count inactive enrollments", skip(executor))]
    pub async fn count_inactive<'con>(executor: impl PgExecutor<'con>) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>("select count(*) from enrollments where not is_active")
            .fetch_one(executor)
            .await
    }

    /// Sum of monthly prices over all active enrollments
    #[tracing::instrument(name = "Total monthly revenue", skip(executor))]
    pub async fn total_monthly_revenue<'con>(
        executor: impl PgExecutor<'con>,
    ) -> sqlx::Result<Option<Decimal>> {
        sqlx::query_scalar::<_, Option<Decimal>>(
            "select sum(monthly_price) from enrollments where is_active",
        )
        .fetch_one(executor)
        .await
    }

    /// Number of distinct owners with at least one active enrollment
    #[tracing::instrument(name = "Count active owners", skip(executor))]
    pub async fn count_active_owners<'con>(
        executor: impl PgExecutor<'con>,
    ) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "select count(distinct username) from enrollments where is_active",
        )
        .fetch_one(executor)
        .await
    }
}
