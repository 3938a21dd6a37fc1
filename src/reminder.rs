use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};

use sqlx::PgPool;

use crate::client::{EmailClient, PlanCatalogClient, ReminderEmail, UserDirectoryClient};
use crate::domain::EmailAddress;
use crate::error::Result;
use crate::model::{Enrollment, ReminderBatchResult, ReminderFailure};
use crate::repo::EnrollmentRepo;

/// First day of the lookahead window, relative to "today"
const LOOKAHEAD_START_DAYS: u64 = 1;
/// Last day of the lookahead window, inclusive
const LOOKAHEAD_END_DAYS: u64 = 3;

/// Selects active enrollments due for a billing reminder and sends one
/// email per enrollment, isolating per-item failures.
///
/// There is no dedup marker and no reentrancy lock: re-running within
/// the same window re-sends reminders, and two overlapping invocations
/// can double-send. Both are accepted behavior.
pub struct ReminderEngine {
    pool: PgPool,
    user_directory: Arc<UserDirectoryClient>,
    plan_catalog: Arc<PlanCatalogClient>,
    email_client: Arc<EmailClient>,
}

impl ReminderEngine {
    pub fn new(
        pool: PgPool,
        user_directory: Arc<UserDirectoryClient>,
        plan_catalog: Arc<PlanCatalogClient>,
        email_client: Arc<EmailClient>,
    ) -> Self {
        Self {
            pool,
            user_directory,
            plan_catalog,
            email_client,
        }
    }

    /// Inclusive [today + 1, today + 3] reminder window
    pub fn window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (
            today + Days::new(LOOKAHEAD_START_DAYS),
            today + Days::new(LOOKAHEAD_END_DAYS),
        )
    }

    /// Run one reminder batch for the window anchored at `today`.
    ///
    /// A store failure fails the whole run; everything past the range
    /// scan is per-enrollment and never aborts the batch.
    #[tracing::instrument(name = "Run billing reminders", skip(self))]
    pub async fn run(&self, today: NaiveDate) -> Result<ReminderBatchResult> {
        let (start, end) = Self::window(today);

        let due = EnrollmentRepo::fetch_active_due_between(&self.pool, start, end).await?;

        let mut result = ReminderBatchResult::new(due.len());
        for enrollment in &due {
            match self.send_reminder(enrollment).await {
                Ok(()) => {
                    result.succeeded += 1;
                }
                Err(error) => {
                    tracing::error!(
                        "Failed to send billing reminder for enrollment {}: {}",
                        enrollment.id,
                        error
                    );
                    result.failures.push(ReminderFailure {
                        enrollment_id: enrollment.id,
                        reason: error.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Sent {} out of {} billing reminders successfully",
            result.succeeded,
            result.attempted
        );

        Ok(result)
    }

    async fn send_reminder(&self, enrollment: &Enrollment) -> Result<()> {
        let identity = self
            .user_directory
            .fetch_identity(&enrollment.username)
            .await?;
        let address: EmailAddress = identity.email.parse()?;
        let plan = self.plan_catalog.fetch_plan(enrollment.plan_id).await?;

        // The amount is the enrollment's own snapshot, not the plan's
        // current catalog price
        let reminder = ReminderEmail {
            to: address.to_string(),
            username: identity.display_name(),
            subscription_name: plan.name.clone(),
            next_billing_date: enrollment.next_billing_date,
            amount: enrollment.monthly_price,
            currency: enrollment.currency.clone(),
        };

        self.email_client.send_reminder(&reminder).await?;

        tracing::info!(
            "Sent billing reminder for user: {}, subscription: {}",
            enrollment.username,
            plan.name
        );

        Ok(())
    }
}

/// Daily scheduler loop: sleeps until the next fire time, runs the
/// engine, and keeps looping regardless of individual run failures.
pub async fn run_daily(engine: Arc<ReminderEngine>, fire_hour_utc: u32) {
    loop {
        let wait = duration_until_next_fire(Utc::now(), fire_hour_utc);
        tracing::info!(
            "Next billing reminder run scheduled in {} seconds",
            wait.as_secs()
        );
        tokio::time::sleep(wait).await;

        match engine.run(Utc::now().date_naive()).await {
            Ok(result) => {
                tracing::info!(
                    "Daily billing reminder job completed: {}/{} sent, {} failed",
                    result.succeeded,
                    result.attempted,
                    result.failures.len()
                );
            }
            Err(error) => {
                tracing::error!("Daily billing reminder job failed: {}", error);
            }
        }
    }
}

fn duration_until_next_fire(now: DateTime<Utc>, fire_hour_utc: u32) -> Duration {
    let fire_today = now
        .date_naive()
        .and_hms_opt(fire_hour_utc % 24, 0, 0)
        .unwrap_or_default()
        .and_utc();

    let next_fire = if fire_today > now {
        fire_today
    } else {
        fire_today + Days::new(1)
    };

    (next_fire - now).to_std().unwrap_or(Duration::ZERO)
}
