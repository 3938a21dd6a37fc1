use chrono::{DateTime, NaiveDate, Utc};

use rust_decimal::Decimal;

use serde::{Deserialize, Serialize};

use sqlx::FromRow;

use uuid::Uuid;

/// Billing period carried by the plan snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillingPeriod {
    Monthly,
    Yearly,
}

impl BillingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingPeriod::Monthly => "MONTHLY",
            BillingPeriod::Yearly => "YEARLY",
        }
    }

    /// Catalog payloads carry the period as free text; anything
    /// unrecognized falls back to monthly billing.
    pub fn from_string(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "YEARLY" => BillingPeriod::Yearly,
            _ => BillingPeriod::Monthly,
        }
    }
}

/// New enrollment, ready for insertion.
/// Price, currency and billing period are snapshots taken from the
/// plan catalog at creation time.
#[derive(Debug)]
pub struct NewEnrollment {
    pub username: String,
    pub plan_id: i64,
    pub start_date: NaiveDate,
    pub next_billing_date: NaiveDate,
    pub monthly_price: Decimal,
    pub currency: String,
    pub billing_period: BillingPeriod,
    pub notes: Option<String>,
}

/// Stored enrollment record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Enrollment {
    /// ID of the enrollment, assigned by the store
    pub id: Uuid,
    /// Owner; immutable after creation
    pub username: String,
    /// Reference to the externally-owned plan; immutable after creation
    pub plan_id: i64,
    pub start_date: NaiveDate,
    pub next_billing_date: NaiveDate,
    /// Snapshot values, never refreshed from the catalog
    pub monthly_price: Decimal,
    pub currency: String,
    pub billing_period: String,
    /// Soft-delete flag; rows are never physically removed
    pub is_active: bool,
    pub notes: Option<String>,
    /// Creation and update timestamps, store-assigned
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner-editable subset of an enrollment
#[derive(Debug)]
pub struct EnrollmentChanges {
    pub start_date: NaiveDate,
    pub next_billing_date: NaiveDate,
    pub notes: Option<String>,
}

/// Per-owner monthly cost aggregate. Recomputed on every request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCostSummary {
    pub total_monthly_cost: Decimal,
    pub currency: String,
    pub active_subscription_count: i64,
    pub average_cost_per_subscription: Decimal,
}

impl MonthlyCostSummary {
    /// Build the summary from the store aggregates.
    ///
    /// The currency is the process-wide default: enrollments priced in
    /// different currencies are summed naively without conversion.
    pub fn compute(total: Option<Decimal>, count: i64, currency: String) -> Self {
        use rust_decimal::RoundingStrategy;

        let total = total.unwrap_or(Decimal::ZERO);
        let average = if count > 0 {
            (total / Decimal::from(count))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        } else {
            Decimal::ZERO
        };

        Self {
            total_monthly_cost: total,
            currency,
            active_subscription_count: count,
            average_cost_per_subscription: average,
        }
    }
}

/// Outcome of one reminder batch run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderBatchResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<ReminderFailure>,
}

impl ReminderBatchResult {
    pub fn new(attempted: usize) -> Self {
        Self {
            attempted,
            succeeded: 0,
            failures: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderFailure {
    pub enrollment_id: Uuid,
    pub reason: String,
}
