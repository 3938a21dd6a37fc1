use std::time::Duration;

use anyhow::Context;

use reqwest::{Client, StatusCode};

use rust_decimal::Decimal;

use serde::Deserialize;

use url::Url;

use crate::error::{Error, Result};

/// Client for the externally-owned plan catalog.
#[derive(Debug)]
pub struct PlanCatalogClient {
    client: Client,

    api_plans_url: Url,
}

impl PlanCatalogClient {
    pub fn new(api_timeout: Duration, api_base_url: Url) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(api_timeout)
            .build()
            .context("Failed to build http client")?;

        let api_plans_url = api_base_url
            .join("api/subscriptions/")
            .context("Failed to create plan endpoint URL")?;

        Ok(Self {
            client,
            api_plans_url,
        })
    }

    /// Fetch a point-in-time snapshot of one plan.
    /// `PlanNotFound` when the catalog reports the plan missing or
    /// inactive; `UpstreamUnavailable` on transport/timeout failure.
    /// Neither is retried within the current request.
    #[tracing::instrument(name = "Fetch plan details", skip(self))]
    pub async fn fetch_plan(&self, plan_id: i64) -> Result<PlanDetails> {
        let url = format!("{}{}", self.api_plans_url, plan_id);

        let res = self.client.get(url).send().await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Err(Error::PlanNotFound(plan_id));
        }
        let envelope: PlanEnvelope = res.error_for_status()?.json().await?;

        match envelope.subscription {
            Some(plan) if envelope.success && plan.is_active => Ok(plan),
            _ => Err(Error::PlanNotFound(plan_id)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlanEnvelope {
    success: bool,
    subscription: Option<PlanDetails>,
}

/// Point-in-time plan snapshot from the catalog. No lifecycle beyond
/// the call that produced it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetails {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub category: Option<String>,
    pub billing_period: String,
    pub website_url: Option<String>,
    pub logo_url: Option<String>,
    pub is_active: bool,
}
