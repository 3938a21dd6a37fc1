use std::convert::Infallible;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use chrono::NaiveDate;

use reqwest::Client;

use rust_decimal::Decimal;

use serde::Serialize;

use secrecy::Secret;

use url::Url;

use crate::error::Error;

const SERVICE_TOKEN_HEADER: &str = "X-Service-Token";

/// Client for the email service. One outbound message per call,
/// no retries here; a failure is reported upward.
#[derive(Debug)]
pub struct EmailClient {
    client: Client,

    api_reminder_url: Url,
    api_auth_token: EmailAuthorizationToken,
}

impl EmailClient {
    pub fn new(
        api_timeout: Duration,
        api_base_url: Url,
        api_auth_token: EmailAuthorizationToken,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(api_timeout)
            .build()
            .context("Failed to build http client")?;

        let api_reminder_url = api_base_url
            .join("api/email/subscription-reminder")
            .context("Failed to create reminder endpoint URL")?;

        Ok(Self {
            client,
            api_reminder_url,
            api_auth_token,
        })
    }

    #[tracing::instrument(name = "Send billing reminder email", skip(self))]
    pub async fn send_reminder(&self, reminder: &ReminderEmail) -> Result<(), Error> {
        use secrecy::ExposeSecret;

        self.client
            .post(self.api_reminder_url.clone())
            .header(SERVICE_TOKEN_HEADER, self.api_auth_token.expose_secret())
            .json(reminder)
            .send()
            .await
            .map_err(Error::SendEmailError)?
            .error_for_status()
            .map_err(Error::SendEmailError)?;
        Ok(())
    }
}

/// Reminder payload consumed by the email service.
/// `amount` carries the enrollment's own price snapshot, not the
/// plan's current catalog price.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderEmail {
    pub to: String,
    pub username: String,
    pub subscription_name: String,
    pub next_billing_date: NaiveDate,
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug)]
pub struct EmailAuthorizationToken(Secret<String>);

impl FromStr for EmailAuthorizationToken {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Infallible> {
        let value = value.to_string();
        let value = Secret::new(value);

        Ok(Self(value))
    }
}

impl From<Secret<String>> for EmailAuthorizationToken {
    fn from(value: Secret<String>) -> Self {
        Self(value)
    }
}

impl secrecy::ExposeSecret<String> for EmailAuthorizationToken {
    fn expose_secret(&self) -> &String {
        self.0.expose_secret()
    }
}
