use std::time::Duration;

use anyhow::Context;

use reqwest::{Client, StatusCode};

use serde::Deserialize;

use url::Url;

use crate::error::{Error, Result};

/// Client for the externally-owned user directory.
#[derive(Debug)]
pub struct UserDirectoryClient {
    client: Client,

    api_users_url: Url,
}

impl UserDirectoryClient {
    pub fn new(api_timeout: Duration, api_base_url: Url) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(api_timeout)
            .build()
            .context("Failed to build http client")?;

        let api_users_url = api_base_url
            .join("api/users/")
            .context("Failed to create user endpoint URL")?;

        Ok(Self {
            client,
            api_users_url,
        })
    }

    /// Resolve a username into a notifiable identity.
    /// `UserNotFound` when the directory does not know the user,
    /// `UpstreamUnavailable` on transport/timeout failure.
    #[tracing::instrument(name = "Fetch user identity", skip(self))]
    pub async fn fetch_identity(&self, username: &str) -> Result<Identity> {
        let url = format!("{}{}", self.api_users_url, username);

        let res = self.client.get(url).send().await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Err(Error::UserNotFound(username.into()));
        }
        let envelope: UserEnvelope = res.error_for_status()?.json().await?;

        match envelope.user {
            Some(identity) if envelope.success => Ok(identity),
            _ => Err(Error::UserNotFound(username.into())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    success: bool,
    user: Option<Identity>,
}

/// Point-in-time user snapshot from the directory
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl Identity {
    /// Display name used in reminder emails
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
