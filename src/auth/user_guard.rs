use std::future::Future;
use std::pin::Pin;

use actix_web::{dev, web, FromRequest, HttpRequest};

use argon2::{Argon2, PasswordHash, PasswordVerifier};

use anyhow::Context;

use secrecy::Secret;

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::Credentials;
use crate::error::{RestError, RestResult};
use crate::repo::{UserCredentials, UsersRepo};
use crate::telemetry::spawn_blocking_with_tracing;

/// Authenticated caller; the username is the explicit owner identifier
/// passed into every core operation.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

impl FromRequest for AuthenticatedUser {
    type Error = RestError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            // NOTE: Must be registered with the application at startup
            let pool: &PgPool = req
                .app_data::<web::Data<PgPool>>()
                .expect("PgPool not registered for application");
            // Pull the credentials from the headers
            let creds = Credentials::from_headers(req.headers())
                .map_err(RestError::FailedToAuthenticate)?;
            // Get the user and verify the credentials
            validate_credentials(pool, &creds).await
        })
    }
}

#[tracing::instrument("Validate credentials", skip(credentials, pool))]
pub(super) async fn validate_credentials(
    pool: &PgPool,
    credentials: &Credentials,
) -> RestResult<AuthenticatedUser> {
    let username = credentials.username.clone();
    let password = credentials.password.clone();

    let user: UserCredentials = UsersRepo::fetch_credentials_by_username(pool, &username)
        .await?
        .context("No user stored for username")
        .map_err(RestError::FailedToAuthenticate)?;

    let password_hash = user.password_hash();
    spawn_blocking_with_tracing(move || verify_password_hash(password, password_hash))
        .await
        .context("Failed to spawn blocking task")??;

    Ok(AuthenticatedUser {
        id: user.id,
        username,
        is_admin: user.is_admin,
    })
}

#[tracing::instrument("Verify password hash", skip(password, password_hash))]
fn verify_password_hash(password: Secret<String>, password_hash: Secret<String>) -> RestResult<()> {
    use secrecy::ExposeSecret;

    let password_hash = PasswordHash::new(password_hash.expose_secret())
        .context("Failed to parse stored password hash")?;

    Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &password_hash)
        .context("Failed to verify password hash")
        .map_err(RestError::FailedToAuthenticate)?;

    Ok(())
}
