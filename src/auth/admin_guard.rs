use std::future::Future;
use std::pin::Pin;

use actix_web::{dev, web, FromRequest, HttpRequest};

use sqlx::PgPool;

use crate::auth::user_guard::validate_credentials;
use crate::auth::{AuthenticatedUser, Credentials};
use crate::error::RestError;

/// Guard for administrator-only endpoints
#[derive(Debug)]
pub struct Administrator(AuthenticatedUser);

impl FromRequest for Administrator {
    type Error = RestError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let pool: &PgPool = req
                .app_data::<web::Data<PgPool>>()
                .expect("PgPool not registered for application");

            let creds = Credentials::from_headers(req.headers())
                .map_err(RestError::FailedToAuthenticate)?;

            let user = validate_credentials(pool, &creds).await?;
            if !user.is_admin {
                return Err(RestError::FailedToAuthenticate(anyhow::anyhow!(
                    "User is not an administrator"
                )));
            }

            Ok(Administrator(user))
        })
    }
}

impl AsRef<AuthenticatedUser> for Administrator {
    fn as_ref(&self) -> &AuthenticatedUser {
        &self.0
    }
}
