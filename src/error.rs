use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Core error taxonomy, shared by the repositories, the upstream clients
/// and the reminder engine.
#[derive(Debug, Error)]
pub enum Error {
    // Malformed creation/update input
    #[error("{0}")]
    ValidationFailed(String),
    #[error("You already have this subscription")]
    DuplicateEnrollment,
    #[error("Subscription not found")]
    EnrollmentNotFound,
    // Plan catalog reported the plan missing or inactive
    #[error("Plan {0} not found")]
    PlanNotFound(i64),
    // User directory does not know the owner
    #[error("User {0} not found")]
    UserNotFound(String),
    // Transport/timeout failure talking to an upstream service
    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(#[from] reqwest::Error),
    // Email client errors
    #[error("Failed to send email: {0}")]
    SendEmailError(reqwest::Error),
    // Database errors
    #[error(transparent)]
    DatabaseError(#[from] sqlx::Error),
}

pub type RestResult<T> = std::result::Result<T, RestError>;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to authenticate: {0}")]
    FailedToAuthenticate(anyhow::Error),

    #[error("Upstream service unavailable")]
    BadGateway(String),

    #[error("Internal Server Error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for RestError {
    fn from(_e: sqlx::Error) -> Self {
        Self::InternalError("Database error".into())
    }
}

impl From<Error> for RestError {
    fn from(e: Error) -> Self {
        use Error as E;
        match e {
            E::ValidationFailed(msg) => Self::BadRequest(msg),
            E::DuplicateEnrollment => Self::BadRequest(e.to_string()),
            E::EnrollmentNotFound => Self::NotFound(e.to_string()),
            E::PlanNotFound(_) => Self::BadRequest(e.to_string()),
            E::UserNotFound(_) => Self::BadRequest(e.to_string()),
            E::UpstreamUnavailable(inner) => {
                tracing::error!("Upstream call failed: {}", inner);
                Self::BadGateway("Upstream service unavailable".into())
            }
            E::SendEmailError(inner) => {
                tracing::error!("Failed to send email: {}", inner);
                Self::InternalError("Failed to send email".into())
            }
            E::DatabaseError(_) => Self::InternalError("Database error".into()),
        }
    }
}

impl ResponseError for RestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::FailedToAuthenticate(_) => StatusCode::UNAUTHORIZED,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::InternalError(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "message": self.to_string(),
        }))
    }
}
