use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Service-level error taxonomy shared by the API and redirect surfaces.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("This URL slug is reserved and cannot be used. Please choose a different one.")]
    ReservedSlug,
    #[error("This custom URL is already taken. Please choose a different one.")]
    SlugTaken,
    #[error("Anonymous user limit reached. Please sign up to continue.")]
    QuotaExceeded,
    #[error("Unable to generate unique short code. Please try again.")]
    AllocationExhausted,
    #[error("Not found")]
    NotFound,
    #[error("Unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl ServiceError {
    fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) | ServiceError::ReservedSlug => StatusCode::BAD_REQUEST,
            ServiceError::SlugTaken => StatusCode::CONFLICT,
            ServiceError::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::AllocationExhausted | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable code where the client is expected to branch on the
    /// failure (the quota error prompts a sign-up flow).
    fn code(&self) -> Option<&'static str> {
        match self {
            ServiceError::QuotaExceeded => Some("ANONYMOUS_LIMIT_REACHED"),
            ServiceError::SlugTaken => Some("SLUG_TAKEN"),
            ServiceError::ReservedSlug => Some("SLUG_RESERVED"),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal detail stays in the logs, not in the response body.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            match self {
                ServiceError::AllocationExhausted => self.to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        let code = self.code();
        (status, Json(ErrorBody { message, code })).into_response()
    }
}
