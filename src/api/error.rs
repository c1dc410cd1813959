use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use super::models::ErrorResponse;
use crate::fetch::FetchError;
use crate::service::ServiceError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payload invalid: {0}")]
    InvalidPayload(String),
    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("spend limit reached: {0}")]
    SpendLimit(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("upstream failure: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::SpendLimit(_) => StatusCode::PAYMENT_REQUIRED,
            ApiError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::SpendLimit(_) => "SPEND_LIMIT_REACHED",
            ApiError::NotConfigured(_) => "NOT_CONFIGURED",
            ApiError::Upstream(_) => "UPSTREAM_FAILURE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        ApiError::InvalidPayload(value.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotConfigured => ApiError::NotConfigured(err.to_string()),
            ServiceError::BudgetExhausted(reason) => ApiError::SpendLimit(reason),
            ServiceError::Fetch(FetchError::CaseNotFound { court, case_number }) => {
                ApiError::NotFound(format!("case {case_number} in {court}"))
            }
            ServiceError::AuthenticationFailed { .. }
            | ServiceError::Fetch(_)
            | ServiceError::Http(_)
            | ServiceError::Auth(_) => ApiError::Upstream(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_mapping() {
        let not_found: ApiError = ServiceError::Fetch(FetchError::CaseNotFound {
            court: "cacd".into(),
            case_number: "1:24-cv-1".into(),
        })
        .into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let budget: ApiError = ServiceError::BudgetExhausted("daily".into()).into();
        assert_eq!(budget.code(), "SPEND_LIMIT_REACHED");

        let auth: ApiError = ServiceError::AuthenticationFailed {
            court: "cacd".into(),
            detail: "web_login [login_rejected]".into(),
        }
        .into();
        assert_eq!(auth.status_code(), StatusCode::BAD_GATEWAY);

        let missing: ApiError = ServiceError::NotConfigured.into();
        assert_eq!(missing.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
