use arcade_core::error::ArcadeError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

/// Wraps a component-level [`ArcadeError`] with the correlation id of the
/// request that produced it, so `Internal` failures can be traced back to a
/// single log line without leaking detail to the caller.
pub struct ApiError {
    pub error: ArcadeError,
    pub correlation_id: Uuid,
}

impl ApiError {
    pub fn new(error: ArcadeError, correlation_id: Uuid) -> Self {
        Self { error, correlation_id }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retry_after) = match &self.error {
            ArcadeError::InputShape(_) => (StatusCode::BAD_REQUEST, "malformed request", None),
            ArcadeError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated", None),
            ArcadeError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid credentials", None),
            ArcadeError::NotVerified => (StatusCode::UNAUTHORIZED, "account not verified", None),
            ArcadeError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None),
            ArcadeError::NotFound => (StatusCode::NOT_FOUND, "not found", None),
            ArcadeError::InsufficientCredits => (StatusCode::PAYMENT_REQUIRED, "insufficient credits", None),
            ArcadeError::Conflict => (StatusCode::CONFLICT, "save conflict, refetch before retrying", None),
            ArcadeError::Throttled { retry_after_secs } => {
                (StatusCode::TOO_MANY_REQUESTS, "rate limited", Some(*retry_after_secs))
            }
            ArcadeError::BadSession => (StatusCode::UNAUTHORIZED, "session token invalid", None),
            ArcadeError::BadChecksum => (StatusCode::UNAUTHORIZED, "checksum mismatch", None),
            ArcadeError::EmailInUse => (StatusCode::BAD_REQUEST, "email already in use", None),
            ArcadeError::BadCode => (StatusCode::BAD_REQUEST, "code invalid or expired", None),
            ArcadeError::TooManyAttempts => (StatusCode::BAD_REQUEST, "too many attempts", None),
            ArcadeError::BadSignature => (StatusCode::BAD_REQUEST, "invalid signature", None),
            ArcadeError::Internal(detail) => {
                tracing::error!(correlation_id = %self.correlation_id, detail, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error", None)
            }
        };

        if !matches!(self.error, ArcadeError::Internal(_)) {
            tracing::warn!(correlation_id = %self.correlation_id, error = %self.error, "request failed");
        }

        let mut body = json!({ "error": message, "correlationId": self.correlation_id.to_string() });
        if let Some(secs) = retry_after {
            body["retryAfterSecs"] = json!(secs);
        }

        (status, Json(body)).into_response()
    }
}
