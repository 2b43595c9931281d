use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Accounts service domain error variants.
///
/// Wrong, expired and unknown OTPs, as well as unknown emails on a verify
/// step, all collapse into `InvalidOtp` so callers cannot probe which one
/// happened.
#[derive(Debug, thiserror::Error)]
pub enum AccountsServiceError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("otp is invalid")]
    InvalidOtp,
    #[error("email already registered")]
    EmailTaken,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AccountsServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InvalidOtp => "INVALID_OTP",
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<bazargan_otp::MalformedCode> for AccountsServiceError {
    fn from(e: bazargan_otp::MalformedCode) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

impl IntoResponse for AccountsServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::InvalidOtp => StatusCode::UNAUTHORIZED,
            Self::EmailTaken => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Only 500s are logged here; TraceLayer already records status for the rest.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
