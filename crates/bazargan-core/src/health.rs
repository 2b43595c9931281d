use axum::http::StatusCode;

/// Handler for `GET /healthz`: liveness check.
///
/// Readiness depends on service-owned resources, so each service provides its
/// own `/readyz`.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}
