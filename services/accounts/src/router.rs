use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use bazargan_core::health::healthz;
use bazargan_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    activation::{complete_activation, request_activation, verify_activation},
    health::readyz,
    password_reset::{complete_password_reset, request_password_reset, verify_password_reset},
    register::register,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Registration
        .route("/accounts/register", post(register))
        // Activation
        .route("/accounts/activation/otp", post(request_activation))
        .route("/accounts/activation/otp/verify", post(verify_activation))
        .route("/accounts/activation/otp/complete", post(complete_activation))
        // Password reset
        .route("/accounts/reset_password/otp", post(request_password_reset))
        .route("/accounts/reset_password/otp/verify", post(verify_password_reset))
        .route(
            "/accounts/reset_password/otp/complete",
            post(complete_password_reset),
        )
        // Last layer is outermost: the request id exists before TraceLayer runs.
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
