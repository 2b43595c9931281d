use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};

use crate::error::AccountsServiceError;
use crate::state::AppState;
use crate::usecase::password_reset::{
    CompletePasswordResetInput, CompletePasswordResetUseCase, RequestPasswordResetInput,
    RequestPasswordResetUseCase, VerifyPasswordResetInput, VerifyPasswordResetUseCase,
};

// ── POST /accounts/reset_password/otp ────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestPasswordResetRequest {
    pub email: String,
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<RequestPasswordResetRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = RequestPasswordResetUseCase {
        users: state.user_repo(),
        binder: state.binder(),
        notifier: state.notifier(),
    };
    usecase
        .execute(RequestPasswordResetInput { email: body.email })
        .await?;
    Ok(StatusCode::ACCEPTED)
}

// ── POST /accounts/reset_password/otp/verify ─────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyPasswordResetRequest {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyPasswordResetResponse {
    pub reset_token: String,
}

pub async fn verify_password_reset(
    State(state): State<AppState>,
    Json(body): Json<VerifyPasswordResetRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = VerifyPasswordResetUseCase {
        users: state.user_repo(),
        binder: state.binder(),
    };
    let out = usecase
        .execute(VerifyPasswordResetInput {
            email: body.email,
            code: body.code,
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(VerifyPasswordResetResponse {
            reset_token: out.reset_token.to_string(),
        }),
    ))
}

// ── POST /accounts/reset_password/otp/complete ───────────────────────────────

#[derive(Deserialize)]
pub struct CompletePasswordResetRequest {
    pub email: String,
    pub token: String,
    pub password: String,
}

pub async fn complete_password_reset(
    State(state): State<AppState>,
    Json(body): Json<CompletePasswordResetRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = CompletePasswordResetUseCase {
        users: state.user_repo(),
        binder: state.binder(),
        hasher: state.hasher(),
    };
    usecase
        .execute(CompletePasswordResetInput {
            email: body.email,
            token: body.token,
            password: body.password,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
