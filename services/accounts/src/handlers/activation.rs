use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};

use crate::error::AccountsServiceError;
use crate::state::AppState;
use crate::usecase::activation::{
    CompleteActivationInput, CompleteActivationUseCase, RequestActivationInput,
    RequestActivationUseCase, VerifyActivationInput, VerifyActivationUseCase,
};

// ── POST /accounts/activation/otp ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestActivationRequest {
    pub email: String,
}

pub async fn request_activation(
    State(state): State<AppState>,
    Json(body): Json<RequestActivationRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = RequestActivationUseCase {
        users: state.user_repo(),
        binder: state.binder(),
        notifier: state.notifier(),
    };
    usecase
        .execute(RequestActivationInput { email: body.email })
        .await?;
    Ok(StatusCode::ACCEPTED)
}

// ── POST /accounts/activation/otp/verify ─────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyActivationRequest {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyActivationResponse {
    pub password_token: Option<String>,
}

pub async fn verify_activation(
    State(state): State<AppState>,
    Json(body): Json<VerifyActivationRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = VerifyActivationUseCase {
        users: state.user_repo(),
        binder: state.binder(),
    };
    let out = usecase
        .execute(VerifyActivationInput {
            email: body.email,
            code: body.code,
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(VerifyActivationResponse {
            password_token: out.password_token.map(|t| t.to_string()),
        }),
    ))
}

// ── POST /accounts/activation/otp/complete ───────────────────────────────────

#[derive(Deserialize)]
pub struct CompleteActivationRequest {
    pub email: String,
    pub token: String,
    pub password: String,
}

pub async fn complete_activation(
    State(state): State<AppState>,
    Json(body): Json<CompleteActivationRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = CompleteActivationUseCase {
        users: state.user_repo(),
        binder: state.binder(),
        hasher: state.hasher(),
    };
    usecase
        .execute(CompleteActivationInput {
            email: body.email,
            token: body.token,
            password: body.password,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
