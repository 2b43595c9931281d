use tracing::debug;

use bazargan_domain::otp::OtpReason;
use bazargan_otp::OtpCode;

use crate::domain::repository::{OtpNotifier, OtpRepository, PasswordHasher, UserRepository};
use crate::domain::types::{Account, AccountChange, normalize_email};
use crate::error::AccountsServiceError;
use crate::usecase::activation::{parse_password_change, set_password_with_token};
use crate::usecase::otp::{OtpBinder, deliver};

// ── Request ──────────────────────────────────────────────────────────────────

pub struct RequestPasswordResetInput {
    pub email: String,
}

pub struct RequestPasswordResetUseCase<U: UserRepository, O: OtpRepository, N: OtpNotifier> {
    pub users: U,
    pub binder: OtpBinder<O>,
    pub notifier: N,
}

impl<U: UserRepository, O: OtpRepository, N: OtpNotifier> RequestPasswordResetUseCase<U, O, N> {
    pub async fn execute(
        &self,
        input: RequestPasswordResetInput,
    ) -> Result<(), AccountsServiceError> {
        let email = normalize_email(&input.email);
        let account = match self.users.find_by_email(&email).await? {
            Some(account) if account.is_active => account,
            _ => {
                debug!("password reset requested for unknown or inactive email");
                return Ok(());
            }
        };

        let issued = self
            .binder
            .issue_for_user(account.id, OtpReason::ForgotPassword)
            .await?;
        deliver(&self.notifier, &account, OtpReason::ForgotPassword, &issued.otp).await;
        Ok(())
    }
}

// ── Verify ───────────────────────────────────────────────────────────────────

pub struct VerifyPasswordResetInput {
    pub email: String,
    pub code: String,
}

#[derive(Debug)]
pub struct VerifyPasswordResetOutput {
    pub reset_token: OtpCode,
}

pub struct VerifyPasswordResetUseCase<U: UserRepository, O: OtpRepository> {
    pub users: U,
    pub binder: OtpBinder<O>,
}

impl<U: UserRepository, O: OtpRepository> VerifyPasswordResetUseCase<U, O> {
    pub async fn execute(
        &self,
        input: VerifyPasswordResetInput,
    ) -> Result<VerifyPasswordResetOutput, AccountsServiceError> {
        let policy = self.binder.policies.for_reason(OtpReason::ForgotPassword);
        let code = OtpCode::parse(&input.code, policy.length())?;

        let account = find_active(&self.users, &input.email).await?;

        let token = self.binder.generate(OtpReason::ForgotPasswordToken)?;
        let changes = [AccountChange::Bind {
            reason: OtpReason::ForgotPasswordToken,
            otp: token.record,
        }];
        self.binder
            .consume(account.id, OtpReason::ForgotPassword, code, &changes)
            .await?;

        Ok(VerifyPasswordResetOutput {
            reset_token: token.code,
        })
    }
}

// ── Complete ─────────────────────────────────────────────────────────────────

pub struct CompletePasswordResetInput {
    pub email: String,
    pub token: String,
    pub password: String,
}

pub struct CompletePasswordResetUseCase<U: UserRepository, O: OtpRepository, H: PasswordHasher> {
    pub users: U,
    pub binder: OtpBinder<O>,
    pub hasher: H,
}

impl<U: UserRepository, O: OtpRepository, H: PasswordHasher> CompletePasswordResetUseCase<U, O, H> {
    pub async fn execute(
        &self,
        input: CompletePasswordResetInput,
    ) -> Result<(), AccountsServiceError> {
        let reason = OtpReason::ForgotPasswordToken;
        let token = parse_password_change(&self.binder, reason, &input.token, &input.password)?;
        let account = find_active(&self.users, &input.email).await?;

        set_password_with_token(&self.binder, &self.hasher, &account, reason, token, input.password)
            .await
    }
}

/// Unknown and deactivated accounts are indistinguishable from a wrong code.
async fn find_active<U: UserRepository>(
    users: &U,
    email: &str,
) -> Result<Account, AccountsServiceError> {
    match users.find_by_email(&normalize_email(email)).await? {
        Some(account) if account.is_active => Ok(account),
        _ => Err(AccountsServiceError::InvalidOtp),
    }
}
