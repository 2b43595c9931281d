use tracing::debug;

use bazargan_domain::otp::OtpReason;
use bazargan_otp::OtpCode;

use crate::domain::repository::{OtpNotifier, OtpRepository, PasswordHasher, UserRepository};
use crate::domain::types::{Account, AccountChange, normalize_email, validate_password};
use crate::error::AccountsServiceError;
use crate::usecase::otp::{OtpBinder, deliver};

// ── Request ──────────────────────────────────────────────────────────────────

pub struct RequestActivationInput {
    pub email: String,
}

/// Re-sends the activation code. Unknown and already verified emails succeed
/// silently.
pub struct RequestActivationUseCase<U: UserRepository, O: OtpRepository, N: OtpNotifier> {
    pub users: U,
    pub binder: OtpBinder<O>,
    pub notifier: N,
}

impl<U: UserRepository, O: OtpRepository, N: OtpNotifier> RequestActivationUseCase<U, O, N> {
    pub async fn execute(&self, input: RequestActivationInput) -> Result<(), AccountsServiceError> {
        let email = normalize_email(&input.email);
        let Some(account) = self.users.find_by_email(&email).await? else {
            debug!("activation requested for unknown email");
            return Ok(());
        };
        if account.is_verified {
            debug!(user_id = %account.id, "activation requested for verified user");
            return Ok(());
        }

        let issued = self
            .binder
            .issue_for_user(account.id, OtpReason::ActivateUser)
            .await?;
        deliver(&self.notifier, &account, OtpReason::ActivateUser, &issued.otp).await;
        Ok(())
    }
}

// ── Verify ───────────────────────────────────────────────────────────────────

pub struct VerifyActivationInput {
    pub email: String,
    pub code: String,
}

#[derive(Debug)]
pub struct VerifyActivationOutput {
    /// Present when the account has no password yet; exchanged for one at the
    /// complete step.
    pub password_token: Option<OtpCode>,
}

pub struct VerifyActivationUseCase<U: UserRepository, O: OtpRepository> {
    pub users: U,
    pub binder: OtpBinder<O>,
}

impl<U: UserRepository, O: OtpRepository> VerifyActivationUseCase<U, O> {
    pub async fn execute(
        &self,
        input: VerifyActivationInput,
    ) -> Result<VerifyActivationOutput, AccountsServiceError> {
        let policy = self.binder.policies.for_reason(OtpReason::ActivateUser);
        let code = OtpCode::parse(&input.code, policy.length())?;

        let email = normalize_email(&input.email);
        let account = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AccountsServiceError::InvalidOtp)?;

        let mut changes = vec![AccountChange::MarkVerified];
        let mut password_token = None;
        if !account.has_password() {
            let token = self.binder.generate(OtpReason::ActiveUserPassword)?;
            changes.push(AccountChange::Bind {
                reason: OtpReason::ActiveUserPassword,
                otp: token.record,
            });
            password_token = Some(token.code);
        }

        self.binder
            .consume(account.id, OtpReason::ActivateUser, code, &changes)
            .await?;

        Ok(VerifyActivationOutput { password_token })
    }
}

// ── Complete ─────────────────────────────────────────────────────────────────

pub struct CompleteActivationInput {
    pub email: String,
    pub token: String,
    pub password: String,
}

pub struct CompleteActivationUseCase<U: UserRepository, O: OtpRepository, H: PasswordHasher> {
    pub users: U,
    pub binder: OtpBinder<O>,
    pub hasher: H,
}

impl<U: UserRepository, O: OtpRepository, H: PasswordHasher> CompleteActivationUseCase<U, O, H> {
    pub async fn execute(&self, input: CompleteActivationInput) -> Result<(), AccountsServiceError> {
        let reason = OtpReason::ActiveUserPassword;
        let token = parse_password_change(&self.binder, reason, &input.token, &input.password)?;

        let account = self
            .users
            .find_by_email(&normalize_email(&input.email))
            .await?
            .ok_or(AccountsServiceError::InvalidOtp)?;

        set_password_with_token(&self.binder, &self.hasher, &account, reason, token, input.password)
            .await
    }
}

/// Validate the new password and parse the token under `reason`'s policy.
pub(crate) fn parse_password_change<O: OtpRepository>(
    binder: &OtpBinder<O>,
    reason: OtpReason,
    token: &str,
    password: &str,
) -> Result<OtpCode, AccountsServiceError> {
    if !validate_password(password) {
        return Err(AccountsServiceError::InvalidInput(
            "password must be 8 to 128 characters".to_owned(),
        ));
    }
    let policy = binder.policies.for_reason(reason);
    Ok(OtpCode::parse(token, policy.length())?)
}

/// Shared second step of activation and password reset: exchange a token
/// bound to `reason` for a new password hash.
///
/// The token is checked before the password is hashed, so a wrong token
/// costs the same whether or not the account exists.
pub(crate) async fn set_password_with_token<O: OtpRepository, H: PasswordHasher>(
    binder: &OtpBinder<O>,
    hasher: &H,
    account: &Account,
    reason: OtpReason,
    token: OtpCode,
    password: String,
) -> Result<(), AccountsServiceError> {
    let bound = binder.verify_bound(account.id, reason, token).await?;
    let password_hash = hasher.hash(password).await?;
    binder
        .apply(&bound, &[AccountChange::SetPassword { password_hash }])
        .await
}
