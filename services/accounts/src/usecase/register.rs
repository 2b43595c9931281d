use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use bazargan_domain::id::UserId;
use bazargan_domain::otp::OtpReason;

use crate::domain::repository::{OtpNotifier, OtpRepository, PasswordHasher, UserRepository};
use crate::domain::types::{
    Account, AccountChange, normalize_email, validate_email, validate_password,
};
use crate::error::AccountsServiceError;
use crate::usecase::otp::{OtpBinder, deliver};

pub struct RegisterInput {
    pub email: String,
    /// Accounts created without a password set one after activation.
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct RegisterOutput {
    pub user_id: UserId,
}

/// Creates the account and binds its activation code in one transaction,
/// so a failed registration can simply be retried.
pub struct RegisterUseCase<U, O, N, H>
where
    U: UserRepository,
    O: OtpRepository,
    N: OtpNotifier,
    H: PasswordHasher,
{
    pub users: U,
    pub binder: OtpBinder<O>,
    pub notifier: N,
    pub hasher: H,
}

impl<U, O, N, H> RegisterUseCase<U, O, N, H>
where
    U: UserRepository,
    O: OtpRepository,
    N: OtpNotifier,
    H: PasswordHasher,
{
    pub async fn execute(&self, input: RegisterInput) -> Result<RegisterOutput, AccountsServiceError> {
        let email = normalize_email(&input.email);
        if !validate_email(&email) {
            return Err(AccountsServiceError::InvalidInput("invalid email".to_owned()));
        }

        let password_hash = match input.password {
            Some(password) => {
                if !validate_password(&password) {
                    return Err(AccountsServiceError::InvalidInput(
                        "password must be 8 to 128 characters".to_owned(),
                    ));
                }
                Some(self.hasher.hash(password).await?)
            }
            None => None,
        };

        let account = Account {
            id: UserId(Uuid::now_v7()),
            email,
            password_hash,
            is_verified: false,
            is_active: true,
            created_at: Utc::now(),
        };
        let reason = OtpReason::ActivateUser;
        let otp = self.binder.generate(reason)?;
        self.users
            .create(
                &account,
                &[AccountChange::Bind {
                    reason,
                    otp: otp.record.clone(),
                }],
            )
            .await?;
        info!(user_id = %account.id, otp_id = %otp.record.id, "account registered");

        deliver(&self.notifier, &account, reason, &otp).await;

        Ok(RegisterOutput {
            user_id: account.id,
        })
    }
}
