use anyhow::Context as _;
use tracing::{info, warn};

use bazargan_domain::id::UserId;
use bazargan_domain::otp::OtpReason;
use bazargan_otp::{GeneratedOtp, OtpCode, OtpCodec};

use crate::domain::repository::{OtpNotifier, OtpRepository};
use crate::domain::types::{Account, AccountChange, BoundOtp, OtpBinding, OtpPolicies};
use crate::error::AccountsServiceError;

/// Result of issuing an OTP. `otp.code` is the only copy of the plaintext.
#[derive(Debug)]
pub struct IssuedOtp {
    pub binding: OtpBinding,
    pub otp: GeneratedOtp,
}

/// Ties OTPs to users per reason: at most one live OTP per (user, reason).
pub struct OtpBinder<O: OtpRepository> {
    pub otps: O,
    pub codec: OtpCodec,
    pub policies: OtpPolicies,
}

impl<O: OtpRepository> OtpBinder<O> {
    /// Generate a record for `reason` without binding it. Used for OTPs bound
    /// inside another transaction, such as account creation or a consume.
    pub fn generate(&self, reason: OtpReason) -> Result<GeneratedOtp, AccountsServiceError> {
        let otp = self
            .codec
            .generate(self.policies.for_reason(reason))
            .context("generate otp")?;
        Ok(otp)
    }

    /// Always mints a new record; an existing binding for the pair is
    /// repointed so the previous code stops working.
    pub async fn issue_for_user(
        &self,
        user_id: UserId,
        reason: OtpReason,
    ) -> Result<IssuedOtp, AccountsServiceError> {
        let otp = self.generate(reason)?;
        let binding = self.otps.bind(user_id, reason, &otp.record).await?;
        info!(%user_id, %reason, otp_id = %otp.record.id, "otp issued");
        Ok(IssuedOtp { binding, otp })
    }

    /// Verify `code` against the live OTP for (user, reason) without
    /// consuming it.
    ///
    /// A missing binding and a failed verification both yield `InvalidOtp`.
    /// Nothing is deleted, so the user can retry until the timeout lapses.
    pub async fn verify_bound(
        &self,
        user_id: UserId,
        reason: OtpReason,
        code: OtpCode,
    ) -> Result<BoundOtp, AccountsServiceError> {
        let bound = self
            .otps
            .find_bound(user_id, reason)
            .await?
            .ok_or(AccountsServiceError::InvalidOtp)?;

        if !self.codec.verify(&bound.otp, code) {
            return Err(AccountsServiceError::InvalidOtp);
        }
        Ok(bound)
    }

    /// Delete a verified binding and apply `changes` atomically. Yields
    /// `InvalidOtp` if a concurrent consume or reissue got there first.
    pub async fn apply(
        &self,
        bound: &BoundOtp,
        changes: &[AccountChange],
    ) -> Result<(), AccountsServiceError> {
        if !self.otps.consume(&bound.binding, changes).await? {
            return Err(AccountsServiceError::InvalidOtp);
        }

        let binding = &bound.binding;
        info!(
            user_id = %binding.user_id,
            reason = %binding.reason,
            otp_id = %bound.otp.id,
            "otp consumed"
        );
        Ok(())
    }

    /// `verify_bound` followed by `apply`.
    pub async fn consume(
        &self,
        user_id: UserId,
        reason: OtpReason,
        code: OtpCode,
        changes: &[AccountChange],
    ) -> Result<(), AccountsServiceError> {
        let bound = self.verify_bound(user_id, reason, code).await?;
        self.apply(&bound, changes).await
    }
}

/// Hand the code to the notifier. Delivery failures are logged and swallowed.
pub async fn deliver<N: OtpNotifier>(
    notifier: &N,
    account: &Account,
    reason: OtpReason,
    otp: &GeneratedOtp,
) {
    if let Err(e) = notifier
        .deliver(&account.email, otp.code, otp.record.timeout, reason)
        .await
    {
        warn!(error = %e, user_id = %account.id, %reason, "otp delivery failed");
    }
}
