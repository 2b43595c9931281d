#![allow(async_fn_in_trait)]

use chrono::{DateTime, Duration, Utc};

use bazargan_domain::id::UserId;
use bazargan_domain::otp::OtpReason;
use bazargan_otp::{OtpCode, OtpRecord};

use crate::domain::types::{Account, AccountChange, BoundOtp, OtpBinding};
use crate::error::AccountsServiceError;

/// Repository for accounts. The OTP core only reads id and email.
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountsServiceError>;

    /// Insert a new account and apply `changes` to it in the same
    /// transaction. Fails with `EmailTaken` on a duplicate email, leaving
    /// nothing behind.
    async fn create(
        &self,
        account: &Account,
        changes: &[AccountChange],
    ) -> Result<(), AccountsServiceError>;
}

/// Repository for OTP records and their (user, reason) bindings.
pub trait OtpRepository: Send + Sync {
    /// Persist `otp` and point the (user, reason) binding at it, atomically.
    /// Creates the binding if absent; a concurrent creator for the same pair
    /// turns into a repoint, never a second binding.
    async fn bind(
        &self,
        user_id: UserId,
        reason: OtpReason,
        otp: &OtpRecord,
    ) -> Result<OtpBinding, AccountsServiceError>;

    async fn find_bound(
        &self,
        user_id: UserId,
        reason: OtpReason,
    ) -> Result<Option<BoundOtp>, AccountsServiceError>;

    /// Delete `binding` and its record and apply `changes`, in one transaction.
    ///
    /// Returns `false` without applying anything if the binding no longer
    /// points at `binding.otp_id` (consumed or reissued concurrently).
    async fn consume(
        &self,
        binding: &OtpBinding,
        changes: &[AccountChange],
    ) -> Result<bool, AccountsServiceError>;

    /// Delete every record past its timeout at `now`. Returns rows deleted.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AccountsServiceError>;
}

/// Port for handing a plaintext code to the user (email in production).
pub trait OtpNotifier: Send + Sync {
    async fn deliver(
        &self,
        email: &str,
        code: OtpCode,
        ttl: Duration,
        reason: OtpReason,
    ) -> anyhow::Result<()>;
}

/// Port for turning a plaintext password into a stored hash.
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: String) -> anyhow::Result<String>;
}
