use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use bazargan_domain::id::{OtpId, UserId};
use bazargan_domain::otp::OtpReason;
use bazargan_otp::{OtpPolicy, OtpRecord};

/// Account row as seen by the OTP flows.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: UserId,
    pub email: String,
    pub password_hash: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Live OTP for one (user, reason) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpBinding {
    pub id: Uuid,
    pub user_id: UserId,
    pub otp_id: OtpId,
    pub reason: OtpReason,
}

/// A binding together with the record it currently points at.
#[derive(Debug, Clone)]
pub struct BoundOtp {
    pub binding: OtpBinding,
    pub otp: OtpRecord,
}

/// Account mutation applied in the same transaction that consumes an OTP.
#[derive(Debug, Clone)]
pub enum AccountChange {
    MarkVerified,
    SetPassword { password_hash: String },
    /// Bind a follow-up OTP for the next step of the flow.
    Bind { reason: OtpReason, otp: OtpRecord },
}

/// Code shape per reason: short emailed codes, longer second-step tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicies {
    pub code: OtpPolicy,
    pub token: OtpPolicy,
}

impl OtpPolicies {
    pub fn for_reason(&self, reason: OtpReason) -> OtpPolicy {
        if reason.is_token() {
            self.token
        } else {
            self.code
        }
    }
}

impl Default for OtpPolicies {
    fn default() -> Self {
        Self {
            code: OtpPolicy::default(),
            token: OtpPolicy::new(TOKEN_LENGTH, Duration::seconds(TOKEN_TIMEOUT_SECS))
                .unwrap_or_default(),
        }
    }
}

pub const TOKEN_LENGTH: usize = 12;

pub const TOKEN_TIMEOUT_SECS: i64 = 600;

pub const MIN_PASSWORD_LEN: usize = 8;

pub const MAX_PASSWORD_LEN: usize = 128;

pub fn validate_password(password: &str) -> bool {
    (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password.chars().count())
}

/// Trimmed, lowercased email. Lookups and inserts both go through this.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Cheap shape check: one `@` with something on both sides and a dot in the domain.
pub fn validate_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && email.len() <= 255
        }
        None => false,
    }
}
