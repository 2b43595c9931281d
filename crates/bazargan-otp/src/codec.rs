use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::RngExt;

use bazargan_domain::id::OtpId;

use crate::clock::{Clock, SystemClock};
use crate::signer::{self, SignatureError, SigningKeys, TimestampSigner};

/// Shortest code length accepted by [`OtpPolicy`].
pub const MIN_LENGTH: usize = 4;

/// Longest code length accepted by [`OtpPolicy`]; keeps codes inside `u64`.
pub const MAX_LENGTH: usize = 18;

pub const DEFAULT_LENGTH: usize = 6;

pub const DEFAULT_TIMEOUT_SECS: i64 = 120;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    #[error("otp length must be between 4 and 18 digits, got {0}")]
    InvalidLength(usize),
    #[error("otp timeout must be at least one second")]
    InvalidTimeout,
    #[error("signed output does not start with the code")]
    UnexpectedEnvelope,
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// Length and lifetime of the codes issued for one purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicy {
    length: usize,
    timeout: Duration,
}

impl OtpPolicy {
    pub fn new(length: usize, timeout: Duration) -> Result<Self, OtpError> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
            return Err(OtpError::InvalidLength(length));
        }
        if timeout < Duration::seconds(1) {
            return Err(OtpError::InvalidTimeout);
        }
        Ok(Self { length, timeout })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            timeout: Duration::seconds(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Plaintext numeric code. Compared as an integer; `Debug` never prints it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct OtpCode(u64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("code must be exactly {length} digits")]
pub struct MalformedCode {
    pub length: usize,
}

impl OtpCode {
    /// Parse user input: surrounding whitespace is ignored, the rest must be
    /// exactly `length` ASCII digits.
    pub fn parse(input: &str, length: usize) -> Result<Self, MalformedCode> {
        let digits = input.trim();
        if digits.len() != length || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MalformedCode { length });
        }
        digits
            .parse()
            .map(Self)
            .map_err(|_| MalformedCode { length })
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for OtpCode {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(<redacted>)")
    }
}

/// Stored half of an OTP. Holds no plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    /// Also the signing salt.
    pub id: OtpId,
    /// Signed output with the leading code digits removed.
    pub envelope: String,
    /// Whole seconds; equals the timestamp embedded in `envelope`.
    pub issued_at: DateTime<Utc>,
    pub timeout: Duration,
}

impl OtpRecord {
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        signer::is_expired(self.issued_at.timestamp(), self.timeout, now)
    }
}

/// A fresh record plus its plaintext code. The code cannot be recovered once
/// this value is dropped.
#[derive(Debug)]
pub struct GeneratedOtp {
    pub record: OtpRecord,
    pub code: OtpCode,
}

/// Generates and verifies OTPs under a fixed key set and clock.
#[derive(Clone)]
pub struct OtpCodec {
    keys: Arc<SigningKeys>,
    clock: Arc<dyn Clock>,
}

impl OtpCodec {
    pub fn new(keys: SigningKeys, clock: Arc<dyn Clock>) -> Self {
        Self {
            keys: Arc::new(keys),
            clock,
        }
    }

    pub fn with_system_clock(keys: SigningKeys) -> Self {
        Self::new(keys, Arc::new(SystemClock))
    }

    pub fn generate(&self, policy: OtpPolicy) -> Result<GeneratedOtp, OtpError> {
        let policy = OtpPolicy::new(policy.length, policy.timeout)?;
        let code = random_code(policy.length);
        let id = OtpId::new();
        let now = self.clock.now();
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);

        let digits = code.to_string();
        let signed = TimestampSigner::new(&self.keys, id.to_string()).sign_at(&digits, issued_at)?;
        let envelope = signed
            .strip_prefix(digits.as_str())
            .ok_or(OtpError::UnexpectedEnvelope)?
            .to_owned();

        Ok(GeneratedOtp {
            record: OtpRecord {
                id,
                envelope,
                issued_at,
                timeout: policy.timeout,
            },
            code: OtpCode(code),
        })
    }

    /// True only when the MAC matches, the record is within its timeout and
    /// the signed value is the submitted code. Never errors.
    pub fn verify(&self, record: &OtpRecord, code: OtpCode) -> bool {
        let signed = format!("{}{}", code.value(), record.envelope);
        let signer = TimestampSigner::new(&self.keys, record.id.to_string());
        match signer.unsign_at(&signed, record.timeout, self.clock.now()) {
            Ok(value) => value.parse::<u64>().is_ok_and(|v| v == code.value()),
            Err(e) => {
                tracing::debug!(otp_id = %record.id, error = %e, "otp verification failed");
                false
            }
        }
    }

    pub fn has_expired(&self, record: &OtpRecord) -> bool {
        record.has_expired(self.clock.now())
    }
}

fn random_code(length: usize) -> u64 {
    let low = 10u64.pow(length as u32 - 1);
    let high = 10u64.pow(length as u32);
    rand::rng().random_range(low..high)
}
