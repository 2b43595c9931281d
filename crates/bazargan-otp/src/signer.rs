//! Salted, timestamped HMAC-SHA256 signer.
//!
//! Signed layout: `{value}:{timestamp}:{mac}` where
//!
//! | Part | Encoding |
//! |------|----------|
//! | `value` | caller-supplied text (must not be relied on to be `:`-free) |
//! | `timestamp` | UNIX seconds, base62 (`0-9A-Za-z`) |
//! | `mac` | HMAC-SHA256 over `{value}:{timestamp}`, URL-safe base64 without padding |
//!
//! The HMAC key is `SHA-256(salt || "signer" || secret)`, so the same secret
//! yields unrelated MACs under different salts.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const SEP: char = ':';

const KEY_SALT_SUFFIX: &[u8] = b"signer";

const B62_ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Errors returned by [`TimestampSigner`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed signed value")]
    Malformed,
    #[error("signature does not match")]
    BadSignature,
    #[error("signature expired")]
    Expired,
    #[error("invalid signing key")]
    InvalidKey,
}

impl From<InvalidLength> for SignatureError {
    fn from(_: InvalidLength) -> Self {
        Self::InvalidKey
    }
}

/// Process-wide secret key plus older keys still accepted during rotation.
///
/// Signing always uses `current`; verification tries `current` first, then
/// each fallback in order.
#[derive(Clone)]
pub struct SigningKeys {
    current: Vec<u8>,
    fallbacks: Vec<Vec<u8>>,
}

impl SigningKeys {
    pub fn new(current: impl Into<Vec<u8>>) -> Self {
        Self {
            current: current.into(),
            fallbacks: Vec::new(),
        }
    }

    pub fn with_fallbacks<I, K>(mut self, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Vec<u8>>,
    {
        self.fallbacks = fallbacks.into_iter().map(Into::into).collect();
        self
    }

    fn verification_order(&self) -> impl Iterator<Item = &[u8]> {
        std::iter::once(self.current.as_slice()).chain(self.fallbacks.iter().map(Vec::as_slice))
    }
}

impl fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeys")
            .field("current", &"<redacted>")
            .field("fallbacks", &self.fallbacks.len())
            .finish()
    }
}

/// Signs and verifies values under one salt.
pub struct TimestampSigner<'a> {
    keys: &'a SigningKeys,
    salt: String,
}

impl<'a> TimestampSigner<'a> {
    pub fn new(keys: &'a SigningKeys, salt: impl Into<String>) -> Self {
        Self {
            keys,
            salt: salt.into(),
        }
    }

    /// Sign `value` with `at` (truncated to whole seconds) as the embedded timestamp.
    pub fn sign_at(&self, value: &str, at: DateTime<Utc>) -> Result<String, SignatureError> {
        let timestamp = b62_encode(u64::try_from(at.timestamp()).unwrap_or(0));
        let payload = format!("{value}{SEP}{timestamp}");
        let mac = self
            .keyed_mac(&self.keys.current)?
            .chain_update(payload.as_bytes())
            .finalize()
            .into_bytes();
        Ok(format!("{payload}{SEP}{}", URL_SAFE_NO_PAD.encode(mac)))
    }

    /// Verify the MAC against every configured key, then the age, and return
    /// the original value.
    pub fn unsign_at(
        &self,
        signed: &str,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, SignatureError> {
        let (payload, mac) = signed.rsplit_once(SEP).ok_or(SignatureError::Malformed)?;
        let mac = URL_SAFE_NO_PAD
            .decode(mac)
            .map_err(|_| SignatureError::BadSignature)?;

        let mut matched = false;
        for key in self.keys.verification_order() {
            // verify_slice compares in constant time.
            if self
                .keyed_mac(key)?
                .chain_update(payload.as_bytes())
                .verify_slice(&mac)
                .is_ok()
            {
                matched = true;
                break;
            }
        }
        if !matched {
            return Err(SignatureError::BadSignature);
        }

        let (value, timestamp) = payload.rsplit_once(SEP).ok_or(SignatureError::Malformed)?;
        let issued = b62_decode(timestamp)
            .and_then(|ts| i64::try_from(ts).ok())
            .ok_or(SignatureError::Malformed)?;
        if is_expired(issued, max_age, now) {
            return Err(SignatureError::Expired);
        }
        Ok(value.to_owned())
    }

    fn keyed_mac(&self, secret: &[u8]) -> Result<HmacSha256, SignatureError> {
        let key = Sha256::new()
            .chain_update(self.salt.as_bytes())
            .chain_update(KEY_SALT_SUFFIX)
            .chain_update(secret)
            .finalize();
        Ok(<HmacSha256 as Mac>::new_from_slice(&key)?)
    }
}

/// Single expiry predicate for signed timestamps and stored records alike:
/// expired once more than `max_age` whole seconds have passed since `issued_secs`.
pub fn is_expired(issued_secs: i64, max_age: Duration, now: DateTime<Utc>) -> bool {
    now.timestamp().saturating_sub(issued_secs) > max_age.num_seconds()
}

fn b62_encode(mut n: u64) -> String {
    if n == 0 {
        return "0".to_owned();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(B62_ALPHABET[(n % 62) as usize]);
        n /= 62;
    }
    digits.reverse();
    // Alphabet is ASCII.
    digits.into_iter().map(char::from).collect()
}

fn b62_decode(s: &str) -> Option<u64> {
    if s.is_empty() {
        return None;
    }
    s.bytes().try_fold(0u64, |acc, byte| {
        let digit = B62_ALPHABET.iter().position(|&c| c == byte)? as u64;
        acc.checked_mul(62)?.checked_add(digit)
    })
}
