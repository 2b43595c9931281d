//! OTP reason tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Purpose an OTP is bound to. A user holds at most one live OTP per reason.
///
/// Wire and storage format: the `SCREAMING_SNAKE_CASE` variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpReason {
    ActivateUser,
    ForgotPassword,
    /// Second step of a password reset, issued once `ForgotPassword` verifies.
    ForgotPasswordToken,
    /// Lets a freshly activated user without a password set one.
    ActiveUserPassword,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown otp reason: {0}")]
pub struct UnknownOtpReason(pub String);

impl OtpReason {
    pub const ALL: [OtpReason; 4] = [
        Self::ActivateUser,
        Self::ForgotPassword,
        Self::ForgotPasswordToken,
        Self::ActiveUserPassword,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActivateUser => "ACTIVATE_USER",
            Self::ForgotPassword => "FORGOT_PASSWORD",
            Self::ForgotPasswordToken => "FORGOT_PASSWORD_TOKEN",
            Self::ActiveUserPassword => "ACTIVE_USER_PASSWORD",
        }
    }

    /// Human-readable label, used in notifications.
    pub fn label(self) -> &'static str {
        match self {
            Self::ActivateUser => "Activate user",
            Self::ForgotPassword => "Forgot password",
            Self::ForgotPasswordToken => "Forgot password token",
            Self::ActiveUserPassword => "Activate user password token",
        }
    }

    /// Token reasons are handed back to the client instead of being emailed,
    /// and authorize the final step of a multi-step flow.
    pub fn is_token(self) -> bool {
        matches!(self, Self::ForgotPasswordToken | Self::ActiveUserPassword)
    }
}

impl fmt::Display for OtpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtpReason {
    type Err = UnknownOtpReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownOtpReason(s.to_owned()))
    }
}
