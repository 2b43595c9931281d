//! One-time password primitive.
//!
//! A random numeric code is signed together with its issuance timestamp; the
//! leading plaintext digits are cut off and only the remainder (the
//! *envelope*) is stored. Verifying requires the user to supply the missing
//! digits, so a stored record alone can never reproduce the code.

pub mod clock;
pub mod codec;
pub mod signer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{GeneratedOtp, MalformedCode, OtpCode, OtpCodec, OtpError, OtpPolicy, OtpRecord};
pub use signer::{SignatureError, SigningKeys, TimestampSigner};
